//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the connection engine
//! against a scripted channel.  All tests run on the host with no agent
//! required.

mod connection_flow_tests;
mod mock_channel;
