//! Hosted reliable channel: transport trait, frame codec, wire messages and
//! the [`LinkChannel`](channel::LinkChannel) that ties them together.

pub mod channel;
pub mod codec;
pub mod transport;
pub mod wire;
