//! Clock and delay adapters.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`
//!   (microsecond precision).
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for host runs
//!   and tests.
//!
//! Epoch time comes from the system wall clock on both targets; the link
//! channel corrects it with the agent offset.

use std::time::{SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;

/// Monotonic and wall-clock time source.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn millis(&self) -> i64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1000
    }

    /// Milliseconds since construction (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn millis(&self) -> i64 {
        i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    /// Local wall-clock time in nanoseconds since the Unix epoch.
    /// Before the epoch (unset RTC) this is 0.
    pub fn epoch_nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Blocking delay on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}
