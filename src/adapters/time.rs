//! Monotonic millisecond clock for the scheduler loop.
//!
//! - **`feature = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **host**: uses `std::time::Instant` for tests and simulation.
//!
//! The value is truncated to `u32` and wraps after ~49.7 days.  Everything
//! downstream compares timestamps with `wrapping_sub`.

pub struct MonotonicClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot, wrapping.
    #[cfg(feature = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        ((unsafe { esp_idf_sys::esp_timer_get_time() }) / 1000) as u32
    }

    /// Milliseconds since construction, wrapping.
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
