//! Execute cooldown owned by the control surface.
//!
//! After an execute is accepted, further requests are refused until the
//! window elapses. The broadcast itself never consults this.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Busy flag with a timed re-enable.
#[derive(Debug)]
pub struct ExecuteCooldown {
    window: Duration,
    busy_until: Mutex<Option<Instant>>,
}

impl ExecuteCooldown {
    /// Creates a cooldown. A zero window never refuses.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            busy_until: Mutex::new(None),
        }
    }

    /// Marks the start of an execute.
    ///
    /// # Errors
    ///
    /// Returns the remaining wait if a previous execute is still cooling
    /// down.
    pub fn try_begin(&self) -> Result<(), Duration> {
        if self.window.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let mut busy_until = self.busy_until.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(deadline) = *busy_until
            && deadline > now
        {
            return Err(deadline - now);
        }
        *busy_until = Some(now + self.window);
        Ok(())
    }

    /// Returns `true` while a previous execute is cooling down.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        let busy_until = self.busy_until.lock().unwrap_or_else(PoisonError::into_inner);
        busy_until.is_some_and(|deadline| deadline > Instant::now())
    }
}
