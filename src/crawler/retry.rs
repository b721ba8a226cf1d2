use log::{error, warn};
use std::fmt::Display;
use std::thread;
use std::time::Duration;

/// Fixed-delay retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A budget of zero attempts is raised to one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts: attempts.max(1), delay }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `op` until it succeeds or the budget is spent. `op` receives the
    /// 1-based attempt number. The last error is returned on exhaustion.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts;
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} failed after {} attempts: {}", what, attempts, e);
                    return Err(e);
                }
            }
        }
    }
}
