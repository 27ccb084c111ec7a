/// Per-check-in-code debounce of verification attempts
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Last-attempt map keyed by check-in code. A zero window disables limiting.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reject `code` if an attempt was recorded within the window
    pub fn check(&self, code: &str) -> Result<()> {
        self.check_at(code, Instant::now())
    }

    pub fn check_at(&self, code: &str, now: Instant) -> Result<()> {
        if self.window.is_zero() {
            return Ok(());
        }
        let last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        match last_seen.get(code) {
            Some(&seen) if now.saturating_duration_since(seen) < self.window => {
                Err(Error::RateLimited(code.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Reject `code` if an attempt was recorded within the window, otherwise
    /// record this one. Test and insert happen under one lock.
    pub fn check_and_record(&self, code: &str) -> Result<()> {
        self.check_and_record_at(code, Instant::now())
    }

    pub fn check_and_record_at(&self, code: &str, now: Instant) -> Result<()> {
        if self.window.is_zero() {
            return Ok(());
        }
        let mut last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&seen) = last_seen.get(code) {
            if now.saturating_duration_since(seen) < self.window {
                return Err(Error::RateLimited(code.to_string()));
            }
        }
        last_seen.retain(|_, seen| now.saturating_duration_since(*seen) < self.window);
        last_seen.insert(code.to_string(), now);
        Ok(())
    }
}
