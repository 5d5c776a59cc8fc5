use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rate_limit::{RateLimiter, RateWindow};

// Name the ticker is registered under in the limiter
pub const TICKER: &str = "print_second";

// serve mode's shared state

pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub ticks_run: AtomicU64,        // ticks that passed the limiter
    pub ticks_suppressed: AtomicU64, // ticks dropped by the limiter
}

impl AppState {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            ticks_run: AtomicU64::new(0),
            ticks_suppressed: AtomicU64::new(0),
        }
    }

    pub fn record_tick(&self, ran: bool) {
        if ran {
            self.ticks_run.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ticks_suppressed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn ticker_window(&self) -> Option<RateWindow> {
        self.limiter.window(TICKER)
    }
}
