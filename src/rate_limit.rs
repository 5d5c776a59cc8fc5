use chrono::{DateTime, Timelike, Utc};
use clap::ValueEnum;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::call::Call;
use crate::clock::{Clock, SystemClock};
use crate::error::DecoratorError;
use crate::metrics::RATE_LIMITED;

/// How the current counting window is identified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WindowScheme {
    /// Minute of the hour (0-59). Calls exactly an hour apart land in the
    /// same window.
    MinuteOfHour,
    /// Whole minutes since the Unix epoch.
    #[default]
    EpochMinute,
}

impl WindowScheme {
    pub fn window_id(self, now: DateTime<Utc>) -> i64 {
        match self {
            WindowScheme::MinuteOfHour => i64::from(now.minute()),
            WindowScheme::EpochMinute => now.timestamp().div_euclid(60),
        }
    }

    // does `current` start a new window over the stored one?
    // epoch minutes only move forward; a late reading is charged to the stored window
    fn starts_new_window(self, current: i64, stored: Option<i64>) -> bool {
        match (self, stored) {
            (_, None) => true,
            (WindowScheme::MinuteOfHour, Some(id)) => current != id,
            (WindowScheme::EpochMinute, Some(id)) => current > id,
        }
    }
}

// Rate window - tracks calls per wrapped function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateWindow {
    pub window_id: Option<i64>, // None until the first call
    pub count: u64,
}

/// Result of counting one call attempt against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { count: u64, remaining: u64 },
    Suppressed { count: u64, limit: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

// Library-level limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub limit_per_window: u32,
    #[serde(default)]
    pub window_scheme: WindowScheme,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            limit_per_window: 10,
            window_scheme: WindowScheme::default(),
        }
    }
}

/// Fixed-window call limiter. One window per wrapped function name; all
/// functions wrapped by one limiter share the same limit and clock.
pub struct RateLimiter {
    limit: NonZeroU32,
    scheme: WindowScheme,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    /// Limiter allowing `limit_per_window` calls per minute, on the system clock.
    pub fn configure(limit_per_window: u32) -> Result<Arc<Self>, DecoratorError> {
        Self::from_settings(
            LimiterSettings {
                limit_per_window,
                ..LimiterSettings::default()
            },
            Arc::new(SystemClock),
        )
    }

    pub fn from_settings(
        settings: LimiterSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, DecoratorError> {
        let limit = NonZeroU32::new(settings.limit_per_window).ok_or(DecoratorError::InvalidLimit)?;
        Ok(Arc::new(Self {
            limit,
            scheme: settings.window_scheme,
            clock,
            windows: DashMap::new(),
        }))
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn scheme(&self) -> WindowScheme {
        self.scheme
    }

    /// Count one call attempt for `name` and decide whether it may run.
    /// The clock is read, and the window reset and incremented, under the
    /// window's entry lock.
    pub fn admit(&self, name: &str) -> Admission {
        let limit = u64::from(self.limit.get());

        let mut window = self.windows.entry(name.to_string()).or_default();
        let current = self.scheme.window_id(self.clock.now());

        // new window..? Reset it
        if self.scheme.starts_new_window(current, window.window_id) {
            window.window_id = Some(current);
            window.count = 0;
        }

        window.count += 1;
        let count = window.count;
        drop(window);

        if count <= limit {
            Admission::Allowed {
                count,
                remaining: limit - count,
            }
        } else {
            Admission::Suppressed { count, limit }
        }
    }

    /// Snapshot of the window for `name`, if it has been attached.
    pub fn window(&self, name: &str) -> Option<RateWindow> {
        self.windows.get(name).map(|w| *w)
    }

    /// Forget every window, as if nothing had been called yet.
    pub fn reset(&self) {
        for mut window in self.windows.iter_mut() {
            *window = RateWindow::default();
        }
    }

    /// Wrap `func` so that at most `limit` calls run per window. Suppressed
    /// calls return `None`.
    pub fn wrap<F>(self: &Arc<Self>, name: &str, func: F) -> RateLimited<F> {
        self.windows.entry(name.to_string()).or_default();
        RateLimited {
            name: name.to_string(),
            limiter: Arc::clone(self),
            func,
        }
    }
}

pub struct RateLimited<F> {
    name: String,
    limiter: Arc<RateLimiter>,
    func: F,
}

impl<F> RateLimited<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl<F, Args> Call<Args> for RateLimited<F>
where
    F: Call<Args>,
{
    type Output = Option<F::Output>;

    fn call(&self, args: Args) -> Option<F::Output> {
        match self.limiter.admit(&self.name) {
            Admission::Allowed { .. } => Some(self.func.call(args)),
            Admission::Suppressed { count, limit } => {
                RATE_LIMITED.inc();
                warn!(
                    function = %self.name,
                    count,
                    limit,
                    "Limit for this function is exceeded for now"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn limiter(limit: u32, scheme: WindowScheme) -> (Arc<RateLimiter>, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let limiter = RateLimiter::from_settings(
            LimiterSettings {
                limit_per_window: limit,
                window_scheme: scheme,
            },
            clock.clone(),
        )
        .unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(RateLimiter::configure(0).err(), Some(DecoratorError::InvalidLimit));
    }

    #[test]
    fn test_window_ids() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 59).unwrap();
        assert_eq!(WindowScheme::MinuteOfHour.window_id(t), 30);
        assert_eq!(WindowScheme::EpochMinute.window_id(t), t.timestamp() / 60);
    }

    #[test]
    fn test_wrap_creates_sentinel_window() {
        let (limiter, _) = limiter(2, WindowScheme::EpochMinute);
        let _f = limiter.wrap("f", |x: u32| x);
        assert_eq!(limiter.window("f"), Some(RateWindow::default()));
        assert_eq!(limiter.window("g"), None);
    }

    #[test]
    fn test_admit_counts_suppressed_attempts() {
        let (limiter, _) = limiter(2, WindowScheme::EpochMinute);
        assert_eq!(limiter.admit("f"), Admission::Allowed { count: 1, remaining: 1 });
        assert_eq!(limiter.admit("f"), Admission::Allowed { count: 2, remaining: 0 });
        assert_eq!(limiter.admit("f"), Admission::Suppressed { count: 3, limit: 2 });
        assert_eq!(limiter.window("f").unwrap().count, 3);
        // other names have their own window
        assert!(limiter.admit("g").is_allowed());
    }

    #[test]
    fn test_minute_of_hour_wraps_after_an_hour() {
        let (limiter, clock) = limiter(1, WindowScheme::MinuteOfHour);
        assert!(limiter.admit("f").is_allowed());
        clock.advance(Duration::hours(1));
        assert!(!limiter.admit("f").is_allowed());
    }

    #[test]
    fn test_epoch_minute_does_not_wrap() {
        let (limiter, clock) = limiter(1, WindowScheme::EpochMinute);
        assert!(limiter.admit("f").is_allowed());
        clock.advance(Duration::hours(1));
        assert!(limiter.admit("f").is_allowed());
    }

    #[test]
    fn test_late_reading_is_charged_to_current_window() {
        let (limiter, clock) = limiter(1, WindowScheme::EpochMinute);
        assert!(limiter.admit("f").is_allowed());
        clock.advance(Duration::seconds(-10));
        assert_eq!(limiter.admit("f"), Admission::Suppressed { count: 2, limit: 1 });
        assert_eq!(
            limiter.window("f").unwrap().window_id,
            Some(WindowScheme::EpochMinute.window_id(clock.now() + Duration::seconds(10)))
        );
    }

    #[test]
    fn test_reset_restores_quota() {
        let (limiter, _) = limiter(1, WindowScheme::EpochMinute);
        assert!(limiter.admit("f").is_allowed());
        assert!(!limiter.admit("f").is_allowed());
        limiter.reset();
        assert!(limiter.admit("f").is_allowed());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: LimiterSettings =
            serde_json::from_str(r#"{"limit_per_window": 5, "window_scheme": "minute-of-hour"}"#)
                .unwrap();
        assert_eq!(settings.limit_per_window, 5);
        assert_eq!(settings.window_scheme, WindowScheme::MinuteOfHour);

        let settings: LimiterSettings = serde_json::from_str(r#"{"limit_per_window": 3}"#).unwrap();
        assert_eq!(settings.window_scheme, WindowScheme::EpochMinute);
    }
}
