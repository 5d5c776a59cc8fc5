//! Function wrappers for cross-cutting concerns.
//!
//! - [`acknowledge`]: logs and counts every call that reaches a function.
//! - [`cache`]: memoizes results per wrapped function and argument key.
//! - [`rate_limit`]: caps how many calls run in each one-minute window.
//! - [`guards`]: role checks, error boundaries and exact type checks, which
//!   reject calls with a [`DecoratorError`] (or log and drop them via
//!   [`Logged`]).
//!
//! Everything implements [`Call`], so wrappers stack in any order:
//!
//! ```
//! use std::sync::Arc;
//! use call_decorators::{Call, RateLimiter, ResultCache};
//!
//! let cache: Arc<ResultCache<u64, u64>> = Arc::new(ResultCache::new());
//! let limiter = RateLimiter::configure(10).unwrap();
//! let square = limiter.wrap("square", cache.wrap("square", |x: u64| x * x));
//!
//! assert_eq!(square.call(4_u64), Some(16));
//! ```

pub mod acknowledge;
pub mod cache;
pub mod call;
pub mod clock;
pub mod config;
pub mod demo;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod state;

pub use acknowledge::Acknowledged;
pub use cache::{CacheStats, Cached, ResultCache, TryCached};
pub use call::Call;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DecoratorError, Mismatch};
pub use guards::{Arg, ErrorBoundary, Logged, RoleGuard, Signature, TypeValidator};
pub use rate_limit::{Admission, LimiterSettings, RateLimited, RateLimiter, RateWindow, WindowScheme};
