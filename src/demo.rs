//! Small drivers exercising each wrapper the way a caller would.
//!
//! Each driver prints what the wrapped functions produce and returns the
//! results so they can be checked.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::info;

use crate::acknowledge::Acknowledged;
use crate::cache::ResultCache;
use crate::call::Call;
use crate::clock::{Clock, ManualClock};
use crate::guards::{Arg, ErrorBoundary, Logged, RoleGuard, Signature, TypeValidator};
use crate::rate_limit::RateLimiter;
use crate::state::TICKER;

/// Admin-only operation, called once as admin and once as another user.
pub fn role_demo() -> Vec<Option<()>> {
    let show_receipt = Logged::new(RoleGuard::admin().wrap("show_customer_receipt", |()| println!("Ok")));
    ["admin", "fido"]
        .into_iter()
        .map(|role| show_receipt.call((role, ())))
        .collect()
}

/// Lookup that fails on a missing key, once with and once without it.
pub fn error_demo() -> Vec<Option<String>> {
    let risky = Logged::new(ErrorBoundary::wrap(
        "some_function_with_risky_operation",
        |data: HashMap<String, String>| -> Result<String, String> {
            let value = data
                .get("key")
                .cloned()
                .ok_or_else(|| "KeyError: 'key'".to_string())?;
            println!("{value}");
            Ok(value)
        },
    ));

    [("key", "bar"), ("foo", "bar")]
        .into_iter()
        .map(|(k, v)| risky.call(HashMap::from([(k.to_string(), v.to_string())])))
        .collect()
}

fn add(args: &[&dyn Arg]) -> i64 {
    let a = args[0].as_any().downcast_ref::<i64>().copied().unwrap_or_default();
    let b = args[1].as_any().downcast_ref::<i64>().copied().unwrap_or_default();
    a + b
}

/// `add(a: i64, b: i64) -> i64` called with good and bad argument types.
pub fn type_demo() -> Vec<Option<i64>> {
    let signature = Signature::new("add")
        .param::<i64>("a")
        .param::<i64>("b")
        .returns::<i64>();
    let checked = Logged::new(TypeValidator::new(signature).wrap(add));

    let results = vec![
        checked.invoke(&[&1_i64, &2.0_f64]),
        checked.invoke(&[&2_i64, &2_i64]),
        checked.invoke(&[&"2", &2.0_f64]),
    ];
    for sum in results.iter().flatten() {
        println!("{sum}");
    }
    results
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReport {
    pub square: Vec<u64>,
    pub square_calls: u64,
    pub mult: Vec<u64>,
    pub mult_calls: u64,
}

// square and mult memoized in one shared cache, each acknowledging every real invocation
pub fn cache_demo() -> CacheReport {
    let cache: Arc<ResultCache<(u64, u64), u64>> = Arc::new(ResultCache::new());
    let square = Acknowledged::new("square", |a: u64| a * a);
    let mult = Acknowledged::new("mult", |(a, b): (u64, u64)| a * b);
    let (square_calls, mult_calls) = (square.counter(), mult.counter());

    let square = cache.wrap_keyed("square", |a: &u64| (*a, 0), square);
    let mult = cache.wrap("mult", mult);

    let square_results: Vec<u64> = [2, 2, 3, 3, 8, 8]
        .into_iter()
        .map(|a| square.call(a))
        .inspect(|r| println!("{r}"))
        .collect();
    let mult_results: Vec<u64> = (0..3)
        .map(|_| mult.call((8, 2)))
        .inspect(|r| println!("{r}"))
        .collect();

    let stats = cache.stats();
    info!(hits = stats.hits, misses = stats.misses, entries = stats.entries, "cache demo done");

    CacheReport {
        square: square_results,
        square_calls: square_calls.load(Ordering::Relaxed),
        mult: mult_results,
        mult_calls: mult_calls.load(Ordering::Relaxed),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerReport {
    pub ran: u64,
    pub suppressed: u64,
}

/// Run the rate-limited ticker on a simulated clock, advancing it by `step`
/// after every tick.
pub fn ticker_demo(
    limiter: &Arc<RateLimiter>,
    clock: &ManualClock,
    iterations: u64,
    step: Duration,
) -> TickerReport {
    let print_second = limiter.wrap(TICKER, |()| {
        let second = clock.now().format("%S").to_string();
        println!("{second}");
    });

    let mut report = TickerReport::default();
    for _ in 0..iterations {
        match print_second.call(()) {
            Some(()) => report.ran += 1,
            None => report.suppressed += 1,
        }
        clock.advance(step);
    }
    info!(ran = report.ran, suppressed = report.suppressed, "ticker demo done");
    report
}
