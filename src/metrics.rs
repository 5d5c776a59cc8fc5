use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, register_counter, register_counter_vec, register_gauge,
};


lazy_static! {
    pub static ref CACHE_HITS: Counter =
        register_counter!("decorators_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("decorators_cache_misses_total", "Total cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("decorators_cache_size", "Current number of cached results").unwrap();
    pub static ref RATE_LIMITED: Counter = register_counter!(
        "decorators_rate_limited_total",
        "Calls suppressed by a rate limiter"
    )
    .unwrap();
    pub static ref REJECTIONS: CounterVec = register_counter_vec!(
        "decorators_rejections_total",
        "Calls rejected by a guard, by failure kind",
        &["kind"]
    )
    .unwrap();
}
