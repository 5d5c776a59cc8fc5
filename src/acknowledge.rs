use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::call::Call;

/// Announces every invocation that actually reaches the wrapped function,
/// and counts them. Put it innermost to see which calls a cache or limiter
/// let through.
pub struct Acknowledged<F> {
    name: String,
    title: String,
    calls: Arc<AtomicU64>,
    func: F,
}

impl<F> Acknowledged<F> {
    pub fn new(name: &str, func: F) -> Self {
        Self {
            name: name.to_string(),
            title: title_case(name),
            calls: Arc::new(AtomicU64::new(0)),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // shared handle, still readable after the wrapper is moved into another one
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }
}

impl<F, Args> Call<Args> for Acknowledged<F>
where
    F: Call<Args>,
{
    type Output = F::Output;

    fn call(&self, args: Args) -> F::Output {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        info!(function = %self.name, calls = n, "{} has been called!", self.title);
        self.func.call(args)
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
