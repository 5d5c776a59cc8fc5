// Memoizing call-result cache, one namespace per wrapped function.
// Entries are written once and never evicted; watch len() or the
// decorators_cache_size gauge for functions with a wide input domain.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::debug;

use crate::call::Call;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

// Namespaced cache key: wrapped function name + its argument key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey<K> {
    namespace: Arc<str>,
    args: K,
}

// Slot for one computed result. Empty until the first successful call.
type CacheEntry<V> = Arc<OnceCell<V>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct ResultCache<K, V> {
    entries: DashMap<Arc<CacheKey<K>>, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    // this cache's share of the CACHE_SIZE gauge
    stored: AtomicI64,
}

impl<K, V> Default for ResultCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ResultCache<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stored: AtomicI64::new(0),
        }
    }

    /// Return the stored result for `args` in `namespace`, computing it with
    /// `compute` the first time.
    ///
    /// Concurrent callers with the same key wait for a single computation.
    /// Calling back into the same key from inside `compute` deadlocks.
    pub fn get_or_compute<F>(&self, namespace: &str, args: K, compute: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        match self.get_or_try_compute::<_, std::convert::Infallible>(namespace, args, || {
            Ok(compute())
        }) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible functions.
    /// An `Err` (or a panic) stores nothing, so the next call with the same
    /// key runs `compute` again.
    pub fn get_or_try_compute<F, E>(&self, namespace: &str, args: K, compute: F) -> Result<V, E>
    where
        V: Clone,
        F: FnOnce() -> Result<V, E>,
    {
        let key = Arc::new(CacheKey {
            namespace: Arc::from(namespace),
            args,
        });

        // grab the slot, then release the shard lock before running user code
        let slot = Arc::clone(self.entries.entry(Arc::clone(&key)).or_default().value());

        if let Some(value) = slot.get() {
            self.record_hit(namespace);
            return Ok(value.clone());
        }

        let mut computed = false;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            slot.get_or_try_init(|| {
                computed = true;
                compute()
            })
            .cloned()
        }));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                self.discard_empty(&key, &slot);
                panic::resume_unwind(payload);
            }
        };

        if !computed {
            // another caller finished the computation while we waited
            self.record_hit(namespace);
        } else if result.is_ok() {
            self.record_miss(namespace, true);
        } else {
            self.record_miss(namespace, false);
            self.discard_empty(&key, &slot);
        }
        result
    }

    // Drop a slot left empty by a failed computation, unless another caller
    // is still waiting on it.
    fn discard_empty(&self, key: &CacheKey<K>, slot: &CacheEntry<V>) {
        self.entries.remove_if(key, |_, current| {
            Arc::ptr_eq(current, slot) && current.get().is_none() && Arc::strong_count(current) == 2
        });
    }

    fn record_hit(&self, namespace: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        CACHE_HITS.inc();
        debug!(function = namespace, "cache hit");
    }

    fn record_miss(&self, namespace: &str, stored: bool) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        CACHE_MISSES.inc();
        if stored {
            self.stored.fetch_add(1, Ordering::Relaxed);
            CACHE_SIZE.inc();
        }
        debug!(function = namespace, "cache miss");
    }

    /// Number of stored results across all namespaces.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, namespace: &str, args: &K) -> bool
    where
        K: Clone,
    {
        let key = CacheKey {
            namespace: Arc::from(namespace),
            args: args.clone(),
        };
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.value().get().is_some())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drop every stored result and reset the counters.
    pub fn clear(&self) {
        let mut removed = 0i64;
        self.entries.retain(|_, slot| {
            if slot.get().is_some() {
                removed += 1;
            }
            false
        });
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stored.fetch_sub(removed, Ordering::Relaxed);
        CACHE_SIZE.sub(removed as f64);
    }

    /// Wrap `func` so that its results are memoized in this cache under `name`.
    /// The whole argument value is the key.
    pub fn wrap<F, Args>(self: &Arc<Self>, name: &str, func: F) -> Cached<F, Args, K, V>
    where
        Args: Clone + Into<K>,
        F: Call<Args, Output = V>,
    {
        self.wrap_keyed(name, |args: &Args| args.clone().into(), func)
    }

    /// Wrap `func`, using `key_fn` to pick the part of the arguments that
    /// identifies a call. Arguments left out of the key do not distinguish
    /// cached results.
    pub fn wrap_keyed<F, Args>(
        self: &Arc<Self>,
        name: &str,
        key_fn: fn(&Args) -> K,
        func: F,
    ) -> Cached<F, Args, K, V>
    where
        F: Call<Args, Output = V>,
    {
        Cached {
            name: Arc::from(name),
            cache: Arc::clone(self),
            key_fn,
            func,
        }
    }

    // only Ok values are memoized
    pub fn wrap_fallible<F, Args, E>(
        self: &Arc<Self>,
        name: &str,
        func: F,
    ) -> TryCached<F, Args, K, V>
    where
        Args: Clone + Into<K>,
        F: Call<Args, Output = Result<V, E>>,
    {
        TryCached {
            name: Arc::from(name),
            cache: Arc::clone(self),
            key_fn: |args: &Args| args.clone().into(),
            func,
        }
    }
}

impl<K, V> Drop for ResultCache<K, V> {
    fn drop(&mut self) {
        CACHE_SIZE.sub(*self.stored.get_mut() as f64);
    }
}

pub struct Cached<F, Args, K, V> {
    name: Arc<str>,
    cache: Arc<ResultCache<K, V>>,
    key_fn: fn(&Args) -> K,
    func: F,
}

impl<F, Args, K, V> Cached<F, Args, K, V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Arc<ResultCache<K, V>> {
        &self.cache
    }
}

impl<F, Args, K, V> Call<Args> for Cached<F, Args, K, V>
where
    F: Call<Args, Output = V>,
    K: Hash + Eq,
    V: Clone,
{
    type Output = V;

    fn call(&self, args: Args) -> V {
        let key = (self.key_fn)(&args);
        self.cache
            .get_or_compute(&self.name, key, || self.func.call(args))
    }
}

pub struct TryCached<F, Args, K, V> {
    name: Arc<str>,
    cache: Arc<ResultCache<K, V>>,
    key_fn: fn(&Args) -> K,
    func: F,
}

impl<F, Args, K, V> TryCached<F, Args, K, V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Arc<ResultCache<K, V>> {
        &self.cache
    }
}

impl<F, Args, K, V, E> Call<Args> for TryCached<F, Args, K, V>
where
    F: Call<Args, Output = Result<V, E>>,
    K: Hash + Eq,
    V: Clone,
{
    type Output = Result<V, E>;

    fn call(&self, args: Args) -> Result<V, E> {
        let key = (self.key_fn)(&args);
        self.cache
            .get_or_try_compute(&self.name, key, || self.func.call(args))
    }
}
