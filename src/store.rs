//! Keyed configuration store.
//!
//! Lookups take a shared read lock and hand out `Arc<Record<C>>`, so the hot
//! path never blocks other readers. Inserting a new key takes the write lock
//! briefly. Each record guards its counters with its own mutex, which keeps
//! launch count, history and the aggregator mutually consistent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::configs::{SmmConfig, TransConfig};
use crate::error::{TuneError, TuneResult};
use crate::keys::{SmmKey, TransKey, TuningKey};
use crate::profiling::{PerfCounters, PerfSummary};

/// A configuration together with its live performance counters.
#[derive(Debug)]
pub struct Record<C> {
    config: C,
    counters: Mutex<PerfCounters>,
}

impl<C> Record<C> {
    pub fn new(config: C) -> Self {
        Self::with_counters(config, PerfCounters::default())
    }

    pub fn with_counters(config: C, counters: PerfCounters) -> Self {
        Self {
            config,
            counters: Mutex::new(counters),
        }
    }

    #[inline]
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Mutable access while the record is still exclusively owned (before it
    /// is published to a store).
    #[inline]
    pub fn config_mut(&mut self) -> &mut C {
        &mut self.config
    }

    fn lock(&self) -> MutexGuard<'_, PerfCounters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the counters.
    pub fn counters(&self) -> PerfCounters {
        *self.lock()
    }

    pub fn record_launch(&self, stack_size: i32) {
        self.lock().record_launch(stack_size);
    }

    pub fn record_sample(&self, sample: f64) -> TuneResult<()> {
        self.lock().record_sample(sample)
    }

    pub fn record_execution(&self, stack_size: i32, sample: f64) -> TuneResult<()> {
        self.lock().record_execution(stack_size, sample)
    }

    pub fn launches(&self) -> u64 {
        self.lock().launches()
    }

    pub fn summary(&self) -> TuneResult<PerfSummary> {
        self.lock().perf().summary()
    }
}

/// Map from identity key to record; at most one record per key.
#[derive(Debug)]
pub struct ConfigStore<K, C> {
    entries: RwLock<HashMap<K, Arc<Record<C>>>>,
}

pub type SmmStore = ConfigStore<SmmKey, SmmConfig>;
pub type TransStore = ConfigStore<TransKey, TransConfig>;

impl<K: TuningKey, C> Default for ConfigStore<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TuningKey, C> ConfigStore<K, C> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: &K) -> Option<Arc<Record<C>>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Insert a fresh record. Fails with `DuplicateKey` if the key already
    /// has one; the existing record is left untouched.
    pub fn insert(&self, key: K, config: C) -> TuneResult<Arc<Record<C>>> {
        self.insert_record(key, Record::new(config))
    }

    pub fn insert_record(&self, key: K, record: Record<C>) -> TuneResult<Arc<Record<C>>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(&key) {
            return Err(TuneError::DuplicateKey(key.to_string()));
        }
        log::debug!("tuning cache insert: {key}");
        let record = Arc::new(record);
        entries.insert(key, Arc::clone(&record));
        Ok(record)
    }

    /// Insert or overwrite (re-tuning). Returns the previous record, if any.
    /// The new record starts with fresh counters.
    pub fn replace(&self, key: K, config: C) -> Option<Arc<Record<C>>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        log::debug!("tuning cache replace: {key}");
        entries.insert(key, Arc::new(Record::new(config)))
    }

    pub fn remove(&self, key: &K) -> Option<Arc<Record<C>>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key)
    }

    /// Look up `key`, running `tune` on a miss and inserting its result.
    ///
    /// `tune` runs without holding any lock. If another thread inserted the
    /// same key meanwhile, its record wins and the fresh result is dropped.
    pub fn get_or_insert_with<F>(&self, key: &K, tune: F) -> TuneResult<Arc<Record<C>>>
    where
        F: FnOnce(&K) -> TuneResult<C>,
    {
        if let Some(record) = self.lookup(key) {
            log::trace!("tuning cache hit: {key}");
            return Ok(record);
        }
        log::debug!("tuning cache miss: {key}");
        let config = tune(key)?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let record = entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Record::new(config)));
        Ok(Arc::clone(record))
    }

    /// Visit every record in key order.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &Record<C>),
    {
        for (key, record) in self.sorted_entries() {
            visit(&key, &record);
        }
    }

    /// Fallible visitor; stops at the first error.
    pub fn try_for_each<F, E>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&K, &Record<C>) -> Result<(), E>,
    {
        for (key, record) in self.sorted_entries() {
            visit(&key, &record)?;
        }
        Ok(())
    }

    /// Snapshot of all entries, sorted by key. The lock is released before
    /// the caller sees the entries so visitors may write to slow streams.
    fn sorted_entries(&self) -> Vec<(K, Arc<Record<C>>)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = entries
            .iter()
            .map(|(k, r)| (k.clone(), Arc::clone(r)))
            .collect();
        drop(entries);
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn keys(&self) -> Vec<K> {
        self.sorted_entries().into_iter().map(|(k, _)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
