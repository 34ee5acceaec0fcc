//! Per-record execution counters.
//!
//! Launch accounting is kept apart from the performance samples: a launch
//! may happen without a timing sample (counters disabled, timer failure) and
//! a restored record may carry a sample without any launch in this process.

use crate::error::TuneResult;
use crate::profiling::aggregator::PerfAggregator;

/// Number of recent stack sizes remembered per kernel variant.
pub const SIZE_HISTORY_LEN: usize = 7;

/// Fixed-capacity ring of the most recent stack sizes. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHistory {
    sizes: [i32; SIZE_HISTORY_LEN],
    next: usize,
    len: usize,
}

impl SizeHistory {
    pub fn push(&mut self, size: i32) {
        self.sizes[self.next] = size;
        self.next = (self.next + 1) % SIZE_HISTORY_LEN;
        self.len = (self.len + 1).min(SIZE_HISTORY_LEN);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sizes from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        let start = (self.next + SIZE_HISTORY_LEN - self.len) % SIZE_HISTORY_LEN;
        (0..self.len).map(move |i| self.sizes[(start + i) % SIZE_HISTORY_LEN])
    }

    pub fn last(&self) -> Option<i32> {
        if self.len == 0 {
            None
        } else {
            Some(self.sizes[(self.next + SIZE_HISTORY_LEN - 1) % SIZE_HISTORY_LEN])
        }
    }
}

/// Mutable statistics embedded in every configuration record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerfCounters {
    launches: u64,
    history: SizeHistory,
    perf: PerfAggregator,
}

impl PerfCounters {
    /// Account one kernel launch over a stack of `stack_size` products.
    pub fn record_launch(&mut self, stack_size: i32) {
        self.launches += 1;
        self.history.push(stack_size);
    }

    pub fn record_sample(&mut self, sample: f64) -> TuneResult<()> {
        self.perf.record_sample(sample)
    }

    /// Launch plus timing sample in one step. The sample is validated first so
    /// a rejected sample does not count the launch either.
    pub fn record_execution(&mut self, stack_size: i32, sample: f64) -> TuneResult<()> {
        self.perf.record_sample(sample)?;
        self.record_launch(stack_size);
        Ok(())
    }

    pub(crate) fn restore_launches(&mut self, launches: u64) {
        self.launches = self.launches.max(launches);
    }

    /// Number of kernel launches (`executionCount`).
    pub fn launches(&self) -> u64 {
        self.launches
    }

    pub fn history(&self) -> &SizeHistory {
        &self.history
    }

    pub fn perf(&self) -> &PerfAggregator {
        &self.perf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_history_wraps() {
        let mut h = SizeHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.last(), None);
        for s in 1..=10 {
            h.push(s);
        }
        assert_eq!(h.len(), SIZE_HISTORY_LEN);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(h.last(), Some(10));
    }

    #[test]
    fn test_size_history_partial() {
        let mut h = SizeHistory::default();
        h.push(30000);
        h.push(128);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![30000, 128]);
    }

    #[test]
    fn test_launches_and_samples_are_distinct() {
        let mut c = PerfCounters::default();
        c.record_launch(100);
        c.record_sample(1.5).unwrap();
        c.record_sample(2.5).unwrap();
        assert_eq!(c.launches(), 1);
        assert_eq!(c.perf().count(), 2);
    }

    #[test]
    fn test_rejected_execution_not_counted() {
        let mut c = PerfCounters::default();
        assert!(c.record_execution(64, -3.0).is_err());
        assert_eq!(c.launches(), 0);
        assert!(c.history().is_empty());
        c.record_execution(64, 3.0).unwrap();
        assert_eq!(c.launches(), 1);
    }

    #[test]
    fn test_restore_launches_is_monotonic() {
        let mut c = PerfCounters::default();
        c.restore_launches(5);
        c.restore_launches(2);
        assert_eq!(c.launches(), 5);
    }
}
