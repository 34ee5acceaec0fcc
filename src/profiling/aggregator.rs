//! Numerically stable streaming statistics for throughput samples.
//!
//! An aggregator keeps the maximum, the log-sum (geometric mean) and a Kahan
//! compensated sum (arithmetic mean) of positive samples without storing the
//! samples themselves.

use crate::error::{TuneError, TuneResult};
use crate::kernel_types::Precision;

/// Kahan compensated summation for high-precision accumulation.
///
/// The compensation term `c` captures the low-order bits lost during each
/// addition and feeds them back into the next one, which keeps the error
/// bounded independently of the number of terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KahanAccumulator {
    sum: f64,
    /// Compensation term for lost low-order bits.
    c: f64,
}

impl KahanAccumulator {
    pub const fn new() -> Self {
        Self { sum: 0.0, c: 0.0 }
    }

    /// Create a Kahan accumulator with an initial value.
    pub const fn with_value(value: f64) -> Self {
        Self { sum: value, c: 0.0 }
    }

    #[inline]
    pub fn add(&mut self, x: f64) {
        let y = x - self.c;
        let t = self.sum + y;
        self.c = (t - self.sum) - y;
        self.sum = t;
    }

    /// Add another Kahan sum (preserving precision).
    pub fn add_kahan(&mut self, other: &KahanAccumulator) {
        self.add(other.sum);
        self.add(-other.c);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// Sum with the outstanding compensation applied.
    #[inline]
    pub fn corrected_value(&self) -> f64 {
        self.sum - self.c
    }
}

/// Point-in-time view of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfSummary {
    pub max: f64,
    pub geometric_mean: f64,
    pub arithmetic_mean: f64,
    pub count: u64,
}

/// Online accumulation of positive throughput samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfAggregator {
    max: f64,
    log_sum: f64,
    sum: KahanAccumulator,
    count: u64,
}

impl Default for PerfAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfAggregator {
    pub const fn new() -> Self {
        Self {
            max: 0.0,
            log_sum: 0.0,
            sum: KahanAccumulator::new(),
            count: 0,
        }
    }

    /// Record one sample. Non-positive or non-finite samples are rejected and
    /// leave the aggregator untouched.
    pub fn record_sample(&mut self, ratio: f64) -> TuneResult<()> {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(TuneError::InvalidSample(ratio));
        }
        self.max = self.max.max(ratio);
        self.log_sum += ratio.ln();
        self.sum.add(ratio);
        self.count += 1;
        Ok(())
    }

    pub fn summary(&self) -> TuneResult<PerfSummary> {
        if self.count == 0 {
            return Err(TuneError::EmptyAggregator);
        }
        let n = self.count as f64;
        Ok(PerfSummary {
            max: self.max,
            geometric_mean: (self.log_sum / n).exp(),
            arithmetic_mean: self.sum.corrected_value() / n,
            count: self.count,
        })
    }

    /// Fold another aggregator's samples into this one.
    pub fn merge(&mut self, other: &PerfAggregator) {
        if other.count == 0 {
            return;
        }
        self.max = self.max.max(other.max);
        self.log_sum += other.log_sum;
        self.sum.add_kahan(&other.sum);
        self.count += other.count;
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn log_sum(&self) -> f64 {
        self.log_sum
    }

    #[inline]
    pub fn compensated_sum(&self) -> f64 {
        self.sum.corrected_value()
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Distribution of achieved arithmetic-intensity ratios per precision class,
/// as collected while reading persisted tuning records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceEstimate {
    pub single: PerfAggregator,
    pub double: PerfAggregator,
}

impl PerformanceEstimate {
    pub fn class(&self, precision: Precision) -> &PerfAggregator {
        match precision {
            Precision::Single => &self.single,
            Precision::Double => &self.double,
        }
    }

    pub fn record(&mut self, precision: Precision, ratio: f64) -> TuneResult<()> {
        match precision {
            Precision::Single => self.single.record_sample(ratio),
            Precision::Double => self.double.record_sample(ratio),
        }
    }

    pub fn merge(&mut self, other: &PerformanceEstimate) {
        self.single.merge(&other.single);
        self.double.merge(&other.double);
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.double.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kahan_sum_precision() {
        let n = 1_000_000;
        let x = 1e-8_f64;
        let expected = (n as f64) * x;

        let mut naive_sum = 0.0_f64;
        let mut kahan = KahanAccumulator::new();
        for _ in 0..n {
            naive_sum += x;
            kahan.add(x);
        }

        let naive_error = (naive_sum - expected).abs() / expected;
        let kahan_error = (kahan.value() - expected).abs() / expected;
        assert!(kahan_error < naive_error / 10.0);
        assert!(kahan_error < 1e-10);
    }

    #[test]
    fn test_record_and_summary() {
        let mut agg = PerfAggregator::new();
        for s in [0.8, 0.9, 0.95] {
            agg.record_sample(s).unwrap();
        }
        let summary = agg.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.max, 0.95);
        assert!((summary.arithmetic_mean - 2.65 / 3.0).abs() < 1e-12);
        let gm = (0.8_f64 * 0.9 * 0.95).powf(1.0 / 3.0);
        assert!((summary.geometric_mean - gm).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_sample_is_noop() {
        let mut agg = PerfAggregator::new();
        agg.record_sample(2.0).unwrap();
        let before = agg;
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(agg.record_sample(bad), Err(TuneError::InvalidSample(_))));
        }
        assert_eq!(agg, before);
    }

    #[test]
    fn test_empty_summary() {
        let agg = PerfAggregator::new();
        assert!(matches!(agg.summary(), Err(TuneError::EmptyAggregator)));
    }

    #[test]
    fn test_mean_stability_small_deltas() {
        // 0.1 is not representable; a naive sum drifts visibly over 1e6 terms.
        let mut agg = PerfAggregator::new();
        for _ in 0..1_000_000 {
            agg.record_sample(0.1).unwrap();
        }
        let mean = agg.summary().unwrap().arithmetic_mean;
        assert!((mean - 0.1).abs() < 1e-12, "mean drifted: {mean}");
    }

    #[test]
    fn test_merge() {
        let mut a = PerfAggregator::new();
        let mut b = PerfAggregator::new();
        a.record_sample(1.0).unwrap();
        b.record_sample(4.0).unwrap();
        b.record_sample(2.0).unwrap();
        a.merge(&b);
        let s = a.summary().unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.max, 4.0);
        assert!((s.geometric_mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_classes() {
        let mut est = PerformanceEstimate::default();
        assert!(est.is_empty());
        est.record(Precision::Double, 3.0).unwrap();
        assert_eq!(est.class(Precision::Double).count(), 1);
        assert_eq!(est.class(Precision::Single).count(), 0);
    }
}
