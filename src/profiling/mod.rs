//! Performance accounting for tuned kernel variants.
//!
//! # Quick Start
//!
//! ```rust
//! use libsmm_cache::profiling::PerfAggregator;
//!
//! let mut agg = PerfAggregator::new();
//! agg.record_sample(0.8).unwrap();
//! agg.record_sample(0.9).unwrap();
//! let summary = agg.summary().unwrap();
//! assert_eq!(summary.count, 2);
//! assert_eq!(summary.max, 0.9);
//! ```

pub mod aggregator;
pub mod counters;

pub use aggregator::{KahanAccumulator, PerfAggregator, PerfSummary, PerformanceEstimate};
pub use counters::{PerfCounters, SizeHistory, SIZE_HISTORY_LEN};
