//! libsmm-cache: persistent, device-aware tuning cache for small matrix
//! multiplication (SMM) and transpose kernels.
//!
//! This crate provides:
//! - **Tuning keys**: element type and shape (plus device for SMM) identify a configuration
//! - **Concurrent stores**: many readers, rare writers, per-record performance counters
//! - **Text codec**: one record per line, written and re-read across runs
//! - **Dispatch policy**: constant-memory placement and MNK-kernel suitability
//!
//! # Quick Start
//!
//! ```rust
//! use libsmm_cache::{ElemType, DeviceUid, SmmKey, SmmConfig, SmmParams, TuneConfig, TuningCache};
//!
//! let cache = TuningCache::new(TuneConfig::default());
//! let key = SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(0));
//! let record = cache
//!     .smm_config(&key, |_| Ok(SmmConfig::new(SmmParams::default())))
//!     .unwrap();
//! record.record_execution(30000, 42.0).unwrap();
//! assert_eq!(record.summary().unwrap().count, 1);
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod configs;
pub mod dispatch;
pub mod error;
pub mod kernel_types;
pub mod keys;
pub mod profiling;
pub mod store;

// Matrix dumps for debugging kernel inputs
#[cfg(any(debug_assertions, feature = "debug-print"))]
pub mod debug;

pub use cache::{LoadReport, TuningCache};
pub use codec::{
    parse_smm_line, parse_smm_line_with, parse_trans_line, write_smm_header, write_smm_params,
    write_trans_params, FieldStyle, ParsedSmm, ParsedTrans, WriteOptions,
};
pub use config::TuneConfig;
pub use configs::{SmmConfig, SmmParams, TransConfig};
pub use dispatch::{is_suitable, should_use_constant_memory, DeviceCaps, SupportedTypes};
pub use error::{TuneError, TuneResult};
pub use kernel_types::{BoundKernel, DeviceUid, ElemType, KernelHandle, KernelVariant, VariantPolicy};
pub use keys::{SmmKey, TransKey, TuningKey};
pub use profiling::{KahanAccumulator, PerfAggregator, PerfCounters, PerfSummary, PerformanceEstimate};
pub use store::{ConfigStore, Record, SmmStore, TransStore};
