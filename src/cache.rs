//! Process-wide tuning cache: stores, persisted parameters and overrides.
//!
//! ```text
//! params file / buffer --parse--> SmmStore / TransStore --lookup--> caller
//!                                        ^                            |
//!                                        +---- tuner on a miss -------+
//! ```

use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use crate::codec::{self, FieldStyle, WriteOptions};
use crate::config::TuneConfig;
use crate::configs::{SmmConfig, TransConfig};
use crate::dispatch::{should_use_constant_memory, DeviceCaps};
use crate::error::{TuneError, TuneResult};
use crate::kernel_types::{BoundKernel, DeviceUid, ElemType, KernelVariant};
use crate::keys::{SmmKey, TransKey};
use crate::profiling::PerformanceEstimate;
use crate::store::{Record, SmmStore, TransStore};

/// Outcome of loading a parameter buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Lines for a device that could not be resolved.
    pub skipped: usize,
    pub malformed: usize,
    /// Lines whose key was already present (first one wins).
    pub duplicates: usize,
}

type Override<K, C> = Option<(K, Arc<Record<C>>)>;

pub struct TuningCache {
    config: TuneConfig,
    smm: SmmStore,
    trans: TransStore,
    estimate: Mutex<PerformanceEstimate>,
    smm_override: OnceLock<Override<SmmKey, SmmConfig>>,
    trans_override: OnceLock<Override<TransKey, TransConfig>>,
}

fn record_lines(buffer: &str) -> impl Iterator<Item = (usize, &str)> {
    buffer
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

impl TuningCache {
    pub fn new(config: TuneConfig) -> Self {
        Self {
            config,
            smm: SmmStore::new(),
            trans: TransStore::new(),
            estimate: Mutex::new(PerformanceEstimate::default()),
            smm_override: OnceLock::new(),
            trans_override: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &TuneConfig {
        &self.config
    }

    pub fn smm(&self) -> &SmmStore {
        &self.smm
    }

    pub fn trans(&self) -> &TransStore {
        &self.trans
    }

    /// Arithmetic-intensity statistics of everything loaded so far.
    pub fn estimate(&self) -> PerformanceEstimate {
        *self.estimate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Populate the SMM store from a persisted buffer, one record per line.
    ///
    /// `resolve` maps a line's device label (if any) to a device UID; lines it
    /// rejects belong to another device and are skipped. Malformed lines are
    /// logged and counted, never fatal.
    pub fn load_smm_params<R>(&self, buffer: &str, resolve: R) -> LoadReport
    where
        R: Fn(Option<&str>) -> Option<DeviceUid>,
    {
        let mut report = LoadReport::default();
        let mut estimate = PerformanceEstimate::default();
        for (lineno, line) in record_lines(buffer) {
            let parsed = match codec::parse_smm_line(line, DeviceUid::default()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("smm params line {lineno} rejected: {e}");
                    report.malformed += 1;
                    continue;
                }
            };
            let Some(uid) = resolve(parsed.device.as_deref()) else {
                log::debug!("smm params line {lineno}: device {:?} not present", parsed.device);
                report.skipped += 1;
                continue;
            };
            let parsed = parsed.with_device_uid(uid);
            let record = self.with_default_stack(parsed.record);
            match self.smm.insert_record(parsed.key, record) {
                Ok(_) => {
                    estimate.merge(&parsed.estimate);
                    report.loaded += 1;
                }
                Err(TuneError::DuplicateKey(key)) => {
                    log::debug!("smm params line {lineno}: {key} already loaded");
                    report.duplicates += 1;
                }
                Err(e) => {
                    log::warn!("smm params line {lineno}: {e}");
                    report.malformed += 1;
                }
            }
        }
        self.estimate
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .merge(&estimate);
        log::info!(
            "loaded {} smm configurations ({} skipped, {} malformed, {} duplicate)",
            report.loaded,
            report.skipped,
            report.malformed,
            report.duplicates
        );
        report
    }

    /// Populate the transpose store from a persisted buffer.
    pub fn load_trans_params(&self, buffer: &str) -> LoadReport {
        let mut report = LoadReport::default();
        for (lineno, line) in record_lines(buffer) {
            match codec::parse_trans_line(line) {
                Ok(parsed) => match self.trans.insert_record(parsed.key, parsed.record) {
                    Ok(_) => report.loaded += 1,
                    Err(_) => report.duplicates += 1,
                },
                Err(e) => {
                    log::warn!("trans params line {lineno} rejected: {e}");
                    report.malformed += 1;
                }
            }
        }
        log::info!("loaded {} transpose configurations", report.loaded);
        report
    }

    /// Load the configured parameter file for `device`. Lines without a device
    /// label apply to any device; labelled lines must match the device name.
    pub fn load_params_file(&self, device: &DeviceCaps) -> TuneResult<LoadReport> {
        let Some(path) = &self.config.params_file else {
            return Ok(LoadReport::default());
        };
        let buffer = std::fs::read_to_string(path)?;
        Ok(self.load_smm_params(&buffer, |label| match label {
            None => Some(device.uid),
            Some(name) if name == device.name => Some(device.uid),
            Some(_) => None,
        }))
    }

    /// Records that do not carry a stack size (`s=0`) get the configured one.
    fn with_default_stack(&self, mut record: Record<SmmConfig>) -> Record<SmmConfig> {
        let params = &mut record.config_mut().params;
        if params.s == 0 {
            params.s = self.config.default_stack_size;
        }
        record
    }

    fn smm_override(&self) -> Option<&(SmmKey, Arc<Record<SmmConfig>>)> {
        self.smm_override
            .get_or_init(|| {
                let text = self.config.smm_override.as_deref()?;
                match codec::parse_smm_line(text, DeviceUid::default()) {
                    Ok(parsed) => {
                        log::info!("smm configuration forced for {}", parsed.key);
                        Some((parsed.key, Arc::new(self.with_default_stack(parsed.record))))
                    }
                    Err(e) => {
                        log::warn!("ignoring smm override {text:?}: {e}");
                        None
                    }
                }
            })
            .as_ref()
    }

    fn trans_override(&self) -> Option<&(TransKey, Arc<Record<TransConfig>>)> {
        self.trans_override
            .get_or_init(|| {
                let text = self.config.trans_override.as_deref()?;
                match codec::parse_trans_line(text) {
                    Ok(parsed) => Some((parsed.key, Arc::new(parsed.record))),
                    Err(e) => {
                        log::warn!("ignoring transpose override {text:?}: {e}");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Configuration for an SMM key.
    ///
    /// A forced override matching the key's type and shape (on any device) is
    /// returned without consulting the store. Otherwise the store is queried
    /// and `tune` is called on a miss.
    pub fn smm_config<F>(&self, key: &SmmKey, tune: F) -> TuneResult<Arc<Record<SmmConfig>>>
    where
        F: FnOnce(&SmmKey) -> TuneResult<SmmConfig>,
    {
        if let Some((forced, record)) = self.smm_override() {
            if (forced.ty, forced.m, forced.n, forced.k) == (key.ty, key.m, key.n, key.k) {
                return Ok(Arc::clone(record));
            }
        }
        self.smm.get_or_insert_with(key, tune)
    }

    /// Configuration for a transpose key; see [`smm_config`](Self::smm_config).
    pub fn trans_config<F>(&self, key: &TransKey, tune: F) -> TuneResult<Arc<Record<TransConfig>>>
    where
        F: FnOnce(&TransKey) -> TuneResult<TransConfig>,
    {
        if let Some((forced, record)) = self.trans_override() {
            if forced == key {
                return Ok(Arc::clone(record));
            }
        }
        self.trans.get_or_insert_with(key, tune)
    }

    /// Kernel to launch for a stack of `stack_size` entries under the
    /// configured variant policy.
    pub fn select_kernel(
        &self,
        record: &Record<SmmConfig>,
        stack_size: usize,
    ) -> Option<(KernelVariant, BoundKernel)> {
        record
            .config()
            .select_kernel(self.config.variant_policy, stack_size)
    }

    pub fn use_constant_memory(&self, device: &DeviceCaps) -> bool {
        self.config.constant_memory && should_use_constant_memory(device)
    }

    /// MNK-kernel suitability with the configured types and dimension limit.
    pub fn is_suitable(&self, def_mnk: bool, ty: ElemType, stack_size: i32, m_max: i32, n_max: i32, k_max: i32) -> bool {
        self.config
            .supported
            .is_suitable(def_mnk, ty, stack_size, m_max, n_max, k_max, self.config.max_kernel_dim)
    }

    /// Write every SMM record, one per line, in key order. `label` maps device
    /// UIDs to the names written into the `device` field. Returns the number
    /// of bytes written.
    pub fn dump_smm<W, L>(&self, stream: &mut W, header: bool, label: L) -> TuneResult<usize>
    where
        W: Write + ?Sized,
        L: Fn(DeviceUid) -> Option<String>,
    {
        let mut written = 0;
        if header {
            // Commented out so the dump loads back as-is.
            let opts = WriteOptions::new().prefix("# ").suffix("\n").device("device");
            written += codec::write_smm_header(stream, &opts)?;
        }
        self.smm.try_for_each(|key, record| {
            let name = label(key.device);
            let mut opts = WriteOptions::new().suffix("\n").style(FieldStyle::Named);
            opts.device = name.as_deref();
            written += codec::write_smm_params(&mut *stream, false, key, Some(record), &opts)?;
            if self.config.verbosity > 0 {
                if let Ok(summary) = record.summary() {
                    log::info!(
                        "{key}: {} launches, {:.1} GFLOPS (max {:.1})",
                        record.launches(),
                        summary.geometric_mean,
                        summary.max
                    );
                }
            }
            Ok::<(), TuneError>(())
        })?;
        Ok(written)
    }

    /// Write every transpose record, one per line, in key order.
    pub fn dump_trans<W: Write + ?Sized>(&self, stream: &mut W) -> TuneResult<usize> {
        let mut written = 0;
        let opts = WriteOptions::new().suffix("\n");
        self.trans.try_for_each(|key, record| {
            written += codec::write_trans_params(&mut *stream, false, key, Some(record), &opts)?;
            Ok::<(), TuneError>(())
        })?;
        Ok(written)
    }
}
