//! Runtime configuration.
//!
//! Defaults can be overridden from a JSON file and from `LIBSMM_*` environment
//! variables. Environment values win over the file.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::SupportedTypes;
use crate::error::{TuneError, TuneResult};
use crate::kernel_types::VariantPolicy;

pub const ENV_MAX_KERNEL_DIM: &str = "LIBSMM_MAX_KERNEL_DIM";
pub const ENV_STACK_SIZE: &str = "LIBSMM_STACK_SIZE";
pub const ENV_VERBOSE: &str = "LIBSMM_VERBOSE";
pub const ENV_PARAMS_FILE: &str = "LIBSMM_PARAMS_FILE";
pub const ENV_SMM_PARAMS: &str = "LIBSMM_SMM_PARAMS";
pub const ENV_TRANS_PARAMS: &str = "LIBSMM_TRANS_PARAMS";
pub const ENV_CMEM: &str = "LIBSMM_CMEM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneConfig {
    /// Largest m, n or k for which a specialized kernel is attempted.
    pub max_kernel_dim: i32,
    /// Stack size assumed when a record does not carry one.
    pub default_stack_size: i32,
    /// 0 = quiet; higher levels log per-record counters on dump.
    pub verbosity: u32,
    /// Persisted parameter buffer loaded at startup.
    pub params_file: Option<PathBuf>,
    /// Serialized SMM record forcing a configuration.
    pub smm_override: Option<String>,
    /// Serialized transpose record forcing a configuration.
    pub trans_override: Option<String>,
    pub supported: SupportedTypes,
    pub constant_memory: bool,
    pub variant_policy: VariantPolicy,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            max_kernel_dim: 64,
            default_stack_size: 30000,
            verbosity: 0,
            params_file: None,
            smm_override: None,
            trans_override: None,
            supported: SupportedTypes::default(),
            constant_memory: cfg!(feature = "cmem"),
            variant_policy: VariantPolicy::default(),
        }
    }
}

impl TuneConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> TuneResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TuneError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> TuneResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> TuneResult<()> {
        self.apply_vars(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_vars<F>(&mut self, var: F) -> TuneResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var(ENV_MAX_KERNEL_DIM) {
            self.max_kernel_dim = parse_var(ENV_MAX_KERNEL_DIM, &v)?;
        }
        if let Some(v) = var(ENV_STACK_SIZE) {
            self.default_stack_size = parse_var(ENV_STACK_SIZE, &v)?;
        }
        if let Some(v) = var(ENV_VERBOSE) {
            self.verbosity = parse_var(ENV_VERBOSE, &v)?;
        }
        if let Some(v) = var(ENV_CMEM) {
            self.constant_memory = parse_var::<i32>(ENV_CMEM, &v)? != 0;
        }
        if let Some(v) = var(ENV_PARAMS_FILE) {
            self.params_file = enabled(v).map(PathBuf::from);
        }
        if let Some(v) = var(ENV_SMM_PARAMS) {
            self.smm_override = enabled(v);
        }
        if let Some(v) = var(ENV_TRANS_PARAMS) {
            self.trans_override = enabled(v);
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> TuneResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TuneError::InvalidConfig(format!("{name}={value:?} is not a valid number")))
}

/// An empty value or `0` disables a string-valued override.
fn enabled(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "0" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(pairs: &[(&str, &str)]) -> TuneResult<TuneConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = TuneConfig::default();
        config.apply_vars(|name| vars.get(name).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = TuneConfig::default();
        assert_eq!(config.max_kernel_dim, 64);
        assert!(config.smm_override.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = apply(&[
            (ENV_MAX_KERNEL_DIM, "32"),
            (ENV_VERBOSE, "2"),
            (ENV_SMM_PARAMS, "type=3 m=4 n=4 k=4 bs=8"),
            (ENV_TRANS_PARAMS, "0"),
            (ENV_CMEM, "0"),
        ])
        .unwrap();
        assert_eq!(config.max_kernel_dim, 32);
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.smm_override.as_deref(), Some("type=3 m=4 n=4 k=4 bs=8"));
        assert!(config.trans_override.is_none());
        assert!(!config.constant_memory);
    }

    #[test]
    fn test_bad_env_value() {
        let err = apply(&[(ENV_STACK_SIZE, "lots")]).unwrap_err();
        assert!(matches!(err, TuneError::InvalidConfig(_)));
    }

    #[test]
    fn test_json_file() {
        let dir = std::env::temp_dir().join("libsmm_cache_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "max_kernel_dim": 80, "variant_policy": "AlternateForPartialBatch" }"#).unwrap();

        let config = TuneConfig::load(&path).unwrap();
        assert_eq!(config.max_kernel_dim, 80);
        assert_eq!(config.variant_policy, VariantPolicy::AlternateForPartialBatch);
        assert_eq!(config.default_stack_size, 30000);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(TuneConfig::load(&path), Err(TuneError::InvalidConfig(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
