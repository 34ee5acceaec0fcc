//! Canonical field names and order of the text format.
//!
//! Order is: element type, dimensions, device label, tuning parameters,
//! counters. The writer always emits this order; the parser accepts named
//! fields in any order and uses it only to place bare (positional) values.

use crate::configs::SmmParams;

pub const TYPE: &str = "type";
pub const M: &str = "m";
pub const N: &str = "n";
pub const K: &str = "k";
pub const DEVICE: &str = "device";
pub const NEXEC: &str = "nexec";
pub const GFLOPS: &str = "gflops";
pub const WGSIZE: &str = "wgsize";
pub const MEMBW: &str = "membw";

pub const SMM_KEY: &[&str] = &[TYPE, M, N, K];
pub const SMM_COUNTERS: &[&str] = &[NEXEC, GFLOPS];

pub const TRANS_KEY: &[&str] = &[TYPE, M, N];
pub const TRANS_PARAMS: &[&str] = &[WGSIZE];
pub const TRANS_COUNTERS: &[&str] = &[NEXEC, MEMBW];

/// Decimal places for floating-point counters.
pub const FLOAT_PRECISION: usize = 3;

/// Default delimiter between fields.
pub const DEFAULT_DELIMITER: &str = " ";

/// Characters the tokenizer splits on (besides `=`).
pub const DEFAULT_SEPARATORS: &str = " \t\r\n;,";

/// Full positional layout of an SMM record.
pub fn smm_layout() -> Vec<&'static str> {
    let mut layout = Vec::with_capacity(SMM_KEY.len() + 1 + SmmParams::NAMES.len() + SMM_COUNTERS.len());
    layout.extend_from_slice(SMM_KEY);
    layout.push(DEVICE);
    layout.extend_from_slice(SmmParams::NAMES);
    layout.extend_from_slice(SMM_COUNTERS);
    layout
}

/// Full positional layout of a transpose record.
pub fn trans_layout() -> Vec<&'static str> {
    let mut layout = Vec::with_capacity(TRANS_KEY.len() + 1 + TRANS_PARAMS.len() + TRANS_COUNTERS.len());
    layout.extend_from_slice(TRANS_KEY);
    layout.push(DEVICE);
    layout.extend_from_slice(TRANS_PARAMS);
    layout.extend_from_slice(TRANS_COUNTERS);
    layout
}
