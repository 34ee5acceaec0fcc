//! Reading keys and records back from text.
//!
//! A line is a sequence of fields separated by whitespace, `;` or `,`. A field
//! is either `name=value` (spaces around `=` are tolerated) or a bare value
//! that fills the next slot of the canonical layout. Named fields may appear
//! in any order; unknown names are ignored. Values may be double-quoted.
//!
//! Key fields are all-or-nothing: if any of them is missing or unparsable the
//! whole line is rejected and nothing is constructed.

use crate::codec::fields::{self, DEFAULT_SEPARATORS};
use crate::configs::{SmmConfig, SmmParams, TransConfig};
use crate::error::{TuneError, TuneResult};
use crate::kernel_types::{DeviceUid, ElemType};
use crate::keys::{SmmKey, TransKey};
use crate::profiling::{PerfCounters, PerformanceEstimate};
use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// A value; `quoted` is set when any part of it was double-quoted.
    Word { text: String, quoted: bool },
    Assign,
}

fn tokenize(buffer: &str, separators: &str) -> TuneResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = buffer.chars();

    while let Some(c) = chars.next() {
        if c == '"' {
            in_word = true;
            quoted = true;
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => word.push(escaped),
                        None => return Err(TuneError::malformed("unterminated quoted value")),
                    },
                    Some(other) => word.push(other),
                    None => return Err(TuneError::malformed("unterminated quoted value")),
                }
            }
        } else if c == '=' || separators.contains(c) {
            if in_word {
                tokens.push(Token::Word {
                    text: std::mem::take(&mut word),
                    quoted,
                });
                in_word = false;
                quoted = false;
            }
            if c == '=' {
                tokens.push(Token::Assign);
            }
        } else {
            in_word = true;
            word.push(c);
        }
    }
    if in_word {
        tokens.push(Token::Word { text: word, quoted });
    }
    Ok(tokens)
}

fn set_field(assigned: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(slot) = assigned.iter_mut().find(|(n, _)| n == name) {
        slot.1 = value;
    } else {
        assigned.push((name.to_string(), value));
    }
}

/// Resolve tokens into `(field name, value)` pairs against a positional
/// layout. Later assignments of the same field win.
///
/// A bare value goes to the next layout slot that is still empty. The device
/// slot takes a bare value only if it was quoted or is not an integer.
fn assign_fields(tokens: Vec<Token>, layout: &[&'static str]) -> Vec<(String, String)> {
    let mut assigned: Vec<(String, String)> = Vec::new();
    let mut cursor = 0usize;
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        let Token::Word { text: word, quoted } = token else {
            log::trace!("stray '=' ignored");
            continue;
        };
        if iter.peek() == Some(&Token::Assign) {
            iter.next();
            let value = match iter.peek() {
                Some(Token::Word { .. }) => match iter.next() {
                    Some(Token::Word { text, .. }) => text,
                    _ => String::new(),
                },
                _ => String::new(),
            };
            set_field(&mut assigned, &word.to_ascii_lowercase(), value);
            continue;
        }
        while let Some(&slot) = layout.get(cursor) {
            let filled = assigned.iter().any(|(n, _)| n == slot);
            let numeric_device = slot == fields::DEVICE && !quoted && word.parse::<i64>().is_ok();
            if !filled && !numeric_device {
                break;
            }
            cursor += 1;
        }
        match layout.get(cursor) {
            Some(slot) => {
                set_field(&mut assigned, slot, word);
                cursor += 1;
            }
            None => log::trace!("surplus positional value '{word}' ignored"),
        }
    }
    assigned
}

struct Fields(Vec<(String, String)>);

impl Fields {
    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn required_dim(&self, name: &str) -> TuneResult<i32> {
        let raw = self
            .get(name)
            .ok_or_else(|| TuneError::malformed(format!("missing field `{name}`")))?;
        let value: i32 = raw
            .trim()
            .parse()
            .map_err(|_| TuneError::malformed(format!("`{name}` is not an integer: {raw:?}")))?;
        if value <= 0 {
            return Err(TuneError::malformed(format!("`{name}` must be positive, got {value}")));
        }
        Ok(value)
    }

    fn elem_type(&self) -> TuneResult<ElemType> {
        let raw = self
            .get(fields::TYPE)
            .ok_or_else(|| TuneError::malformed("missing field `type`"))?
            .trim();
        let parsed = match raw.parse::<i32>() {
            Ok(code) => ElemType::from_code(code),
            Err(_) => [ElemType::F32, ElemType::F64, ElemType::C32, ElemType::C64]
                .into_iter()
                .find(|ty| ty.name().eq_ignore_ascii_case(raw)),
        };
        parsed.ok_or_else(|| TuneError::malformed(format!("unknown element type {raw:?}")))
    }

    fn optional<T: std::str::FromStr>(&self, name: &str) -> TuneResult<Option<T>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| TuneError::malformed(format!("invalid value for `{name}`: {raw:?}"))),
        }
    }

    fn device(&self) -> Option<String> {
        self.get(fields::DEVICE)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

/// Restore counters from persisted values. A throughput value that is not
/// positive is treated as "no sample".
fn restore_counters(nexec: Option<u64>, throughput: Option<f64>) -> PerfCounters {
    let mut counters = PerfCounters::default();
    if let Some(nexec) = nexec {
        counters.restore_launches(nexec);
    }
    if let Some(value) = throughput.filter(|v| *v > 0.0) {
        if let Err(e) = counters.record_sample(value) {
            log::debug!("persisted throughput not restored: {e}");
        }
    }
    counters
}

/// Result of parsing one SMM line.
#[derive(Debug)]
pub struct ParsedSmm {
    pub key: SmmKey,
    pub record: Record<SmmConfig>,
    /// Device label, if the line carried one.
    pub device: Option<String>,
    /// Arithmetic-intensity ratio of this line's `gflops`, if any.
    pub estimate: PerformanceEstimate,
}

impl ParsedSmm {
    /// Re-key the record for a device resolved by the caller.
    pub fn with_device_uid(mut self, uid: DeviceUid) -> Self {
        self.key.device = uid;
        self
    }
}

/// Result of parsing one transpose line.
#[derive(Debug)]
pub struct ParsedTrans {
    pub key: TransKey,
    pub record: Record<TransConfig>,
    pub device: Option<String>,
}

/// Parse an SMM record with the default separators. The key is created for
/// `device_uid`; the persisted device label is returned separately.
pub fn parse_smm_line(buffer: &str, device_uid: DeviceUid) -> TuneResult<ParsedSmm> {
    parse_smm_line_with(buffer, device_uid, DEFAULT_SEPARATORS)
}

/// [`parse_smm_line`] with a caller-chosen set of separator characters.
pub fn parse_smm_line_with(buffer: &str, device_uid: DeviceUid, separators: &str) -> TuneResult<ParsedSmm> {
    let layout = fields::smm_layout();
    let found = Fields(assign_fields(tokenize(buffer, separators)?, &layout));

    let ty = found.elem_type()?;
    let m = found.required_dim(fields::M)?;
    let n = found.required_dim(fields::N)?;
    let k = found.required_dim(fields::K)?;
    let key = SmmKey::new(ty, m, n, k, device_uid);

    let mut params = SmmParams::default();
    for name in SmmParams::NAMES {
        if let Some(value) = found.optional::<i32>(name)? {
            params.set(name, value);
        }
    }

    let gflops = found.optional::<f64>(fields::GFLOPS)?;
    let counters = restore_counters(found.optional(fields::NEXEC)?, gflops);

    let mut estimate = PerformanceEstimate::default();
    let ai = key.arithmetic_intensity();
    if let Some(ratio) = gflops.filter(|_| ai > 0.0).map(|g| g / ai) {
        if ratio > 0.0 && ratio.is_finite() {
            estimate.record(ty.precision(), ratio)?;
        }
    }

    Ok(ParsedSmm {
        key,
        record: Record::with_counters(SmmConfig::new(params), counters),
        device: found.device(),
        estimate,
    })
}

/// Parse a transpose record with the default separators.
pub fn parse_trans_line(buffer: &str) -> TuneResult<ParsedTrans> {
    let layout = fields::trans_layout();
    let found = Fields(assign_fields(tokenize(buffer, DEFAULT_SEPARATORS)?, &layout));

    let ty = found.elem_type()?;
    let m = found.required_dim(fields::M)?;
    let n = found.required_dim(fields::N)?;

    let wgsize = found.optional::<usize>(fields::WGSIZE)?.unwrap_or(0);
    let counters = restore_counters(found.optional(fields::NEXEC)?, found.optional(fields::MEMBW)?);

    Ok(ParsedTrans {
        key: TransKey::new(ty, m, n),
        record: Record::with_counters(TransConfig::new(wgsize), counters),
        device: found.device(),
    })
}
