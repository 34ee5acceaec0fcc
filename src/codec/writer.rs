//! Writing keys and records as text.
//!
//! Output is deterministic: fields follow the canonical order in
//! [`fields`](super::fields) and floating-point counters use a fixed number of
//! decimals. The whole line is formatted first and handed to the stream in a
//! single `write_all`.

use std::io::Write;

use crate::codec::fields::{self, DEFAULT_DELIMITER, FLOAT_PRECISION};
use crate::configs::{SmmConfig, SmmParams, TransConfig};
use crate::error::{TuneError, TuneResult};
use crate::keys::{SmmKey, TransKey};
use crate::profiling::PerfCounters;
use crate::store::Record;

/// How values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStyle {
    /// `name=value`
    #[default]
    Named,
    /// Bare values in canonical order.
    Positional,
}

/// Optional framing of a written line.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions<'a> {
    /// Field separator, a single space when unset.
    pub delimiter: Option<&'a str>,
    /// Written once before the first field.
    pub prefix: Option<&'a str>,
    /// Written once after the last field.
    pub suffix: Option<&'a str>,
    /// Human-readable device label, written after the dimensions.
    pub device: Option<&'a str>,
    pub style: FieldStyle,
}

impl<'a> WriteOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: &'a str) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn suffix(mut self, suffix: &'a str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn device(mut self, device: &'a str) -> Self {
        self.device = Some(device);
        self
    }

    pub fn style(mut self, style: FieldStyle) -> Self {
        self.style = style;
        self
    }
}

/// Accumulates one line of fields.
struct Line<'o> {
    opts: &'o WriteOptions<'o>,
    out: String,
    first: bool,
}

impl<'o> Line<'o> {
    fn new(opts: &'o WriteOptions<'o>) -> Self {
        let mut out = String::new();
        if let Some(prefix) = opts.prefix {
            out.push_str(prefix);
        }
        Self { opts, out, first: true }
    }

    fn sep(&mut self) {
        if !self.first {
            self.out.push_str(self.opts.delimiter.unwrap_or(DEFAULT_DELIMITER));
        }
        self.first = false;
    }

    fn name(&mut self, name: &str) {
        self.sep();
        self.out.push_str(name);
    }

    fn value(&mut self, name: &str, value: &str) {
        self.sep();
        if self.opts.style == FieldStyle::Named {
            self.out.push_str(name);
            self.out.push('=');
        }
        self.out.push_str(value);
    }

    /// An empty label counts as no label.
    fn device(&self) -> Option<&'o str> {
        self.opts.device.filter(|d| !d.is_empty())
    }

    fn device_name(&mut self) {
        if self.device().is_some() {
            self.name(fields::DEVICE);
        }
    }

    fn device_value(&mut self) {
        if let Some(device) = self.device() {
            self.value(fields::DEVICE, &quote(device));
        }
    }

    fn finish<W: Write + ?Sized>(mut self, stream: &mut W) -> TuneResult<usize> {
        if let Some(suffix) = self.opts.suffix {
            self.out.push_str(suffix);
        }
        stream
            .write_all(self.out.as_bytes())
            .map_err(TuneError::StreamWrite)?;
        Ok(self.out.len())
    }
}

/// Quote a label if the tokenizer would otherwise split it, or if a bare
/// integer would be read as a positional parameter instead of a label.
fn quote(label: &str) -> String {
    let plain = !label.is_empty()
        && label.parse::<i64>().is_err()
        && !label
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '=' | '"' | '\\'));
    if plain {
        return label.to_string();
    }
    let mut quoted = String::with_capacity(label.len() + 2);
    quoted.push('"');
    for c in label.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn format_float(value: f64) -> String {
    format!("{value:.prec$}", prec = FLOAT_PRECISION)
}

/// Geometric mean of the recorded samples, 0 when there are none.
fn geometric_mean(counters: &PerfCounters) -> f64 {
    counters
        .perf()
        .summary()
        .map(|s| s.geometric_mean)
        .unwrap_or(0.0)
}

/// Write an SMM key, and unless `key_only` the tuning parameters and counters
/// of `record`, to `stream`.
///
/// Without a record the key's field names are written (a schema line). With a
/// record, `key_only` selects between the key's values and the full record.
/// Returns the number of bytes written.
pub fn write_smm_params<W: Write + ?Sized>(
    stream: &mut W,
    key_only: bool,
    key: &SmmKey,
    record: Option<&Record<SmmConfig>>,
    opts: &WriteOptions<'_>,
) -> TuneResult<usize> {
    let mut line = Line::new(opts);
    let Some(record) = record else {
        for name in fields::SMM_KEY {
            line.name(name);
        }
        line.device_name();
        return line.finish(stream);
    };

    line.value(fields::TYPE, &key.ty.code().to_string());
    line.value(fields::M, &key.m.to_string());
    line.value(fields::N, &key.n.to_string());
    line.value(fields::K, &key.k.to_string());
    line.device_value();
    if !key_only {
        let params = &record.config().params;
        for (name, value) in SmmParams::NAMES.iter().zip(params.values()) {
            line.value(name, &value.to_string());
        }
        let counters = record.counters();
        line.value(fields::NEXEC, &counters.launches().to_string());
        line.value(fields::GFLOPS, &format_float(geometric_mean(&counters)));
    }
    line.finish(stream)
}

/// Write the names of every SMM field (header line for a record dump).
pub fn write_smm_header<W: Write + ?Sized>(stream: &mut W, opts: &WriteOptions<'_>) -> TuneResult<usize> {
    let mut line = Line::new(opts);
    for name in fields::SMM_KEY {
        line.name(name);
    }
    line.device_name();
    for name in SmmParams::NAMES.iter().chain(fields::SMM_COUNTERS) {
        line.name(name);
    }
    line.finish(stream)
}

/// Transpose counterpart of [`write_smm_params`].
pub fn write_trans_params<W: Write + ?Sized>(
    stream: &mut W,
    key_only: bool,
    key: &TransKey,
    record: Option<&Record<TransConfig>>,
    opts: &WriteOptions<'_>,
) -> TuneResult<usize> {
    let mut line = Line::new(opts);
    let Some(record) = record else {
        for name in fields::TRANS_KEY {
            line.name(name);
        }
        line.device_name();
        return line.finish(stream);
    };

    line.value(fields::TYPE, &key.ty.code().to_string());
    line.value(fields::M, &key.m.to_string());
    line.value(fields::N, &key.n.to_string());
    line.device_value();
    if !key_only {
        line.value(fields::WGSIZE, &record.config().wgsize.to_string());
        let counters = record.counters();
        line.value(fields::NEXEC, &counters.launches().to_string());
        line.value(fields::MEMBW, &format_float(geometric_mean(&counters)));
    }
    line.finish(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_types::{DeviceUid, ElemType};

    fn smm_record() -> Record<SmmConfig> {
        let params = SmmParams {
            s: 30000,
            bs: 8,
            bm: 4,
            bn: 4,
            bk: 1,
            ws: 16,
            lu: 1,
            ..Default::default()
        };
        Record::new(SmmConfig::new(params))
    }

    fn key() -> SmmKey {
        SmmKey::new(ElemType::F64, 4, 4, 4, DeviceUid(7))
    }

    fn written(
        key_only: bool,
        record: Option<&Record<SmmConfig>>,
        opts: &WriteOptions<'_>,
    ) -> (usize, String) {
        let mut buf = Vec::new();
        let n = write_smm_params(&mut buf, key_only, &key(), record, opts).unwrap();
        (n, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_names_without_record() {
        let (n, text) = written(false, None, &WriteOptions::new());
        assert_eq!(text, "type m n k");
        assert_eq!(n, text.len());
        let (_, text) = written(true, None, &WriteOptions::new().device("gpu0"));
        assert_eq!(text, "type m n k device");
    }

    #[test]
    fn test_key_values() {
        let record = smm_record();
        let (_, text) = written(true, Some(&record), &WriteOptions::new());
        assert_eq!(text, "type=3 m=4 n=4 k=4");
        let opts = WriteOptions::new().style(FieldStyle::Positional).delimiter(";");
        let (_, text) = written(true, Some(&record), &opts);
        assert_eq!(text, "3;4;4;4");
    }

    #[test]
    fn test_full_record_framing() {
        let record = smm_record();
        record.record_launch(30000);
        record.record_sample(2.0).unwrap();
        record.record_sample(8.0).unwrap();
        let opts = WriteOptions::new().prefix("[").suffix("]\n").device("Tesla V100");
        let (n, text) = written(false, Some(&record), &opts);
        assert_eq!(
            text,
            "[type=3 m=4 n=4 k=4 device=\"Tesla V100\" s=30000 bs=8 bm=4 bn=4 bk=1 ws=16 wg=0 \
             lu=1 nz=0 al=0 tb=0 tc=0 ap=0 aa=0 ab=0 ac=0 nexec=1 gflops=4.000]\n"
        );
        assert_eq!(n, text.len());
    }

    #[test]
    fn test_deterministic() {
        let record = smm_record();
        let (_, a) = written(false, Some(&record), &WriteOptions::new());
        let (_, b) = written(false, Some(&record), &WriteOptions::new());
        assert_eq!(a, b);
        assert!(a.ends_with("nexec=0 gflops=0.000"));
    }

    #[test]
    fn test_header() {
        let mut buf = Vec::new();
        write_smm_header(&mut buf, &WriteOptions::new().delimiter(";")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("type;m;n;k;s;bs;"));
        assert!(text.ends_with(";ac;nexec;gflops"));
    }

    #[test]
    fn test_trans_record() {
        let record = Record::new(TransConfig::new(64));
        let mut buf = Vec::new();
        let key = TransKey::new(ElemType::F32, 23, 5);
        write_trans_params(&mut buf, false, &key, Some(&record), &WriteOptions::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "type=1 m=23 n=5 wgsize=64 nexec=0 membw=0.000");
    }

    struct FailingStream;

    impl Write for FailingStream {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stream_failure() {
        let record = smm_record();
        let err = write_smm_params(&mut FailingStream, false, &key(), Some(&record), &WriteOptions::new())
            .unwrap_err();
        assert!(matches!(err, TuneError::StreamWrite(_)));
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("gfx90a"), "gfx90a");
        assert_eq!(quote("a b"), "\"a b\"");
        assert_eq!(quote("x\"y"), "\"x\\\"y\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("1080"), "\"1080\"");
        assert_eq!(quote("-2"), "\"-2\"");
        assert_eq!(quote("1080ti"), "1080ti");
    }

    #[test]
    fn test_numeric_label_positional() {
        let record = smm_record();
        let opts = WriteOptions::new().device("1080").style(FieldStyle::Positional);
        let (_, text) = written(false, Some(&record), &opts);
        assert!(text.starts_with("3 4 4 4 \"1080\" 30000 8 4 4 1 16 "), "{text}");
    }

    #[test]
    fn test_empty_label_is_omitted() {
        let record = smm_record();
        let (_, text) = written(true, Some(&record), &WriteOptions::new().device(""));
        assert_eq!(text, "type=3 m=4 n=4 k=4");
        let (_, text) = written(true, None, &WriteOptions::new().device(""));
        assert_eq!(text, "type m n k");
    }
}
