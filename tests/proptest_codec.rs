//! Property-based tests for the record codec and performance aggregation.
//!
//! Invariants checked for all inputs:
//! - A written record parses back to the same key, parameters, label and
//!   counters, in named and positional style, and rewrites byte-identically
//! - Aggregator count and max track the accepted samples exactly
//! - Suitability is total and honours the dimension limit

use proptest::prelude::*;

use libsmm_cache::{
    parse_smm_line, parse_trans_line, write_smm_params, write_trans_params, DeviceUid, ElemType,
    FieldStyle, PerfAggregator, Record, SmmConfig, SmmKey, SmmParams, SupportedTypes, TransConfig,
    TransKey, WriteOptions,
};

fn arb_elem_type() -> impl Strategy<Value = ElemType> {
    prop_oneof![
        Just(ElemType::F32),
        Just(ElemType::F64),
        Just(ElemType::C32),
        Just(ElemType::C64),
    ]
}

fn arb_params() -> impl Strategy<Value = SmmParams> {
    prop::collection::vec(-4i32..100_000, SmmParams::NAMES.len()).prop_map(|values| {
        let mut params = SmmParams::default();
        for (name, value) in SmmParams::NAMES.iter().zip(values) {
            params.set(name, value);
        }
        params
    })
}

fn arb_label() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        "[a-zA-Z][a-zA-Z0-9_ ,;=-]{0,16}",
        "-?[0-9]{1,6}",
        "[0-9][a-z0-9. ]{0,8}",
        Just(String::new()),
    ])
}

fn arb_style() -> impl Strategy<Value = FieldStyle> {
    prop_oneof![Just(FieldStyle::Named), Just(FieldStyle::Positional)]
}

fn smm_line(key: &SmmKey, record: &Record<SmmConfig>, opts: &WriteOptions<'_>) -> String {
    let mut line = Vec::new();
    write_smm_params(&mut line, false, key, Some(record), opts).unwrap();
    String::from_utf8(line).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Codec round trip
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn smm_record_round_trips(
        ty in arb_elem_type(),
        m in 1i32..=128,
        n in 1i32..=128,
        k in 1i32..=128,
        uid in 0i32..16,
        params in arb_params(),
        label in arb_label(),
        style in arb_style(),
        samples in prop::collection::vec(0.5f64..1000.0, 0..4),
    ) {
        let key = SmmKey::new(ty, m, n, k, DeviceUid(uid));
        let record = Record::new(SmmConfig::new(params));
        for &sample in &samples {
            record.record_execution(30000, sample).unwrap();
        }
        let mut opts = WriteOptions::new().style(style);
        opts.device = label.as_deref();
        let text = smm_line(&key, &record, &opts);

        let parsed = parse_smm_line(&text, DeviceUid(uid)).unwrap();
        prop_assert_eq!(parsed.key, key);
        prop_assert_eq!(parsed.record.config().params, params);
        prop_assert_eq!(parsed.record.launches(), samples.len() as u64);
        let expected_label = label.clone().filter(|l| !l.is_empty());
        prop_assert_eq!(&parsed.device, &expected_label);

        // Writing the parsed record again reproduces the line exactly.
        let mut again = WriteOptions::new().style(style);
        again.device = parsed.device.as_deref();
        prop_assert_eq!(smm_line(&parsed.key, &parsed.record, &again), text);
    }

    #[test]
    fn trans_record_round_trips(
        ty in arb_elem_type(),
        m in 1i32..=256,
        n in 1i32..=256,
        wgsize in 0usize..1024,
    ) {
        let key = TransKey::new(ty, m, n);
        let record = Record::new(TransConfig::new(wgsize));
        let mut line = Vec::new();
        write_trans_params(&mut line, false, &key, Some(&record), &WriteOptions::new()).unwrap();
        let parsed = parse_trans_line(std::str::from_utf8(&line).unwrap()).unwrap();
        prop_assert_eq!(parsed.key, key);
        prop_assert_eq!(parsed.record.config().wgsize, wgsize);
    }

    #[test]
    fn parser_never_panics(line in "[ -~]{0,80}") {
        let _ = parse_smm_line(&line, DeviceUid(0));
        let _ = parse_trans_line(&line);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Aggregation
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregator_tracks_count_and_max(
        samples in prop::collection::vec(prop_oneof![1e-6f64..1e6, -10.0f64..=0.0], 1..64),
    ) {
        let mut agg = PerfAggregator::new();
        let mut accepted = Vec::new();
        for &s in &samples {
            if agg.record_sample(s).is_ok() {
                accepted.push(s);
            }
        }
        prop_assert_eq!(agg.count(), accepted.len() as u64);
        if accepted.is_empty() {
            prop_assert!(agg.summary().is_err());
        } else {
            let summary = agg.summary().unwrap();
            let max = accepted.iter().cloned().fold(f64::MIN, f64::max);
            let min = accepted.iter().cloned().fold(f64::MAX, f64::min);
            prop_assert_eq!(summary.max, max);
            prop_assert!(summary.geometric_mean <= max * (1.0 + 1e-9));
            prop_assert!(summary.geometric_mean >= min * (1.0 - 1e-9));
            prop_assert!(summary.geometric_mean <= summary.arithmetic_mean * (1.0 + 1e-9));
        }
    }

    #[test]
    fn suitability_respects_limit(
        stack in -10i32..1000,
        m in -4i32..80,
        n in -4i32..80,
        k in -4i32..80,
        limit in 1i32..80,
    ) {
        let types = SupportedTypes { f32: true, f64: true };
        let expected = stack > 0 && [m, n, k].iter().all(|&d| d > 0 && d <= limit);
        prop_assert_eq!(types.is_suitable(true, ElemType::F64, stack, m, n, k, limit), expected);
        prop_assert!(!types.is_suitable(false, ElemType::F64, stack, m, n, k, limit));
    }
}

#[test]
fn million_unit_samples_stay_exact() {
    let mut agg = PerfAggregator::new();
    for _ in 0..1_000_000 {
        agg.record_sample(1.0).unwrap();
    }
    let summary = agg.summary().unwrap();
    assert_eq!(summary.count, 1_000_000);
    assert!((summary.arithmetic_mean - 1.0).abs() < 1e-9);
    assert!((summary.geometric_mean - 1.0).abs() < 1e-9);
}
