//! End-to-end normalization scenarios.
//!
//! Each test feeds a realistic `cellwan_status` snapshot through
//! `nr5103_radio::normalize` and checks the exact observations that come out.

use chrono::{DateTime, Utc};
use serde_json::json;

use nr5103_radio::status::keys;
use nr5103_radio::{FieldValue, MEASUREMENT, Observation, RawStatus, normalize};

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Snapshot as the modem returns it for an LTE-only attach with CA.
fn lte_only() -> RawStatus {
    serde_json::from_value(json!({
        "INTF_Current_Band": "B20,B32",
        "INTF_RFCN": "1300,9410",
        "INTF_PhyCell_ID": 123,
        "INTF_RSRP": -95.0,
        "NSA_Enable": false,
        "NSA_PhyCellID": 0,
        "NSA_RSRP": -140,
    }))
    .unwrap()
}

/// NSA attach: LTE anchor plus an NR leg.
fn nsa() -> RawStatus {
    serde_json::from_value(json!({
        "INTF_Current_Band": "B32,B20,n78",
        "INTF_RFCN": "9919,6300,632448",
        "INTF_PhyCell_ID": "311",
        "INTF_Cell_ID": 26630401,
        "INTF_RSRP": "-88",
        "INTF_RSRQ": "-10",
        "INTF_SINR": "14",
        "NSA_Enable": true,
        "NSA_PhyCellID": 57,
        "NSA_Cell_ID": "",
        "NSA_Band": "n78",
        "NSA_RFCN": 632448,
        "NSA_RSRP": -97.5,
        "NSA_RSRQ": -11.5,
        "NSA_SINR": 0,
    }))
    .unwrap()
}

fn float(obs: &Observation, key: &str) -> Option<f64> {
    obs.field(key).and_then(FieldValue::as_f64)
}

fn text<'a>(obs: &'a Observation, key: &str) -> Option<&'a str> {
    obs.field(key).and_then(FieldValue::as_str)
}

#[test]
fn lte_only_snapshot_yields_one_anchor() {
    let obs = normalize(&lte_only(), t0());
    assert_eq!(obs.len(), 1);
    let anchor = &obs[0];

    assert_eq!(anchor.measurement(), MEASUREMENT);
    let tags: Vec<(&str, &str)> = anchor.tags().iter().map(|(k, v)| (*k, v.as_str())).collect();
    assert_eq!(
        tags,
        vec![
            ("arfcn", "1300"),
            ("band", "B20"),
            ("cell_id", "unknown"),
            ("pci", "123"),
            ("rat", "LTE"),
            ("role", "anchor"),
        ]
    );

    let field_keys: Vec<&str> = anchor.fields().keys().copied().collect();
    assert_eq!(field_keys, vec!["intf_bands", "intf_rfcns", "rsrp"]);
    assert_eq!(float(anchor, "rsrp"), Some(-95.0));
    assert_eq!(text(anchor, "intf_bands"), Some("B20,B32"));
    assert_eq!(text(anchor, "intf_rfcns"), Some("1300,9410"));
    assert_eq!(anchor.time(), t0());
}

#[test]
fn lte_only_line_protocol() {
    let lines: Vec<String> = normalize(&lte_only(), t0())
        .iter()
        .map(Observation::to_line_protocol)
        .collect();
    assert_eq!(
        lines,
        vec![
            "cellular_radio_raw,arfcn=1300,band=B20,cell_id=unknown,pci=123,rat=LTE,role=anchor \
             intf_bands=\"B20,B32\",intf_rfcns=\"1300,9410\",rsrp=-95 1700000000000000000"
        ]
    );
}

#[test]
fn nsa_snapshot_yields_anchor_then_secondary() {
    let obs = normalize(&nsa(), t0());
    assert_eq!(obs.len(), 2);
    let (anchor, secondary) = (&obs[0], &obs[1]);

    assert_eq!(anchor.tag("role"), Some("anchor"));
    assert_eq!(anchor.tag("band"), Some("B20"), "B32 is downlink-only");
    assert_eq!(anchor.tag("arfcn"), Some("6300"));
    assert_eq!(anchor.tag("pci"), Some("311"));
    assert_eq!(anchor.tag("cell_id"), Some("26630401"));
    assert_eq!(float(anchor, "rsrp"), Some(-88.0));
    assert_eq!(float(anchor, "rsrq"), Some(-10.0));
    assert_eq!(float(anchor, "sinr"), Some(14.0));
    assert_eq!(text(anchor, "intf_bands"), Some("B32,B20,n78"));

    assert_eq!(secondary.tag("rat"), Some("NR"));
    assert_eq!(secondary.tag("role"), Some("secondary"));
    assert_eq!(secondary.tag("pci"), Some("57"));
    assert_eq!(secondary.tag("cell_id"), Some("26630401"), "empty NR cell id falls back");
    assert_eq!(secondary.tag("band"), Some("n78"));
    assert_eq!(secondary.tag("arfcn"), Some("632448"));
    assert_eq!(float(secondary, "rsrp"), Some(-97.5));
    assert_eq!(float(secondary, "rsrq"), Some(-11.5));
    assert_eq!(float(secondary, "sinr"), None, "SINR 0 means not available");
    assert!(secondary.field("intf_bands").is_none());

    assert!(obs.iter().all(|o| o.time() == t0()));
}

#[test]
fn identity_gate_suppresses_everything() {
    let placeholders = [json!(0), json!(-5), json!("abc"), serde_json::Value::Null];
    for pci in placeholders {
        let status = nsa()
            .with(keys::LTE_PCI, pci.clone())
            .with(keys::NR_PCI, pci.clone());
        assert!(
            normalize(&status, t0()).is_empty(),
            "PCI {pci} must not produce observations"
        );
    }
}

#[test]
fn rsrp_sentinel_boundaries() {
    let cases = [(-140.0, false), (-139.9, true), (-40.0, false), (-40.1, true)];
    for (rsrp, valid) in cases {
        let status = nsa().with(keys::LTE_RSRP, rsrp).with(keys::NR_RSRP, rsrp);
        let obs = normalize(&status, t0());
        assert_eq!(float(&obs[0], "rsrp").is_some(), valid, "anchor rsrp {rsrp}");
        assert_eq!(obs.len() == 2, valid, "secondary gate at rsrp {rsrp}");
    }
}

#[test]
fn anchor_sinr_zero_is_omitted() {
    let status = lte_only().with(keys::LTE_SINR, 0.0);
    let obs = normalize(&status, t0());
    assert!(obs[0].field("sinr").is_none());
}

#[test]
fn secondary_missing_band_drops_whole_context() {
    let status = nsa().with(keys::NR_BAND, serde_json::Value::Null);
    let obs = normalize(&status, t0());
    assert_eq!(obs.len(), 1);
    assert_eq!(obs[0].tag("role"), Some("anchor"));
}

#[test]
fn sdl_only_carrier_list_still_reports_band() {
    let status = lte_only()
        .with(keys::BAND_LIST, "B32")
        .with(keys::CHANNEL_LIST, "9919");
    let obs = normalize(&status, t0());
    assert_eq!(obs[0].tag("band"), Some("B32"));
    assert_eq!(obs[0].tag("arfcn"), Some("9919"));
}

#[test]
fn nr_only_carrier_list_has_no_anchor_band() {
    let status = lte_only()
        .with(keys::BAND_LIST, "n1")
        .with(keys::CHANNEL_LIST, "300");
    let obs = normalize(&status, t0());
    assert_eq!(obs.len(), 1);
    assert_eq!(obs[0].tag("band"), None);
    assert_eq!(obs[0].tag("arfcn"), None);
    assert_eq!(text(&obs[0], "intf_bands"), Some("n1"));
}

#[test]
fn hostile_modem_text_cannot_break_the_line() {
    let status = lte_only()
        .with(keys::LTE_CELL_ID, r"abc\")
        .with(keys::BAND_LIST, "B20,B3\nfoo,B32");
    let line = normalize(&status, t0())[0].to_line_protocol();

    assert!(!line.contains('\n'), "{line:?}");
    assert!(line.contains(r"cell_id=abc\\,pci=123,"), "{line}");
    assert!(line.contains(r#"intf_bands="B20,B3foo,B32""#), "{line}");
}

#[test]
fn empty_snapshot_yields_nothing() {
    assert!(normalize(&RawStatus::default(), t0()).is_empty());
}

#[test]
fn normalize_is_idempotent() {
    let status = nsa();
    let a = normalize(&status, t0());
    let b = normalize(&status, t0());
    assert_eq!(a, b);

    let render = |obs: &[Observation]| -> Vec<String> {
        obs.iter().map(Observation::to_line_protocol).collect()
    };
    assert_eq!(render(&a), render(&b));
}

#[test]
fn normalize_is_safe_across_threads() {
    let status = nsa();
    let expected = normalize(&status, t0());
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| normalize(&status, t0()))).collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}
