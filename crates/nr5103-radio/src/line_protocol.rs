//! InfluxDB line protocol rendering.
//!
//! ```text
//! cellular_radio_raw,band=B20,pci=123,rat=LTE,role=anchor rsrp=-95,intf_bands="B20,B32" 1700000000000000000
//! ```
//!
//! Tags and fields come out sorted by key, so identical observations always
//! render to identical bytes.

use std::fmt::Write;

use crate::observation::{FieldValue, Observation};

const MEASUREMENT_SPECIAL: &[char] = &[',', ' ', '\\'];
const KEY_SPECIAL: &[char] = &[',', '=', ' ', '\\'];
const STRING_SPECIAL: &[char] = &['"', '\\'];

/// Render one observation as a single line, without a trailing newline.
///
/// The timestamp is in nanoseconds. Times outside the representable
/// nanosecond range (before 1677 or after 2262) are left off and the server
/// assigns its own.
pub fn encode(obs: &Observation) -> String {
    let mut out = String::with_capacity(128);
    escape_into(&mut out, obs.measurement(), MEASUREMENT_SPECIAL);

    for (key, value) in obs.tags() {
        out.push(',');
        escape_into(&mut out, key, KEY_SPECIAL);
        out.push('=');
        escape_into(&mut out, value, KEY_SPECIAL);
    }

    for (i, (key, value)) in obs.fields().iter().enumerate() {
        out.push(if i == 0 { ' ' } else { ',' });
        escape_into(&mut out, key, KEY_SPECIAL);
        out.push('=');
        match value {
            // Display for f64 never uses exponent notation and never appends
            // a type suffix, which is what the float grammar expects.
            FieldValue::Float(v) => {
                let _ = write!(out, "{v}");
            }
            FieldValue::Text(s) => {
                out.push('"');
                escape_into(&mut out, s, STRING_SPECIAL);
                out.push('"');
            }
        }
    }

    if let Some(ns) = obs.time().timestamp_nanos_opt() {
        let _ = write!(out, " {ns}");
    }
    out
}

/// Line breaks terminate a record and have no escape, so they are dropped.
fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if c == '\n' || c == '\r' {
            continue;
        }
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
