//! # Field Validators
//!
//! Total coercion and plausibility checks for raw status values. Every
//! function here answers "absent" instead of failing, so a malformed field
//! can only ever drop out of an observation.
//!
//! ## Thresholds
//!
//! | Metric | Valid (exclusive) | Sentinel                          |
//! |--------|-------------------|-----------------------------------|
//! | PCI    | `> 0`             | `0` / negative when not attached  |
//! | RSRP   | −140 … −40 dBm    | −140 is the "no signal" floor     |
//! | RSRQ   | −30 … 0 dB        |                                   |
//! | SINR   | −20 … 50 dB       | exactly `0` on some firmware      |

use serde_json::Value;

// ─── Threshold Table ────────────────────────────────────────────────────────

/// Open interval `(low, high)`; both endpoints are rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenRange {
    pub low: f64,
    pub high: f64,
}

impl OpenRange {
    pub const fn new(low: f64, high: f64) -> Self {
        OpenRange { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value > self.low && value < self.high
    }
}

/// RSRP in dBm. The −140 floor doubles as the modem's "no signal" value.
pub const RSRP_DBM: OpenRange = OpenRange::new(-140.0, -40.0);

/// RSRQ in dB.
pub const RSRQ_DB: OpenRange = OpenRange::new(-30.0, 0.0);

/// SINR in dB. Wide; rejects only obvious placeholders.
pub const SINR_DB: OpenRange = OpenRange::new(-20.0, 50.0);

/// SINR reported when the firmware has no measurement.
pub const SINR_NOT_AVAILABLE: f64 = 0.0;

/// Largest PCI the modem emits as a "no cell attached" placeholder.
pub const PCI_PLACEHOLDER_MAX: i64 = 0;

// ─── Coercion ───────────────────────────────────────────────────────────────

/// Coerce a raw value to a finite float.
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace is
/// ignored). Booleans, containers, malformed strings and non-finite values
/// are absent.
pub fn coerce_f64(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Coerce a raw value to an integer.
///
/// Accepts JSON integers, integral JSON floats (`123.0`) and integer strings.
/// Fractional values are absent rather than truncated.
pub fn coerce_i64(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            let in_range = f >= i64::MIN as f64 && f <= i64::MAX as f64;
            (f.fract() == 0.0 && in_range).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// ─── Validity Gates ─────────────────────────────────────────────────────────

/// Physical cell identity, if present and not a placeholder.
pub fn valid_pci(raw: Option<&Value>) -> Option<i64> {
    coerce_i64(raw).filter(|&pci| pci > PCI_PLACEHOLDER_MAX)
}

pub fn plausible_rsrp(rsrp: Option<f64>) -> Option<f64> {
    rsrp.filter(|&v| RSRP_DBM.contains(v))
}

pub fn plausible_rsrq(rsrq: Option<f64>) -> Option<f64> {
    rsrq.filter(|&v| RSRQ_DB.contains(v))
}

pub fn plausible_sinr(sinr: Option<f64>) -> Option<f64> {
    sinr.filter(|&v| SINR_DB.contains(v))
}

/// Drop the firmware's "not available" SINR.
///
/// Narrower than [`plausible_sinr`]: `0` sits inside [`SINR_DB`] but is still
/// discarded.
pub fn clean_sinr(sinr: Option<f64>) -> Option<f64> {
    sinr.filter(|&v| v != SINR_NOT_AVAILABLE)
}

/// SINR as written: sentinel-cleaned, then range-checked.
pub fn usable_sinr(sinr: Option<f64>) -> Option<f64> {
    plausible_sinr(clean_sinr(sinr))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
