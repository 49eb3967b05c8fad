//! Raw `cellwan_status` snapshot.
//!
//! The modem returns one loosely-typed JSON object per poll. Values drift
//! between strings and numbers across firmware revisions, and any key may be
//! missing, so every accessor here is total and returns an `Option`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::validate::{coerce_f64, coerce_i64};

/// Field names of the `cellwan_status` DAL object.
pub mod keys {
    pub const BAND_LIST: &str = "INTF_Current_Band";
    pub const CHANNEL_LIST: &str = "INTF_RFCN";
    pub const LTE_PCI: &str = "INTF_PhyCell_ID";
    pub const LTE_CELL_ID: &str = "INTF_Cell_ID";
    pub const LTE_RSRP: &str = "INTF_RSRP";
    pub const LTE_RSRQ: &str = "INTF_RSRQ";
    pub const LTE_SINR: &str = "INTF_SINR";

    pub const NR_ENABLED: &str = "NSA_Enable";
    pub const NR_PCI: &str = "NSA_PhyCellID";
    pub const NR_CELL_ID: &str = "NSA_Cell_ID";
    pub const NR_BAND: &str = "NSA_Band";
    pub const NR_CHANNEL: &str = "NSA_RFCN";
    pub const NR_RSRP: &str = "NSA_RSRP";
    pub const NR_RSRQ: &str = "NSA_RSRQ";
    pub const NR_SINR: &str = "NSA_SINR";
}

/// One poll cycle's status object, read-only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawStatus {
    fields: Map<String, Value>,
}

impl RawStatus {
    /// Wrap a JSON value; only objects are snapshots.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(RawStatus { fields }),
            _ => None,
        }
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw value; JSON `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Value rendered as text. Strings are trimmed; empty strings, booleans
    /// and containers are absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        coerce_f64(self.get(key))
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        coerce_i64(self.get(key))
    }

    /// Boolean flag. Accepts JSON booleans, non-zero numbers and the usual
    /// textual spellings; anything else is `false`.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enable" | "enabled"
            ),
            _ => false,
        }
    }

    // ── Carrier aggregation context ─────────────────────────────────

    pub fn band_list(&self) -> Option<String> {
        self.text(keys::BAND_LIST)
    }

    pub fn channel_list(&self) -> Option<String> {
        self.text(keys::CHANNEL_LIST)
    }

    // ── LTE anchor ──────────────────────────────────────────────────

    pub fn lte_pci(&self) -> Option<&Value> {
        self.get(keys::LTE_PCI)
    }

    pub fn lte_cell_id(&self) -> Option<String> {
        self.text(keys::LTE_CELL_ID)
    }

    pub fn lte_rsrp(&self) -> Option<f64> {
        self.number(keys::LTE_RSRP)
    }

    pub fn lte_rsrq(&self) -> Option<f64> {
        self.number(keys::LTE_RSRQ)
    }

    pub fn lte_sinr(&self) -> Option<f64> {
        self.number(keys::LTE_SINR)
    }

    // ── NR secondary ────────────────────────────────────────────────

    pub fn nr_enabled(&self) -> bool {
        self.flag(keys::NR_ENABLED)
    }

    pub fn nr_pci(&self) -> Option<&Value> {
        self.get(keys::NR_PCI)
    }

    pub fn nr_cell_id(&self) -> Option<String> {
        self.text(keys::NR_CELL_ID)
    }

    pub fn nr_band(&self) -> Option<String> {
        self.text(keys::NR_BAND)
    }

    pub fn nr_channel(&self) -> Option<String> {
        self.text(keys::NR_CHANNEL)
    }

    pub fn nr_rsrp(&self) -> Option<f64> {
        self.number(keys::NR_RSRP)
    }

    pub fn nr_rsrq(&self) -> Option<f64> {
        self.number(keys::NR_RSRQ)
    }

    pub fn nr_sinr(&self) -> Option<f64> {
        self.number(keys::NR_SINR)
    }
}
