//! Time-series observation: measurement, tags, fields and timestamp.
//!
//! Tags are grouping keys and fields are values. Both are kept in sorted maps
//! so that rendering an observation is deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A field value as written to the sink.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Float(_) => None,
        }
    }
}

/// Immutable once built. Construct with [`Observation::new`] from
/// optional components; absent components (and empty tag values) are not
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    measurement: &'static str,
    tags: BTreeMap<&'static str, String>,
    fields: BTreeMap<&'static str, FieldValue>,
    time: DateTime<Utc>,
}

impl Observation {
    pub fn new<T, F>(measurement: &'static str, tags: T, fields: F, time: DateTime<Utc>) -> Self
    where
        T: IntoIterator<Item = (&'static str, Option<String>)>,
        F: IntoIterator<Item = (&'static str, Option<FieldValue>)>,
    {
        Observation {
            measurement,
            tags: tags
                .into_iter()
                .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v)))
                .collect(),
            fields: fields
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
            time,
        }
    }

    pub fn measurement(&self) -> &'static str {
        self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<&'static str, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<&'static str, FieldValue> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// See [`crate::line_protocol::encode`].
    pub fn to_line_protocol(&self) -> String {
        crate::line_protocol::encode(self)
    }
}
