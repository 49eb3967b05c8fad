//! # NR5103 Radio Normalization
//!
//! Converts one raw `cellwan_status` snapshot from a Zyxel NR5103 into clean
//! `cellular_radio_raw` observations, one per active radio leg:
//!
//! - **Carrier list**: index-aligned band/channel strings into pairs
//! - **Anchor selection**: first LTE band that is not downlink-only
//! - **Validation**: sentinel and plausibility gates per field
//! - **Extraction**: LTE anchor and NR secondary contexts
//! - **Line protocol**: deterministic InfluxDB rendering
//!
//! Everything here is pure. A snapshot in, 0–2 observations out; nothing is
//! remembered between calls.
//!
//! ```
//! use nr5103_radio::{normalize, RawStatus};
//!
//! let status = RawStatus::default()
//!     .with("INTF_Current_Band", "B20,B32")
//!     .with("INTF_RFCN", "1300,9410")
//!     .with("INTF_PhyCell_ID", 123)
//!     .with("INTF_RSRP", -95.0);
//! let time = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
//!
//! let obs = normalize(&status, time);
//! assert_eq!(obs.len(), 1);
//! assert_eq!(obs[0].tag("band"), Some("B20"));
//! ```

pub mod carrier;
pub mod extract;
pub mod line_protocol;
pub mod observation;
pub mod status;
pub mod validate;

pub use carrier::{CarrierList, CarrierPair};
pub use extract::{MEASUREMENT, RadioContext, RadioRole};
pub use observation::{FieldValue, Observation};
pub use status::RawStatus;

use chrono::{DateTime, Utc};

/// Normalize one snapshot. Anchor first, then secondary; every observation
/// carries `time`.
pub fn normalize(status: &RawStatus, time: DateTime<Utc>) -> Vec<Observation> {
    extract::observations(status, time)
}
