//! # Radio Context Extraction
//!
//! Turns one [`RawStatus`] into at most two radio contexts:
//!
//! | Context   | RAT | Gate                                                  |
//! |-----------|-----|-------------------------------------------------------|
//! | Anchor    | LTE | valid PCI; everything else optional                   |
//! | Secondary | NR  | enabled + valid PCI + band + channel + plausible RSRP |
//!
//! The anchor gate is soft: only the PCI is required and each signal field
//! drops out on its own. The secondary gate is all-or-nothing because the
//! NSA keys are routinely populated with leftovers while no NR leg is up, and
//! a half-valid NR record would start a ghost series.

use chrono::{DateTime, Utc};

use crate::carrier::{CarrierList, CarrierPair};
use crate::observation::{FieldValue, Observation};
use crate::status::RawStatus;
use crate::validate::{plausible_rsrp, plausible_rsrq, usable_sinr, valid_pci};

/// Measurement name of every radio observation.
pub const MEASUREMENT: &str = "cellular_radio_raw";

/// Cell-id tag value when the modem reports none.
pub const UNKNOWN_CELL_ID: &str = "unknown";

/// Which leg of the connection a context describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RadioRole {
    /// LTE primary carrier.
    Anchor,
    /// NR carrier in NSA mode.
    Secondary,
}

impl RadioRole {
    pub const fn rat(self) -> &'static str {
        match self {
            RadioRole::Anchor => "LTE",
            RadioRole::Secondary => "NR",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RadioRole::Anchor => "anchor",
            RadioRole::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for RadioRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.rat(), self.as_str())
    }
}

/// Validated view of one radio leg. Every `Option` is already filtered:
/// `Some` means the value passed its gate.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioContext {
    pub role: RadioRole,
    pub pci: i64,
    pub cell_id: Option<String>,
    pub band: Option<String>,
    pub channel: Option<String>,
    pub rsrp: Option<f64>,
    pub rsrq: Option<f64>,
    pub sinr: Option<f64>,
    /// Full CA band list (anchor only).
    pub carrier_bands: Option<String>,
    /// Full CA channel list (anchor only).
    pub carrier_channels: Option<String>,
}

impl RadioContext {
    pub fn to_observation(&self, time: DateTime<Utc>) -> Observation {
        let cell_id = self
            .cell_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_CELL_ID.to_string());

        Observation::new(
            MEASUREMENT,
            [
                ("rat", Some(self.role.rat().to_string())),
                ("role", Some(self.role.as_str().to_string())),
                ("pci", Some(self.pci.to_string())),
                ("cell_id", Some(cell_id)),
                ("band", self.band.clone()),
                ("arfcn", self.channel.clone()),
            ],
            [
                ("rsrp", self.rsrp.map(FieldValue::Float)),
                ("rsrq", self.rsrq.map(FieldValue::Float)),
                ("sinr", self.sinr.map(FieldValue::Float)),
                ("intf_bands", self.carrier_bands.clone().map(FieldValue::Text)),
                ("intf_rfcns", self.carrier_channels.clone().map(FieldValue::Text)),
            ],
            time,
        )
    }
}

/// LTE anchor context, or `None` when the LTE PCI is missing or a
/// placeholder.
pub fn anchor_context(
    status: &RawStatus,
    carriers: &CarrierList,
    anchor: Option<&CarrierPair>,
) -> Option<RadioContext> {
    let Some(pci) = valid_pci(status.lte_pci()) else {
        tracing::trace!(raw = ?status.lte_pci(), "anchor suppressed: no valid LTE PCI");
        return None;
    };

    Some(RadioContext {
        role: RadioRole::Anchor,
        pci,
        cell_id: status.lte_cell_id(),
        band: anchor.map(|p| p.band.clone()),
        channel: anchor.and_then(CarrierPair::channel).map(str::to_string),
        rsrp: plausible_rsrp(status.lte_rsrp()),
        rsrq: plausible_rsrq(status.lte_rsrq()),
        sinr: usable_sinr(status.lte_sinr()),
        carrier_bands: carriers.band_labels(),
        carrier_channels: carriers.channel_labels(),
    })
}

/// NR secondary context. Any failed gate suppresses the whole context.
pub fn secondary_context(status: &RawStatus) -> Option<RadioContext> {
    if !status.nr_enabled() {
        return None;
    }

    let pci = valid_pci(status.nr_pci());
    let band = status.nr_band();
    let channel = status.nr_channel();
    let rsrp = plausible_rsrp(status.nr_rsrp());

    let (Some(pci), Some(band), Some(channel), Some(rsrp)) = (pci, band, channel, rsrp) else {
        tracing::trace!(
            pci = ?status.nr_pci(),
            band = ?status.nr_band(),
            channel = ?status.nr_channel(),
            rsrp = ?status.nr_rsrp(),
            "secondary suppressed: NSA enabled but gate failed"
        );
        return None;
    };

    Some(RadioContext {
        role: RadioRole::Secondary,
        pci,
        cell_id: status.nr_cell_id().or_else(|| status.lte_cell_id()),
        band: Some(band),
        channel: Some(channel),
        rsrp: Some(rsrp),
        rsrq: plausible_rsrq(status.nr_rsrq()),
        sinr: usable_sinr(status.nr_sinr()),
        carrier_bands: None,
        carrier_channels: None,
    })
}

/// Both contexts in emission order: anchor first, then secondary.
pub fn contexts(status: &RawStatus) -> Vec<RadioContext> {
    let carriers = CarrierList::parse(status.band_list().as_deref(), status.channel_list().as_deref());
    let anchor = carriers.anchor();

    let out: Vec<RadioContext> = [
        anchor_context(status, &carriers, anchor),
        secondary_context(status),
    ]
    .into_iter()
    .flatten()
    .collect();

    tracing::debug!(
        carriers = %carriers,
        anchor = ?anchor.map(|p| p.band.as_str()),
        contexts = out.len(),
        "radio contexts extracted"
    );
    out
}

/// Normalize one snapshot into 0–2 observations, all stamped with `time`.
pub fn observations(status: &RawStatus, time: DateTime<Utc>) -> Vec<Observation> {
    contexts(status)
        .iter()
        .map(|ctx| ctx.to_observation(time))
        .collect()
}
