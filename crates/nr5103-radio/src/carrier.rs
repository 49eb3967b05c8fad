//! # Carrier Aggregation List
//!
//! The modem reports everything it currently aggregates as two comma-separated
//! strings that are index-aligned with each other:
//!
//! ```text
//! INTF_Current_Band = "B20,B32,n1"
//! INTF_RFCN         = "6300,9919,..."
//! ```
//!
//! [`CarrierList`] turns them into explicit `(band, channel)` pairs so the
//! alignment is structural, and [`CarrierList::anchor`] picks the LTE band
//! that is actually carrying the connection.
//!
//! ## Anchor selection
//!
//! LTE bands are `B`-prefixed, NR bands `n`-prefixed. The first LTE entry in
//! device order is the anchor in practice, except that supplemental
//! downlink-only bands can be listed ahead of it and can never be a primary
//! cell. They are skipped unless nothing else is left.
//!
//! ```
//! use nr5103_radio::carrier::CarrierList;
//!
//! let list = CarrierList::parse(Some("B32,B20,n1"), Some("100,200,300"));
//! let anchor = list.anchor().unwrap();
//! assert_eq!(anchor.band, "B20");
//! assert_eq!(anchor.channel, "200");
//! ```

use std::fmt;

/// Band label prefix of the LTE family.
pub const LTE_BAND_PREFIX: &str = "B";

/// LTE supplemental downlink-only bands. Downlink capacity only; never an
/// anchor.
pub const LTE_SDL_ONLY: &[&str] = &["B29", "B32"];

// ─── Carrier Pair ───────────────────────────────────────────────────────────

/// One aggregated carrier. `channel` is empty when the modem listed the band
/// without a channel number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CarrierPair {
    pub band: String,
    pub channel: String,
}

impl CarrierPair {
    pub fn new(band: impl Into<String>, channel: impl Into<String>) -> Self {
        CarrierPair {
            band: band.into(),
            channel: channel.into(),
        }
    }

    pub fn is_lte(&self) -> bool {
        self.band.starts_with(LTE_BAND_PREFIX)
    }

    pub fn is_sdl_only(&self) -> bool {
        LTE_SDL_ONLY.contains(&self.band.as_str())
    }

    /// Channel number, if one was reported.
    pub fn channel(&self) -> Option<&str> {
        (!self.channel.is_empty()).then_some(self.channel.as_str())
    }
}

impl fmt::Display for CarrierPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            Some(channel) => write!(f, "{}@{}", self.band, channel),
            None => write!(f, "{}", self.band),
        }
    }
}

// ─── Carrier List ───────────────────────────────────────────────────────────

/// Carriers in device-reported order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierList {
    pairs: Vec<CarrierPair>,
}

impl CarrierList {
    /// Pair up the band and channel lists.
    ///
    /// Channel tokens keep their position, so a short or gappy channel list
    /// leaves the affected bands without a channel. Empty band tokens are
    /// dropped before pairing: a gap in the band list does shift, and the
    /// bands after it take the channels at their new index.
    pub fn parse(bands: Option<&str>, channels: Option<&str>) -> Self {
        let channels: Vec<&str> = channels
            .map(|list| list.split(',').map(str::trim).collect())
            .unwrap_or_default();

        let pairs = bands
            .into_iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|band| !band.is_empty())
            .enumerate()
            .map(|(i, band)| CarrierPair::new(band, channels.get(i).copied().unwrap_or("")))
            .collect();

        CarrierList { pairs }
    }

    pub fn pairs(&self) -> &[CarrierPair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CarrierPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The LTE anchor carrier.
    ///
    /// `None` only when no LTE band is listed at all. If every LTE band is
    /// SDL-only the first of them is returned, so a missing anchor band in
    /// the output always means "no LTE reported".
    pub fn anchor(&self) -> Option<&CarrierPair> {
        let mut lte = self.pairs.iter().filter(|p| p.is_lte());
        let first = lte.next()?;
        if !first.is_sdl_only() {
            return Some(first);
        }
        lte.find(|p| !p.is_sdl_only()).or(Some(first))
    }

    /// All band labels, comma-joined. `None` for an empty list.
    pub fn band_labels(&self) -> Option<String> {
        join_non_empty(self.pairs.iter().map(|p| p.band.as_str()))
    }

    /// All reported channel numbers, comma-joined. `None` when no band has a
    /// channel.
    pub fn channel_labels(&self) -> Option<String> {
        join_non_empty(self.pairs.iter().filter_map(CarrierPair::channel))
    }
}

impl<'a> IntoIterator for &'a CarrierList {
    type Item = &'a CarrierPair;
    type IntoIter = std::slice::Iter<'a, CarrierPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for CarrierList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{pair}")?;
        }
        Ok(())
    }
}

fn join_non_empty<'a>(labels: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = labels.collect::<Vec<_>>().join(",");
    (!joined.is_empty()).then_some(joined)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
