use strum::IntoStaticStr;

use crate::error::ArchError;

/// AHI spectral bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr)]
#[rustfmt::skip]
pub enum Channel {
    B01, B02, B03, B04, B05, B06, B07, B08,
    B09, B10, B11, B12, B13, B14, B15, B16,
}

#[rustfmt::skip]
const CHANNEL_KEYS: [&str; 16] = [
    "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08",
    "B09", "B10", "B11", "B12", "B13", "B14", "B15", "B16",
];

/// Alias table: one row per channel, every accepted spelling mapping to
/// the canonical `B**` key. Includes the legacy `C**` names, bare band
/// numbers, central wavelengths and colloquial names.
#[rustfmt::skip]
const CHANNEL_ALIASES: [(&[&str], Channel); 16] = [
    (&["B01", "C01", "1", "01", "0.47", "0.46", "BLUE", "B"], Channel::B01),
    (&["B02", "C02", "2", "02", "0.51", "RED", "R"], Channel::B02),
    (&["B03", "C03", "3", "03", "0.64", "GREEN", "G"], Channel::B03),
    (&["B04", "C04", "4", "04", "0.86", "CIRRUS"], Channel::B04),
    (&["B05", "C05", "5", "05", "1.6", "SNOW/ICE"], Channel::B05),
    (&["B06", "C06", "6", "06", "2.3", "CLOUD PARTICLE SIZE", "CPS"], Channel::B06),
    (&["B07", "C07", "7", "07", "3.9", "IR SHORTWAVE WINDOW", "IR SHORTWAVE"], Channel::B07),
    (&["B08", "C08", "8", "08", "6.2", "UPPER-LEVEL WATER VAPOUR"], Channel::B08),
    (&["B09", "C09", "9", "09", "6.9", "7.0", "MID-LEVEL WATER VAPOUR"], Channel::B09),
    (&["B10", "C10", "10", "7.3", "LOWER-LEVEL WATER VAPOUR"], Channel::B10),
    (&["B11", "C11", "11", "8.6", "CLOUD-TOP PHASE", "CTP"], Channel::B11),
    (&["B12", "C12", "12", "9.6", "OZONE"], Channel::B12),
    (&["B13", "C13", "13", "10.4", "CLEAN IR LONGWAVE WINDOW", "CLEAN IR"], Channel::B13),
    (&["B14", "C14", "14", "11.2", "IR LONGWAVE WINDOW", "IR LONGWAVE"], Channel::B14),
    (&["B15", "C15", "15", "12.3", "12.4", "DIRTY LONGWAVE WINDOW", "DIRTY IR"], Channel::B15),
    (&["B16", "C16", "16", "13.3", "CO2 IR LONGWAVE", "CO2", "CO2 IR"], Channel::B16),
];

impl Channel {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        let upper = name.to_ascii_uppercase();
        for (aliases, channel) in &CHANNEL_ALIASES {
            if aliases.iter().any(|a| *a == upper) {
                return Ok(*channel);
            }
        }
        Err(ArchError::invalid(name, "channel", &CHANNEL_KEYS))
    }

    /// Resolve the exact 3-character token as it appears in L1b filenames.
    pub fn from_fname_token(token: &str) -> Option<Self> {
        CHANNEL_ALIASES
            .iter()
            .find(|(aliases, _)| aliases[0] == token)
            .map(|(_, channel)| *channel)
    }

    pub fn available() -> &'static [&'static str] {
        &CHANNEL_KEYS
    }
}
