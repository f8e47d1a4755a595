use strum::IntoStaticStr;

use crate::error::ArchError;

/// Geostationary platforms served by the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Satellite {
    #[strum(serialize = "himawari-8")]
    Himawari8,
    #[strum(serialize = "himawari-9")]
    Himawari9,
}

const SATELLITE_KEYS: [&str; 2] = ["himawari-8", "himawari-9"];

impl Satellite {
    /// Resolve a user-supplied name (case-insensitive alias) to a
    /// canonical satellite.
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_uppercase().as_str() {
            "H8" | "H08" | "HIMAWARI8" | "HIMAWARI-8" => Ok(Satellite::Himawari8),
            "H9" | "H09" | "HIMAWARI9" | "HIMAWARI-9" => Ok(Satellite::Himawari9),
            _ => Err(ArchError::invalid(name, "satellite", &SATELLITE_KEYS)),
        }
    }

    /// Resolve the short platform token embedded in filenames
    /// ("H08" in L1b names, "h09" in L2 names).
    pub fn from_platform_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "H08" | "H8" => Some(Satellite::Himawari8),
            "H09" | "H9" => Some(Satellite::Himawari9),
            _ => None,
        }
    }

    /// Infer the satellite from any token of a full path.
    pub fn from_path(path: &str) -> Result<Self, ArchError> {
        let upper = path.to_ascii_uppercase();
        if ["HIMAWARI8", "HIMAWARI-8", "H08", "_H8_"]
            .iter()
            .any(|p| upper.contains(p))
        {
            Ok(Satellite::Himawari8)
        } else if ["HIMAWARI9", "HIMAWARI-9", "H09", "_H9_"]
            .iter()
            .any(|p| upper.contains(p))
        {
            Ok(Satellite::Himawari9)
        } else {
            Err(ArchError::decode(path, "satellite not derivable from path"))
        }
    }

    /// AWS open-data bucket holding this satellite's files.
    pub fn bucket_name(self) -> &'static str {
        match self {
            Satellite::Himawari8 => "noaa-himawari8",
            Satellite::Himawari9 => "noaa-himawari9",
        }
    }

    /// Directory name used when mirroring the bucket on local storage.
    pub fn local_dir_name(self) -> &'static str {
        match self {
            Satellite::Himawari8 => "HIMAWARI-8",
            Satellite::Himawari9 => "HIMAWARI-9",
        }
    }

    pub fn available() -> &'static [&'static str] {
        &SATELLITE_KEYS
    }
}
