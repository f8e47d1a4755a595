use chrono::Duration;
use strum::IntoStaticStr;

use crate::error::ArchError;

/// Spatial coverage region of an acquisition.
///
/// Each sector has a fixed revisit cadence, which also bounds the search
/// window used by the closest/previous/next queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Sector {
    #[strum(serialize = "FLDK")]
    FullDisk,
    #[strum(serialize = "Japan")]
    Japan,
    #[strum(serialize = "Target")]
    Target,
    #[strum(serialize = "Landmark")]
    Landmark,
}

const SECTOR_KEYS: [&str; 4] = ["FLDK", "Japan", "Target", "Landmark"];

impl Sector {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_uppercase().as_str() {
            "FLDK" | "FULL" | "FULLDISK" | "FULL DISK" | "F" => Ok(Sector::FullDisk),
            "JAPAN" | "JAPAN_AREA" | "JAPAN AREA" | "J" => Ok(Sector::Japan),
            "TARGET" | "TARGET_AREA" | "TARGET AREA" | "T" => Ok(Sector::Target),
            "LANDMARK" | "M" | "MESOSCALE" => Ok(Sector::Landmark),
            _ => Err(ArchError::invalid(name, "sector", &SECTOR_KEYS)),
        }
    }

    /// Interval between successive acquisitions of this sector.
    pub fn acquisition_cadence(self) -> Duration {
        match self {
            Sector::FullDisk => Duration::minutes(10),
            Sector::Japan | Sector::Target => Duration::seconds(150),
            Sector::Landmark => Duration::seconds(30),
        }
    }

    /// Observation duration assumed when the filename carries no end time.
    pub fn native_granularity(self) -> Duration {
        self.acquisition_cadence()
    }

    pub fn available() -> &'static [&'static str] {
        &SECTOR_KEYS
    }
}

/// Sub-region code within a sector that hosts more than one scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr)]
pub enum SceneAbbr {
    R1,
    R2,
    R3,
    R4,
    R5,
}

const SCENE_KEYS: [&str; 5] = ["R1", "R2", "R3", "R4", "R5"];

impl SceneAbbr {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_uppercase().as_str() {
            "R1" => Ok(SceneAbbr::R1),
            "R2" => Ok(SceneAbbr::R2),
            "R3" => Ok(SceneAbbr::R3),
            "R4" => Ok(SceneAbbr::R4),
            "R5" => Ok(SceneAbbr::R5),
            _ => Err(ArchError::invalid(name, "scene_abbr", &SCENE_KEYS)),
        }
    }

    /// Scenes hosted by a sector. FLDK hosts none: its files cover the
    /// whole disk and carry no scene token.
    pub fn valid_for(sector: Sector) -> &'static [SceneAbbr] {
        match sector {
            Sector::FullDisk => &[],
            Sector::Japan => &[SceneAbbr::R1, SceneAbbr::R2],
            Sector::Target => &[SceneAbbr::R3],
            Sector::Landmark => &[SceneAbbr::R4, SceneAbbr::R5],
        }
    }
}
