use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use strum::IntoStaticStr;

use crate::{
    channel::Channel,
    codec,
    error::ArchError,
    product::{Product, ProductLevel},
    satellite::Satellite,
    sector::{SceneAbbr, Sector},
};

/// Decoded record for one archived file.
///
/// All fields are derived from the filename alone; nothing here requires
/// reading file contents.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMetadata {
    pub satellite: Satellite,
    pub product_level: ProductLevel,
    pub product: Product,
    pub sector: Sector,
    pub scene_abbr: Option<SceneAbbr>,
    pub channel: Option<Channel>,
    /// Grid spacing in hundreds of meters (5, 10, 20). L1b only.
    pub spatial_res: Option<u16>,
    pub segment_number: Option<u8>,
    pub segment_total: Option<u8>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub production_time: Option<NaiveDateTime>,
    /// L2 processing version token ("v1r1"). Used as the acquisition-mode
    /// descriptor in consistency checks.
    pub version: Option<String>,
}

/// Metadata field a search result can be grouped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum GroupKey {
    #[strum(serialize = "product")]
    Product,
    #[strum(serialize = "sector")]
    Sector,
    #[strum(serialize = "scene_abbr")]
    SceneAbbr,
    #[strum(serialize = "channel")]
    Channel,
    #[strum(serialize = "platform_shortname")]
    PlatformShortname,
    #[strum(serialize = "start_time")]
    StartTime,
    #[strum(serialize = "end_time")]
    EndTime,
    #[strum(serialize = "production_time")]
    ProductionTime,
    #[strum(serialize = "spatial_res")]
    SpatialRes,
    #[strum(serialize = "segment_number")]
    SegmentNumber,
    #[strum(serialize = "segment_total")]
    SegmentTotal,
}

const GROUP_KEYS: [&str; 11] = [
    "product",
    "sector",
    "scene_abbr",
    "channel",
    "platform_shortname",
    "start_time",
    "end_time",
    "production_time",
    "spatial_res",
    "segment_number",
    "segment_total",
];

impl GroupKey {
    pub fn from_name(name: &str) -> Result<Self, ArchError> {
        match name {
            "product" => Ok(GroupKey::Product),
            "sector" => Ok(GroupKey::Sector),
            "scene_abbr" => Ok(GroupKey::SceneAbbr),
            "channel" => Ok(GroupKey::Channel),
            "platform_shortname" => Ok(GroupKey::PlatformShortname),
            "start_time" => Ok(GroupKey::StartTime),
            "end_time" => Ok(GroupKey::EndTime),
            "production_time" => Ok(GroupKey::ProductionTime),
            "spatial_res" => Ok(GroupKey::SpatialRes),
            "segment_number" => Ok(GroupKey::SegmentNumber),
            "segment_total" => Ok(GroupKey::SegmentTotal),
            _ => Err(ArchError::invalid(name, "group key", &GROUP_KEYS)),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &GROUP_KEYS
    }
}

/// Value of a grouping key. Ordered so that temporal keys sort
/// chronologically and everything else lexically/numerically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Time(NaiveDateTime),
    Int(u32),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyValue::Time(t) => write!(f, "{}", t),
            KeyValue::Int(n) => write!(f, "{}", n),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl FileMetadata {
    /// Project one grouping key out of the record. Returns an error when
    /// the key is not derivable for this product family (e.g. `channel`
    /// for an L2 file).
    pub fn key_value(&self, key: GroupKey) -> Result<KeyValue, ArchError> {
        let missing = |name: &str| {
            ArchError::InvalidArgument(format!(
                "key '{}' is not derivable for product '{:?}' files",
                name, self.product
            ))
        };
        match key {
            GroupKey::Product => {
                let name: &'static str = self.product.into();
                Ok(KeyValue::Text(name.to_owned()))
            }
            GroupKey::Sector => {
                let name: &'static str = self.sector.into();
                Ok(KeyValue::Text(name.to_owned()))
            }
            GroupKey::SceneAbbr => self
                .scene_abbr
                .map(|s| {
                    let name: &'static str = s.into();
                    KeyValue::Text(name.to_owned())
                })
                .ok_or_else(|| missing("scene_abbr")),
            GroupKey::Channel => self
                .channel
                .map(|c| {
                    let name: &'static str = c.into();
                    KeyValue::Text(name.to_owned())
                })
                .ok_or_else(|| missing("channel")),
            GroupKey::PlatformShortname => {
                let name: &'static str = self.satellite.into();
                Ok(KeyValue::Text(name.to_owned()))
            }
            GroupKey::StartTime => Ok(KeyValue::Time(self.start_time)),
            GroupKey::EndTime => Ok(KeyValue::Time(self.end_time)),
            GroupKey::ProductionTime => self
                .production_time
                .map(KeyValue::Time)
                .ok_or_else(|| missing("production_time")),
            GroupKey::SpatialRes => self
                .spatial_res
                .map(|r| KeyValue::Int(u32::from(r)))
                .ok_or_else(|| missing("spatial_res")),
            GroupKey::SegmentNumber => self
                .segment_number
                .map(|n| KeyValue::Int(u32::from(n)))
                .ok_or_else(|| missing("segment_number")),
            GroupKey::SegmentTotal => self
                .segment_total
                .map(|n| KeyValue::Int(u32::from(n)))
                .ok_or_else(|| missing("segment_total")),
        }
    }
}

/// Resolved search output: either a flat ordered path list or a grouped
/// mapping from key value to the paths sharing it.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResult {
    Flat(Vec<String>),
    Grouped(BTreeMap<KeyValue, Vec<String>>),
}

impl SearchResult {
    pub fn len(&self) -> usize {
        match self {
            SearchResult::Flat(paths) => paths.len(),
            SearchResult::Grouped(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group a flat path list by a metadata key.
///
/// Group keys are sorted ascending; for temporal keys that is
/// chronological order. Grouping an already grouped result is rejected:
/// re-grouping is only defined over flat lists.
pub fn group_files(paths: &SearchResult, key: GroupKey) -> Result<SearchResult, ArchError> {
    let paths = match paths {
        SearchResult::Flat(paths) => paths,
        SearchResult::Grouped(_) => {
            return Err(ArchError::InvalidArgument(
                "cannot group an already grouped result; pass a flat path list".to_owned(),
            ))
        }
    };
    Ok(SearchResult::Grouped(group_paths(paths, key)?))
}

/// Group bare paths by key; used internally by the search engine.
pub(crate) fn group_paths(
    paths: &[String],
    key: GroupKey,
) -> Result<BTreeMap<KeyValue, Vec<String>>, ArchError> {
    let mut groups: BTreeMap<KeyValue, Vec<String>> = BTreeMap::new();
    for path in paths {
        let info = codec::decode_path(path)?;
        let value = info.key_value(key)?;
        groups.entry(value).or_default().push(path.clone());
    }
    Ok(groups)
}

/// Extract one metadata field per path by re-decoding each filename.
/// Pure projection; never touches storage.
pub fn get_key_from_paths(paths: &SearchResult, key: GroupKey) -> Result<Vec<KeyValue>, ArchError> {
    match paths {
        SearchResult::Flat(paths) => paths
            .iter()
            .map(|p| codec::decode_path(p)?.key_value(key))
            .collect(),
        SearchResult::Grouped(groups) => groups
            .values()
            .flatten()
            .map(|p| codec::decode_path(p)?.key_value(key))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L1B_A: &str = "HS_H08_20211117_1130_B01_FLDK_R10_S0110.DAT.bz2";
    const L1B_B: &str = "HS_H08_20211117_1130_B02_FLDK_R20_S0110.DAT.bz2";
    const L1B_C: &str = "HS_H08_20211117_1140_B01_FLDK_R10_S0110.DAT.bz2";

    fn flat(names: &[&str]) -> SearchResult {
        SearchResult::Flat(names.iter().map(|n| (*n).to_owned()).collect())
    }

    #[test]
    fn group_by_start_time_sorts_chronologically() {
        let grouped = group_files(&flat(&[L1B_C, L1B_A, L1B_B]), GroupKey::StartTime).unwrap();
        let groups = match grouped {
            SearchResult::Grouped(g) => g,
            _ => unreachable!(),
        };
        let keys: Vec<&KeyValue> = groups.keys().collect();
        assert_eq!(groups.len(), 2);
        assert!(keys[0] < keys[1]);
        assert_eq!(groups.values().next().unwrap().len(), 2);
    }

    #[test]
    fn grouping_a_grouped_result_is_rejected() {
        let grouped = group_files(&flat(&[L1B_A, L1B_B]), GroupKey::StartTime).unwrap();
        let err = group_files(&grouped, GroupKey::Channel).unwrap_err();
        assert!(matches!(err, ArchError::InvalidArgument(_)));
    }

    #[test]
    fn key_extraction_is_a_pure_projection() {
        let channels = get_key_from_paths(&flat(&[L1B_A, L1B_B]), GroupKey::Channel).unwrap();
        assert_eq!(
            channels,
            vec![
                KeyValue::Text("B01".to_owned()),
                KeyValue::Text("B02".to_owned())
            ]
        );
    }

    #[test]
    fn unknown_group_key_lists_vocabulary() {
        let err = GroupKey::from_name("scan_mode").unwrap_err();
        assert!(err.to_string().contains("start_time"));
    }

    #[test]
    fn underivable_key_errors() {
        let l2 = "AHI-CMSK_v1r1_h09_s202111171130220_e202111171139400_c202111171145220.nc";
        let err = get_key_from_paths(&flat(&[l2]), GroupKey::Channel).unwrap_err();
        assert!(err.to_string().contains("channel"));
    }
}
