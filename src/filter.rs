//! Post-listing filters applied to decoded filenames.
//!
//! Storage listings are only as precise as the directory layout; the
//! final say on what a query returns happens here, on decoded metadata.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::{
    channel::Channel,
    checks, codec,
    error::ArchError,
    metadata::FileMetadata,
    product::ProductKey,
    sector::SceneAbbr,
};

/// Optional narrowing criteria for a file query.
///
/// Empty vectors mean "no filter on that axis". Time bounds are applied
/// with overlap semantics: a file is kept when its acquisition interval
/// overlaps the query window, see [`FilterSpec::matches`].
#[derive(Clone, Debug, Default)]
pub struct FilterSpec {
    pub channels: Vec<Channel>,
    pub scene_abbrs: Vec<SceneAbbr>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl FilterSpec {
    /// Time-window-only filter.
    pub fn window(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        FilterSpec {
            start_time: Some(start),
            end_time: Some(end),
            ..FilterSpec::default()
        }
    }

    /// Cross-check the filter axes against the queried product coordinates.
    pub fn validate(&self, key: ProductKey) -> Result<(), ArchError> {
        checks::check_channels(&self.channels, key.product)?;
        checks::check_scene_abbrs(&self.scene_abbrs, key.sector)?;
        Ok(())
    }

    /// Decide whether one decoded record passes the filter.
    ///
    /// A file is excluded on time only when its interval ends at or
    /// before the window start, or begins after the window end. A file
    /// ending exactly at the window start is excluded; one starting
    /// exactly at the window end is kept.
    pub fn matches(&self, info: &FileMetadata) -> bool {
        if !self.channels.is_empty() {
            match info.channel {
                Some(channel) if self.channels.contains(&channel) => {}
                Some(_) => return false,
                None => {}
            }
        }
        if !self.scene_abbrs.is_empty() {
            match info.scene_abbr {
                Some(scene) if self.scene_abbrs.contains(&scene) => {}
                Some(_) => return false,
                None => {}
            }
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if info.end_time <= start || info.start_time > end {
                return false;
            }
        }
        true
    }
}

/// Narrow an already-resolved result without touching storage.
///
/// Flat results stay flat; grouped results are filtered per group, and
/// groups left empty are dropped. Every path must decode.
pub fn filter_files(
    paths: &crate::metadata::SearchResult,
    spec: &FilterSpec,
) -> Result<crate::metadata::SearchResult, ArchError> {
    use crate::metadata::SearchResult;

    let keep = |list: &[String]| -> Result<Vec<String>, ArchError> {
        let mut kept = Vec::with_capacity(list.len());
        for path in list {
            if spec.matches(&codec::decode_path(path)?) {
                kept.push(path.clone());
            }
        }
        Ok(kept)
    };

    match paths {
        SearchResult::Flat(list) => Ok(SearchResult::Flat(keep(list)?)),
        SearchResult::Grouped(groups) => {
            let mut filtered = std::collections::BTreeMap::new();
            for (value, list) in groups {
                let kept = keep(list)?;
                if !kept.is_empty() {
                    filtered.insert(value.clone(), kept);
                }
            }
            Ok(SearchResult::Grouped(filtered))
        }
    }
}

/// Filter raw listing paths down to the queried product and criteria.
///
/// Paths whose names do not mention the queried product at all are
/// skipped silently; shared directories legitimately hold neighbors.
/// Names that do mention it but fail to decode are hard errors.
pub(crate) fn filter_paths(
    paths: Vec<String>,
    key: ProductKey,
    spec: &FilterSpec,
) -> Result<Vec<String>, ArchError> {
    let mut kept = Vec::with_capacity(paths.len());
    for path in paths {
        let fname = codec::basename(&path);
        let mentions_product = key
            .product
            .raw_spellings()
            .iter()
            .any(|spelling| fname.contains(spelling));
        if !mentions_product {
            continue;
        }
        let info = codec::decode_filename(fname, key.product_level, key.product)?;
        if info.sector != key.sector {
            // Landmark files share the Target directory; sector is only
            // decidable after decoding.
            continue;
        }
        if spec.matches(&info) {
            kept.push(path);
        }
    }
    Ok(kept)
}

/// Keep only the finest spatial resolution per acquisition.
///
/// Some bands are published at several grid spacings for the same start
/// time and segment; the coarser duplicates are dropped.
pub(crate) fn dedup_finest_resolution(paths: Vec<String>) -> Result<Vec<String>, ArchError> {
    type DedupKey = (NaiveDateTime, Option<Channel>, Option<u8>);
    let mut finest: HashMap<DedupKey, (u16, usize)> = HashMap::new();
    let mut decoded = Vec::with_capacity(paths.len());

    for (idx, path) in paths.iter().enumerate() {
        let info = codec::decode_path(path)?;
        let res = match info.spatial_res {
            Some(res) => res,
            None => {
                decoded.push(idx);
                continue;
            }
        };
        let key = (info.start_time, info.channel, info.segment_number);
        match finest.get_mut(&key) {
            Some(entry) if entry.0 <= res => {}
            Some(entry) => *entry = (res, idx),
            None => {
                finest.insert(key, (res, idx));
            }
        }
    }

    decoded.extend(finest.values().map(|(_, idx)| *idx));
    decoded.sort_unstable();
    Ok(decoded.into_iter().map(|idx| paths[idx].clone()).collect())
}
