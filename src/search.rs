//! Query engine over one satellite's archive.
//!
//! An [`Archive`] binds a storage backend to one validated product
//! coordinate and answers time-window, closest, latest and
//! previous/next-acquisition queries. All results are deterministic:
//! flat lists sort ascending by address, acquisition series sort
//! ascending by start time.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDateTime, Utc};
use log::debug;

use crate::{
    checks, codec,
    error::ArchError,
    filter::{self, FilterSpec},
    metadata::{self, GroupKey, SearchResult},
    paths::{self, ConnectionType},
    product::{Product, ProductKey, ProductLevel},
    sector::Sector,
    store::ObjectStore,
};

/// Consecutive acquisitions, ascending by start time, with the addresses
/// belonging to each.
pub type AcquisitionSeries = Vec<(NaiveDateTime, Vec<String>)>;

fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Products a satellite's archive currently publishes at one level,
/// discovered from the top-level directory listing.
pub fn available_online_products<S: ObjectStore>(
    store: &S,
    product_level: ProductLevel,
) -> Result<Vec<Product>, ArchError> {
    let mut products: Vec<Product> = vec![];
    for name in store.ls("")? {
        for (level, product) in paths::products_in_dir(&name) {
            if *level == product_level && !products.contains(product) {
                products.push(*product);
            }
        }
    }
    Ok(products)
}

#[derive(Clone)]
pub struct Archive<S> {
    store: S,
    key: ProductKey,
    connection: ConnectionType,
    clock: fn() -> NaiveDateTime,
}

impl<S: ObjectStore> Archive<S> {
    pub fn new(
        store: S,
        product_level: ProductLevel,
        product: Product,
        sector: Sector,
    ) -> Result<Self, ArchError> {
        let key = ProductKey::new(product_level, product, sector)?;
        Ok(Archive {
            store,
            key,
            connection: ConnectionType::Bucket,
            clock: utc_now,
        })
    }

    /// Render results with this connection type instead of `s3://`
    /// addresses.
    pub fn with_connection(mut self, connection: ConnectionType) -> Self {
        self.connection = connection;
        self
    }

    /// Replace the wall clock. Queries relative to "now" use this.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn satellite(&self) -> crate::satellite::Satellite {
        self.store.satellite()
    }

    pub fn product_key(&self) -> ProductKey {
        self.key
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    fn now_snapped(&self) -> NaiveDateTime {
        checks::snap_to_half_minute((self.clock)())
    }

    /// Cap an internally derived window end at the clock. Caller-supplied
    /// bounds are never clamped; a future bound from outside is an error.
    fn clamp_to_now(&self, end: NaiveDateTime) -> NaiveDateTime {
        end.min(self.now_snapped())
    }

    /// All files whose acquisition interval overlaps `[start, end]`,
    /// sorted ascending by address.
    pub fn find_files(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<Vec<String>, ArchError> {
        let found = self.search_window(start, end, spec)?;
        Ok(self.render(found))
    }

    /// Like [`Archive::find_files`], grouped by a metadata key.
    pub fn find_files_grouped(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        spec: &FilterSpec,
        group_by: GroupKey,
    ) -> Result<SearchResult, ArchError> {
        let found = self.search_window(start, end, spec)?;
        let groups = metadata::group_paths(&found, group_by)?;
        Ok(SearchResult::Grouped(
            groups
                .into_iter()
                .map(|(value, paths)| (value, self.render(paths)))
                .collect(),
        ))
    }

    /// Start time of the acquisition closest to `time`, looking one
    /// acquisition cadence to either side. Ties break toward the earlier
    /// acquisition.
    pub fn find_closest_start_time(
        &self,
        time: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<NaiveDateTime, ArchError> {
        let time = checks::snap_to_half_minute(time);
        let cadence = self.key.sector.acquisition_cadence();
        let starts =
            self.start_times_in(time - cadence, self.clamp_to_now(time + cadence), spec)?;
        starts
            .into_iter()
            .min_by_key(|start| {
                let offset = (*start - time).num_seconds().abs();
                // Earlier acquisition wins an exact tie.
                (offset, *start)
            })
            .ok_or_else(|| {
                ArchError::NotFound(format!(
                    "no '{:?}' acquisition within {}s of {}",
                    self.key.product,
                    cadence.num_seconds(),
                    time
                ))
            })
    }

    /// Start time of the most recent acquisition within `lookback` of
    /// now.
    pub fn find_latest_start_time(
        &self,
        lookback: Duration,
        spec: &FilterSpec,
    ) -> Result<NaiveDateTime, ArchError> {
        let now = self.now_snapped();
        let starts = self.start_times_in(now - lookback, now, spec)?;
        starts.into_iter().next_back().ok_or_else(|| {
            ArchError::NotFound(format!(
                "no '{:?}' acquisition in the last {}s",
                self.key.product,
                lookback.num_seconds()
            ))
        })
    }

    /// All files of the acquisition closest to `time`.
    pub fn find_closest_files(
        &self,
        time: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<Vec<String>, ArchError> {
        let time = checks::snap_to_half_minute(time);
        let closest = self.find_closest_start_time(time, spec)?;
        let cadence = self.key.sector.acquisition_cadence();
        let groups =
            self.acquisitions_in(time - cadence, self.clamp_to_now(time + cadence), spec)?;
        let paths = groups.get(&closest).cloned().unwrap_or_default();
        Ok(self.render(paths))
    }

    /// All files of the most recent acquisition within `lookback` of now.
    pub fn find_latest_files(
        &self,
        lookback: Duration,
        spec: &FilterSpec,
    ) -> Result<Vec<String>, ArchError> {
        let latest = self.find_latest_start_time(lookback, spec)?;
        let now = self.now_snapped();
        let groups = self.acquisitions_in(now - lookback, now, spec)?;
        let paths = groups.get(&latest).cloned().unwrap_or_default();
        Ok(self.render(paths))
    }

    /// The `n` acquisitions before the one anchored at `anchor_time`.
    ///
    /// The anchor must resolve to an actual acquisition. With
    /// `include_anchor` the anchor acquisition is part of the series and
    /// counts toward `n`. With `check_consistency` set, the series must
    /// contain exactly `n` acquisitions, be evenly spaced up to the
    /// anchor, and share a single acquisition mode.
    pub fn find_previous_files(
        &self,
        anchor_time: NaiveDateTime,
        n: usize,
        include_anchor: bool,
        check_consistency: bool,
        spec: &FilterSpec,
    ) -> Result<AcquisitionSeries, ArchError> {
        self.find_adjacent_files(anchor_time, n, include_anchor, check_consistency, spec, false)
    }

    /// The `n` acquisitions after the one anchored at `anchor_time`.
    pub fn find_next_files(
        &self,
        anchor_time: NaiveDateTime,
        n: usize,
        include_anchor: bool,
        check_consistency: bool,
        spec: &FilterSpec,
    ) -> Result<AcquisitionSeries, ArchError> {
        self.find_adjacent_files(anchor_time, n, include_anchor, check_consistency, spec, true)
    }

    fn find_adjacent_files(
        &self,
        anchor_time: NaiveDateTime,
        n: usize,
        include_anchor: bool,
        check_consistency: bool,
        spec: &FilterSpec,
        forward: bool,
    ) -> Result<AcquisitionSeries, ArchError> {
        if n == 0 {
            return Err(ArchError::InvalidArgument(
                "requested zero acquisitions".to_owned(),
            ));
        }
        let anchor_time = checks::snap_to_half_minute(anchor_time);
        let anchor = self.find_closest_start_time(anchor_time, spec)?;
        if check_consistency && anchor != anchor_time {
            return Err(ArchError::IrregularInterval(format!(
                "no acquisition starts exactly at {}; closest is {}",
                anchor_time, anchor
            )));
        }

        let cadence = self.key.sector.acquisition_cadence();
        let span = cadence * (n as i32 + 1);
        let (window_start, window_end) = if forward {
            (anchor, self.clamp_to_now(anchor + span))
        } else {
            (anchor - span, anchor)
        };
        let groups = self.acquisitions_in(window_start, window_end, spec)?;

        // The anchor counts toward n when it is part of the result.
        let wanted = if include_anchor { n - 1 } else { n };
        let mut selected: AcquisitionSeries = if forward {
            groups
                .into_iter()
                .filter(|(start, _)| *start > anchor)
                .take(wanted)
                .collect()
        } else {
            let mut before: Vec<_> = groups
                .into_iter()
                .filter(|(start, _)| *start < anchor)
                .collect();
            let keep = before.len().saturating_sub(wanted);
            before.split_off(keep)
        };

        let anchor_paths = self
            .acquisitions_in(anchor, anchor, spec)?
            .remove(&anchor)
            .unwrap_or_default();

        if check_consistency {
            if selected.len() < wanted {
                return Err(ArchError::InsufficientData(format!(
                    "requested {} acquisitions {} {}, found {}",
                    n,
                    if forward { "after" } else { "before" },
                    anchor,
                    selected.len() + include_anchor as usize
                )));
            }
            self.check_regular_spacing(&selected, anchor)?;
            // The anchor participates in the mode check even when it is
            // not part of the returned series.
            self.check_uniform_mode(selected.iter().chain(&[(anchor, anchor_paths.clone())]))?;
        }

        if include_anchor {
            let entry = (anchor, anchor_paths);
            if forward {
                selected.insert(0, entry);
            } else {
                selected.push(entry);
            }
        }

        Ok(selected
            .into_iter()
            .map(|(start, paths)| (start, self.render(paths)))
            .collect())
    }

    /// Every start time must sit one constant step from its neighbors,
    /// anchor included.
    fn check_regular_spacing(
        &self,
        series: &AcquisitionSeries,
        anchor: NaiveDateTime,
    ) -> Result<(), ArchError> {
        let mut starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        starts.push(anchor);
        starts.sort_unstable();
        let steps: BTreeSet<i64> = starts
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_seconds())
            .collect();
        if steps.len() > 1 {
            return Err(ArchError::IrregularInterval(format!(
                "acquisition spacing is not constant: steps of {:?} seconds",
                steps
            )));
        }
        Ok(())
    }

    /// All files in a series must share one acquisition mode: the
    /// processing version for L2 products, the segment count for L1b.
    fn check_uniform_mode<'a>(
        &self,
        series: impl IntoIterator<Item = &'a (NaiveDateTime, Vec<String>)>,
    ) -> Result<(), ArchError> {
        let mut modes = BTreeSet::new();
        for (_, paths) in series {
            for path in paths {
                let info = codec::decode_path(path)?;
                let mode = match self.key.product_level {
                    ProductLevel::L2 => info.version.unwrap_or_default(),
                    ProductLevel::L1b => info
                        .segment_total
                        .map(|total| total.to_string())
                        .unwrap_or_default(),
                };
                modes.insert(mode);
            }
        }
        if modes.len() > 1 {
            return Err(ArchError::IrregularInterval(format!(
                "mixed acquisition modes across the series: {:?}",
                modes
            )));
        }
        Ok(())
    }

    /// List, decode and filter everything overlapping `[start, end]`.
    /// Returns raw `s3://` addresses sorted ascending.
    fn search_window(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<Vec<String>, ArchError> {
        spec.validate(self.key)?;
        let (start, end) = checks::validate_window(start, end, (self.clock)())?;
        debug!(
            "searching {:?} {:?} from {} to {}",
            self.key.product, self.key.sector, start, end
        );

        let mut listed = vec![];
        for pattern in paths::glob_patterns(self.key, start, end) {
            listed.extend(self.store.glob(&pattern)?);
        }

        let effective = FilterSpec {
            start_time: Some(start),
            end_time: Some(end),
            ..spec.clone()
        };
        let mut found = filter::filter_paths(listed, self.key, &effective)?;
        if self.key.product_level == ProductLevel::L1b {
            found = filter::dedup_finest_resolution(found)?;
        }
        found.sort_unstable();
        Ok(found)
    }

    fn acquisitions_in(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<BTreeMap<NaiveDateTime, Vec<String>>, ArchError> {
        let found = self.search_window(start, end, spec)?;
        let mut groups: BTreeMap<NaiveDateTime, Vec<String>> = BTreeMap::new();
        for path in found {
            let info = codec::decode_path(&path)?;
            groups.entry(info.start_time).or_default().push(path);
        }
        Ok(groups)
    }

    fn start_times_in(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        spec: &FilterSpec,
    ) -> Result<BTreeSet<NaiveDateTime>, ArchError> {
        Ok(self
            .acquisitions_in(start, end, spec)?
            .into_iter()
            .map(|(start, _)| start)
            .collect())
    }

    fn render(&self, paths: Vec<String>) -> Vec<String> {
        paths
            .into_iter()
            .map(|path| paths::apply_connection(&path, self.connection))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::satellite::Satellite;
    use crate::store::mock::MockStore;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 11, 17).and_hms(h, m, s)
    }

    fn midnight_after() -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 11, 18).and_hms(0, 0, 0)
    }

    fn fldk_key(hhmm: &str, band: &str) -> String {
        format!(
            "AHI-L1b-FLDK/2021/11/17/{}/HS_H08_20211117_{}_{}_FLDK_R10_S0110.DAT.bz2",
            hhmm, hhmm, band
        )
    }

    fn fldk_archive(keys: &[String]) -> Archive<MockStore> {
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = MockStore::with_keys(Satellite::Himawari8, &refs);
        Archive::new(store, ProductLevel::L1b, Product::Rad, Sector::FullDisk)
            .unwrap()
            .with_clock(midnight_after)
    }

    #[test]
    fn find_files_is_sorted_and_window_bounded() {
        let keys = vec![
            fldk_key("1120", "B01"),
            fldk_key("1130", "B01"),
            fldk_key("1140", "B01"),
            fldk_key("1150", "B01"),
        ];
        let archive = fldk_archive(&keys);
        // Files cover [start, start+10min); 11:20's interval ends at
        // 11:30 and is excluded, 11:50 starts after the window end.
        let found = archive
            .find_files(ts(11, 30, 0), ts(11, 45, 0), &FilterSpec::default())
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0] < found[1]);
        assert!(found[0].contains("_1130_"));
        assert!(found[1].contains("_1140_"));
    }

    #[test]
    fn file_starting_exactly_at_window_end_is_kept() {
        let keys = vec![fldk_key("1140", "B01")];
        let archive = fldk_archive(&keys);
        let found = archive
            .find_files(ts(11, 30, 0), ts(11, 40, 0), &FilterSpec::default())
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn grouped_results_render_the_connection_type() {
        let keys = vec![fldk_key("1130", "B01"), fldk_key("1130", "B02")];
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = MockStore::with_keys(Satellite::Himawari8, &refs);
        let archive = Archive::new(store, ProductLevel::L1b, Product::Rad, Sector::FullDisk)
            .unwrap()
            .with_clock(midnight_after)
            .with_connection(ConnectionType::Https);
        let grouped = archive
            .find_files_grouped(
                ts(11, 30, 0),
                ts(11, 40, 0),
                &FilterSpec::default(),
                GroupKey::Channel,
            )
            .unwrap();
        let groups = match grouped {
            SearchResult::Grouped(groups) => groups,
            _ => unreachable!(),
        };
        assert_eq!(groups.len(), 2);
        for paths in groups.values() {
            assert!(paths[0].starts_with("https://noaa-himawari8.s3.amazonaws.com/"));
        }
    }

    #[test]
    fn a_window_reaching_into_the_future_is_rejected() {
        let keys = vec![fldk_key("1130", "B01")];
        let archive = fldk_archive(&keys)
            .with_clock(|| NaiveDate::from_ymd(2021, 11, 17).and_hms(12, 0, 0));
        let err = archive
            .find_files(ts(11, 30, 0), ts(13, 0, 0), &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::InvalidArgument(_)));
    }

    #[test]
    fn closest_start_time_breaks_ties_toward_earlier() {
        let keys = vec![fldk_key("1130", "B01"), fldk_key("1140", "B01")];
        let archive = fldk_archive(&keys);
        let closest = archive
            .find_closest_start_time(ts(11, 35, 0), &FilterSpec::default())
            .unwrap();
        assert_eq!(closest, ts(11, 30, 0));
    }

    #[test]
    fn closest_start_time_with_nothing_nearby_is_not_found() {
        let keys = vec![fldk_key("1130", "B01")];
        let archive = fldk_archive(&keys);
        let err = archive
            .find_closest_start_time(ts(15, 0, 0), &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::NotFound(_)));
    }

    #[test]
    fn latest_files_pick_the_newest_acquisition() {
        let keys = vec![
            fldk_key("1130", "B01"),
            fldk_key("1140", "B01"),
            fldk_key("1140", "B02"),
        ];
        let archive = fldk_archive(&keys).with_clock(|| {
            NaiveDate::from_ymd(2021, 11, 17).and_hms(12, 0, 0)
        });
        let latest = archive
            .find_latest_files(Duration::hours(1), &FilterSpec::default())
            .unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.iter().all(|p| p.contains("_1140_")));
    }

    #[test]
    fn previous_files_walk_backwards_from_the_anchor() {
        let keys = vec![
            fldk_key("1100", "B01"),
            fldk_key("1110", "B01"),
            fldk_key("1120", "B01"),
            fldk_key("1130", "B01"),
        ];
        let archive = fldk_archive(&keys);
        let series = archive
            .find_previous_files(ts(11, 30, 0), 2, false, true, &FilterSpec::default())
            .unwrap();
        let starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![ts(11, 10, 0), ts(11, 20, 0)]);
    }

    #[test]
    fn the_anchor_counts_toward_the_requested_total() {
        let keys = vec![
            fldk_key("1110", "B01"),
            fldk_key("1120", "B01"),
            fldk_key("1130", "B01"),
        ];
        let archive = fldk_archive(&keys);
        let series = archive
            .find_previous_files(ts(11, 30, 0), 2, true, true, &FilterSpec::default())
            .unwrap();
        let starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![ts(11, 20, 0), ts(11, 30, 0)]);
        assert_eq!(series[1].1.len(), 1);
    }

    #[test]
    fn the_anchor_can_complete_a_short_series() {
        // Only one acquisition precedes the anchor; with the anchor
        // included that still satisfies a request for two.
        let keys = vec![fldk_key("1120", "B01"), fldk_key("1130", "B01")];
        let archive = fldk_archive(&keys);
        let series = archive
            .find_previous_files(ts(11, 30, 0), 2, true, true, &FilterSpec::default())
            .unwrap();
        let starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![ts(11, 20, 0), ts(11, 30, 0)]);
    }

    #[test]
    fn next_files_with_anchor_lead_with_the_anchor() {
        let keys = vec![fldk_key("1130", "B01"), fldk_key("1140", "B01")];
        let archive = fldk_archive(&keys);
        let series = archive
            .find_next_files(ts(11, 30, 0), 2, true, true, &FilterSpec::default())
            .unwrap();
        let starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![ts(11, 30, 0), ts(11, 40, 0)]);
    }

    #[test]
    fn next_files_walk_forwards() {
        let keys = vec![
            fldk_key("1130", "B01"),
            fldk_key("1140", "B01"),
            fldk_key("1150", "B01"),
        ];
        let archive = fldk_archive(&keys);
        let series = archive
            .find_next_files(ts(11, 30, 0), 2, false, true, &FilterSpec::default())
            .unwrap();
        let starts: Vec<NaiveDateTime> = series.iter().map(|(start, _)| *start).collect();
        assert_eq!(starts, vec![ts(11, 40, 0), ts(11, 50, 0)]);
    }

    #[test]
    fn too_few_acquisitions_is_insufficient_data() {
        let keys = vec![fldk_key("1120", "B01"), fldk_key("1130", "B01")];
        let archive = fldk_archive(&keys);
        let err = archive
            .find_previous_files(ts(11, 30, 0), 3, false, true, &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::InsufficientData(_)));
    }

    #[test]
    fn a_gap_in_the_series_is_an_irregular_interval() {
        // 11:10 is missing: 11:00 and 11:20 are 20 minutes apart while
        // the anchor sits 10 minutes after 11:20.
        let keys = vec![
            fldk_key("1100", "B01"),
            fldk_key("1120", "B01"),
            fldk_key("1130", "B01"),
        ];
        let archive = fldk_archive(&keys);
        let err = archive
            .find_previous_files(ts(11, 30, 0), 2, false, true, &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::IrregularInterval(_)));
    }

    #[test]
    fn an_inexact_anchor_fails_consistency() {
        let keys = vec![fldk_key("1120", "B01"), fldk_key("1130", "B01")];
        let archive = fldk_archive(&keys);
        let err = archive
            .find_previous_files(ts(11, 33, 0), 1, false, true, &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::IrregularInterval(_)));
        // Without the consistency requirement the anchor snaps to the
        // closest acquisition and the query succeeds.
        let series = archive
            .find_previous_files(ts(11, 33, 0), 1, false, false, &FilterSpec::default())
            .unwrap();
        assert_eq!(series[0].0, ts(11, 20, 0));
    }

    #[test]
    fn mixed_l2_versions_fail_the_mode_check() {
        let keys = vec![
            "AHI-L2-FLDK-Clouds/2021/11/17/1130/AHI-CMSK_v1r1_h08_s202111171130000_e202111171140000_c202111171145000.nc".to_owned(),
            "AHI-L2-FLDK-Clouds/2021/11/17/1140/AHI-CMSK_v2r0_h08_s202111171140000_e202111171150000_c202111171155000.nc".to_owned(),
        ];
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = MockStore::with_keys(Satellite::Himawari8, &refs);
        let archive = Archive::new(store, ProductLevel::L2, Product::CMSK, Sector::FullDisk)
            .unwrap()
            .with_clock(midnight_after);
        let err = archive
            .find_next_files(ts(11, 30, 0), 1, false, true, &FilterSpec::default())
            .unwrap_err();
        assert!(matches!(err, ArchError::IrregularInterval(_)));
    }

    #[test]
    fn japan_window_yields_eight_acquisitions_of_two_channels() {
        let mut keys = vec![];
        for hhmm in &["1130", "1140", "1150"] {
            for obs in 1..=4 {
                for band in &["B01", "B02"] {
                    keys.push(format!(
                        "AHI-L1b-Japan/2021/11/17/{}/HS_H08_20211117_{}_{}_JP{:02}_R10_S0101.DAT.bz2",
                        hhmm, hhmm, band, obs
                    ));
                }
            }
        }
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = MockStore::with_keys(Satellite::Himawari8, &refs);
        let archive = Archive::new(store, ProductLevel::L1b, Product::Rad, Sector::Japan)
            .unwrap()
            .with_clock(midnight_after);

        let grouped = archive
            .find_files_grouped(
                ts(11, 30, 0),
                ts(11, 49, 30),
                &FilterSpec::default(),
                GroupKey::StartTime,
            )
            .unwrap();
        let groups = match grouped {
            SearchResult::Grouped(groups) => groups,
            _ => unreachable!(),
        };
        assert_eq!(groups.len(), 8);
        assert!(groups.values().all(|paths| paths.len() == 2));

        // A file starting exactly at the window end is kept, so closing
        // the window at 11:50 sharp admits the 11:50 slot as a ninth
        // group. The 11:49:30 end above keeps the window to the eight
        // slots the 2m30s cadence fits strictly inside 20 minutes.
        let grouped = archive
            .find_files_grouped(
                ts(11, 30, 0),
                ts(11, 50, 0),
                &FilterSpec::default(),
                GroupKey::StartTime,
            )
            .unwrap();
        let groups = match grouped {
            SearchResult::Grouped(groups) => groups,
            _ => unreachable!(),
        };
        assert_eq!(groups.len(), 9);
    }

    #[test]
    fn online_products_are_discovered_from_the_layout() {
        let store = MockStore::with_keys(
            Satellite::Himawari9,
            &[
                "AHI-L1b-FLDK/2021/11/17/1130/HS_H09_20211117_1130_B01_FLDK_R10_S0110.DAT.bz2",
                "AHI-L2-FLDK-Clouds/2021/11/17/1130/AHI-CMSK_v1r1_h09_s202111171130000_e202111171140000_c202111171145000.nc",
                "AHI-L2-FLDK-RainfallRate/2021/11/17/1130/AHI-RRQPE_v1r1_h09_s202111171130000_e202111171140000_c202111171145000.nc",
            ],
        );
        assert_eq!(
            available_online_products(&store, ProductLevel::L1b).unwrap(),
            vec![Product::Rad]
        );
        assert_eq!(
            available_online_products(&store, ProductLevel::L2).unwrap(),
            vec![Product::CMSK, Product::CHGT, Product::CPHS, Product::RRQPE]
        );
    }

    #[test]
    fn channel_filter_applies_to_every_query() {
        let keys = vec![
            fldk_key("1130", "B01"),
            fldk_key("1130", "B02"),
            fldk_key("1140", "B01"),
            fldk_key("1140", "B02"),
        ];
        let archive = fldk_archive(&keys);
        let spec = FilterSpec {
            channels: vec![Channel::B02],
            ..FilterSpec::default()
        };
        let closest = archive.find_closest_files(ts(11, 31, 0), &spec).unwrap();
        assert_eq!(closest.len(), 1);
        assert!(closest[0].contains("_B02_"));
    }
}
