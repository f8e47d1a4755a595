//! Input validation shared by the search and download front doors.
//!
//! All user-supplied times pass through here before touching storage:
//! flexible text formats are parsed, sub-second precision is dropped and
//! seconds are snapped to the archive's 30-second acquisition grid.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{
    channel::Channel,
    error::ArchError,
    product::Product,
    sector::{SceneAbbr, Sector},
};

/// Accepted textual time formats, tried in order.
const TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y%m%d%H%M%S",
    "%Y%m%d%H%M",
];

/// Parse a user-supplied time string. Bare dates mean midnight. The
/// result is already snapped to the 30-second grid.
pub fn parse_time(text: &str) -> Result<NaiveDateTime, ArchError> {
    let trimmed = text.trim();
    // Drop any fractional seconds; the grid has no use for them.
    let trimmed = trimmed.split('.').next().unwrap_or(trimmed);
    for fmt in &TIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(snap_to_half_minute(t));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(d.and_hms(0, 0, 0));
    }
    Err(ArchError::InvalidArgument(format!(
        "unparseable time '{}'. Accepted formats: {:?}",
        text, TIME_FORMATS
    )))
}

/// Snap a timestamp to the archive's 30-second acquisition grid.
///
/// Seconds past 45 roll forward to the next minute, seconds past 15 snap
/// to the half minute, anything earlier snaps to the whole minute.
/// Sub-second precision is discarded.
pub fn snap_to_half_minute(t: NaiveDateTime) -> NaiveDateTime {
    let t = t.with_nanosecond(0).unwrap_or(t);
    let s = t.second();
    if s > 45 {
        (t - Duration::seconds(i64::from(s))) + Duration::minutes(1)
    } else if s > 15 {
        t.with_second(30).unwrap_or(t)
    } else {
        t.with_second(0).unwrap_or(t)
    }
}

/// Validate a [start, end] acquisition window against the clock.
///
/// Both bounds are snapped first, and neither may lie in the future.
/// Queries relative to "now" derive their own window ends and cap them
/// at the clock before reaching this check.
pub fn validate_window(
    start: NaiveDateTime,
    end: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), ArchError> {
    let start = snap_to_half_minute(start);
    let end = snap_to_half_minute(end);
    let now = snap_to_half_minute(now);
    if start > end {
        return Err(ArchError::InvalidArgument(format!(
            "start_time '{}' is after end_time '{}'",
            start, end
        )));
    }
    if start > now {
        return Err(ArchError::InvalidArgument(format!(
            "start_time '{}' is in the future (now: '{}')",
            start, now
        )));
    }
    if end > now {
        return Err(ArchError::InvalidArgument(format!(
            "end_time '{}' is in the future (now: '{}')",
            end, now
        )));
    }
    Ok((start, end))
}

/// Channel filters only make sense for products published per band.
pub fn check_channels(channels: &[Channel], product: Product) -> Result<(), ArchError> {
    if !channels.is_empty() && !product.has_channels() {
        return Err(ArchError::InvalidArgument(format!(
            "product '{:?}' has no channels; drop the channel filter",
            product
        )));
    }
    Ok(())
}

/// Scene filters must name scenes the sector actually hosts.
pub fn check_scene_abbrs(scenes: &[SceneAbbr], sector: Sector) -> Result<(), ArchError> {
    let valid = SceneAbbr::valid_for(sector);
    if !scenes.is_empty() && valid.is_empty() {
        return Err(ArchError::InvalidArgument(format!(
            "sector '{:?}' hosts no scenes; drop the scene_abbr filter",
            sector
        )));
    }
    for scene in scenes {
        if !valid.contains(scene) {
            return Err(ArchError::InvalidArgument(format!(
                "scene_abbr '{:?}' is not valid for sector '{:?}'. Valid scenes: {:?}",
                scene, sector, valid
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(2021, 11, 17).and_hms(h, m, s)
    }

    #[test]
    fn seconds_snap_to_the_half_minute_grid() {
        assert_eq!(snap_to_half_minute(ts(11, 30, 0)), ts(11, 30, 0));
        assert_eq!(snap_to_half_minute(ts(11, 30, 10)), ts(11, 30, 0));
        assert_eq!(snap_to_half_minute(ts(11, 30, 22)), ts(11, 30, 30));
        assert_eq!(snap_to_half_minute(ts(11, 30, 45)), ts(11, 30, 30));
        assert_eq!(snap_to_half_minute(ts(11, 30, 58)), ts(11, 31, 0));
        assert_eq!(snap_to_half_minute(ts(11, 59, 58)), ts(12, 0, 0));
    }

    #[test]
    fn flexible_time_parsing() {
        assert_eq!(parse_time("2021-11-17 11:30:22").unwrap(), ts(11, 30, 30));
        assert_eq!(parse_time("2021-11-17T11:30").unwrap(), ts(11, 30, 0));
        assert_eq!(parse_time("202111171130").unwrap(), ts(11, 30, 0));
        assert_eq!(parse_time("2021-11-17").unwrap(), ts(0, 0, 0));
        assert!(parse_time("late november").is_err());
    }

    #[test]
    fn window_validation_rejects_disorder_and_future_bounds() {
        let now = ts(12, 0, 0);
        assert!(validate_window(ts(11, 40, 0), ts(11, 30, 0), now).is_err());
        assert!(validate_window(ts(12, 10, 0), ts(12, 20, 0), now).is_err());
        assert!(validate_window(ts(11, 30, 0), ts(13, 0, 0), now).is_err());
        let (start, end) = validate_window(ts(11, 30, 0), ts(12, 0, 0), now).unwrap();
        assert_eq!(start, ts(11, 30, 0));
        assert_eq!(end, now);
    }

    #[test]
    fn channel_filter_rejected_for_l2() {
        assert!(check_channels(&[Channel::B01], Product::CMSK).is_err());
        assert!(check_channels(&[Channel::B01], Product::Rad).is_ok());
        assert!(check_channels(&[], Product::CMSK).is_ok());
    }

    #[test]
    fn scene_filter_must_match_sector() {
        assert!(check_scene_abbrs(&[SceneAbbr::R3], Sector::Target).is_ok());
        assert!(check_scene_abbrs(&[SceneAbbr::R1], Sector::Target).is_err());
        assert!(check_scene_abbrs(&[SceneAbbr::R1], Sector::FullDisk).is_err());
    }
}
