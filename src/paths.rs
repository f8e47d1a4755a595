//! Archive directory layout and address rendering.
//!
//! The remote archive shards files by product directory and 10-minute
//! time bucket:
//!
//! `<bucket>/<product dir>/<YYYY>/<MM>/<DD>/<HHMM>/<fname>`
//!
//! where `HHMM` is the acquisition start floored to 10 minutes. A local
//! mirror uses the same relative layout under `<base_dir>/<SATELLITE>/`.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::{
    error::ArchError,
    product::{Product, ProductKey, ProductLevel},
    satellite::Satellite,
    sector::Sector,
};

/// How remote file addresses are rendered for the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionType {
    /// `s3://<bucket>/...` object addresses.
    Bucket,
    /// Plain https addresses on the bucket's website endpoint.
    Https,
    /// Https addresses with a `#mode=bytes` fragment for remote netCDF
    /// range reads.
    NcBytes,
}

const CONNECTION_KEYS: [&str; 3] = ["bucket", "https", "nc_bytes"];

impl ConnectionType {
    pub fn from_alias(name: &str) -> Result<Self, ArchError> {
        match name.to_ascii_lowercase().as_str() {
            "bucket" | "s3" => Ok(ConnectionType::Bucket),
            "https" | "http" => Ok(ConnectionType::Https),
            "nc_bytes" | "bytes" => Ok(ConnectionType::NcBytes),
            _ => Err(ArchError::invalid(name, "connection type", &CONNECTION_KEYS)),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &CONNECTION_KEYS
    }
}

/// Top-level product directory for a validated product coordinate.
///
/// Landmark acquisitions are published into the Target directory; the
/// split into sectors happens at decode time, not in the layout.
pub(crate) fn product_dir_name(key: ProductKey) -> &'static str {
    match key.product_level {
        ProductLevel::L1b => match key.sector {
            Sector::FullDisk => "AHI-L1b-FLDK",
            Sector::Japan => "AHI-L1b-Japan",
            Sector::Target | Sector::Landmark => "AHI-L1b-Target",
        },
        ProductLevel::L2 => match key.product {
            Product::RRQPE => "AHI-L2-FLDK-RainfallRate",
            _ => "AHI-L2-FLDK-Clouds",
        },
    }
}

/// Product coordinates published under a top-level archive directory.
/// The inverse of [`product_dir_name`], used for bucket discovery.
pub(crate) fn products_in_dir(name: &str) -> &'static [(ProductLevel, Product)] {
    match name {
        "AHI-L1b-FLDK" | "AHI-L1b-Japan" | "AHI-L1b-Target" => {
            &[(ProductLevel::L1b, Product::Rad)]
        }
        "AHI-L2-FLDK-Clouds" => &[
            (ProductLevel::L2, Product::CMSK),
            (ProductLevel::L2, Product::CHGT),
            (ProductLevel::L2, Product::CPHS),
        ],
        "AHI-L2-FLDK-RainfallRate" => &[(ProductLevel::L2, Product::RRQPE)],
        _ => &[],
    }
}

/// Floor a timestamp to its 10-minute bucket.
fn floor_to_bucket(t: NaiveDateTime) -> NaiveDateTime {
    let t = t.with_second(0).unwrap_or(t).with_nanosecond(0).unwrap_or(t);
    let extra = t.minute() % 10;
    t - Duration::minutes(i64::from(extra))
}

/// Relative time-bucket directory, `YYYY/MM/DD/HHMM`.
pub(crate) fn time_bucket_dir(t: NaiveDateTime) -> String {
    floor_to_bucket(t).format("%Y/%m/%d/%H%M").to_string()
}

/// All bucket directories whose files can overlap `[start, end]`.
///
/// One extra trailing bucket is included: a file starting in the last
/// bucket before `end` can extend past it, and the reverse holds for
/// observation-shifted sub-slot files.
pub(crate) fn bucket_dirs(start: NaiveDateTime, end: NaiveDateTime) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut t = floor_to_bucket(start);
    let last = floor_to_bucket(end) + Duration::minutes(10);
    while t <= last {
        dirs.push(t.format("%Y/%m/%d/%H%M").to_string());
        t += Duration::minutes(10);
    }
    dirs
}

/// Relative glob patterns covering a product over a time window, one per
/// time bucket.
pub(crate) fn glob_patterns(
    key: ProductKey,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<String> {
    let product_dir = product_dir_name(key);
    let leaf = key.product_level.fname_glob();
    bucket_dirs(start, end)
        .into_iter()
        .map(|bucket| format!("{}/{}/{}", product_dir, bucket, leaf))
        .collect()
}

/// Render a relative object key as a full `s3://` address.
pub(crate) fn s3_address(satellite: Satellite, rel: &str) -> String {
    format!("s3://{}/{}", satellite.bucket_name(), rel)
}

/// Re-render an `s3://` address for the requested connection type.
pub fn apply_connection(path: &str, connection: ConnectionType) -> String {
    match connection {
        ConnectionType::Bucket => path.to_owned(),
        ConnectionType::Https | ConnectionType::NcBytes => {
            let https = match path.strip_prefix("s3://") {
                Some(rest) => match rest.split_once('/') {
                    Some((bucket, key)) => {
                        format!("https://{}.s3.amazonaws.com/{}", bucket, key)
                    }
                    None => format!("https://{}.s3.amazonaws.com", rest),
                },
                None => path.to_owned(),
            };
            if connection == ConnectionType::NcBytes {
                format!("{}#mode=bytes", https)
            } else {
                https
            }
        }
    }
}

/// Strip the bucket address, leaving the relative object key.
pub fn remove_bucket_address(path: &str) -> &str {
    let path = path.split('#').next().unwrap_or(path);
    for prefix in &["s3://", "https://"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return match rest.split_once('/') {
                Some((_, key)) => key,
                None => "",
            };
        }
    }
    path
}

/// Local mirror path for a remote object key.
pub(crate) fn local_path(base_dir: &Path, satellite: Satellite, remote: &str) -> PathBuf {
    let rel = remove_bucket_address(remote);
    let mut path = base_dir.join(satellite.local_dir_name());
    for part in rel.split('/') {
        path.push(part);
    }
    path
}
