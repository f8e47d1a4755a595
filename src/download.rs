//! Concurrent transfer of archive files to a local mirror.
//!
//! Transfers run on a thread pool and report per-file outcomes; one
//! failed object never aborts the batch. The local layout mirrors the
//! remote bucket under `<base_dir>/<SATELLITE>/`, so a [`LocalStore`]
//! pointed at the same base directory can search what was downloaded.
//!
//! [`LocalStore`]: crate::store::LocalStore

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use crossbeam_channel as channel;
use log::{info, warn};
use threadpool::ThreadPool;

use crate::{
    error::ArchError,
    filter::FilterSpec,
    paths,
    search::Archive,
    store::ObjectStore,
};

/// Hard ceiling on transfer concurrency, to stay polite to the bucket.
const MAX_WORKERS: usize = 50;

#[derive(Clone, Debug)]
pub struct DownloadOptions {
    /// Number of parallel transfer workers, capped at 50.
    pub n_workers: usize,
    /// Re-download files that already exist locally.
    pub force: bool,
    /// Compare local and remote sizes; purge and re-fetch mismatches.
    pub check_integrity: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            n_workers: 20,
            force: false,
            check_integrity: true,
        }
    }
}

/// Outcome of one batch transfer.
///
/// `local_paths` holds every file confirmed present locally, including
/// ones skipped because they already existed. `failed` holds the
/// addresses that could not be transferred, with the reason.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub local_paths: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Transfer a batch of remote addresses into the local mirror.
pub fn download_files<S: ObjectStore>(
    store: &S,
    remote_paths: &[String],
    base_dir: &Path,
    options: &DownloadOptions,
) -> Result<DownloadReport, ArchError> {
    if !base_dir.is_dir() {
        return Err(ArchError::Configuration(format!(
            "download base directory '{}' does not exist",
            base_dir.display()
        )));
    }
    if remote_paths.is_empty() {
        return Ok(DownloadReport::default());
    }

    let n_workers = options.n_workers.max(1).min(MAX_WORKERS);
    let pool = ThreadPool::new(n_workers.min(remote_paths.len()));
    let (to_main, from_workers) = channel::bounded(n_workers);

    for remote in remote_paths {
        let local = paths::local_path(base_dir, store.satellite(), remote);
        let store = store.clone();
        let remote = remote.clone();
        let options = options.clone();
        let to_main = to_main.clone();
        pool.execute(move || {
            let outcome = fetch_one(&store, &remote, &local, &options);
            to_main.send((remote, outcome)).expect("main thread hung up");
        });
    }
    drop(to_main);

    let mut report = DownloadReport::default();
    for (remote, outcome) in from_workers {
        match outcome {
            Ok(local) => report.local_paths.push(local),
            Err(err) => {
                warn!("failed to fetch {}: {}", remote, err);
                report.failed.push((remote, err.to_string()));
            }
        }
    }
    pool.join();

    report.local_paths.sort_unstable();
    report.failed.sort_unstable();
    info!(
        "transferred {} files, {} failures",
        report.local_paths.len(),
        report.failed.len()
    );
    Ok(report)
}

/// Bring one remote object to its local mirror path.
fn fetch_one<S: ObjectStore>(
    store: &S,
    remote: &str,
    local: &Path,
    options: &DownloadOptions,
) -> Result<PathBuf, ArchError> {
    if local.is_file() && !options.force {
        if !options.check_integrity {
            return Ok(local.to_owned());
        }
        let expected = store.object_size(remote)?;
        let actual = fs::metadata(local)?.len();
        match expected {
            Some(expected) if expected != actual => {
                warn!(
                    "purging {}: {} bytes on disk, {} remote",
                    local.display(),
                    actual,
                    expected
                );
                fs::remove_file(local)?;
            }
            _ => return Ok(local.to_owned()),
        }
    }

    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = store.retrieve(remote)?;
    fs::write(local, &bytes)?;

    if options.check_integrity {
        if let Some(expected) = store.object_size(remote)? {
            if expected != bytes.len() as u64 {
                fs::remove_file(local)?;
                return Err(ArchError::Storage(format!(
                    "size mismatch for '{}': wrote {} bytes, remote reports {}",
                    remote,
                    bytes.len(),
                    expected
                )));
            }
        }
    }
    Ok(local.to_owned())
}

/// Find and transfer all files overlapping `[start, end]`.
pub fn download_window<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    start: NaiveDateTime,
    end: NaiveDateTime,
    spec: &FilterSpec,
    options: &DownloadOptions,
) -> Result<DownloadReport, ArchError> {
    let found = archive.find_files(start, end, spec)?;
    download_files(archive.store(), &found, base_dir, options)
}

/// Find and transfer the acquisition closest to `time`.
pub fn download_closest_files<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    time: NaiveDateTime,
    spec: &FilterSpec,
    options: &DownloadOptions,
) -> Result<DownloadReport, ArchError> {
    let found = archive.find_closest_files(time, spec)?;
    download_files(archive.store(), &found, base_dir, options)
}

/// Find and transfer the most recent acquisition within `lookback` of
/// now.
pub fn download_latest_files<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    lookback: chrono::Duration,
    spec: &FilterSpec,
    options: &DownloadOptions,
) -> Result<DownloadReport, ArchError> {
    let found = archive.find_latest_files(lookback, spec)?;
    download_files(archive.store(), &found, base_dir, options)
}

/// Find and transfer the `n` acquisitions before the anchor, one report
/// per acquisition.
#[allow(clippy::too_many_arguments)]
pub fn download_previous_files<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    anchor_time: NaiveDateTime,
    n: usize,
    include_anchor: bool,
    check_consistency: bool,
    spec: &FilterSpec,
    options: &DownloadOptions,
) -> Result<Vec<(NaiveDateTime, DownloadReport)>, ArchError> {
    let series =
        archive.find_previous_files(anchor_time, n, include_anchor, check_consistency, spec)?;
    download_series(archive, base_dir, series, options)
}

/// Find and transfer the `n` acquisitions after the anchor, one report
/// per acquisition.
#[allow(clippy::too_many_arguments)]
pub fn download_next_files<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    anchor_time: NaiveDateTime,
    n: usize,
    include_anchor: bool,
    check_consistency: bool,
    spec: &FilterSpec,
    options: &DownloadOptions,
) -> Result<Vec<(NaiveDateTime, DownloadReport)>, ArchError> {
    let series =
        archive.find_next_files(anchor_time, n, include_anchor, check_consistency, spec)?;
    download_series(archive, base_dir, series, options)
}

fn download_series<S: ObjectStore>(
    archive: &Archive<S>,
    base_dir: &Path,
    series: Vec<(NaiveDateTime, Vec<String>)>,
    options: &DownloadOptions,
) -> Result<Vec<(NaiveDateTime, DownloadReport)>, ArchError> {
    let mut reports = Vec::with_capacity(series.len());
    for (start, found) in series {
        let report = download_files(archive.store(), &found, base_dir, options)?;
        reports.push((start, report));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::satellite::Satellite;
    use crate::store::mock::MockStore;

    const KEYS: [&str; 5] = [
        "AHI-L1b-FLDK/2021/11/17/1130/HS_H08_20211117_1130_B01_FLDK_R10_S0110.DAT.bz2",
        "AHI-L1b-FLDK/2021/11/17/1130/HS_H08_20211117_1130_B01_FLDK_R10_S0210.DAT.bz2",
        "AHI-L1b-FLDK/2021/11/17/1130/HS_H08_20211117_1130_B02_FLDK_R10_S0110.DAT.bz2",
        "AHI-L1b-FLDK/2021/11/17/1130/HS_H08_20211117_1130_B02_FLDK_R10_S0210.DAT.bz2",
        "AHI-L1b-FLDK/2021/11/17/1130/HS_H08_20211117_1130_B03_FLDK_R05_S0110.DAT.bz2",
    ];

    fn addresses() -> Vec<String> {
        KEYS.iter()
            .map(|key| format!("s3://noaa-himawari8/{}", key))
            .collect()
    }

    #[test]
    fn batch_download_mirrors_the_remote_layout() {
        let store = MockStore::with_keys(Satellite::Himawari8, &KEYS);
        let dir = tempfile::tempdir().unwrap();
        let report =
            download_files(&store, &addresses(), dir.path(), &DownloadOptions::default())
                .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.local_paths.len(), 5);
        for local in &report.local_paths {
            assert!(local.starts_with(dir.path().join("HIMAWARI-8/AHI-L1b-FLDK")));
            assert!(local.is_file());
        }
    }

    #[test]
    fn one_bad_object_does_not_abort_the_batch() {
        let store = MockStore::with_keys(Satellite::Himawari8, &KEYS).failing(&[KEYS[2]]);
        let dir = tempfile::tempdir().unwrap();
        let report =
            download_files(&store, &addresses(), dir.path(), &DownloadOptions::default())
                .unwrap();
        assert_eq!(report.local_paths.len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.contains("B02_FLDK_R10_S0110"));
    }

    #[test]
    fn existing_files_are_skipped_unless_forced() {
        let store = MockStore::with_keys(Satellite::Himawari8, &KEYS);
        let dir = tempfile::tempdir().unwrap();
        let options = DownloadOptions::default();
        let first = download_files(&store, &addresses(), dir.path(), &options).unwrap();
        let second = download_files(&store, &addresses(), dir.path(), &options).unwrap();
        assert_eq!(first.local_paths, second.local_paths);
    }

    #[test]
    fn corrupt_local_files_are_purged_and_refetched() {
        let store = MockStore::with_keys(Satellite::Himawari8, &KEYS);
        let dir = tempfile::tempdir().unwrap();
        let options = DownloadOptions::default();
        let first = download_files(&store, &addresses(), dir.path(), &options).unwrap();

        let victim = &first.local_paths[0];
        fs::write(victim, b"truncated").unwrap();

        let second = download_files(&store, &addresses(), dir.path(), &options).unwrap();
        assert!(second.is_complete());
        let restored = fs::read(victim).unwrap();
        assert_ne!(restored, b"truncated");
    }

    #[test]
    fn missing_base_directory_is_a_configuration_error() {
        let store = MockStore::with_keys(Satellite::Himawari8, &KEYS);
        let err = download_files(
            &store,
            &addresses(),
            Path::new("/nonexistent/base"),
            &DownloadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ArchError::Configuration(_)));
    }
}
