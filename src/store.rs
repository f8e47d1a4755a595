//! Storage backends the archive can search.
//!
//! A backend resolves relative glob patterns against one satellite's
//! archive root and hands back full addresses plus object bytes. The
//! search and download layers are written against the trait so the same
//! queries run over the remote bucket, a local mirror, or a test double.

use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::{error::ArchError, satellite::Satellite};

pub trait ObjectStore: Clone + Send + 'static {
    /// Satellite whose archive this store serves.
    fn satellite(&self) -> Satellite;

    /// Expand a relative pattern (`<product dir>/<Y>/<m>/<d>/<HHMM>/<leaf glob>`)
    /// into full addresses, sorted ascending. A missing directory is an
    /// empty listing, not an error.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, ArchError>;

    /// Fetch one object's bytes.
    fn retrieve(&self, address: &str) -> Result<Vec<u8>, ArchError>;

    /// Size in bytes of one object, if the backend can report it.
    fn object_size(&self, address: &str) -> Result<Option<u64>, ArchError>;

    /// Immediate children of a relative directory, sorted: file names and
    /// subdirectory names without a trailing separator. The empty string
    /// lists the archive root. A missing directory is an empty listing.
    fn ls(&self, dir: &str) -> Result<Vec<String>, ArchError>;

    /// Whether a relative directory exists in the archive.
    fn isdir(&self, dir: &str) -> Result<bool, ArchError> {
        Ok(!self.ls(dir)?.is_empty())
    }
}

/// Shell-style `*` match against a single path component.
pub(crate) fn leaf_matches(pattern: &str, name: &str) -> bool {
    fn matches(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..])),
            (Some(pc), Some(nc)) if pc == nc => matches(&p[1..], &n[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), name.as_bytes())
}

/// Archive mirrored on the local filesystem under
/// `<base_dir>/<SATELLITE>/`, laid out like the remote bucket.
#[derive(Clone, Debug)]
pub struct LocalStore {
    base_dir: PathBuf,
    satellite: Satellite,
}

impl LocalStore {
    pub fn new(base_dir: impl Into<PathBuf>, satellite: Satellite) -> Result<Self, ArchError> {
        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(ArchError::Configuration(format!(
                "archive base directory '{}' does not exist",
                base_dir.display()
            )));
        }
        Ok(LocalStore {
            base_dir,
            satellite,
        })
    }
}

impl LocalStore {
    fn resolve(&self, dir: &str) -> PathBuf {
        let mut root = self.base_dir.join(self.satellite.local_dir_name());
        for part in dir.split('/').filter(|part| !part.is_empty()) {
            root.push(part);
        }
        root
    }
}

impl ObjectStore for LocalStore {
    fn satellite(&self) -> Satellite {
        self.satellite
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, ArchError> {
        let (dir, leaf) = match pattern.rsplit_once('/') {
            Some(split) => split,
            None => ("", pattern),
        };
        let root = self.resolve(dir);
        if !root.is_dir() {
            debug!("no local directory {}", root.display());
            return Ok(vec![]);
        }

        let mut found = vec![];
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if entry.path().is_file() && leaf_matches(leaf, &name) {
                found.push(entry.path().to_string_lossy().into_owned());
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    fn retrieve(&self, address: &str) -> Result<Vec<u8>, ArchError> {
        Ok(fs::read(address)?)
    }

    fn object_size(&self, address: &str) -> Result<Option<u64>, ArchError> {
        Ok(Some(fs::metadata(address)?.len()))
    }

    fn ls(&self, dir: &str) -> Result<Vec<String>, ArchError> {
        let root = self.resolve(dir);
        if !root.is_dir() {
            return Ok(vec![]);
        }
        let mut names = vec![];
        for entry in fs::read_dir(&root)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort_unstable();
        Ok(names)
    }

    fn isdir(&self, dir: &str) -> Result<bool, ArchError> {
        Ok(self.resolve(dir).is_dir())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory store used by the search and download tests.

    use std::collections::{BTreeMap, HashSet};
    use std::sync::Arc;

    use super::*;
    use crate::paths;

    #[derive(Clone, Default)]
    pub struct MockStore {
        satellite: Option<Satellite>,
        objects: Arc<BTreeMap<String, Vec<u8>>>,
        failing: Arc<HashSet<String>>,
    }

    impl MockStore {
        /// Build a store of empty-bodied objects from relative keys.
        pub fn with_keys(satellite: Satellite, keys: &[&str]) -> Self {
            let objects = keys
                .iter()
                .map(|k| ((*k).to_owned(), format!("data:{}", k).into_bytes()))
                .collect();
            MockStore {
                satellite: Some(satellite),
                objects: Arc::new(objects),
                failing: Arc::default(),
            }
        }

        /// Mark relative keys whose retrieval should fail.
        pub fn failing(mut self, keys: &[&str]) -> Self {
            self.failing = Arc::new(keys.iter().map(|k| (*k).to_owned()).collect());
            self
        }

        fn rel(&self, address: &str) -> String {
            paths::remove_bucket_address(address).to_owned()
        }
    }

    impl ObjectStore for MockStore {
        fn satellite(&self) -> Satellite {
            self.satellite.unwrap_or(Satellite::Himawari8)
        }

        fn glob(&self, pattern: &str) -> Result<Vec<String>, ArchError> {
            let (dir, leaf) = pattern.rsplit_once('/').unwrap_or(("", pattern));
            let prefix = format!("{}/", dir);
            let satellite = self.satellite();
            Ok(self
                .objects
                .keys()
                .filter(|key| {
                    key.strip_prefix(&prefix)
                        .map_or(false, |name| !name.contains('/') && leaf_matches(leaf, name))
                })
                .map(|key| paths::s3_address(satellite, key))
                .collect())
        }

        fn retrieve(&self, address: &str) -> Result<Vec<u8>, ArchError> {
            let rel = self.rel(address);
            if self.failing.contains(&rel) {
                return Err(ArchError::Storage(format!("transfer failed for '{}'", rel)));
            }
            self.objects
                .get(&rel)
                .cloned()
                .ok_or_else(|| ArchError::NotFound(format!("no object '{}'", rel)))
        }

        fn object_size(&self, address: &str) -> Result<Option<u64>, ArchError> {
            let rel = self.rel(address);
            Ok(self.objects.get(&rel).map(|body| body.len() as u64))
        }

        fn ls(&self, dir: &str) -> Result<Vec<String>, ArchError> {
            let prefix = if dir.is_empty() {
                String::new()
            } else {
                format!("{}/", dir)
            };
            let mut names: Vec<String> = self
                .objects
                .keys()
                .filter_map(|key| key.strip_prefix(&prefix))
                .filter_map(|rest| rest.split('/').next())
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect();
            names.sort_unstable();
            names.dedup();
            Ok(names)
        }
    }
}
