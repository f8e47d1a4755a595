//! Remote archive backend on the public S3 buckets.
//!
//! The buckets are open to anonymous reads, so no credential setup is
//! required.

use log::debug;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::{
    error::ArchError,
    paths,
    satellite::Satellite,
    store::{leaf_matches, ObjectStore},
};

#[derive(Clone, Debug)]
pub struct S3Store {
    satellite: Satellite,
    bucket: Bucket,
}

impl S3Store {
    /// Connect to a satellite's public bucket with anonymous credentials.
    pub fn new(satellite: Satellite) -> Result<Self, ArchError> {
        let credentials = Credentials::anonymous()
            .map_err(|err| ArchError::Configuration(err.to_string()))?;
        let bucket = Bucket::new(satellite.bucket_name(), Region::UsEast1, credentials)
            .map_err(|err| ArchError::Configuration(err.to_string()))?;
        Ok(S3Store { satellite, bucket })
    }
}

impl ObjectStore for S3Store {
    fn satellite(&self) -> Satellite {
        self.satellite
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, ArchError> {
        let (dir, leaf) = pattern.rsplit_once('/').unwrap_or(("", pattern));
        let prefix = format!("{}/", dir);
        debug!("listing s3://{}/{}", self.bucket.name(), prefix);

        let pages = self
            .bucket
            .list_blocking(prefix.clone(), Some("/".to_owned()))
            .map_err(|err| ArchError::Storage(err.to_string()))?;

        let mut found = vec![];
        for page in pages {
            for object in page.contents {
                let name = object.key.rsplit('/').next().unwrap_or(&object.key);
                if leaf_matches(leaf, name) {
                    found.push(paths::s3_address(self.satellite, &object.key));
                }
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    fn retrieve(&self, address: &str) -> Result<Vec<u8>, ArchError> {
        let key = paths::remove_bucket_address(address);
        let response = self
            .bucket
            .get_object_blocking(key)
            .map_err(|err| ArchError::Storage(err.to_string()))?;
        if response.status_code() != 200 {
            return Err(ArchError::Storage(format!(
                "GET '{}' returned status {}",
                key,
                response.status_code()
            )));
        }
        Ok(response.bytes().to_vec())
    }

    fn ls(&self, dir: &str) -> Result<Vec<String>, ArchError> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        let pages = self
            .bucket
            .list_blocking(prefix.clone(), Some("/".to_owned()))
            .map_err(|err| ArchError::Storage(err.to_string()))?;

        let mut names = vec![];
        for page in pages {
            for common in page.common_prefixes.unwrap_or_default() {
                let name = common.prefix.trim_end_matches('/');
                if let Some(rest) = name.strip_prefix(&prefix) {
                    names.push(rest.to_owned());
                }
            }
            for object in page.contents {
                if let Some(rest) = object.key.strip_prefix(&prefix) {
                    if !rest.is_empty() {
                        names.push(rest.to_owned());
                    }
                }
            }
        }
        names.sort_unstable();
        names.dedup();
        Ok(names)
    }

    fn object_size(&self, address: &str) -> Result<Option<u64>, ArchError> {
        let key = paths::remove_bucket_address(address);
        let (head, status) = self
            .bucket
            .head_object_blocking(key)
            .map_err(|err| ArchError::Storage(err.to_string()))?;
        if status != 200 {
            return Err(ArchError::Storage(format!(
                "HEAD '{}' returned status {}",
                key, status
            )));
        }
        Ok(head.content_length.map(|len| len as u64))
    }
}
