/**************************************************************************************************
 *                                           Public API
 *************************************************************************************************/
pub use crate::{
    channel::Channel,
    checks::parse_time,
    codec::{decode_filename, decode_path},
    download::{
        download_closest_files, download_files, download_latest_files, download_next_files,
        download_previous_files, download_window, DownloadOptions, DownloadReport,
    },
    error::ArchError,
    filter::{filter_files, FilterSpec},
    metadata::{
        get_key_from_paths, group_files, FileMetadata, GroupKey, KeyValue, SearchResult,
    },
    paths::{apply_connection, remove_bucket_address, ConnectionType},
    product::{Product, ProductKey, ProductLevel},
    s3_store::S3Store,
    satellite::Satellite,
    search::{available_online_products, AcquisitionSeries, Archive},
    sector::{SceneAbbr, Sector},
    store::{LocalStore, ObjectStore},
};

/**************************************************************************************************
 *                                      Private Implementation
 *************************************************************************************************/
mod channel;
mod checks;
mod codec;
mod download;
mod error;
mod filter;
mod metadata;
mod paths;
mod product;
mod s3_store;
mod satellite;
mod search;
mod sector;
mod store;
