//! Workbook locations: local files and remote (S3) objects
//!
//! Remote reads authenticate through the standard `AWS_*` environment
//! variables, which the plugin exports at initialization.

use crate::error::{PluginError, PluginResult};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Where a workbook lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    /// Classify a resolved location string.
    ///
    /// Anything containing "s3" is a remote URI, kept verbatim. Everything else
    /// is a local path with surrounding single quotes removed.
    pub fn parse(resolved: &str) -> Self {
        if resolved.contains("s3") {
            Location::Remote(resolved.to_string())
        } else {
            Location::Local(PathBuf::from(resolved.trim_matches('\'')))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(uri) => write!(f, "{}", uri),
        }
    }
}

/// Download a remote object into memory.
///
/// Blocks the calling thread on a private current-thread runtime.
pub fn fetch_remote(uri: &str) -> PluginResult<Vec<u8>> {
    let url = Url::parse(uri)
        .map_err(|e| PluginError::Config(format!("Invalid remote location '{}': {}", uri, e)))?;
    let path = ObjectPath::from_url_path(url.path())
        .map_err(|e| PluginError::Config(format!("Invalid object path in '{}': {}", uri, e)))?;

    let store = AmazonS3Builder::from_env().with_url(uri).build()?;

    debug!("Fetching {} from object storage", uri);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let bytes = runtime.block_on(async { store.get(&path).await?.bytes().await })?;

    debug!("Fetched {} bytes from {}", bytes.len(), uri);
    Ok(bytes.to_vec())
}
