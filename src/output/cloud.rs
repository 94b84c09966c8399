//! Storage locations (S3 and local filesystem)
//!
//! `StorageUri` is the engine-facing form of a root: normalized so DuckDB can
//! read and write it directly. `StorageRoot` pairs it with an object store
//! for the small amount of I/O the job does itself (completion markers,
//! overwrite cleanup, read-back listing).

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::fmt;
use std::sync::Arc;

/// Parsed storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUri {
    /// `s3://bucket/prefix` (also accepts `s3a://` and `s3n://`)
    S3 { bucket: String, prefix: String },
    /// Local directory
    Local { path: String },
}

impl StorageUri {
    /// Parse a root URI
    ///
    /// Supported formats:
    /// - `s3://bucket/path/`, `s3a://bucket/path/`, `s3n://bucket/path/`
    /// - `file:///local/path/`, `/local/path/` or `./path/`
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(Error::config("Storage URI must not be empty"));
        }

        for scheme in ["s3://", "s3a://", "s3n://"] {
            if let Some(rest) = uri.strip_prefix(scheme) {
                return Self::parse_s3(rest, uri);
            }
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if let Some(idx) = path.find("://") {
            return Err(Error::config(format!(
                "Unsupported storage scheme '{}' in {uri}",
                &path[..idx]
            )));
        }

        let trimmed = path.trim_end_matches('/');
        Ok(Self::Local {
            path: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        })
    }

    fn parse_s3(rest: &str, original: &str) -> Result<Self> {
        let (bucket, prefix) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in {original}")));
        }
        Ok(Self::S3 {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    /// Whether the root lives in remote object storage
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::S3 { .. })
    }

    /// Normalized URI as the engine expects it, without trailing slash
    pub fn as_str(&self) -> String {
        match self {
            Self::S3 { bucket, prefix } if prefix.is_empty() => format!("s3://{bucket}"),
            Self::S3 { bucket, prefix } => format!("s3://{bucket}/{prefix}"),
            Self::Local { path } => path.clone(),
        }
    }

    /// Append a relative path (or glob)
    pub fn join(&self, relative: &str) -> String {
        let base = self.as_str();
        let relative = relative.trim_start_matches('/');
        if base.ends_with('/') {
            format!("{base}{relative}")
        } else {
            format!("{base}/{relative}")
        }
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Output root with an object store for direct I/O
#[derive(Debug, Clone)]
pub struct StorageRoot {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix within the bucket (empty for local roots)
    prefix: String,
    /// Engine-facing URI
    uri: StorageUri,
}

impl StorageRoot {
    /// Open the object store behind a root, with ambient S3 settings
    pub fn open(uri: &StorageUri) -> Result<Self> {
        Self::open_with(uri, None, None)
    }

    /// Open the object store behind a root
    ///
    /// Explicit credentials and region take precedence over the
    /// environment; `AWS_ENDPOINT` is always read from it.
    pub fn open_with(
        uri: &StorageUri,
        credentials: Option<&Credentials>,
        region: Option<&str>,
    ) -> Result<Self> {
        match uri {
            StorageUri::S3 { bucket, prefix } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(credentials) = credentials {
                    builder = builder
                        .with_access_key_id(&credentials.access_key_id)
                        .with_secret_access_key(&credentials.secret_access_key);
                }
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                let store = builder
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;
                Ok(Self {
                    store: Arc::new(store),
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                })
            }
            StorageUri::Local { path } => {
                std::fs::create_dir_all(path)?;
                let store = LocalFileSystem::new_with_prefix(path)
                    .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
                Ok(Self {
                    store: Arc::new(store),
                    prefix: String::new(),
                    uri: uri.clone(),
                })
            }
        }
    }

    /// Parse and open in one step
    pub fn parse(uri: &str) -> Result<Self> {
        Self::open(&StorageUri::parse(uri)?)
    }

    /// Engine-facing URI of the root
    pub fn uri(&self) -> &StorageUri {
        &self.uri
    }

    /// Engine-facing URI of a path under the root
    pub fn uri_of(&self, relative: &str) -> String {
        self.uri.join(relative)
    }

    /// Whether this is a cloud destination (not local)
    pub fn is_cloud(&self) -> bool {
        self.uri.is_remote()
    }

    fn object_path(&self, relative: &str) -> ObjectPath {
        let relative = relative.trim_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(relative)
        } else if relative.is_empty() {
            ObjectPath::from(self.prefix.as_str())
        } else {
            ObjectPath::from(format!("{}/{relative}", self.prefix))
        }
    }

    /// Write bytes to a file under the root
    pub async fn put(&self, relative: &str, data: Bytes) -> Result<String> {
        let path = self.object_path(relative);
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::output(format!("Failed to write {path}: {e}")))?;
        Ok(self.uri_of(relative))
    }

    /// Read a file under the root, `None` when it does not exist
    pub async fn get(&self, relative: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(relative);
        match self.store.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every object below a directory
    pub async fn list(&self, relative_dir: &str) -> Result<Vec<ObjectMeta>> {
        let path = self.object_path(relative_dir);
        match self.store.list(Some(&path)).try_collect::<Vec<_>>().await {
            Ok(objects) => Ok(objects),
            Err(object_store::Error::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a directory holds at least one Parquet file
    pub async fn has_parquet(&self, relative_dir: &str) -> Result<bool> {
        Ok(self
            .list(relative_dir)
            .await?
            .iter()
            .any(|meta| meta.location.as_ref().ends_with(".parquet")))
    }

    /// Delete every object below a directory, returning how many were removed
    pub async fn delete_dir(&self, relative_dir: &str) -> Result<usize> {
        let objects = self.list(relative_dir).await?;
        for meta in &objects {
            match self.store.delete(&meta.location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(objects.len())
    }
}
