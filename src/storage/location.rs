//! Storage locations and the object-store handles behind them.
//!
//! A location string selects its backend by scheme: `s3://bucket/prefix`
//! goes to Amazon S3, `file:///abs/path` or a bare path goes to the local
//! filesystem. Both are driven through the same [`ObjectStore`] API so the
//! reader and writer never branch on the backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving or talking to a storage location.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A place records are read from or written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Location {
    /// A directory or file on the local filesystem.
    Local(PathBuf),
    /// A bucket and key prefix in S3. The prefix may be empty.
    S3 { bucket: String, prefix: String },
}

impl Location {
    /// Parses a location string, choosing the backend from its scheme.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| StorageError::InvalidLocation {
            location: raw.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("location cannot be empty"));
        }

        // Keys are taken verbatim: no percent-decoding, and `?`/`#` are
        // ordinary key characters.
        if let Some(rest) = trimmed.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(invalid("missing bucket name"));
            }
            if !bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            {
                return Err(invalid(&format!("invalid bucket name '{bucket}'")));
            }
            return Ok(Location::S3 {
                bucket: bucket.to_string(),
                prefix: key.trim_matches('/').to_string(),
            });
        }

        if trimmed.starts_with("file://") {
            let url = url::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
            let path = url
                .to_file_path()
                .map_err(|_| invalid("file:// location must be an absolute path"))?;
            return Ok(Location::Local(path));
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(invalid(&format!("unsupported scheme '{scheme}'")));
        }

        Ok(Location::Local(PathBuf::from(trimmed)))
    }

    /// Returns a location one level below this one.
    pub fn join(&self, name: &str) -> Location {
        let name = name.trim_matches('/');
        match self {
            Location::Local(path) => Location::Local(path.join(name)),
            Location::S3 { bucket, prefix } => Location::S3 {
                bucket: bucket.clone(),
                prefix: if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                },
            },
        }
    }

    /// Builds an object-store client rooted at this location.
    ///
    /// S3 clients pick up credentials and region from the standard `AWS_*`
    /// environment variables.
    pub fn connect(&self) -> Result<Storage, StorageError> {
        match self {
            Location::Local(path) => {
                let absolute = absolutize(path)?;
                let root = ObjectPath::from_absolute_path(&absolute).map_err(|e| {
                    StorageError::InvalidLocation {
                        location: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                debug!(root = %absolute.display(), "Connected local filesystem store");
                Ok(Storage {
                    store: Arc::new(LocalFileSystem::new()),
                    root,
                    location: self.clone(),
                })
            }
            Location::S3 { bucket, prefix } => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()?;
                debug!(bucket = %bucket, prefix = %prefix, "Connected S3 store");
                Ok(Storage {
                    store: Arc::new(store),
                    root: key_path(prefix, self)?,
                    location: self.clone(),
                })
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{bucket}"),
            Location::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
        }
    }
}

impl FromStr for Location {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}

/// Object path for a raw S3 key prefix, kept byte-for-byte.
fn key_path(prefix: &str, location: &Location) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(prefix).map_err(|e| StorageError::InvalidLocation {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves a possibly relative path against the working directory.
///
/// Existing paths are canonicalized so symlinked temp roots list the same
/// keys they were written under.
fn absolutize(path: &Path) -> Result<PathBuf, StorageError> {
    match std::fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(_) => Ok(std::path::absolute(path)?),
    }
}

/// An object-store client paired with the root path of a [`Location`].
#[derive(Debug, Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    root: ObjectPath,
    location: Location,
}

impl Storage {
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn root(&self) -> &ObjectPath {
        &self.root
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Object path for `relative` (which may contain `/`) below the root.
    pub fn child(&self, relative: &str) -> ObjectPath {
        let relative = ObjectPath::from(relative.trim_matches('/'));
        ObjectPath::from_iter(self.root.parts().chain(relative.parts()))
    }

    /// Human-readable URI for an object path, used in logs and errors.
    pub fn uri(&self, path: &ObjectPath) -> String {
        match &self.location {
            Location::Local(_) => format!("/{path}"),
            Location::S3 { bucket, .. } => format!("s3://{bucket}/{path}"),
        }
    }

    /// Returns true when the root itself names an existing object.
    pub async fn root_is_object(&self) -> Result<bool, StorageError> {
        if self.root.as_ref().is_empty() {
            return Ok(false);
        }
        match self.store.head(&self.root).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the objects below the root, sorted by key.
    ///
    /// Without `recursive`, only objects directly below the root are returned.
    pub async fn list_files(&self, recursive: bool) -> Result<Vec<ObjectPath>, StorageError> {
        let prefix = (!self.root.as_ref().is_empty()).then_some(&self.root);
        let mut listing = self.store.list(prefix);
        let mut files = Vec::new();

        while let Some(meta) = listing.try_next().await? {
            let depth = meta
                .location
                .prefix_match(&self.root)
                .map(|parts| parts.count())
                .unwrap_or(0);
            if depth == 0 || (!recursive && depth > 1) {
                continue;
            }
            files.push(meta.location);
        }

        files.sort();
        Ok(files)
    }

    /// Deletes a single object below this store.
    pub async fn delete(&self, path: &ObjectPath) -> Result<(), StorageError> {
        self.store.delete(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_s3_location() {
        let loc = Location::parse("s3://my-bucket/data/run-1/").unwrap();
        assert_eq!(
            loc,
            Location::S3 {
                bucket: "my-bucket".to_string(),
                prefix: "data/run-1".to_string(),
            }
        );
        assert_eq!(loc.to_string(), "s3://my-bucket/data/run-1");
    }

    #[test]
    fn test_parse_s3_keys_verbatim() {
        for (raw, key) in [
            ("s3://bucket/my data/sample.jsonl", "my data/sample.jsonl"),
            ("s3://bucket/データ/sample.jsonl", "データ/sample.jsonl"),
            ("s3://bucket/run#1/out", "run#1/out"),
            ("s3://bucket/a?b/100%25", "a?b/100%25"),
        ] {
            let loc = Location::parse(raw).unwrap();
            assert_eq!(
                loc,
                Location::S3 {
                    bucket: "bucket".to_string(),
                    prefix: key.to_string(),
                }
            );
            assert_eq!(loc.to_string(), raw);
            assert_eq!(key_path(key, &loc).unwrap().as_ref(), key);
        }
    }

    #[test]
    fn test_parse_s3_rejects_bad_bucket() {
        assert!(Location::parse("s3://my bucket/key").is_err());
        assert!(Location::parse("s3://bucket#1/key").is_err());
    }

    #[test]
    fn test_parse_s3_bucket_root() {
        let loc = Location::parse("s3://bucket").unwrap();
        assert_eq!(
            loc,
            Location::S3 {
                bucket: "bucket".to_string(),
                prefix: String::new(),
            }
        );
        assert_eq!(loc.to_string(), "s3://bucket");
    }

    #[test]
    fn test_parse_local_paths() {
        assert_eq!(
            Location::parse("output").unwrap(),
            Location::Local(PathBuf::from("output"))
        );
        assert_eq!(
            Location::parse("file:///tmp/data").unwrap(),
            Location::Local(PathBuf::from("/tmp/data"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_locations() {
        assert!(Location::parse("").is_err());
        assert!(Location::parse("   ").is_err());
        assert!(Location::parse("gs://bucket/key").is_err());
        assert!(Location::parse("s3:///key-without-bucket").is_err());
    }

    #[test]
    fn test_join() {
        let s3 = Location::parse("s3://b/data").unwrap();
        assert_eq!(s3.join("sample.jsonl").to_string(), "s3://b/data/sample.jsonl");

        let root = Location::parse("s3://b").unwrap();
        assert_eq!(root.join("/sample.jsonl").to_string(), "s3://b/sample.jsonl");

        let local = Location::parse("out").unwrap();
        assert_eq!(local.join("x.jsonl"), Location::Local(PathBuf::from("out/x.jsonl")));
    }

    #[test]
    fn test_location_deserializes_from_string() {
        let loc: Location = serde_yaml::from_str("s3://bucket/prefix").unwrap();
        assert_eq!(loc.to_string(), "s3://bucket/prefix");
    }

    #[tokio::test]
    async fn test_list_files_sorted_and_non_recursive() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.jsonl"), "{}\n").unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "{}\n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.jsonl"), "{}\n").unwrap();

        let storage = Location::Local(dir.path().to_path_buf()).connect().unwrap();

        let flat = storage.list_files(false).await.unwrap();
        let names: Vec<_> = flat.iter().filter_map(|p| p.filename()).collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);

        let all = storage.list_files(true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[2].as_ref().ends_with("nested/c.jsonl"));
    }

    #[tokio::test]
    async fn test_root_is_object() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("sample.jsonl");
        std::fs::write(&file, "{}\n").unwrap();

        let as_file = Location::Local(file).connect().unwrap();
        assert!(as_file.root_is_object().await.unwrap());

        let as_dir = Location::Local(dir.path().to_path_buf()).connect().unwrap();
        assert!(!as_dir.root_is_object().await.unwrap());
    }
}
