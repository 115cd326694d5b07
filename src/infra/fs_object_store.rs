use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::app::ports::ObjectStorePort;
use crate::error::{ReportError, Result};

/// Object store on the local filesystem: `<root>/<bucket>/<name>`.
///
/// Object names may contain `/` and map onto sub-directories.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to its file, refusing names that escape the bucket
    pub fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf> {
        let location = format!("{}/{}", bucket, name);
        let mut path = self.root.clone();
        for part in [bucket, name] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(c) => path.push(c),
                    _ => return Err(ReportError::storage(location, "invalid object path")),
                }
            }
        }
        if path == self.root {
            return Err(ReportError::storage(location, "empty object path"));
        }
        Ok(path)
    }

    async fn ensure_parent(path: &Path, location: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ReportError::storage(location, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, name)?;
        fs::read(&path)
            .await
            .map_err(|e| ReportError::storage(format!("{}/{}", bucket, name), e))
    }

    async fn put(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
        let location = format!("{}/{}", bucket, name);
        let path = self.object_path(bucket, name)?;
        Self::ensure_parent(&path, &location).await?;
        fs::write(&path, &bytes)
            .await
            .map_err(|e| ReportError::storage(location.as_str(), e))?;
        debug!("Wrote {} bytes to {}", bytes.len(), location);
        Ok(())
    }

    async fn copy(&self, src_bucket: &str, name: &str, dst_bucket: &str, dst_name: &str) -> Result<()> {
        let src = self.object_path(src_bucket, name)?;
        let dst = self.object_path(dst_bucket, dst_name)?;
        let location = format!("{}/{}", dst_bucket, dst_name);
        Self::ensure_parent(&dst, &location).await?;
        fs::copy(&src, &dst)
            .await
            .map_err(|e| ReportError::storage(format!("{}/{} -> {}", src_bucket, name, location), e))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, name: &str) -> Result<()> {
        let path = self.object_path(bucket, name)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| ReportError::storage(format!("{}/{}", bucket, name), e))
    }
}
