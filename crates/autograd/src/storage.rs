/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Object storage for submitted sources and assignment reference files.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object path '{0}'")]
    InvalidPath(String),

    #[error("Object '{0}' not found")]
    NotFound(String),

    #[error("Storage I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A boxed reader over a stored object.
pub type ObjectReader = Box<dyn AsyncRead + Unpin + Send>;

/// Blob storage addressed by relative, `/`-separated paths.
#[async_trait]
pub trait ObjectStorer: Send + Sync {
    /// Writes everything from `reader` to `dst`, replacing any existing object.
    /// Returns the number of bytes stored.
    async fn store(
        &self,
        dst: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError>;

    /// Opens the object at `path` for reading.
    async fn seek(&self, path: &str) -> Result<ObjectReader, StorageError>;
}

/// Reads a whole object into memory.
pub async fn read_all(storer: &dyn ObjectStorer, path: &str) -> Result<Vec<u8>, StorageError> {
    let mut reader = storer.seek(path).await?;
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|source| StorageError::Io {
            path: path.to_string(),
            source,
        })?;
    Ok(buf)
}

/// Stores objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an object path onto the filesystem, refusing anything that could
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || !normal {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorer for LocalObjectStore {
    async fn store(
        &self,
        dst: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let target = self.resolve(dst)?;
        let io_err = |source| StorageError::Io {
            path: dst.to_string(),
            source,
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write beside the target and rename so readers never see a partial object.
        let partial = target.with_extension("partial");
        let mut file = fs::File::create(&partial).await.map_err(io_err)?;
        let written = tokio::io::copy(reader, &mut file).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);
        fs::rename(&partial, &target).await.map_err(io_err)?;

        debug!(path = dst, bytes = written, "Stored object");
        Ok(written)
    }

    async fn seek(&self, path: &str) -> Result<ObjectReader, StorageError> {
        let target = self.resolve(path)?;
        match fs::File::open(&target).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(source) => Err(StorageError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_then_seek() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let mut source: &[u8] = b"int main() { return 0; }";
        let written = store.store("submissions/a/main.cpp", &mut source).await.unwrap();
        assert_eq!(written, 24);

        let content = read_all(&store, "submissions/a/main.cpp").await.unwrap();
        assert_eq!(content, b"int main() { return 0; }");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let err = store.seek("nope.txt").await.err().unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects"));

        for path in ["../secret", "/etc/passwd", "a/../../b", ""] {
            let mut empty: &[u8] = b"";
            assert!(matches!(
                store.store(path, &mut empty).await,
                Err(StorageError::InvalidPath(_))
            ));
            assert!(matches!(
                store.seek(path).await.err(),
                Some(StorageError::InvalidPath(_))
            ));
        }
    }
}
