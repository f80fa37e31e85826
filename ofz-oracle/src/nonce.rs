//! Persistent, monotonically increasing nonce for EIP-712 signatures.
//!
//! Ported from `nonce_manager.py`: a single counter survives process
//! restarts by living in a JSON file (`{"nonce": N}`). Where the Python
//! version wrote the file in place and could leave a half-written file on
//! a crash mid-write, this stages the write to a sibling temp file and
//! renames it over the target, which POSIX guarantees is atomic.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{OracleError, Result};
use crate::types::NonceRecord;

pub struct NonceStore {
    path: PathBuf,
    current: Mutex<u64>,
}

impl NonceStore {
    /// Loads the nonce from `path`, creating the file with nonce 0 if it
    /// doesn't exist yet. `path`'s parent directory is created if needed.
    pub async fn load(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| OracleError::Config(format!("cannot create nonce dir: {e}")))?;
        }

        let current = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<NonceRecord>(&bytes)
                .map(|record| record.nonce)
                .unwrap_or_else(|e| {
                    log::error!("nonce file at {} is corrupt ({e}); restarting at 0", path.display());
                    0
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no nonce file at {}; starting at 0", path.display());
                0
            }
            Err(e) => return Err(OracleError::Config(format!("cannot read nonce file: {e}"))),
        };

        let store = NonceStore {
            path,
            current: Mutex::new(current),
        };
        store.persist(current).await?;
        Ok(store)
    }

    /// Returns the current nonce without incrementing it.
    pub async fn current(&self) -> u64 {
        *self.current.lock().await
    }

    /// Increments and persists the nonce, returning the new value.
    pub async fn next(&self) -> Result<u64> {
        let mut guard = self.current.lock().await;
        let next = *guard + 1;
        self.persist(next).await?;
        *guard = next;
        Ok(next)
    }

    async fn persist(&self, nonce: u64) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_vec_pretty(&NonceRecord { nonce }).unwrap()).await
    }
}

/// Writes `contents` to `path` via a temp file in the same directory,
/// fsync, then rename, so a concurrent reader never observes a partial
/// write and a crash mid-write never corrupts the previous contents.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp"),
        std::process::id()
    ));

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(|e| OracleError::Config(format!("cannot create temp file {}: {e}", tmp_path.display())))?;
    use tokio::io::AsyncWriteExt;
    file.write_all(contents)
        .await
        .map_err(|e| OracleError::Config(format!("cannot write temp file {}: {e}", tmp_path.display())))?;
    file.sync_all()
        .await
        .map_err(|e| OracleError::Config(format!("cannot fsync temp file {}: {e}", tmp_path.display())))?;
    drop(file);

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| OracleError::Config(format!("cannot rename {} to {}: {e}", tmp_path.display(), path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_at_zero_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonce.json");
        let store = NonceStore::load(path.clone()).await.unwrap();
        assert_eq!(store.current().await, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn next_increments_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonce.json");
        let store = NonceStore::load(path.clone()).await.unwrap();
        assert_eq!(store.next().await.unwrap(), 1);
        assert_eq!(store.next().await.unwrap(), 2);

        let reloaded = NonceStore::load(path).await.unwrap();
        assert_eq!(reloaded.current().await, 2);
    }

    #[tokio::test]
    async fn corrupt_file_restarts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonce.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let store = NonceStore::load(path).await.unwrap();
        assert_eq!(store.current().await, 0);
    }
}
