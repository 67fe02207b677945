use crate::domain::errors::KVStoreError;
use crate::ports::outbound::KeyValueStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const VALUE_EXT: &str = "json";
const TEMP_EXT: &str = "json.tmp";

/// File-backed key-value store.
///
/// Each key lives in its own `<key>.json` file under the data directory. A
/// write goes to a temp file, is fsynced, then renamed over the old value, so
/// a crash leaves either the old or the new value on disk.
#[derive(Clone, Debug)]
pub struct FileKVStore {
    dir: PathBuf,
}

impl FileKVStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        tracing::debug!("[rx-02] File store at {}", dir.display());
        Self { dir }
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str, ext: &str) -> Result<PathBuf, KVStoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.');
        if !valid {
            return Err(KVStoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.{}", key, ext)))
    }
}

#[async_trait]
impl KeyValueStore for FileKVStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVStoreError> {
        let path = self.path_for(key, VALUE_EXT)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KVStoreError> {
        let path = self.path_for(key, VALUE_EXT)?;
        let temp_path = self.path_for(key, TEMP_EXT)?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(value).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KVStoreError> {
        let path = self.path_for(key, VALUE_EXT)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, KVStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", VALUE_EXT);
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(&suffix)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKVStore::new(dir.path());

        assert_eq!(store.get("rx_blocks_v1").await.unwrap(), None);
        store.put("rx_blocks_v1", b"[1]").await.unwrap();
        store.put("rx_blocks_v1", b"[1,2]").await.unwrap();

        let reopened = FileKVStore::new(dir.path());
        assert_eq!(
            reopened.get("rx_blocks_v1").await.unwrap(),
            Some(b"[1,2]".to_vec())
        );
        assert!(!dir.path().join("rx_blocks_v1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_keys_ignore_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKVStore::new(dir.path());
        store.put("prescriptions_v1", b"[]").await.unwrap();
        store.put("rx_blocks_v1", b"[]").await.unwrap();
        std::fs::write(dir.path().join("rx_blocks_v1.json.tmp"), b"partial").unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["prescriptions_v1".to_string(), "rx_blocks_v1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKVStore::new(dir.path().join("not-yet"));
        assert!(store.keys().await.unwrap().is_empty());
        store.delete("rx_blocks_v1").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKVStore::new(dir.path());
        let err = store.put("../escape", b"x").await.unwrap_err();
        assert!(matches!(err, KVStoreError::InvalidKey { .. }));
        assert!(!err.is_transient());
    }
}
