use crate::config::StorageConfig;
use crate::error::AppError;
use crate::services::index::BlobIndex;
use crate::utils::hash;
use crate::utils::validation::{basename_suffix, validate_staging_name};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Declared-hash values that mean "skip verification" on finalize.
const SKIP_HASH_SENTINELS: &[&str] = &["", "none", "null"];

/// Filesystem half of the upload subsystem: positioned chunk writes into the
/// staging directory and atomic promotion into the content-addressed store.
pub struct StorageService {
    staging_dir: PathBuf,
    store_dir: PathBuf,
    index: BlobIndex,
}

impl StorageService {
    /// Creates the staging and store directories if missing and replays the
    /// store into the dedup index.
    pub async fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.staging_dir).await?;
        tokio::fs::create_dir_all(&config.store_dir).await?;
        let index = BlobIndex::load(&config.store_dir).await?;
        info!(
            "staging in {}, store in {}",
            config.staging_dir.display(),
            config.store_dir.display()
        );
        Ok(Self {
            staging_dir: config.staging_dir.clone(),
            store_dir: config.store_dir.clone(),
            index,
        })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Path of a staging file, after rejecting names that escape the
    /// staging directory.
    pub fn staging_path(&self, name: &str) -> Result<PathBuf, AppError> {
        validate_staging_name(name)?;
        Ok(self.staging_dir.join(name))
    }

    /// Existing blob matching `hash` + `size`, if the store has one.
    pub fn find_existing(&self, hash: &str, size: u64) -> Option<String> {
        self.index.find(hash, size)
    }

    /// Writes `reader` into the staging file at `offset`, creating the file
    /// on first use. Each call opens its own handle, so concurrent writes
    /// at disjoint offsets do not interfere.
    pub async fn write_chunk<R>(
        &self,
        name: &str,
        offset: u64,
        mut reader: R,
    ) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = self.staging_path(name)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&path)
            .await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        debug!("wrote {written} bytes at offset {offset} into {name}");
        Ok(written)
    }

    /// Streams a single-shot upload straight into the final store under
    /// `filename`. Same single-component name rule as staging files.
    pub async fn put<R>(&self, filename: &str, mut reader: R) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        validate_staging_name(filename)?;
        let mut file = tokio::fs::File::create(self.store_dir.join(filename)).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    /// Verifies and promotes a completed staging file into the final store,
    /// returning the blob name `{hash}.{size}.{basename}`.
    ///
    /// The computed digest must equal `declared_hash` unless that is a skip
    /// sentinel; on mismatch the staging file is left in place. Promotion
    /// is a single rename, so readers never observe a partial blob.
    pub async fn finalize(
        &self,
        staging_name: &str,
        declared_size: u64,
        declared_hash: Option<&str>,
        original_name: &str,
    ) -> Result<String, AppError> {
        let staging = self.staging_path(staging_name)?;
        if !tokio::fs::try_exists(&staging).await? {
            return Err(AppError::NoSuchStaging(staging_name.to_string()));
        }

        let computed = hash::digest_file(&staging).await?;
        let check = declared_hash.filter(|h| !SKIP_HASH_SENTINELS.contains(h));
        if let Some(declared) = check {
            if declared != computed {
                warn!("hash mismatch for {staging_name}: declared {declared}, computed {computed}");
                return Err(AppError::HashMismatch {
                    declared: declared.to_string(),
                    computed,
                });
            }
        }

        let final_name = format!(
            "{}.{}.{}",
            computed,
            declared_size,
            basename_suffix(original_name)
        );
        tokio::fs::rename(&staging, self.store_dir.join(&final_name)).await?;
        self.index.insert(&final_name);
        info!("committed {staging_name} as {final_name}");
        Ok(final_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service(dir: &tempfile::TempDir) -> StorageService {
        let config = StorageConfig::rooted_at(dir.path());
        StorageService::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_write_chunk_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;

        storage.write_chunk("stage1", 6, &b"world"[..]).await.unwrap();
        storage.write_chunk("stage1", 0, &b"hello "[..]).await.unwrap();

        let content = tokio::fs::read(dir.path().join("tmp/stage1")).await.unwrap();
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn test_finalize_verifies_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;
        storage.write_chunk("stage2", 0, &b"payload"[..]).await.unwrap();

        let digest = crate::utils::hash::digest_bytes(b"payload");
        let name = storage
            .finalize("stage2", 7, Some(&digest), "file.bin")
            .await
            .unwrap();

        assert_eq!(name, format!("{digest}.7.file.bin"));
        assert!(!dir.path().join("tmp/stage2").exists());
        let content = tokio::fs::read(dir.path().join(&name)).await.unwrap();
        assert_eq!(content, b"payload");
        assert_eq!(storage.find_existing(&digest, 7), Some(name));
    }

    #[tokio::test]
    async fn test_finalize_mismatch_preserves_staging() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;
        storage.write_chunk("stage3", 0, &b"payload"[..]).await.unwrap();

        let err = storage
            .finalize("stage3", 7, Some("0123456789ABCDEF0123456789ABCDEF"), "f")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::HashMismatch { .. }));
        assert!(dir.path().join("tmp/stage3").exists());
    }

    #[tokio::test]
    async fn test_finalize_sentinels_skip_verification() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;
        for (i, sentinel) in ["", "none", "null"].iter().enumerate() {
            let staging = format!("stage4-{i}");
            storage.write_chunk(&staging, 0, &b"abc"[..]).await.unwrap();
            storage
                .finalize(&staging, 3, Some(sentinel), "x.txt")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_finalize_missing_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;
        let err = storage.finalize("ghost", 0, None, "g").await.unwrap_err();
        assert!(matches!(err, AppError::NoSuchStaging(_)));
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(&dir).await;
        let err = storage
            .write_chunk("../escape", 0, &b"x"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsafeName(_)));
    }
}
