use crate::error::AppError;
use crate::services::storage::StorageService;
use crate::utils::validation::validate_staging_name;

/// Client-observed lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Named by `start`; no bytes staged yet.
    Ready,
    /// At least one chunk has been written.
    Writing,
    /// Promoted into the final store.
    Finalized,
}

/// An in-flight upload session. The client carries this tuple across calls
/// and the staging file is the durable record; this entity validates the
/// name and probes the filesystem for the current state.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub staging_name: String,
    pub declared_size: u64,
    pub declared_hash: Option<String>,
}

impl UploadSession {
    /// Builds a session handle, rejecting staging names that would resolve
    /// outside the staging directory.
    pub fn new(
        staging_name: &str,
        declared_size: u64,
        declared_hash: Option<String>,
    ) -> Result<Self, AppError> {
        validate_staging_name(staging_name)?;
        Ok(Self {
            staging_name: staging_name.to_string(),
            declared_size,
            declared_hash,
        })
    }

    /// Probes the filesystem for the session's current state. A session
    /// whose staging file is gone counts as finalized only when the store
    /// already holds a blob for its declared hash and size.
    pub async fn state(&self, storage: &StorageService) -> Result<SessionState, AppError> {
        let staging = storage.staging_path(&self.staging_name)?;
        if tokio::fs::try_exists(&staging).await? {
            return Ok(SessionState::Writing);
        }
        let committed = self
            .declared_hash
            .as_deref()
            .and_then(|hash| storage.find_existing(hash, self.declared_size));
        if committed.is_some() {
            Ok(SessionState::Finalized)
        } else {
            Ok(SessionState::Ready)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[tokio::test]
    async fn test_session_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::rooted_at(dir.path());
        let storage = StorageService::new(&config).await.unwrap();

        let digest = crate::utils::hash::digest_bytes(b"abc");
        let session = UploadSession::new("stage", 3, Some(digest.clone())).unwrap();
        assert_eq!(session.state(&storage).await.unwrap(), SessionState::Ready);

        storage.write_chunk("stage", 0, &b"abc"[..]).await.unwrap();
        assert_eq!(session.state(&storage).await.unwrap(), SessionState::Writing);

        storage
            .finalize("stage", 3, Some(&digest), "abc.txt")
            .await
            .unwrap();
        assert_eq!(
            session.state(&storage).await.unwrap(),
            SessionState::Finalized
        );
    }

    #[test]
    fn test_session_rejects_traversal_names() {
        assert!(UploadSession::new("../x", 0, None).is_err());
    }
}
