use std::env;
use std::path::PathBuf;

/// Default cap on request bodies: 256 MB.
const DEFAULT_MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Filesystem layout and transport limits for the upload subsystem.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Final store directory; committed blobs are served from here.
    pub store_dir: PathBuf,

    /// Staging directory for in-flight uploads (default: `{store}/tmp`).
    pub staging_dir: PathBuf,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::rooted_at("uploads")
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let store_dir = env::var("UPLOAD_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let staging_dir = env::var("STAGING_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| store_dir.join("tmp"));

        let max_body_size = env::var("MAX_BODY_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_SIZE);

        Self {
            store_dir,
            staging_dir,
            max_body_size,
        }
    }

    /// Layout rooted at an arbitrary directory, staging nested under it.
    /// Keeping both on one filesystem is what makes finalize an atomic
    /// rename.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let store_dir = root.into();
        Self {
            staging_dir: store_dir.join("tmp"),
            store_dir,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}
