use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::RwLock;

/// Dedup index over the final store: `{hash}.{size}` → blob filename.
///
/// Blob names encode their own key, so the store directory is the
/// persistent form of this index; one scan at startup replays it and every
/// successful finalize adds the new entry.
pub struct BlobIndex {
    entries: RwLock<HashMap<String, String>>,
}

impl BlobIndex {
    /// Builds the index from one pass over the store directory.
    pub async fn load(store_dir: &Path) -> io::Result<Self> {
        let mut entries = HashMap::new();
        let mut dir = tokio::fs::read_dir(store_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(key) = dedup_key(name) {
                entries.insert(key, name.to_string());
            }
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Stored blob matching the declared hash and size, if any.
    pub fn find(&self, hash: &str, size: u64) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&format!("{hash}.{size}"))
            .cloned()
    }

    /// Records a freshly committed blob.
    pub fn insert(&self, filename: &str) {
        if let Some(key) = dedup_key(filename) {
            self.entries
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key, filename.to_string());
        }
    }
}

/// `{hash}.{size}` prefix of a well-formed blob name
/// (`{hash}.{size}.{basename}`). Names that do not carry a plausible hash
/// and a numeric size, such as form-uploaded files, are not indexed.
fn dedup_key(filename: &str) -> Option<String> {
    let mut parts = filename.splitn(3, '.');
    let hash = parts.next()?;
    let size = parts.next()?;
    if hash.len() >= 16 && !size.is_empty() && size.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("{hash}.{size}"))
    } else {
        None
    }
}
