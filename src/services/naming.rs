use crate::utils::validation::basename_suffix;
use chrono::Local;
use std::path::Path;
use std::sync::Mutex;

/// Allocates intermediate names for upload sessions.
///
/// The prefix is a second-resolution local timestamp; requests landing in
/// the same second get an incrementing `.N` suffix. The (token, counter)
/// pair is the only shared mutable state in the subsystem.
#[derive(Default)]
pub struct SessionNamer {
    last: Mutex<LastToken>,
}

#[derive(Default)]
struct LastToken {
    stamp: String,
    index: u32,
}

impl SessionNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique time-based token: `yyyymmddHHMMSS`, or `yyyymmddHHMMSS.N`
    /// when the previous token was allocated in the same second.
    pub fn next_token(&self) -> String {
        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.stamp == stamp {
            last.index += 1;
            format!("{}.{}", stamp, last.index)
        } else {
            last.stamp = stamp.clone();
            last.index = 0;
            stamp
        }
    }

    /// Intermediate name for a new staging file: token + trailing slice of
    /// the sanitized original basename.
    pub fn staging_name(&self, original_name: &str) -> String {
        format!("{}{}", self.next_token(), basename_suffix(original_name))
    }

    /// Stored name for single-shot form uploads: token + trailing slice of
    /// the sanitized stem + the original extension.
    pub fn unique_filename(&self, original_name: &str) -> String {
        let path = Path::new(original_name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(basename_suffix)
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        format!("{}{}{}", self.next_token(), basename_suffix(stem), ext)
    }
}
