use crate::error::AppError;
use std::path::{Component, Path};

/// Characters stripped from client filenames before they reach any derived
/// path: separators, quotes, whitespace, shell metacharacters and bracket
/// pairs. Control characters are filtered separately.
const HOSTILE_CHARS: &[char] = &[
    '/', '\\', '*', ' ', '\'', '"', ':', '!', '&', '[', ']', '{', '}', '(', ')',
];

/// Trailing characters of the sanitized basename kept in derived file names.
pub const BASENAME_SUFFIX_LEN: usize = 11;

/// Strips filesystem-hostile characters from a client-supplied filename.
/// May return an empty string; the result is never trusted as unique.
pub fn sanitize_basename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !HOSTILE_CHARS.contains(c))
        .collect()
}

/// Sanitized basename truncated to its last `BASENAME_SUFFIX_LEN`
/// characters, the form embedded in staging and final names.
pub fn basename_suffix(name: &str) -> String {
    let sanitized = sanitize_basename(name);
    let chars: Vec<char> = sanitized.chars().collect();
    let skip = chars.len().saturating_sub(BASENAME_SUFFIX_LEN);
    chars[skip..].iter().collect()
}

/// Rejects staging names that would resolve outside the staging directory.
/// A valid name is exactly one normal path component.
pub fn validate_staging_name(name: &str) -> Result<(), AppError> {
    if name.contains('\\') || name.contains('\0') {
        return Err(AppError::UnsafeName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(AppError::UnsafeName(name.to_string())),
    }
}
