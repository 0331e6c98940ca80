//! Shape validation for schema migration paths.

use std::path::Path;

use crate::error::AppError;

/// Characters that may not appear anywhere in a migration path.
pub const DISALLOWED_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Validates the shape of a migration path without touching the filesystem.
///
/// A valid path is non-empty, absolute (a leading `/`, or a drive prefix
/// such as `C:` or `C:\`) and free of [`DISALLOWED_PATH_CHARS`].
pub fn validate_path(path: &Path) -> Result<(), AppError> {
    let raw = path.to_str().ok_or_else(|| AppError::InvalidPath {
        path: path.to_string_lossy().into_owned(),
        reason: "Path is not valid UTF-8",
    })?;

    let invalid = |reason| AppError::InvalidPath {
        path: raw.to_string(),
        reason,
    };

    if raw.is_empty() {
        return Err(invalid("Path cannot be empty"));
    }

    if !is_absolute(raw) {
        return Err(invalid("Path must be absolute"));
    }

    if raw.contains(DISALLOWED_PATH_CHARS) {
        return Err(invalid("Path contains invalid characters"));
    }

    Ok(())
}

fn is_absolute(raw: &str) -> bool {
    if raw.starts_with('/') {
        return true;
    }

    // Drive prefix: a letter and a colon, then nothing or a separator.
    let mut chars = raw.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(drive), Some(':'), next) if drive.is_ascii_alphabetic() => {
            matches!(next, None | Some('/') | Some('\\'))
        }
        _ => false,
    }
}
