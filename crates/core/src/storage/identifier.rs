//! Blob identifier generation and key validation.
//!
//! Identifiers have the form `{uuid_v4}.{extension}`. The caller's filename is
//! only consulted for its extension; it never becomes part of the key.

use uuid::Uuid;

use super::error::StorageError;

/// Extract the lower-cased extension (text after the last `.`).
///
/// Returns `None` when there is no `.` or nothing follows it.
#[must_use]
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Validate the extension of `filename` against the allow-set.
///
/// # Errors
///
/// Returns `InvalidExtension` if the name has no extension or it is not allowed.
pub fn allowed_extension(filename: &str, allowed: &[String]) -> Result<String, StorageError> {
    extension_of(filename)
        .filter(|ext| allowed.iter().any(|a| a == ext))
        .ok_or_else(|| StorageError::invalid_extension(filename))
}

/// Generate a fresh storage identifier for an upload.
///
/// The identifier is a random 128-bit UUID v4 followed by the validated
/// extension. Uniqueness is assumed rather than checked: with 122 random bits
/// the collision probability is negligible, and no retry is attempted.
///
/// # Errors
///
/// Returns `InvalidExtension` if the extension is missing or not allowed.
pub fn generate(filename: &str, allowed: &[String]) -> Result<String, StorageError> {
    let extension = allowed_extension(filename, allowed)?;
    Ok(format!("{}.{extension}", Uuid::new_v4()))
}

/// Check that a key is a single, non-traversing path segment.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 255
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

/// Sanitize a caller-supplied filename for display and download headers.
///
/// Directory components are dropped, leading dots are stripped, and only ASCII
/// alphanumerics, dots, hyphens, and underscores survive; everything else
/// becomes `_`.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    base.trim_start_matches('.')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Infer a MIME type from an extension.
#[must_use]
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        _ => "application/octet-stream",
    }
}

/// Infer a MIME type from a storage key or filename.
#[must_use]
pub fn content_type_for_key(key: &str) -> &'static str {
    extension_of(key).map_or("application/octet-stream", |ext| content_type_for(&ext))
}
