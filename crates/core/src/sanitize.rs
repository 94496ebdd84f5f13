//! Name sanitization for object-store paths, integration names and dataset ids

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").unwrap());

/// Sanitize a single path component for use in object-store paths.
///
/// Lower-cases the input and replaces every character outside `[a-z0-9_]`
/// with an underscore. Idempotent: sanitizing an already-sanitized name
/// returns it unchanged.
pub fn sanitize_path_component(component: &str) -> String {
    DISALLOWED_REGEX
        .replace_all(&component.to_lowercase(), "_")
        .into_owned()
}

/// Normalize a user-supplied bucket name.
///
/// Accepts `gs://bucket`, `gcs://bucket`, `bucket/` and plain `bucket`;
/// returns the bare bucket name with no scheme or trailing slashes.
pub fn normalize_bucket_name(bucket: &str) -> String {
    let trimmed = bucket.trim();
    let stripped = trimmed
        .strip_prefix("gs://")
        .or_else(|| trimmed.strip_prefix("gcs://"))
        .unwrap_or(trimmed);
    stripped.trim_end_matches('/').to_string()
}
