//! Field constraints, enforced before any row is written.
//!
//! Limits mirror what the Linkdeck server accepts at its HTTP boundary, so
//! that data imported through this library can always round-trip through
//! the API layer.

use crate::{LinkdeckError, Result};

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_DESCRIPTION_LEN: usize = 4000;
pub const MAX_TAG_LEN: usize = 64;
pub const MAX_TAGS_PER_BOOKMARK: usize = 50;
pub const MAX_IMPORT_HTML_BYTES: usize = 10_000_000;

/// Trims `username` and checks its length. Returns the trimmed value.
pub fn username(raw: &str) -> Result<String> {
    bounded_trimmed(raw, "username", MAX_USERNAME_LEN)
}

/// Trims `title` and checks its length. Returns the trimmed value.
pub fn title(raw: &str) -> Result<String> {
    bounded_trimmed(raw, "title", MAX_TITLE_LEN)
}

/// Trims `url` and checks its length. Returns the trimmed value.
pub fn url(raw: &str) -> Result<String> {
    bounded_trimmed(raw, "url", MAX_URL_LEN)
}

/// Trims `description` and checks its length. Empty is allowed.
pub fn description(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.len() > MAX_DESCRIPTION_LEN {
        return Err(LinkdeckError::ValidationFailed(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalizes a tag list: trims each entry, drops empties, deduplicates
/// case-sensitively preserving first occurrence, and caps the set at
/// [`MAX_TAGS_PER_BOOKMARK`]. An individual tag over [`MAX_TAG_LEN`]
/// characters is a validation error rather than a silent truncation.
pub fn tags(raw: &[String]) -> Result<Vec<String>> {
    let mut clean: Vec<String> = Vec::new();
    for tag in raw {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.len() > MAX_TAG_LEN {
            return Err(LinkdeckError::ValidationFailed(format!(
                "tag must be at most {MAX_TAG_LEN} characters"
            )));
        }
        if !clean.iter().any(|t| t == trimmed) {
            clean.push(trimmed.to_string());
        }
    }
    clean.truncate(MAX_TAGS_PER_BOOKMARK);
    Ok(clean)
}

fn bounded_trimmed(raw: &str, field: &str, max: usize) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkdeckError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    if trimmed.len() > max {
        return Err(LinkdeckError::ValidationFailed(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}
