//! Error types for the Linkdeck core library.

use thiserror::Error;

/// All errors that can occur within the Linkdeck core library.
#[derive(Debug, Error)]
pub enum LinkdeckError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An entity was requested that does not exist or belongs to another user.
    ///
    /// Foreign-user rows are deliberately indistinguishable from missing rows.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A reorder was given an id list that is not a permutation of the
    /// scope's current members. Nothing was applied.
    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    /// Input failed a field constraint before any write occurred.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A JSON export document declared a version this library cannot read.
    #[error("Unsupported export version: {0}")]
    UnsupportedVersion(u32),

    /// The opened file is not a valid Linkdeck database.
    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    /// A user with this username already exists.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Stored data could not be serialized to or from JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`LinkdeckError`].
pub type Result<T> = std::result::Result<T, LinkdeckError>;

impl LinkdeckError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::NotFound { kind, .. } => format!("{kind} no longer exists"),
            Self::InvalidReorder(msg) => msg.clone(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::UnsupportedVersion(v) => {
                format!("This export was made by a newer version (format {v}) and cannot be imported")
            }
            Self::InvalidDatabase(_) => "Could not open database file".to_string(),
            Self::UsernameTaken(name) => format!("The username '{name}' is already taken"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind() {
        let e = LinkdeckError::NotFound {
            kind: "folder",
            id: "abc".to_string(),
        };
        assert_eq!(e.to_string(), "folder not found: abc");
        assert!(e.user_message().contains("folder"));
    }

    #[test]
    fn test_unsupported_version_message() {
        let e = LinkdeckError::UnsupportedVersion(2);
        assert!(e.to_string().contains('2'));
    }
}
