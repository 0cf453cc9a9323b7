//! Persistent entity types for the Linkdeck hierarchy.
//!
//! The hierarchy is four levels deep: [`Workspace`] → [`Folder`] → [`Group`]
//! → [`Bookmark`]. Every entity row is owned by exactly one user, and every
//! level carries a zero-based `position` that orders it among its siblings.
//!
//! All types serialize in camelCase so they can cross the HTTP boundary of
//! the Linkdeck server without a mapping layer.

use serde::{Deserialize, Serialize};

/// How the client lays out a user's containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Tabbed,
    Hierarchical,
}

/// How the client renders individual bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkViewMode {
    Card,
    List,
}

/// Per-user display preferences, persisted alongside the account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: String,
    pub view_mode: ViewMode,
    pub bookmark_view_mode: BookmarkViewMode,
    pub bookmarks_per_container: i64,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            view_mode: ViewMode::Tabbed,
            bookmark_view_mode: BookmarkViewMode::Card,
            bookmarks_per_container: 20,
        }
    }
}

/// A user account. The password hash is never exposed through this type;
/// credential lookups go through [`Library::find_user_by_username`].
///
/// [`Library::find_user_by_username`]: crate::Library::find_user_by_username
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub preferences: UserPreferences,
}

/// Top-level container of the hierarchy. One "Personal" workspace is created
/// automatically when a user registers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub position: i64,
}

/// A folder inside a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub title: String,
    pub position: i64,
}

/// A group inside a folder. Groups are the only containers that hold
/// bookmarks directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub user_id: String,
    pub folder_id: String,
    pub title: String,
    pub position: i64,
}

/// A bookmark inside a group. `tags` is a deduplicated set, stored
/// normalized through a join relation and returned sorted alphabetically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub position: i64,
}

/// A user's complete hierarchy, each level sorted by position. This is what
/// the client fetches on load and after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub workspaces: Vec<Workspace>,
    pub folders: Vec<Folder>,
    pub groups: Vec<Group>,
    pub bookmarks: Vec<Bookmark>,
}
