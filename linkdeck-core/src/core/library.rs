//! High-level hierarchy operations over a Linkdeck SQLite database.

use crate::core::{ordering, validate};
use crate::{
    AppState, Bookmark, BookmarkViewMode, Folder, Group, LinkdeckError, Result, Storage, User,
    UserPreferences, ViewMode, Workspace,
};
use rusqlite::{Connection, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

/// Credential row returned by [`Library::find_user_by_username`].
///
/// The hash is whatever opaque string the caller stored at registration;
/// this library never inspects it. Verification belongs to the server's
/// auth layer.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub username: String,
    pub password_hash: String,
}

/// Partial update for a user's display preferences. `None` fields keep
/// their current value.
#[derive(Debug, Clone, Default)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub view_mode: Option<ViewMode>,
    pub bookmark_view_mode: Option<BookmarkViewMode>,
    pub bookmarks_per_container: Option<i64>,
}

/// Content of a new bookmark. Positions are always assigned by the library.
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Partial update for an existing bookmark. `None` fields keep their
/// current value; `tags: Some(..)` replaces the whole tag set.
#[derive(Debug, Clone, Default)]
pub struct BookmarkPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Identifies one entity table for ownership checks and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Workspace,
    Folder,
    Group,
    Bookmark,
}

impl Entity {
    fn table(self) -> &'static str {
        match self {
            Self::Workspace => "workspaces",
            Self::Folder => "folders",
            Self::Group => "groups",
            Self::Bookmark => "bookmarks",
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Folder => "folder",
            Self::Group => "group",
            Self::Bookmark => "bookmark",
        }
    }
}

/// One sibling scope: the rows of an entity table whose `parent_col` equals
/// a given parent id. Workspaces use `user_id` as their parent column, which
/// makes every level uniform for the ordering queries.
#[derive(Debug, Clone, Copy)]
struct SiblingScope {
    entity: Entity,
    parent_col: &'static str,
}

const WORKSPACES_OF_USER: SiblingScope = SiblingScope {
    entity: Entity::Workspace,
    parent_col: "user_id",
};
const FOLDERS_OF_WORKSPACE: SiblingScope = SiblingScope {
    entity: Entity::Folder,
    parent_col: "workspace_id",
};
const GROUPS_OF_FOLDER: SiblingScope = SiblingScope {
    entity: Entity::Group,
    parent_col: "folder_id",
};
const BOOKMARKS_OF_GROUP: SiblingScope = SiblingScope {
    entity: Entity::Bookmark,
    parent_col: "group_id",
};

/// An open Linkdeck library backed by a SQLite database.
///
/// `Library` is the single entry point for all reads and mutations. Every
/// operation takes the acting user's id and refuses to touch rows owned by
/// anyone else. Mutations run inside one SQLite transaction each, so a
/// failure never leaves partial state behind.
///
/// The library itself is not synchronized; the server wraps one instance in
/// a mutex so at most one write transaction is in flight process-wide.
pub struct Library {
    storage: Storage,
}

impl Library {
    /// Wraps an opened [`Storage`].
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub(crate) fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    pub(crate) fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.storage.connection_mut().transaction()?)
    }

    // ---- users ----------------------------------------------------------

    /// Creates a user and seeds the starter hierarchy: a "Personal"
    /// workspace holding a "Main" folder holding a "Links" group.
    ///
    /// `password_hash` is stored verbatim; hashing happens upstream.
    ///
    /// # Errors
    ///
    /// Returns [`LinkdeckError::UsernameTaken`] if the username exists,
    /// [`LinkdeckError::ValidationFailed`] for an empty or overlong
    /// username, or [`LinkdeckError::Database`] for any SQLite failure.
    pub fn create_user(&mut self, username: &str, password_hash: &str) -> Result<User> {
        let username = validate::username(username)?;
        let prefs = UserPreferences::default();
        let id = Uuid::new_v4().to_string();
        let now = now_iso();

        let tx = self.transaction()?;

        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            [&username],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(LinkdeckError::UsernameTaken(username));
        }

        tx.execute(
            "INSERT INTO users (id, username, password, theme, view_mode, bookmark_view_mode, bookmarks_per_container, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                username,
                password_hash,
                prefs.theme,
                view_mode_str(prefs.view_mode),
                bookmark_view_mode_str(prefs.bookmark_view_mode),
                prefs.bookmarks_per_container,
                now,
            ],
        )?;

        // Seed starter containers so the UI is never empty.
        let workspace = create_workspace_in_tx(&tx, &id, "Personal")?;
        let folder = create_folder_in_tx(&tx, &id, &workspace.id, "Main")?;
        create_group_in_tx(&tx, &id, &folder.id, "Links")?;

        tx.commit()?;

        Ok(User {
            id,
            username,
            preferences: prefs,
        })
    }

    /// Looks up the credential row for `username`, or `None` if no such
    /// user exists. This is the only operation that exposes the stored hash.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<Credentials>> {
        let result = self.connection().query_row(
            "SELECT id, username, password FROM users WHERE username = ?1",
            [username],
            |row| {
                Ok(Credentials {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            },
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the user's account row, without the password hash.
    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.connection()
            .query_row(
                "SELECT id, username, theme, view_mode, bookmark_view_mode, bookmarks_per_container
                 FROM users WHERE id = ?1",
                [user_id],
                map_user_row,
            )
            .map_err(|_| LinkdeckError::NotFound {
                kind: "user",
                id: user_id.to_string(),
            })
    }

    /// Applies a partial preferences update and returns the merged result.
    pub fn update_preferences(
        &mut self,
        user_id: &str,
        patch: PreferencesPatch,
    ) -> Result<UserPreferences> {
        let current = self.get_user(user_id)?.preferences;
        let merged = UserPreferences {
            theme: patch.theme.unwrap_or(current.theme),
            view_mode: patch.view_mode.unwrap_or(current.view_mode),
            bookmark_view_mode: patch.bookmark_view_mode.unwrap_or(current.bookmark_view_mode),
            bookmarks_per_container: patch
                .bookmarks_per_container
                .unwrap_or(current.bookmarks_per_container),
        };

        let tx = self.transaction()?;
        tx.execute(
            "UPDATE users SET theme = ?1, view_mode = ?2, bookmark_view_mode = ?3, bookmarks_per_container = ?4
             WHERE id = ?5",
            rusqlite::params![
                merged.theme,
                view_mode_str(merged.view_mode),
                bookmark_view_mode_str(merged.bookmark_view_mode),
                merged.bookmarks_per_container,
                user_id,
            ],
        )?;
        tx.commit()?;
        Ok(merged)
    }

    // ---- state ----------------------------------------------------------

    /// Returns the user's entire hierarchy, each level sorted by position
    /// and bookmarks carrying their sorted tag sets.
    pub fn get_state(&self, user_id: &str) -> Result<AppState> {
        let conn = self.connection();

        let workspaces = conn
            .prepare(
                "SELECT id, user_id, title, position FROM workspaces
                 WHERE user_id = ?1 ORDER BY position ASC",
            )?
            .query_map([user_id], |row| {
                Ok(Workspace {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let folders = conn
            .prepare(
                "SELECT id, user_id, workspace_id, title, position FROM folders
                 WHERE user_id = ?1 ORDER BY position ASC",
            )?
            .query_map([user_id], |row| {
                Ok(Folder {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    workspace_id: row.get(2)?,
                    title: row.get(3)?,
                    position: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let groups = conn
            .prepare(
                "SELECT id, user_id, folder_id, title, position FROM groups
                 WHERE user_id = ?1 ORDER BY position ASC",
            )?
            .query_map([user_id], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    folder_id: row.get(2)?,
                    title: row.get(3)?,
                    position: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // One join query for all tag sets instead of a query per bookmark.
        let mut tags_by_bookmark: HashMap<String, Vec<String>> = HashMap::new();
        let tag_rows = conn
            .prepare(
                "SELECT bt.bookmark_id, t.name
                 FROM bookmark_tags bt
                 JOIN tags t ON t.id = bt.tag_id
                 JOIN bookmarks b ON b.id = bt.bookmark_id
                 WHERE b.user_id = ?1",
            )?
            .query_map([user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (bookmark_id, name) in tag_rows {
            tags_by_bookmark.entry(bookmark_id).or_default().push(name);
        }

        let bookmarks = conn
            .prepare(
                "SELECT id, user_id, group_id, url, title, description, position FROM bookmarks
                 WHERE user_id = ?1 ORDER BY position ASC",
            )?
            .query_map([user_id], |row| {
                Ok(Bookmark {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    group_id: row.get(2)?,
                    url: row.get(3)?,
                    title: row.get(4)?,
                    description: row.get(5)?,
                    tags: Vec::new(),
                    position: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(|mut b| {
                let mut tags = tags_by_bookmark.remove(&b.id).unwrap_or_default();
                tags.sort();
                b.tags = tags;
                b
            })
            .collect();

        Ok(AppState {
            workspaces,
            folders,
            groups,
            bookmarks,
        })
    }

    // ---- workspaces -----------------------------------------------------

    /// Creates a workspace at the end of the user's workspace list.
    pub fn create_workspace(&mut self, user_id: &str, title: &str) -> Result<Workspace> {
        let tx = self.transaction()?;
        let workspace = create_workspace_in_tx(&tx, user_id, title)?;
        tx.commit()?;
        Ok(workspace)
    }

    /// Renames a workspace owned by `user_id`.
    pub fn rename_workspace(
        &mut self,
        user_id: &str,
        workspace_id: &str,
        title: &str,
    ) -> Result<Workspace> {
        let title = validate::title(title)?;
        let tx = self.transaction()?;
        must_own(&tx, Entity::Workspace, workspace_id, user_id)?;
        tx.execute(
            "UPDATE workspaces SET title = ?1 WHERE id = ?2",
            rusqlite::params![title, workspace_id],
        )?;
        let workspace = fetch_workspace(&tx, workspace_id)?;
        tx.commit()?;
        Ok(workspace)
    }

    /// Deletes a workspace and, via cascade, all folders, groups, bookmarks
    /// and tag associations beneath it. Surviving workspaces keep their
    /// positions; the sequence may be sparse until the next reorder.
    pub fn delete_workspace(&mut self, user_id: &str, workspace_id: &str) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Workspace, workspace_id, user_id)?;
        tx.execute(
            "DELETE FROM workspaces WHERE id = ?1",
            rusqlite::params![workspace_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reassigns workspace positions so they match `ordered_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkdeckError::InvalidReorder`] unless `ordered_ids` is a
    /// permutation of all of the user's workspace ids; positions are
    /// untouched in that case.
    pub fn reorder_workspaces(&mut self, user_id: &str, ordered_ids: &[String]) -> Result<()> {
        let tx = self.transaction()?;
        reorder_in_tx(&tx, WORKSPACES_OF_USER, user_id, user_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    // ---- folders --------------------------------------------------------

    /// Creates a folder at the end of the workspace's folder list.
    ///
    /// # Errors
    ///
    /// Returns [`LinkdeckError::NotFound`] if the workspace is missing or
    /// owned by another user.
    pub fn create_folder(
        &mut self,
        user_id: &str,
        workspace_id: &str,
        title: &str,
    ) -> Result<Folder> {
        let tx = self.transaction()?;
        let folder = create_folder_in_tx(&tx, user_id, workspace_id, title)?;
        tx.commit()?;
        Ok(folder)
    }

    /// Renames a folder owned by `user_id`.
    pub fn rename_folder(&mut self, user_id: &str, folder_id: &str, title: &str) -> Result<Folder> {
        let title = validate::title(title)?;
        let tx = self.transaction()?;
        must_own(&tx, Entity::Folder, folder_id, user_id)?;
        tx.execute(
            "UPDATE folders SET title = ?1 WHERE id = ?2",
            rusqlite::params![title, folder_id],
        )?;
        let folder = fetch_folder(&tx, folder_id)?;
        tx.commit()?;
        Ok(folder)
    }

    /// Deletes a folder and all groups and bookmarks beneath it.
    pub fn delete_folder(&mut self, user_id: &str, folder_id: &str) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Folder, folder_id, user_id)?;
        tx.execute(
            "DELETE FROM folders WHERE id = ?1",
            rusqlite::params![folder_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reassigns folder positions within one workspace to match `ordered_ids`.
    pub fn reorder_folders(
        &mut self,
        user_id: &str,
        workspace_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Workspace, workspace_id, user_id)?;
        reorder_in_tx(&tx, FOLDERS_OF_WORKSPACE, user_id, workspace_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    /// Moves a folder into `workspace_id`, then applies `ordered_ids` as the
    /// destination workspace's complete folder order (the moved folder
    /// included). The source workspace is not renumbered.
    pub fn move_folder_to_workspace(
        &mut self,
        user_id: &str,
        folder_id: &str,
        workspace_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Folder, folder_id, user_id)?;
        must_own(&tx, Entity::Workspace, workspace_id, user_id)?;
        tx.execute(
            "UPDATE folders SET workspace_id = ?1 WHERE id = ?2",
            rusqlite::params![workspace_id, folder_id],
        )?;
        reorder_in_tx(&tx, FOLDERS_OF_WORKSPACE, user_id, workspace_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    // ---- groups ---------------------------------------------------------

    /// Creates a group at the end of the folder's group list.
    pub fn create_group(&mut self, user_id: &str, folder_id: &str, title: &str) -> Result<Group> {
        let tx = self.transaction()?;
        let group = create_group_in_tx(&tx, user_id, folder_id, title)?;
        tx.commit()?;
        Ok(group)
    }

    /// Renames a group owned by `user_id`.
    pub fn rename_group(&mut self, user_id: &str, group_id: &str, title: &str) -> Result<Group> {
        let title = validate::title(title)?;
        let tx = self.transaction()?;
        must_own(&tx, Entity::Group, group_id, user_id)?;
        tx.execute(
            "UPDATE groups SET title = ?1 WHERE id = ?2",
            rusqlite::params![title, group_id],
        )?;
        let group = fetch_group(&tx, group_id)?;
        tx.commit()?;
        Ok(group)
    }

    /// Deletes a group and all bookmarks inside it.
    pub fn delete_group(&mut self, user_id: &str, group_id: &str) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Group, group_id, user_id)?;
        tx.execute(
            "DELETE FROM groups WHERE id = ?1",
            rusqlite::params![group_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reassigns group positions within one folder to match `ordered_ids`.
    pub fn reorder_groups(
        &mut self,
        user_id: &str,
        folder_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Folder, folder_id, user_id)?;
        reorder_in_tx(&tx, GROUPS_OF_FOLDER, user_id, folder_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    /// Moves a group into `folder_id`, then applies `ordered_ids` as the
    /// destination folder's complete group order.
    pub fn move_group_to_folder(
        &mut self,
        user_id: &str,
        group_id: &str,
        folder_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Group, group_id, user_id)?;
        must_own(&tx, Entity::Folder, folder_id, user_id)?;
        tx.execute(
            "UPDATE groups SET folder_id = ?1 WHERE id = ?2",
            rusqlite::params![folder_id, group_id],
        )?;
        reorder_in_tx(&tx, GROUPS_OF_FOLDER, user_id, folder_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    // ---- bookmarks ------------------------------------------------------

    /// Creates a bookmark at the end of the group's bookmark list.
    ///
    /// Tags are trimmed, deduplicated case-sensitively, and capped at 50;
    /// the url and title must pass field validation.
    pub fn create_bookmark(
        &mut self,
        user_id: &str,
        group_id: &str,
        data: NewBookmark,
    ) -> Result<Bookmark> {
        let tx = self.transaction()?;
        let bookmark = create_bookmark_in_tx(&tx, user_id, group_id, &data)?;
        tx.commit()?;
        Ok(bookmark)
    }

    /// Applies a partial update to a bookmark and returns the new row.
    /// `tags: Some(..)` replaces the whole tag set.
    pub fn update_bookmark(
        &mut self,
        user_id: &str,
        bookmark_id: &str,
        patch: BookmarkPatch,
    ) -> Result<Bookmark> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Bookmark, bookmark_id, user_id)?;

        let current = fetch_bookmark(&tx, bookmark_id)?;
        let url = match patch.url {
            Some(raw) => validate::url(&raw)?,
            None => current.url,
        };
        let title = match patch.title {
            Some(raw) => validate::title(&raw)?,
            None => current.title,
        };
        let description = match patch.description {
            Some(raw) => validate::description(&raw)?,
            None => current.description,
        };

        tx.execute(
            "UPDATE bookmarks SET url = ?1, title = ?2, description = ?3 WHERE id = ?4",
            rusqlite::params![url, title, description, bookmark_id],
        )?;
        if let Some(tags) = patch.tags {
            set_bookmark_tags_in_tx(&tx, user_id, bookmark_id, &tags)?;
        }

        let bookmark = fetch_bookmark(&tx, bookmark_id)?;
        tx.commit()?;
        Ok(bookmark)
    }

    /// Deletes a bookmark. Surviving siblings keep their positions; the
    /// group's sequence may be sparse until its next reorder.
    pub fn delete_bookmark(&mut self, user_id: &str, bookmark_id: &str) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Bookmark, bookmark_id, user_id)?;
        tx.execute(
            "DELETE FROM bookmarks WHERE id = ?1",
            rusqlite::params![bookmark_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reassigns bookmark positions within one group to match `ordered_ids`.
    pub fn reorder_bookmarks(
        &mut self,
        user_id: &str,
        group_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Group, group_id, user_id)?;
        reorder_in_tx(&tx, BOOKMARKS_OF_GROUP, user_id, group_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }

    /// Moves a bookmark into `group_id`, then applies `ordered_ids` as the
    /// destination group's complete bookmark order.
    pub fn move_bookmark_to_group(
        &mut self,
        user_id: &str,
        bookmark_id: &str,
        group_id: &str,
        ordered_ids: &[String],
    ) -> Result<()> {
        let tx = self.transaction()?;
        must_own(&tx, Entity::Bookmark, bookmark_id, user_id)?;
        must_own(&tx, Entity::Group, group_id, user_id)?;
        tx.execute(
            "UPDATE bookmarks SET group_id = ?1 WHERE id = ?2",
            rusqlite::params![group_id, bookmark_id],
        )?;
        reorder_in_tx(&tx, BOOKMARKS_OF_GROUP, user_id, group_id, ordered_ids)?;
        tx.commit()?;
        Ok(())
    }
}

// ---- transaction-scoped helpers -----------------------------------------
//
// The create/reorder primitives take an open `Transaction` so multi-step
// operations (user seeding, moves, the importers) compose into a single
// atomic unit. Public methods wrap exactly one helper per transaction.

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Verifies that `id` exists in the entity's table and belongs to
/// `user_id`. Missing rows and foreign-user rows are both reported as
/// [`LinkdeckError::NotFound`].
fn must_own(tx: &Transaction, entity: Entity, id: &str, user_id: &str) -> Result<()> {
    let count: i64 = tx.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?1 AND user_id = ?2",
            entity.table()
        ),
        rusqlite::params![id, user_id],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(LinkdeckError::NotFound {
            kind: entity.kind(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Returns the position for a new row in `scope` under `parent_id`.
fn next_position_in(tx: &Transaction, scope: SiblingScope, parent_id: &str) -> Result<i64> {
    let max: Option<i64> = tx.query_row(
        &format!(
            "SELECT MAX(position) FROM {} WHERE {} = ?1",
            scope.entity.table(),
            scope.parent_col
        ),
        [parent_id],
        |row| row.get(0),
    )?;
    Ok(ordering::next_position(max))
}

/// Validates `ordered_ids` against the scope's current membership and
/// assigns `position = index` to each id. See
/// [`ordering::validate_permutation`] for the rejection rules.
fn reorder_in_tx(
    tx: &Transaction,
    scope: SiblingScope,
    user_id: &str,
    parent_id: &str,
    ordered_ids: &[String],
) -> Result<()> {
    let members: Vec<String> = tx
        .prepare(&format!(
            "SELECT id FROM {} WHERE user_id = ?1 AND {} = ?2",
            scope.entity.table(),
            scope.parent_col
        ))?
        .query_map(rusqlite::params![user_id, parent_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    ordering::validate_permutation(&members, ordered_ids)?;

    let mut stmt = tx.prepare(&format!(
        "UPDATE {} SET position = ?1 WHERE id = ?2",
        scope.entity.table()
    ))?;
    for (index, id) in ordered_ids.iter().enumerate() {
        stmt.execute(rusqlite::params![index as i64, id])?;
    }
    Ok(())
}

pub(crate) fn create_workspace_in_tx(
    tx: &Transaction,
    user_id: &str,
    title: &str,
) -> Result<Workspace> {
    let title = validate::title(title)?;
    let id = Uuid::new_v4().to_string();
    let position = next_position_in(tx, WORKSPACES_OF_USER, user_id)?;
    tx.execute(
        "INSERT INTO workspaces (id, user_id, title, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, user_id, title, position, now_iso()],
    )?;
    Ok(Workspace {
        id,
        user_id: user_id.to_string(),
        title,
        position,
    })
}

pub(crate) fn create_folder_in_tx(
    tx: &Transaction,
    user_id: &str,
    workspace_id: &str,
    title: &str,
) -> Result<Folder> {
    must_own(tx, Entity::Workspace, workspace_id, user_id)?;
    let title = validate::title(title)?;
    let id = Uuid::new_v4().to_string();
    let position = next_position_in(tx, FOLDERS_OF_WORKSPACE, workspace_id)?;
    tx.execute(
        "INSERT INTO folders (id, user_id, workspace_id, title, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, user_id, workspace_id, title, position, now_iso()],
    )?;
    Ok(Folder {
        id,
        user_id: user_id.to_string(),
        workspace_id: workspace_id.to_string(),
        title,
        position,
    })
}

pub(crate) fn create_group_in_tx(
    tx: &Transaction,
    user_id: &str,
    folder_id: &str,
    title: &str,
) -> Result<Group> {
    must_own(tx, Entity::Folder, folder_id, user_id)?;
    let title = validate::title(title)?;
    let id = Uuid::new_v4().to_string();
    let position = next_position_in(tx, GROUPS_OF_FOLDER, folder_id)?;
    tx.execute(
        "INSERT INTO groups (id, user_id, folder_id, title, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, user_id, folder_id, title, position, now_iso()],
    )?;
    Ok(Group {
        id,
        user_id: user_id.to_string(),
        folder_id: folder_id.to_string(),
        title,
        position,
    })
}

pub(crate) fn create_bookmark_in_tx(
    tx: &Transaction,
    user_id: &str,
    group_id: &str,
    data: &NewBookmark,
) -> Result<Bookmark> {
    must_own(tx, Entity::Group, group_id, user_id)?;
    let url = validate::url(&data.url)?;
    let title = validate::title(&data.title)?;
    let description = validate::description(&data.description)?;

    let id = Uuid::new_v4().to_string();
    let position = next_position_in(tx, BOOKMARKS_OF_GROUP, group_id)?;
    tx.execute(
        "INSERT INTO bookmarks (id, user_id, group_id, url, title, description, position, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![id, user_id, group_id, url, title, description, position, now_iso()],
    )?;
    let tags = set_bookmark_tags_in_tx(tx, user_id, &id, &data.tags)?;

    Ok(Bookmark {
        id,
        user_id: user_id.to_string(),
        group_id: group_id.to_string(),
        url,
        title,
        description,
        tags,
        position,
    })
}

/// Replaces a bookmark's tag set. Each distinct name is backed by one
/// per-user row in `tags`; the join table carries the association. Returns
/// the normalized set in stored order.
fn set_bookmark_tags_in_tx(
    tx: &Transaction,
    user_id: &str,
    bookmark_id: &str,
    tags: &[String],
) -> Result<Vec<String>> {
    tx.execute(
        "DELETE FROM bookmark_tags WHERE bookmark_id = ?1",
        [bookmark_id],
    )?;
    let clean = validate::tags(tags)?;
    for name in &clean {
        let tag_id = ensure_tag_in_tx(tx, user_id, name)?;
        tx.execute(
            "INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id) VALUES (?1, ?2)",
            rusqlite::params![bookmark_id, tag_id],
        )?;
    }
    Ok(clean)
}

/// Finds the user's tag row for `name`, creating it on first use.
fn ensure_tag_in_tx(tx: &Transaction, user_id: &str, name: &str) -> Result<String> {
    let existing = tx.query_row(
        "SELECT id FROM tags WHERE user_id = ?1 AND name = ?2",
        rusqlite::params![user_id, name],
        |row| row.get::<_, String>(0),
    );
    match existing {
        Ok(id) => Ok(id),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO tags (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, name, now_iso()],
            )?;
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

/// Finds the group titled `title` in `folder_id`, or creates it at the end
/// of the folder's group list. Used by the importers for the "Unsorted"
/// catch-all group.
pub(crate) fn get_or_create_group_in_tx(
    tx: &Transaction,
    user_id: &str,
    folder_id: &str,
    title: &str,
) -> Result<(Group, bool)> {
    let existing = tx.query_row(
        "SELECT id, user_id, folder_id, title, position FROM groups
         WHERE user_id = ?1 AND folder_id = ?2 AND title = ?3",
        rusqlite::params![user_id, folder_id, title],
        |row| {
            Ok(Group {
                id: row.get(0)?,
                user_id: row.get(1)?,
                folder_id: row.get(2)?,
                title: row.get(3)?,
                position: row.get(4)?,
            })
        },
    );
    match existing {
        Ok(group) => Ok((group, false)),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let group = create_group_in_tx(tx, user_id, folder_id, title)?;
            Ok((group, true))
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns the user's lowest-position workspace, or `None` if they have no
/// workspaces at all.
pub(crate) fn first_workspace_in_tx(tx: &Transaction, user_id: &str) -> Result<Option<Workspace>> {
    let result = tx.query_row(
        "SELECT id, user_id, title, position FROM workspaces
         WHERE user_id = ?1 ORDER BY position ASC LIMIT 1",
        [user_id],
        |row| {
            Ok(Workspace {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                position: row.get(3)?,
            })
        },
    );
    match result {
        Ok(w) => Ok(Some(w)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn fetch_workspace(tx: &Transaction, id: &str) -> Result<Workspace> {
    Ok(tx.query_row(
        "SELECT id, user_id, title, position FROM workspaces WHERE id = ?1",
        [id],
        |row| {
            Ok(Workspace {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                position: row.get(3)?,
            })
        },
    )?)
}

fn fetch_folder(tx: &Transaction, id: &str) -> Result<Folder> {
    Ok(tx.query_row(
        "SELECT id, user_id, workspace_id, title, position FROM folders WHERE id = ?1",
        [id],
        |row| {
            Ok(Folder {
                id: row.get(0)?,
                user_id: row.get(1)?,
                workspace_id: row.get(2)?,
                title: row.get(3)?,
                position: row.get(4)?,
            })
        },
    )?)
}

fn fetch_group(tx: &Transaction, id: &str) -> Result<Group> {
    Ok(tx.query_row(
        "SELECT id, user_id, folder_id, title, position FROM groups WHERE id = ?1",
        [id],
        |row| {
            Ok(Group {
                id: row.get(0)?,
                user_id: row.get(1)?,
                folder_id: row.get(2)?,
                title: row.get(3)?,
                position: row.get(4)?,
            })
        },
    )?)
}

fn fetch_bookmark(tx: &Transaction, id: &str) -> Result<Bookmark> {
    let mut bookmark = tx.query_row(
        "SELECT id, user_id, group_id, url, title, description, position
         FROM bookmarks WHERE id = ?1",
        [id],
        |row| {
            Ok(Bookmark {
                id: row.get(0)?,
                user_id: row.get(1)?,
                group_id: row.get(2)?,
                url: row.get(3)?,
                title: row.get(4)?,
                description: row.get(5)?,
                tags: Vec::new(),
                position: row.get(6)?,
            })
        },
    )?;
    let mut tags: Vec<String> = tx
        .prepare(
            "SELECT t.name FROM bookmark_tags bt
             JOIN tags t ON t.id = bt.tag_id
             WHERE bt.bookmark_id = ?1",
        )?
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    tags.sort();
    bookmark.tags = tags;
    Ok(bookmark)
}

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let view_mode: String = row.get(3)?;
    let bookmark_view_mode: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        preferences: UserPreferences {
            theme: row.get(2)?,
            view_mode: parse_view_mode(&view_mode),
            bookmark_view_mode: parse_bookmark_view_mode(&bookmark_view_mode),
            bookmarks_per_container: row.get(5)?,
        },
    })
}

fn view_mode_str(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Tabbed => "tabbed",
        ViewMode::Hierarchical => "hierarchical",
    }
}

fn parse_view_mode(raw: &str) -> ViewMode {
    match raw {
        "hierarchical" => ViewMode::Hierarchical,
        _ => ViewMode::Tabbed,
    }
}

fn bookmark_view_mode_str(mode: BookmarkViewMode) -> &'static str {
    match mode {
        BookmarkViewMode::Card => "card",
        BookmarkViewMode::List => "list",
    }
}

fn parse_bookmark_view_mode(raw: &str) -> BookmarkViewMode {
    match raw {
        "list" => BookmarkViewMode::List,
        _ => BookmarkViewMode::Card,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_library() -> Library {
        Library::new(Storage::open_in_memory().unwrap())
    }

    fn make_user(lib: &mut Library, name: &str) -> User {
        lib.create_user(name, "hash").unwrap()
    }

    /// Positions of a group's bookmarks, ascending.
    fn bookmark_positions(lib: &Library, user_id: &str, group_id: &str) -> Vec<i64> {
        let state = lib.get_state(user_id).unwrap();
        let mut positions: Vec<i64> = state
            .bookmarks
            .iter()
            .filter(|b| b.group_id == group_id)
            .map(|b| b.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    #[test]
    fn test_create_user_seeds_starter_hierarchy() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");

        let state = lib.get_state(&user.id).unwrap();
        assert_eq!(state.workspaces.len(), 1);
        assert_eq!(state.workspaces[0].title, "Personal");
        assert_eq!(state.folders.len(), 1);
        assert_eq!(state.folders[0].title, "Main");
        assert_eq!(state.groups.len(), 1);
        assert_eq!(state.groups[0].title, "Links");
        assert!(state.bookmarks.is_empty());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut lib = make_library();
        make_user(&mut lib, "alice");
        let err = lib.create_user("alice", "hash2").unwrap_err();
        assert!(matches!(err, LinkdeckError::UsernameTaken(_)));
    }

    #[test]
    fn test_find_user_by_username_returns_hash() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");

        let creds = lib.find_user_by_username("alice").unwrap().unwrap();
        assert_eq!(creds.user_id, user.id);
        assert_eq!(creds.password_hash, "hash");
        assert!(lib.find_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_update_preferences_merges_patch() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");

        let prefs = lib
            .update_preferences(
                &user.id,
                PreferencesPatch {
                    theme: Some("dark".to_string()),
                    view_mode: Some(ViewMode::Hierarchical),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(prefs.theme, "dark");
        assert_eq!(prefs.view_mode, ViewMode::Hierarchical);
        assert_eq!(prefs.bookmarks_per_container, 20);

        let reloaded = lib.get_user(&user.id).unwrap();
        assert_eq!(reloaded.preferences, prefs);
    }

    #[test]
    fn test_create_assigns_dense_positions() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let workspace_id = lib.get_state(&user.id).unwrap().workspaces[0].id.clone();

        let f0 = lib.get_state(&user.id).unwrap().folders[0].clone();
        let f1 = lib.create_folder(&user.id, &workspace_id, "Work").unwrap();
        let f2 = lib.create_folder(&user.id, &workspace_id, "Play").unwrap();

        assert_eq!(f0.position, 0);
        assert_eq!(f1.position, 1);
        assert_eq!(f2.position, 2);
    }

    #[test]
    fn test_reorder_round_trip() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let mut ids = Vec::new();
        for n in 0..4 {
            let b = lib
                .create_bookmark(
                    &user.id,
                    &group_id,
                    NewBookmark {
                        url: format!("https://example.com/{n}"),
                        title: format!("b{n}"),
                        description: String::new(),
                        tags: vec![],
                    },
                )
                .unwrap();
            ids.push(b.id);
        }

        let reversed: Vec<String> = ids.iter().rev().cloned().collect();
        lib.reorder_bookmarks(&user.id, &group_id, &reversed).unwrap();

        let state = lib.get_state(&user.id).unwrap();
        let in_order: Vec<String> = state
            .bookmarks
            .iter()
            .filter(|b| b.group_id == group_id)
            .map(|b| b.id.clone())
            .collect();
        assert_eq!(in_order, reversed);
        assert_eq!(bookmark_positions(&lib, &user.id, &group_id), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reorder_rejects_partial_and_foreign_sets() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let mut ids = Vec::new();
        for n in 0..3 {
            let b = lib
                .create_bookmark(
                    &user.id,
                    &group_id,
                    NewBookmark {
                        url: format!("https://example.com/{n}"),
                        title: format!("b{n}"),
                        description: String::new(),
                        tags: vec![],
                    },
                )
                .unwrap();
            ids.push(b.id);
        }

        let before: Vec<String> = lib
            .get_state(&user.id)
            .unwrap()
            .bookmarks
            .iter()
            .map(|b| b.id.clone())
            .collect();

        // Subset
        let err = lib
            .reorder_bookmarks(&user.id, &group_id, &ids[..2].to_vec())
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::InvalidReorder(_)));

        // Foreign id appended
        let mut with_foreign = ids.clone();
        with_foreign[2] = "not-a-bookmark".to_string();
        let err = lib
            .reorder_bookmarks(&user.id, &group_id, &with_foreign)
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::InvalidReorder(_)));

        // Duplicate
        let mut with_duplicate = ids.clone();
        with_duplicate[2] = with_duplicate[0].clone();
        let err = lib
            .reorder_bookmarks(&user.id, &group_id, &with_duplicate)
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::InvalidReorder(_)));

        // Positions untouched by any rejected attempt
        let after: Vec<String> = lib
            .get_state(&user.id)
            .unwrap()
            .bookmarks
            .iter()
            .map(|b| b.id.clone())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_bookmark_transfers_parentage() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let state = lib.get_state(&user.id).unwrap();
        let folder_id = state.folders[0].id.clone();
        let source_group = state.groups[0].id.clone();
        let target_group = lib.create_group(&user.id, &folder_id, "Target").unwrap().id;

        let moved = lib
            .create_bookmark(
                &user.id,
                &source_group,
                NewBookmark {
                    url: "https://example.com/moved".to_string(),
                    title: "moved".to_string(),
                    description: String::new(),
                    tags: vec![],
                },
            )
            .unwrap();
        let resident = lib
            .create_bookmark(
                &user.id,
                &target_group,
                NewBookmark {
                    url: "https://example.com/resident".to_string(),
                    title: "resident".to_string(),
                    description: String::new(),
                    tags: vec![],
                },
            )
            .unwrap();

        // Insert the moved bookmark at the front of the destination.
        let order = vec![moved.id.clone(), resident.id.clone()];
        lib.move_bookmark_to_group(&user.id, &moved.id, &target_group, &order)
            .unwrap();

        let state = lib.get_state(&user.id).unwrap();
        let moved_row = state.bookmarks.iter().find(|b| b.id == moved.id).unwrap();
        assert_eq!(moved_row.group_id, target_group);

        let in_order: Vec<String> = state
            .bookmarks
            .iter()
            .filter(|b| b.group_id == target_group)
            .map(|b| b.id.clone())
            .collect();
        assert_eq!(in_order, order);
        assert_eq!(bookmark_positions(&lib, &user.id, &target_group), vec![0, 1]);
    }

    #[test]
    fn test_move_requires_complete_destination_order() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let state = lib.get_state(&user.id).unwrap();
        let folder_id = state.folders[0].id.clone();
        let source_group = state.groups[0].id.clone();
        let target_group = lib.create_group(&user.id, &folder_id, "Target").unwrap().id;

        let moved = lib
            .create_bookmark(
                &user.id,
                &source_group,
                NewBookmark {
                    url: "https://example.com/m".to_string(),
                    title: "m".to_string(),
                    description: String::new(),
                    tags: vec![],
                },
            )
            .unwrap();
        lib.create_bookmark(
            &user.id,
            &target_group,
            NewBookmark {
                url: "https://example.com/r".to_string(),
                title: "r".to_string(),
                description: String::new(),
                tags: vec![],
            },
        )
        .unwrap();

        // Omitting the resident bookmark fails and rolls back the reparent.
        let err = lib
            .move_bookmark_to_group(&user.id, &moved.id, &target_group, &[moved.id.clone()])
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::InvalidReorder(_)));

        let state = lib.get_state(&user.id).unwrap();
        let moved_row = state.bookmarks.iter().find(|b| b.id == moved.id).unwrap();
        assert_eq!(moved_row.group_id, source_group, "failed move must not reparent");
    }

    #[test]
    fn test_move_folder_across_workspaces() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let personal = lib.get_state(&user.id).unwrap().workspaces[0].clone();
        let second = lib.create_workspace(&user.id, "Second").unwrap();

        let folder = lib.get_state(&user.id).unwrap().folders[0].clone();
        lib.move_folder_to_workspace(&user.id, &folder.id, &second.id, &[folder.id.clone()])
            .unwrap();

        let state = lib.get_state(&user.id).unwrap();
        let moved = state.folders.iter().find(|f| f.id == folder.id).unwrap();
        assert_eq!(moved.workspace_id, second.id);
        assert_eq!(moved.position, 0);
        assert_ne!(moved.workspace_id, personal.id);
    }

    #[test]
    fn test_reorder_workspaces() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let w0 = lib.get_state(&user.id).unwrap().workspaces[0].clone();
        let w1 = lib.create_workspace(&user.id, "Second").unwrap();

        lib.reorder_workspaces(&user.id, &[w1.id.clone(), w0.id.clone()])
            .unwrap();
        let state = lib.get_state(&user.id).unwrap();
        assert_eq!(state.workspaces[0].id, w1.id);
        assert_eq!(state.workspaces[0].position, 0);
        assert_eq!(state.workspaces[1].position, 1);
    }

    #[test]
    fn test_cross_user_access_rejected() {
        let mut lib = make_library();
        let alice = make_user(&mut lib, "alice");
        let bob = make_user(&mut lib, "bob");

        let alices_group = lib.get_state(&alice.id).unwrap().groups[0].id.clone();

        let err = lib
            .create_bookmark(
                &bob.id,
                &alices_group,
                NewBookmark {
                    url: "https://example.com".to_string(),
                    title: "intruder".to_string(),
                    description: String::new(),
                    tags: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::NotFound { kind: "group", .. }));

        let err = lib.rename_group(&bob.id, &alices_group, "mine now").unwrap_err();
        assert!(matches!(err, LinkdeckError::NotFound { .. }));
    }

    #[test]
    fn test_delete_workspace_cascades() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let state = lib.get_state(&user.id).unwrap();
        let workspace_id = state.workspaces[0].id.clone();
        let group_id = state.groups[0].id.clone();

        lib.create_bookmark(
            &user.id,
            &group_id,
            NewBookmark {
                url: "https://example.com".to_string(),
                title: "doomed".to_string(),
                description: String::new(),
                tags: vec!["t".to_string()],
            },
        )
        .unwrap();

        lib.delete_workspace(&user.id, &workspace_id).unwrap();

        let state = lib.get_state(&user.id).unwrap();
        assert!(state.workspaces.is_empty());
        assert!(state.folders.is_empty());
        assert!(state.groups.is_empty());
        assert!(state.bookmarks.is_empty());

        let join_rows: i64 = lib
            .connection()
            .query_row("SELECT COUNT(*) FROM bookmark_tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(join_rows, 0);
    }

    #[test]
    fn test_delete_leaves_survivors_unrenumbered() {
        // Deletes do not compact the surviving siblings; the next reorder does.
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let mut ids = Vec::new();
        for n in 0..3 {
            let b = lib
                .create_bookmark(
                    &user.id,
                    &group_id,
                    NewBookmark {
                        url: format!("https://example.com/{n}"),
                        title: format!("b{n}"),
                        description: String::new(),
                        tags: vec![],
                    },
                )
                .unwrap();
            ids.push(b.id);
        }

        lib.delete_bookmark(&user.id, &ids[1]).unwrap();
        assert_eq!(bookmark_positions(&lib, &user.id, &group_id), vec![0, 2]);

        // The next reorder restores density.
        lib.reorder_bookmarks(&user.id, &group_id, &[ids[2].clone(), ids[0].clone()])
            .unwrap();
        assert_eq!(bookmark_positions(&lib, &user.id, &group_id), vec![0, 1]);
    }

    #[test]
    fn test_tag_dedup_is_case_sensitive_and_capped() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let mut tags: Vec<String> = vec!["a".into(), "A".into(), " a ".into()];
        tags.extend((0..60).map(|i| format!("bulk{i}")));

        let bookmark = lib
            .create_bookmark(
                &user.id,
                &group_id,
                NewBookmark {
                    url: "https://example.com".to_string(),
                    title: "tagged".to_string(),
                    description: String::new(),
                    tags,
                },
            )
            .unwrap();

        assert_eq!(bookmark.tags.len(), 50);
        assert!(bookmark.tags.contains(&"a".to_string()));
        assert!(bookmark.tags.contains(&"A".to_string()));

        // Tag rows are reused per (user, name), not duplicated.
        let b2 = lib
            .create_bookmark(
                &user.id,
                &group_id,
                NewBookmark {
                    url: "https://example.com/2".to_string(),
                    title: "tagged again".to_string(),
                    description: String::new(),
                    tags: vec!["a".to_string()],
                },
            )
            .unwrap();
        assert_eq!(b2.tags, vec!["a"]);
        let tag_rows: i64 = lib
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM tags WHERE user_id = ?1 AND name = 'a'",
                [&user.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tag_rows, 1);
    }

    #[test]
    fn test_update_bookmark_patch_semantics() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let bookmark = lib
            .create_bookmark(
                &user.id,
                &group_id,
                NewBookmark {
                    url: "https://example.com".to_string(),
                    title: "before".to_string(),
                    description: "desc".to_string(),
                    tags: vec!["keep".to_string()],
                },
            )
            .unwrap();

        let updated = lib
            .update_bookmark(
                &user.id,
                &bookmark.id,
                BookmarkPatch {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.url, "https://example.com");
        assert_eq!(updated.description, "desc");
        assert_eq!(updated.tags, vec!["keep"]);

        let retagged = lib
            .update_bookmark(
                &user.id,
                &bookmark.id,
                BookmarkPatch {
                    tags: Some(vec!["new".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(retagged.tags, vec!["new"]);
    }

    #[test]
    fn test_validation_failures_are_rejected_before_write() {
        let mut lib = make_library();
        let user = make_user(&mut lib, "alice");
        let group_id = lib.get_state(&user.id).unwrap().groups[0].id.clone();

        let err = lib
            .create_bookmark(
                &user.id,
                &group_id,
                NewBookmark {
                    url: "   ".to_string(),
                    title: "no url".to_string(),
                    description: String::new(),
                    tags: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, LinkdeckError::ValidationFailed(_)));
        assert!(lib.get_state(&user.id).unwrap().bookmarks.is_empty());
    }
}
