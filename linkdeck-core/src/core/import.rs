//! Importing and exporting a user's hierarchy.
//!
//! Two formats are supported: the Netscape bookmark HTML produced by
//! browsers (lossy in both directions — the internal model is exactly
//! three levels deep below a workspace, while the format nests arbitrarily)
//! and a versioned JSON document that round-trips the full hierarchy
//! including tags and descriptions.
//!
//! Each import runs as one write transaction: a failure rolls the whole
//! import back, except individual bookmark failures, which are recorded as
//! warnings and skipped so one bad row never sinks a thousand good ones.

use crate::core::library::{
    create_bookmark_in_tx, create_folder_in_tx, create_group_in_tx, create_workspace_in_tx,
    first_workspace_in_tx, get_or_create_group_in_tx, NewBookmark,
};
use crate::core::netscape::{parse_netscape, ParsedBookmark, ParsedFolder, ParsedNode};
use crate::core::validate;
use crate::{Library, LinkdeckError, Result};
use rusqlite::Transaction;
use serde::{Deserialize, Serialize};

/// Version written into JSON exports and required of JSON imports.
pub const JSON_EXPORT_VERSION: u32 = 1;

/// Title of the per-folder catch-all group that receives bookmarks sitting
/// directly inside a folder, outside any group.
const UNSORTED_GROUP_TITLE: &str = "Unsorted";

/// What to do with folders nested deeper than the internal model allows
/// (anything below the group level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategy {
    /// Hoist every bookmark found anywhere under the overflowing folder
    /// directly into the enclosing group.
    Flatten,
    /// Skip the overflowing folder entirely, counting its bookmarks as
    /// skipped and recording one warning.
    Skip,
    /// Reserved for routing overflow into a root-level folder. Accepted,
    /// but currently handled like [`ImportStrategy::Skip`] so the report
    /// never under-counts.
    Root,
}

/// Tally of what an import did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub folders_created: usize,
    pub groups_created: usize,
    pub bookmarks_created: usize,
    pub bookmarks_skipped: usize,
    pub warnings: Vec<String>,
}

// ---- Netscape import -----------------------------------------------------

/// Imports a Netscape bookmark document into the user's lowest-position
/// workspace (created as "Imported" if they have none).
///
/// The whole import is one transaction. See the module docs for the
/// per-bookmark failure policy.
///
/// # Errors
///
/// Returns [`LinkdeckError::ValidationFailed`] if `html` exceeds the size
/// bound, or [`LinkdeckError::Database`] for any SQLite failure.
pub fn import_netscape(
    library: &mut Library,
    user_id: &str,
    html: &str,
    strategy: ImportStrategy,
) -> Result<ImportReport> {
    if html.len() > validate::MAX_IMPORT_HTML_BYTES {
        return Err(LinkdeckError::ValidationFailed(format!(
            "import file must be at most {} bytes",
            validate::MAX_IMPORT_HTML_BYTES
        )));
    }

    let tree = parse_netscape(html);
    let mut report = ImportReport::default();

    let tx = library.transaction()?;
    let workspace = match first_workspace_in_tx(&tx, user_id)? {
        Some(existing) => existing,
        None => create_workspace_in_tx(&tx, user_id, "Imported")?,
    };

    import_top_level(&tx, user_id, &workspace.id, &tree, strategy, &mut report)?;
    tx.commit()?;

    Ok(report)
}

/// Applies the top-level mapping rules to the parsed tree.
fn import_top_level(
    tx: &Transaction,
    user_id: &str,
    workspace_id: &str,
    nodes: &[ParsedNode],
    strategy: ImportStrategy,
    report: &mut ImportReport,
) -> Result<()> {
    for node in nodes {
        match node {
            ParsedNode::Bookmark(bookmark) => {
                // No enclosing folder to map it into.
                report
                    .warnings
                    .push(format!("Bookmark \"{}\" at root level, skipping", bookmark.title));
                report.bookmarks_skipped += 1;
            }
            ParsedNode::Folder(folder) if folder.is_page => {
                // Page containers are transparent: their children are
                // treated as if they sat at this level.
                import_top_level(tx, user_id, workspace_id, &folder.children, strategy, report)?;
            }
            ParsedNode::Folder(folder) if folder.is_tab_book => {
                let created = create_folder_in_tx(tx, user_id, workspace_id, &folder.title)?;
                report.folders_created += 1;

                for child in &folder.children {
                    match child {
                        ParsedNode::Bookmark(bookmark) => {
                            let group = unsorted_group(tx, user_id, &created.id, report)?;
                            import_bookmark(tx, user_id, &group, bookmark, report)?;
                        }
                        ParsedNode::Folder(subfolder) => {
                            let group =
                                create_group_in_tx(tx, user_id, &created.id, &subfolder.title)?;
                            report.groups_created += 1;
                            import_group_children(
                                tx,
                                user_id,
                                &group.id,
                                &subfolder.children,
                                strategy,
                                report,
                            )?;
                        }
                    }
                }
            }
            ParsedNode::Folder(folder) => {
                let created = create_folder_in_tx(tx, user_id, workspace_id, &folder.title)?;
                report.folders_created += 1;
                import_folder_children(tx, user_id, &created.id, &folder.children, strategy, report)?;
            }
        }
    }
    Ok(())
}

/// Maps a plain folder's children: bookmark leaves go to the folder's
/// "Unsorted" group, nested folders become groups.
fn import_folder_children(
    tx: &Transaction,
    user_id: &str,
    folder_id: &str,
    nodes: &[ParsedNode],
    strategy: ImportStrategy,
    report: &mut ImportReport,
) -> Result<()> {
    for node in nodes {
        match node {
            ParsedNode::Bookmark(bookmark) => {
                let group = unsorted_group(tx, user_id, folder_id, report)?;
                import_bookmark(tx, user_id, &group, bookmark, report)?;
            }
            ParsedNode::Folder(folder) => {
                let group = create_group_in_tx(tx, user_id, folder_id, &folder.title)?;
                report.groups_created += 1;
                import_group_children(tx, user_id, &group.id, &folder.children, strategy, report)?;
            }
        }
    }
    Ok(())
}

/// Maps a group's children. Bookmark leaves are created in the group; a
/// further-nested folder has no place in the model and falls to the
/// nesting-overflow strategy.
fn import_group_children(
    tx: &Transaction,
    user_id: &str,
    group_id: &str,
    nodes: &[ParsedNode],
    strategy: ImportStrategy,
    report: &mut ImportReport,
) -> Result<()> {
    for node in nodes {
        match node {
            ParsedNode::Bookmark(bookmark) => {
                import_bookmark(tx, user_id, group_id, bookmark, report)?;
            }
            ParsedNode::Folder(folder) => match strategy {
                ImportStrategy::Flatten => {
                    for bookmark in flatten_bookmarks(folder) {
                        import_bookmark(tx, user_id, group_id, bookmark, report)?;
                    }
                }
                ImportStrategy::Skip | ImportStrategy::Root => {
                    let count = count_bookmarks(folder);
                    report.bookmarks_skipped += count;
                    report.warnings.push(format!(
                        "Skipped {count} bookmarks in nested folder \"{}\"",
                        folder.title
                    ));
                }
            },
        }
    }
    Ok(())
}

/// Creates one bookmark, recovering from per-row failures: a bookmark the
/// store refuses is counted as skipped with a warning, and the import
/// carries on.
fn import_bookmark(
    tx: &Transaction,
    user_id: &str,
    group_id: &str,
    bookmark: &ParsedBookmark,
    report: &mut ImportReport,
) -> Result<()> {
    let title = if bookmark.title.trim().is_empty() {
        bookmark.url.clone()
    } else {
        bookmark.title.clone()
    };
    let data = NewBookmark {
        url: bookmark.url.clone(),
        title,
        description: String::new(),
        tags: Vec::new(),
    };
    match create_bookmark_in_tx(tx, user_id, group_id, &data) {
        Ok(_) => report.bookmarks_created += 1,
        Err(err) => {
            log::warn!("import: skipping bookmark \"{}\": {err}", bookmark.title);
            report
                .warnings
                .push(format!("Failed to import bookmark \"{}\": {err}", bookmark.title));
            report.bookmarks_skipped += 1;
        }
    }
    Ok(())
}

/// Get-or-create the folder's "Unsorted" group, counting a creation.
fn unsorted_group(
    tx: &Transaction,
    user_id: &str,
    folder_id: &str,
    report: &mut ImportReport,
) -> Result<String> {
    let (group, created) = get_or_create_group_in_tx(tx, user_id, folder_id, UNSORTED_GROUP_TITLE)?;
    if created {
        report.groups_created += 1;
    }
    Ok(group.id)
}

/// Every bookmark leaf anywhere under `folder`, depth-first.
fn flatten_bookmarks(folder: &ParsedFolder) -> Vec<&ParsedBookmark> {
    let mut bookmarks = Vec::new();
    for child in &folder.children {
        match child {
            ParsedNode::Bookmark(b) => bookmarks.push(b),
            ParsedNode::Folder(f) => bookmarks.extend(flatten_bookmarks(f)),
        }
    }
    bookmarks
}

/// Total bookmark leaves anywhere under `folder`.
fn count_bookmarks(folder: &ParsedFolder) -> usize {
    folder
        .children
        .iter()
        .map(|child| match child {
            ParsedNode::Bookmark(_) => 1,
            ParsedNode::Folder(f) => count_bookmarks(f),
        })
        .sum()
}

// ---- JSON export / import ------------------------------------------------

/// A full-fidelity export of one user's hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonExport {
    pub version: u32,
    pub exported_at: String,
    pub workspaces: Vec<JsonWorkspace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonWorkspace {
    pub title: String,
    pub position: i64,
    pub folders: Vec<JsonFolder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFolder {
    pub title: String,
    pub position: i64,
    pub groups: Vec<JsonGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonGroup {
    pub title: String,
    pub position: i64,
    pub bookmarks: Vec<JsonBookmark>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonBookmark {
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub position: i64,
}

/// Exports the user's full hierarchy as a [`JsonExport`] document.
pub fn export_json(library: &Library, user_id: &str) -> Result<JsonExport> {
    let state = library.get_state(user_id)?;

    let workspaces = state
        .workspaces
        .iter()
        .map(|workspace| JsonWorkspace {
            title: workspace.title.clone(),
            position: workspace.position,
            folders: state
                .folders
                .iter()
                .filter(|f| f.workspace_id == workspace.id)
                .map(|folder| JsonFolder {
                    title: folder.title.clone(),
                    position: folder.position,
                    groups: state
                        .groups
                        .iter()
                        .filter(|g| g.folder_id == folder.id)
                        .map(|group| JsonGroup {
                            title: group.title.clone(),
                            position: group.position,
                            bookmarks: state
                                .bookmarks
                                .iter()
                                .filter(|b| b.group_id == group.id)
                                .map(|bookmark| JsonBookmark {
                                    url: bookmark.url.clone(),
                                    title: bookmark.title.clone(),
                                    description: bookmark.description.clone(),
                                    tags: bookmark.tags.clone(),
                                    position: bookmark.position,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Ok(JsonExport {
        version: JSON_EXPORT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        workspaces,
    })
}

/// Imports a [`JsonExport`] document, creating fresh entities for
/// `user_id`. Entities are created in array order, which reproduces the
/// exported relative ordering under new dense positions; ids are never
/// reused from the document.
///
/// # Errors
///
/// Returns [`LinkdeckError::UnsupportedVersion`] before any write if the
/// document's version is not [`JSON_EXPORT_VERSION`].
pub fn import_json(
    library: &mut Library,
    user_id: &str,
    document: &JsonExport,
) -> Result<ImportReport> {
    if document.version != JSON_EXPORT_VERSION {
        return Err(LinkdeckError::UnsupportedVersion(document.version));
    }

    let mut report = ImportReport::default();
    let tx = library.transaction()?;

    for json_workspace in &document.workspaces {
        let workspace = create_workspace_in_tx(&tx, user_id, &json_workspace.title)?;

        for json_folder in &json_workspace.folders {
            let folder = create_folder_in_tx(&tx, user_id, &workspace.id, &json_folder.title)?;
            report.folders_created += 1;

            for json_group in &json_folder.groups {
                let group = create_group_in_tx(&tx, user_id, &folder.id, &json_group.title)?;
                report.groups_created += 1;

                for json_bookmark in &json_group.bookmarks {
                    let data = NewBookmark {
                        url: json_bookmark.url.clone(),
                        title: json_bookmark.title.clone(),
                        description: json_bookmark.description.clone(),
                        tags: json_bookmark.tags.clone(),
                    };
                    match create_bookmark_in_tx(&tx, user_id, &group.id, &data) {
                        Ok(_) => report.bookmarks_created += 1,
                        Err(err) => {
                            log::warn!(
                                "import: skipping bookmark \"{}\": {err}",
                                json_bookmark.title
                            );
                            report.warnings.push(format!(
                                "Failed to import bookmark \"{}\": {err}",
                                json_bookmark.title
                            ));
                            report.bookmarks_skipped += 1;
                        }
                    }
                }
            }
        }
    }

    tx.commit()?;
    Ok(report)
}
