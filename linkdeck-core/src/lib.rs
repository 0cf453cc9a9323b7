//! Core library for Linkdeck — a self-hosted, hierarchical bookmark manager.
//!
//! Bookmarks live in a four-level hierarchy (workspace → folder → group →
//! bookmark) with dense integer ordering inside every sibling scope. The
//! primary entry point is [`Library`], which wraps a [`Storage`] (SQLite)
//! connection and exposes ownership-checked CRUD, reorder/move operations,
//! and import/export in the Netscape bookmark-HTML and Linkdeck JSON
//! formats.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core`
//! module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    error::{LinkdeckError, Result},
    import::{
        export_json, import_json, import_netscape, ImportReport, ImportStrategy, JsonBookmark,
        JsonExport, JsonFolder, JsonGroup, JsonWorkspace, JSON_EXPORT_VERSION,
    },
    library::{BookmarkPatch, Credentials, Library, NewBookmark, PreferencesPatch},
    model::{
        AppState, Bookmark, BookmarkViewMode, Folder, Group, User, UserPreferences, ViewMode,
        Workspace,
    },
    netscape::{export_netscape, parse_netscape, ParsedBookmark, ParsedFolder, ParsedNode},
    storage::Storage,
};
