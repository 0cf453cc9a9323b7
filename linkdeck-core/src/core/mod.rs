//! Internal domain modules for the Linkdeck core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod error;
pub mod import;
pub mod library;
pub mod model;
pub mod netscape;
pub mod ordering;
pub mod storage;
pub mod validate;

#[doc(inline)]
pub use error::{LinkdeckError, Result};
#[doc(inline)]
pub use import::{
    export_json, import_json, import_netscape, ImportReport, ImportStrategy, JsonBookmark,
    JsonExport, JsonFolder, JsonGroup, JsonWorkspace, JSON_EXPORT_VERSION,
};
#[doc(inline)]
pub use library::{BookmarkPatch, Credentials, Library, NewBookmark, PreferencesPatch};
#[doc(inline)]
pub use model::{
    AppState, Bookmark, BookmarkViewMode, Folder, Group, User, UserPreferences, ViewMode,
    Workspace,
};
#[doc(inline)]
pub use netscape::{export_netscape, parse_netscape, ParsedBookmark, ParsedFolder, ParsedNode};
#[doc(inline)]
pub use storage::Storage;
