pub mod config;
pub mod hash;
pub mod ignore;
pub mod intent;
pub mod paths;
pub mod scope;
pub mod types;

pub use config::{ApprovalMode, TetherConfig};
pub use hash::{content_hash, NEW_FILE_SENTINEL};
pub use ignore::IgnoreFilter;
pub use intent::{CatalogError, IntentStore};
pub use paths::TetherPaths;
pub use scope::{normalize_rel_path, ScopeMatcher};
pub use types::*;
