//! Append-only snapshot persistence: every pipeline stage writes a fresh
//! Markdown file with a front-matter header, intermediates in one directory
//! and approved/final drafts in another.

pub mod parser;
pub mod store;
pub mod types;

pub use parser::{read_meta, read_snapshot};
pub use store::SnapshotStore;
pub use types::{
    topic_slug, Approval, PersistenceError, SnapshotInput, SnapshotMeta, Stage, StoredSnapshot,
    DEFAULT_OUTPUT_DIR, DEFAULT_WORKPRODUCT_DIR,
};
