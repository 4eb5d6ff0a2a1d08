//! # Templates — Diff-Based Persistence
//!
//! Entities are persisted as templates. A template derived from another one is
//! a variant and stores only what it changes; loading replays the chain of
//! diffs from the root template down.
//!
//! ## Module Overview
//!
//! - [`blob`] — [`BlobStore`], the key → bytes seam, with memory and directory backends
//! - [`delta`] — [`StoredTemplate`] diffs and the [`ResolvedState`] they fold into
//! - [`store`] — [`TemplateStore`]: identity rules, saving, chain resolution, eager cache

pub mod blob;
pub mod delta;
pub mod store;

#[cfg(feature = "fs")]
pub use blob::DirBlobStore;
pub use blob::{BlobStore, MemoryBlobStore};
pub use delta::{ComponentDelta, ResolvedState, StoredTemplate};
pub use store::{PersistentData, TemplateStore};
