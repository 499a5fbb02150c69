//! # Asset Loading
//!
//! Everything between an uploaded archive and a built [`SceneGraph`](crate::gfx::scene::SceneGraph):
//!
//! - [`archive`] - zip reading by exact path
//! - [`blob`] - `blob:` URI registry and the handles that keep payloads alive
//! - [`rewrite`] - pointing the scene document's references at those URIs
//! - [`loader`] - parsing the rewritten document into a scene graph

pub mod archive;
pub mod blob;
pub mod loader;
pub mod rewrite;

pub use archive::{Archive, ArchiveEntry};
pub use blob::{Blob, BlobHandle, BlobStore, ResolvedAssetSet};
pub use loader::{load_archive, normalize_model, LoadReport, LoadedModel, ModelBounds};
pub use rewrite::rewrite_references;
