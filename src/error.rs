//! Error types for the load and paint pipelines
//!
//! Every error here is caught at the boundary of the operation that produced
//! it (a finished load or a click) and turned into a log diagnostic. None of
//! them is allowed to reach the event loop.

use thiserror::Error;

use crate::gfx::scene::material::MaterialKind;

/// Failures of the archive → scene graph pipeline
#[derive(Debug, Error)]
pub enum LoadError {
    /// The uploaded bytes could not be read as a zip archive
    #[error("archive could not be read: {0}")]
    ArchiveFormat(#[from] zip::result::ZipError),

    /// The archive lacks the scene document or the binary payload
    #[error("required asset '{path}' is missing from the archive")]
    RequiredAssetMissing { path: String },

    /// The rewritten scene document was rejected
    #[error("scene could not be parsed: {reason}")]
    SceneParse {
        reason: String,
        #[source]
        source: Option<gltf::Error>,
    },

    /// A blob URI was dereferenced after release, or never issued
    #[error("no blob is registered for '{uri}'")]
    BlobNotFound { uri: String },
}

impl LoadError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::SceneParse {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        Self::SceneParse {
            reason: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::ArchiveFormat(zip::result::ZipError::Io(err))
    }
}

/// Failures of a paint request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaintError {
    /// Paint was requested before anything was picked
    #[error("nothing is selected")]
    NoSelection,

    /// The hit mesh uses a material that cannot carry vertex colors
    #[error("material '{name}' of kind {kind:?} cannot be recolored")]
    UnsupportedMaterial { name: String, kind: MaterialKind },

    /// The hit mesh has geometry but no material attached
    #[error("mesh '{mesh}' has no material")]
    MaterialMissing { mesh: String },
}

/// A paint color string that is not `#rgb` or `#rrggbb`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{input}' is not a hex color")]
pub struct ColorParseError {
    pub input: String,
}
