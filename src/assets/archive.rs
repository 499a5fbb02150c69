//! Zip archive reader
//!
//! Opens an uploaded bundle and hands out entries by exact path. Entry data is
//! decompressed lazily, only when asked for.

use std::io::{Cursor, Read};

use zip::{result::ZipError, ZipArchive};

use crate::error::LoadError;

/// Upper bound on the buffer reserved up front for one entry
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// One line of the archive's directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// Final path component, e.g. `albedo.png` for `textures/albedo.png`
    pub fn basename(&self) -> &str {
        basename(&self.path)
    }
}

/// An opened archive
pub struct Archive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Opens raw archive bytes
    ///
    /// Fails with [`LoadError::ArchiveFormat`] if the bytes are not a zip file.
    pub fn open(bytes: Vec<u8>) -> Result<Self, LoadError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;

        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let file = zip.by_index_raw(i)?;
            entries.push(ArchiveEntry {
                path: file.name().to_string(),
                is_dir: file.is_dir(),
            });
        }

        Ok(Self { zip, entries })
    }

    /// Directory listing in archive order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Whether a file (not a directory) exists at exactly `path`
    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| !e.is_dir && e.path == path)
    }

    /// Decompresses the entry at exactly `path`, or `None` if there is none
    pub fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, LoadError> {
        let mut file = match self.zip.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if file.is_dir() {
            return Ok(None);
        }

        // The declared size comes from the archive and may be garbage
        let hint = file.size().min(MAX_PREALLOC);
        let mut data = Vec::with_capacity(hint as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Like [`Archive::read`] but a missing entry is a [`LoadError::RequiredAssetMissing`]
    pub fn read_required(&mut self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.read(path)?
            .ok_or_else(|| LoadError::RequiredAssetMissing {
                path: path.to_string(),
            })
    }

    /// Every file under `prefix`, as `(basename, full path)` pairs
    ///
    /// Directory entries are skipped. If two files share a basename the later
    /// one in archive order shadows the earlier when collected into a map.
    pub fn files_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .iter()
            .filter(move |e| !e.is_dir && e.path.starts_with(prefix))
            .map(|e| (e.basename(), e.path.as_str()))
            .filter(|(name, _)| !name.is_empty())
    }
}

/// Final `/`-separated component of a path or URI
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Content type assigned to a payload by its file extension
pub fn content_type_for(path: &str) -> &'static str {
    let ext = basename(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("gltf") => "model/gltf+json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("ktx2") => "image/ktx2",
        _ => "application/octet-stream",
    }
}
