//! In-memory blob handles
//!
//! The [`BlobStore`] plays the part of a browser's object-URL registry: it
//! keeps byte payloads alive under `blob:` URIs that can be written into a
//! scene document and dereferenced later. A [`BlobHandle`] owns its entry and
//! revokes it on drop, so whoever holds the handles decides how long the
//! payloads live.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    rc::{Rc, Weak},
};

use log::{debug, warn};

use crate::error::LoadError;

const URI_SCHEME: &str = "blob:meshpaint/";

/// A registered payload
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Rc<[u8]>,
    pub content_type: String,
}

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    blobs: HashMap<String, Blob>,
}

/// Registry of live blobs, shared by everything on the UI thread
#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` and returns the handle that keeps them alive
    pub fn create(&self, bytes: Vec<u8>, content_type: &str) -> BlobHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let uri = format!("{}{}", URI_SCHEME, inner.next_id);

        debug!("blob {} created ({} bytes, {})", uri, bytes.len(), content_type);
        inner.blobs.insert(
            uri.clone(),
            Blob {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );

        BlobHandle {
            uri,
            store: Rc::downgrade(&self.inner),
        }
    }

    /// Looks up a live blob
    pub fn get(&self, uri: &str) -> Option<Blob> {
        self.inner.borrow().blobs.get(uri).cloned()
    }

    /// Dereferences a blob URI the way a resource fetch would
    pub async fn fetch(&self, uri: &str) -> Result<Blob, LoadError> {
        self.get(uri).ok_or_else(|| LoadError::BlobNotFound {
            uri: uri.to_string(),
        })
    }

    /// Number of blobs not yet released
    pub fn live_count(&self) -> usize {
        self.inner.borrow().blobs.len()
    }

    /// Whether `uri` was issued by a blob store
    pub fn is_blob_uri(uri: &str) -> bool {
        uri.starts_with(URI_SCHEME)
    }
}

/// Owning handle to one registered blob; dropping it releases the blob
#[derive(Debug)]
pub struct BlobHandle {
    uri: String,
    store: Weak<RefCell<StoreInner>>,
}

impl BlobHandle {
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        // A handle can be dropped while the store is borrowed during a panic unwind.
        let Ok(mut inner) = store.try_borrow_mut() else {
            warn!("blob {} could not be released, store is busy", self.uri);
            return;
        };
        if inner.blobs.remove(&self.uri).is_some() {
            debug!("blob {} released", self.uri);
        }
    }
}

/// A resolved payload together with the archive path it came from
#[derive(Debug)]
pub struct ResolvedAsset {
    pub path: String,
    pub handle: BlobHandle,
}

/// Basename → URI lookup handed to the reference rewriter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    /// Canonical name of the binary payload and its URI
    pub binary: Option<(String, String)>,
    /// Texture basename → URI
    pub textures: HashMap<String, String>,
}

/// Every handle issued for one upload
///
/// Dropping the set releases all of its blobs. The viewer keeps the set of the
/// model on screen and drops it when a newer model is installed.
#[derive(Debug, Default)]
pub struct ResolvedAssetSet {
    binary: Option<(String, ResolvedAsset)>,
    textures: BTreeMap<String, ResolvedAsset>,
    document: Option<BlobHandle>,
}

impl ResolvedAssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the binary payload under its canonical reference name
    pub fn set_binary(&mut self, canonical_name: &str, asset: ResolvedAsset) {
        self.binary = Some((canonical_name.to_string(), asset));
    }

    /// Records a texture keyed by basename, replacing any earlier one of that name
    pub fn insert_texture(&mut self, basename: &str, asset: ResolvedAsset) {
        if let Some(previous) = self.textures.insert(basename.to_string(), asset) {
            warn!(
                "texture '{}' shadows '{}' with the same file name",
                basename, previous.path
            );
        }
    }

    /// Records the rewritten scene document
    pub fn set_document(&mut self, handle: BlobHandle) {
        self.document = Some(handle);
    }

    pub fn binary_uri(&self) -> Option<&str> {
        self.binary.as_ref().map(|(_, a)| a.handle.uri())
    }

    pub fn texture_uri(&self, basename: &str) -> Option<&str> {
        self.textures.get(basename).map(|a| a.handle.uri())
    }

    pub fn document_uri(&self) -> Option<&str> {
        self.document.as_ref().map(BlobHandle::uri)
    }

    pub fn texture_names(&self) -> impl Iterator<Item = &str> {
        self.textures.keys().map(String::as_str)
    }

    /// Number of handles held
    pub fn len(&self) -> usize {
        usize::from(self.binary.is_some()) + self.textures.len() + usize::from(self.document.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The lookup the reference rewriter needs
    pub fn reference_map(&self) -> ReferenceMap {
        ReferenceMap {
            binary: self
                .binary
                .as_ref()
                .map(|(name, asset)| (name.clone(), asset.handle.uri().to_string())),
            textures: self
                .textures
                .iter()
                .map(|(name, asset)| (name.clone(), asset.handle.uri().to_string()))
                .collect(),
        }
    }
}
