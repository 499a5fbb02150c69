//! Archive → scene graph loading
//!
//! [`load_archive`] runs the whole upload pipeline: open the zip, register the
//! binary payload and textures as blobs, rewrite the scene document to point
//! at them, then parse the document and build a [`SceneGraph`]. Nothing here
//! touches the live scene; the caller installs the result.

use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cgmath::{Quaternion, Vector3};
use gltf::{buffer, image, mesh::Mode, Gltf};
use log::{debug, error, info, log, warn, Level};

use super::{
    archive::{basename, content_type_for, Archive},
    blob::{BlobStore, ResolvedAsset, ResolvedAssetSet},
    rewrite::{rewrite_references, Rewritten},
};
use crate::{
    config::ArchiveLayout,
    error::LoadError,
    gfx::scene::{
        graph::{MeshId, NodeId, SceneGraph, Transform},
        material::{Material, MaterialId, MaterialKind, Side, TextureChannels, TextureRef},
        mesh::{ColorAttribute, Mesh},
    },
};

/// Diagnostics collected while loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub buffer_count: usize,
    pub mesh_count: usize,
    pub texture_count: usize,
    /// Names of meshes drawn with no material
    pub meshes_without_material: Vec<String>,
    /// `uri` values the rewriter could not map to a packed file
    pub unresolved_references: Vec<String>,
}

/// A fully built model, ready to be installed
#[derive(Debug)]
pub struct LoadedModel {
    pub graph: SceneGraph,
    /// Handles keeping the model's blobs alive
    pub assets: ResolvedAssetSet,
    pub report: LoadReport,
}

/// World-space bounds of a model before it was recentered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBounds {
    pub center: Vector3<f32>,
    pub size: Vector3<f32>,
}

/// Loads an uploaded archive into a scene graph
///
/// Fails without side effects on the live scene; blobs registered along the
/// way are released when the error is returned.
pub async fn load_archive(
    bytes: Vec<u8>,
    store: BlobStore,
    layout: ArchiveLayout,
) -> Result<LoadedModel, LoadError> {
    let mut archive = Archive::open(bytes)?;
    debug!("archive opened, {} entries", archive.entries().len());

    let document = archive.read_required(&layout.document)?;
    let binary = archive.read_required(&layout.binary)?;
    let document = String::from_utf8(document)
        .map_err(|err| LoadError::parse(format!("{} is not UTF-8: {}", layout.document, err)))?;

    let mut assets = ResolvedAssetSet::new();
    assets.set_binary(
        basename(&layout.binary),
        ResolvedAsset {
            path: layout.binary.clone(),
            handle: store.create(binary, content_type_for(&layout.binary)),
        },
    );

    let texture_paths: Vec<(String, String)> = archive
        .files_under(&layout.texture_prefix)
        .map(|(name, path)| (name.to_string(), path.to_string()))
        .collect();
    for (name, path) in texture_paths {
        let Some(data) = archive.read(&path)? else {
            continue;
        };
        let handle = store.create(data, content_type_for(&path));
        info!("texture {} loaded as {}", name, handle.uri());
        assets.insert_texture(&name, ResolvedAsset { path, handle });
    }

    let Rewritten {
        document,
        replaced,
        unresolved,
    } = rewrite_references(&document, &assets.reference_map());
    debug!("{} references rewritten", replaced);
    for reference in &unresolved {
        warn!("reference '{}' does not name a packed file", reference);
    }

    let document_handle = store.create(document.into_owned().into_bytes(), "application/json");
    let document_uri = document_handle.uri().to_string();
    assets.set_document(document_handle);

    let document = store.fetch(&document_uri).await?;
    let gltf = Gltf::from_slice(&document.bytes)?;

    let buffers = resolve_buffers(&gltf, &store).await?;
    if buffers.is_empty() {
        error!("scene document references no binary buffer");
    } else if let Some(first) = gltf.buffers().next() {
        if let buffer::Source::Uri(uri) = first.source() {
            info!("binary buffer detected: {}", uri);
        }
    }
    check_images(&gltf, &store);

    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let root_name = scene.as_ref().and_then(|s| s.name()).unwrap_or("scene");
    let mut graph = SceneGraph::new(root_name);

    let materials: Vec<MaterialId> = gltf
        .materials()
        .map(|m| graph.add_material(convert_material(&m)))
        .collect();

    let mut mesh_parts: Vec<Vec<MeshId>> = Vec::with_capacity(gltf.meshes().len());
    for mesh in gltf.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh {}", mesh.index()));
        let primitive_count = mesh.primitives().count();

        let mut parts = Vec::with_capacity(primitive_count);
        for primitive in mesh.primitives() {
            let name = if primitive_count > 1 {
                format!("{} #{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            };
            let Some(mut part) = read_primitive(&primitive, &buffers, &name)? else {
                continue;
            };

            part.material = primitive
                .material()
                .index()
                .and_then(|i| materials.get(i).copied());
            if part.colors.is_some() {
                if let Some(material) = part.material.and_then(|m| graph.materials_mut().get_mut(m)) {
                    material.vertex_colors = true;
                }
            }
            parts.push(graph.add_mesh(part));
        }
        mesh_parts.push(parts);
    }

    if let Some(scene) = &scene {
        let mut visited = vec![false; gltf.nodes().len()];
        let root = graph.root();
        for node in scene.nodes() {
            add_node(&mut graph, root, node, &mesh_parts, &mut visited);
        }
    } else {
        warn!("scene document defines no scene");
    }

    let report = LoadReport {
        buffer_count: buffers.len(),
        mesh_count: graph.meshes().count(),
        texture_count: assets.texture_names().count(),
        meshes_without_material: audit_materials(&graph),
        unresolved_references: unresolved,
    };
    info!(
        "model '{}' loaded: {} meshes, {} buffers, {} textures",
        root_name, report.mesh_count, report.buffer_count, report.texture_count
    );

    Ok(LoadedModel {
        graph,
        assets,
        report,
    })
}

/// Translates the graph root so the model's bounding box is centered on the origin
///
/// Returns the bounds measured before the move, or `None` for a model with no geometry.
pub fn normalize_model(graph: &mut SceneGraph) -> Option<ModelBounds> {
    let bounds = graph.bounding_box()?;
    let center = bounds.center();

    let root = graph.root();
    if let Some(node) = graph.node_mut(root) {
        node.transform.translation -= center;
    }

    Some(ModelBounds {
        center,
        size: bounds.size(),
    })
}

async fn resolve_buffers(gltf: &Gltf, store: &BlobStore) -> Result<Vec<Rc<[u8]>>, LoadError> {
    let mut buffers = Vec::with_capacity(gltf.buffers().len());

    for buffer in gltf.buffers() {
        let data: Rc<[u8]> = match buffer.source() {
            buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(Rc::from)
                .ok_or_else(|| LoadError::parse("binary chunk referenced but not present"))?,
            buffer::Source::Uri(uri) if BlobStore::is_blob_uri(uri) => store.fetch(uri).await?.bytes,
            buffer::Source::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri)?.into(),
            buffer::Source::Uri(uri) => {
                return Err(LoadError::parse(format!(
                    "buffer {} references '{}', which is not in the archive",
                    buffer.index(),
                    uri
                )))
            }
        };

        if data.len() < buffer.length() {
            return Err(LoadError::parse(format!(
                "buffer {} is {} bytes, expected at least {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }

    Ok(buffers)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let (_, payload) = uri
        .split_once(";base64,")
        .ok_or_else(|| LoadError::parse("only base64 data URIs are supported"))?;
    STANDARD
        .decode(payload)
        .map_err(|err| LoadError::parse(format!("invalid data URI: {}", err)))
}

/// Warns about images that cannot be resolved; textures are optional
fn check_images(gltf: &Gltf, store: &BlobStore) {
    for image in gltf.images() {
        if let image::Source::Uri { uri, .. } = image.source() {
            if BlobStore::is_blob_uri(uri) {
                if store.get(uri).is_none() {
                    warn!("image {} points at released blob {}", image.index(), uri);
                }
            } else if !uri.starts_with("data:") {
                warn!("image {} ('{}') is not packed in the archive", image.index(), uri);
            }
        }
    }
}

fn texture_ref(texture: gltf::Texture<'_>) -> TextureRef {
    let image = texture.source();
    let name = match (image.name(), image.source()) {
        (Some(name), _) => name.to_string(),
        (None, image::Source::Uri { uri, .. }) => uri.to_string(),
        (None, image::Source::View { .. }) => format!("image {}", image.index()),
    };
    TextureRef {
        image: image.index(),
        name,
    }
}

fn convert_material(material: &gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let metallic_roughness = pbr.metallic_roughness_texture().map(|t| texture_ref(t.texture()));
    let mut textures = TextureChannels {
        base_color: pbr.base_color_texture().map(|t| texture_ref(t.texture())),
        normal: material.normal_texture().map(|t| texture_ref(t.texture())),
        metalness: metallic_roughness.clone(),
        roughness: metallic_roughness,
    };

    let (kind, base_color) = if let Some(spec_gloss) = material.pbr_specular_glossiness() {
        if let Some(diffuse) = spec_gloss.diffuse_texture() {
            textures.base_color = Some(texture_ref(diffuse.texture()));
        }
        (MaterialKind::SpecularGlossiness, spec_gloss.diffuse_factor())
    } else if material.unlit() {
        (MaterialKind::Basic, pbr.base_color_factor())
    } else {
        (MaterialKind::Standard, pbr.base_color_factor())
    };

    let name = match (material.name(), material.index()) {
        (Some(name), _) => name.to_string(),
        (None, Some(index)) => format!("material {}", index),
        (None, None) => "default".to_string(),
    };
    let side = if material.double_sided() {
        Side::Double
    } else {
        Side::Front
    };

    Material::new(&name, kind)
        .with_base_color(base_color)
        .with_metallic_roughness(pbr.metallic_factor(), pbr.roughness_factor())
        .with_side(side)
        .with_textures(textures)
}

/// Reads one primitive as a triangle list, `None` for primitives that aren't triangles
fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[Rc<[u8]>],
    name: &str,
) -> Result<Option<Mesh>, LoadError> {
    let mode = primitive.mode();
    if !matches!(mode, Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan) {
        debug!("skipping {:?} primitive of '{}'", mode, name);
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
    let Some(positions) = reader.read_positions() else {
        warn!("primitive of '{}' has no positions", name);
        return Ok(None);
    };
    let positions: Vec<[f32; 3]> = positions.collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(LoadError::parse(format!(
            "'{}' references vertex {} but has only {}",
            name,
            bad,
            positions.len()
        )));
    }
    let indices = triangulate(mode, &indices);

    let normals: Option<Vec<[f32; 3]>> = reader
        .read_normals()
        .map(Iterator::collect)
        .filter(|n: &Vec<[f32; 3]>| n.len() == positions.len());
    let mesh = match normals {
        Some(normals) => Mesh::with_normals(name, positions, normals, indices),
        None => Mesh::new(name, positions, indices),
    };

    let colors = reader
        .read_colors(0)
        .map(|c| c.into_rgb_f32().collect::<Vec<_>>())
        .filter(|c| c.len() == mesh.vertex_count());
    Ok(Some(match colors {
        Some(colors) => mesh.with_colors(ColorAttribute::from_colors(colors)),
        None => mesh,
    }))
}

/// Converts strip and fan index orders into a plain triangle list
fn triangulate(mode: Mode, indices: &[u32]) -> Vec<u32> {
    match mode {
        Mode::TriangleStrip => (0..indices.len().saturating_sub(2))
            .flat_map(|i| {
                // Every other triangle is flipped to keep the winding consistent
                if i % 2 == 0 {
                    [indices[i], indices[i + 1], indices[i + 2]]
                } else {
                    [indices[i + 2], indices[i + 1], indices[i]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..indices.len().saturating_sub(1))
            .flat_map(|i| [indices[0], indices[i], indices[i + 1]])
            .collect(),
        _ => indices[..indices.len() / 3 * 3].to_vec(),
    }
}

fn add_node(
    graph: &mut SceneGraph,
    parent: NodeId,
    node: gltf::Node<'_>,
    mesh_parts: &[Vec<MeshId>],
    visited: &mut [bool],
) {
    match visited.get_mut(node.index()) {
        Some(seen) if !*seen => *seen = true,
        _ => {
            warn!("node {} is reachable twice, skipping", node.index());
            return;
        }
    }

    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.index()));
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        translation: translation.into(),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };

    let parts = node
        .mesh()
        .and_then(|m| mesh_parts.get(m.index()))
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    // A mesh with several primitives becomes a group with one child per primitive
    let id = match parts {
        [single] => graph.add_mesh_node(parent, &name, transform, *single),
        _ => {
            let id = graph.add_node(parent, &name, transform);
            for (i, part) in parts.iter().enumerate() {
                graph.add_mesh_node(id, &format!("{} #{}", name, i), Transform::default(), *part);
            }
            id
        }
    };

    for child in node.children() {
        add_node(graph, id, child, mesh_parts, visited);
    }
}

/// Logs the texture channels of every mesh, returning the meshes with no material
fn audit_materials(graph: &SceneGraph) -> Vec<String> {
    let mut missing = Vec::new();

    for (_, mesh) in graph.meshes() {
        let Some(material) = mesh.material.and_then(|m| graph.materials().get(m)) else {
            error!("mesh '{}' has geometry but no material", mesh.name);
            missing.push(mesh.name.clone());
            continue;
        };

        for (channel, texture) in material.textures.iter() {
            let level = channel_log_level(channel, texture.is_some());
            match texture {
                Some(texture) => log!(level, "{}: {} texture '{}'", mesh.name, channel, texture.name),
                None => log!(level, "{}: no {} texture", mesh.name, channel),
            }
        }
    }

    missing
}

/// A missing albedo map is worth a warning; other channels are informational
fn channel_log_level(channel: &str, present: bool) -> Level {
    if !present && channel == "base color" {
        Level::Warn
    } else {
        Level::Info
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;
    use pollster::block_on;

    use super::*;
    use crate::test_support::{zip_bytes, GltfFixture};

    fn load(bytes: Vec<u8>, store: &BlobStore) -> Result<LoadedModel, LoadError> {
        block_on(load_archive(bytes, store.clone(), ArchiveLayout::default()))
    }

    #[test]
    fn test_texture_channels_log_at_info_or_above() {
        assert_eq!(channel_log_level("base color", false), Level::Warn);
        assert_eq!(channel_log_level("base color", true), Level::Info);
        assert_eq!(channel_log_level("normal", false), Level::Info);
        assert_eq!(channel_log_level("roughness", true), Level::Info);
        assert!(channel_log_level("normal", false) <= log::LevelFilter::Info);
    }

    #[test]
    fn test_cube_loads_as_single_mesh_node() {
        let store = BlobStore::new();
        let model = load(GltfFixture::cube([10.0, 0.0, 0.0]).bundle(&[]), &store).unwrap();

        assert_eq!(model.graph.mesh_nodes().count(), 1);
        assert_eq!(model.report.mesh_count, 1);
        assert_eq!(model.report.buffer_count, 1);
        assert!(model.report.meshes_without_material.is_empty());

        let mesh = model.graph.meshes().next().unwrap().1;
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.material.map(MaterialId::index), Some(0));
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn test_normalize_centers_bounds() {
        let store = BlobStore::new();
        let mut model = load(GltfFixture::cube([10.0, 0.0, 0.0]).bundle(&[]), &store).unwrap();

        let bounds = normalize_model(&mut model.graph).unwrap();
        assert!((bounds.center - Vector3::new(10.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert!((bounds.size - Vector3::new(2.0, 2.0, 2.0)).magnitude() < 1e-5);

        let recentered = model.graph.bounding_box().unwrap();
        assert!(recentered.center().magnitude() < 1e-5);
    }

    #[test]
    fn test_missing_binary_or_document() {
        let store = BlobStore::new();
        let fixture = GltfFixture::triangle();
        let document = fixture.document_text();

        let no_binary = zip_bytes(&[("scene.gltf", document.as_bytes())], &[]);
        match load(no_binary, &store) {
            Err(LoadError::RequiredAssetMissing { path }) => assert_eq!(path, "scene.bin"),
            other => panic!("expected missing binary, got {:?}", other.map(|_| ())),
        }

        let no_document = zip_bytes(&[("scene.bin", &fixture.binary)], &[]);
        match load(no_document, &store) {
            Err(LoadError::RequiredAssetMissing { path }) => assert_eq!(path, "scene.gltf"),
            other => panic!("expected missing document, got {:?}", other.map(|_| ())),
        }

        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_not_a_zip() {
        let store = BlobStore::new();
        let result = load(b"plain text".to_vec(), &store);
        assert!(matches!(result, Err(LoadError::ArchiveFormat(_))));
    }

    #[test]
    fn test_parse_failure_releases_blobs() {
        let store = BlobStore::new();
        let bytes = zip_bytes(
            &[("scene.gltf", b"{ not json"), ("scene.bin", b"\0\0\0\0")],
            &[],
        );

        let result = load(bytes, &store);
        assert!(matches!(result, Err(LoadError::SceneParse { .. })));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_textures_are_resolved_through_blobs() {
        let store = BlobStore::new();
        let fixture = GltfFixture::triangle().with_base_color_texture("albedo.png");
        let model = load(fixture.bundle(&[("albedo.png", b"\x89PNG")]), &store).unwrap();

        assert_eq!(model.report.texture_count, 1);
        assert!(model.report.unresolved_references.is_empty());

        let texture_uri = model.assets.texture_uri("albedo.png").unwrap().to_string();
        assert!(BlobStore::is_blob_uri(&texture_uri));
        let blob = store.get(&texture_uri).unwrap();
        assert_eq!(blob.content_type, "image/png");

        let (_, material) = model.graph.materials().iter().next().unwrap();
        assert_eq!(material.textures.base_color.as_ref().unwrap().name, texture_uri);
        assert!(material.textures.normal.is_none());

        // binary, texture and rewritten document
        assert_eq!(store.live_count(), 3);
        drop(model);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_unpacked_texture_is_reported_but_load_succeeds() {
        let store = BlobStore::new();
        let fixture = GltfFixture::triangle().with_base_color_texture("missing.png");
        let model = load(fixture.bundle(&[]), &store).unwrap();

        assert_eq!(model.report.unresolved_references, vec!["textures/missing.png"]);
    }

    #[test]
    fn test_mesh_without_material_is_reported() {
        let store = BlobStore::new();
        let model = load(GltfFixture::triangle().without_material().bundle(&[]), &store).unwrap();

        assert_eq!(model.report.meshes_without_material, vec!["body"]);
        assert!(model.graph.meshes().next().unwrap().1.material.is_none());
    }

    #[test]
    fn test_material_kinds() {
        let store = BlobStore::new();
        let model = load(
            GltfFixture::triangle().with_specular_glossiness().bundle(&[]),
            &store,
        )
        .unwrap();

        let (_, material) = model.graph.materials().iter().next().unwrap();
        assert_eq!(material.kind, MaterialKind::SpecularGlossiness);
        assert_eq!(material.base_color, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_multi_primitive_mesh_becomes_group() {
        let store = BlobStore::new();
        let model = load(
            GltfFixture::triangle().with_duplicate_primitive().bundle(&[]),
            &store,
        )
        .unwrap();

        let graph = &model.graph;
        let top = graph.node(graph.root()).unwrap().children.clone();
        assert_eq!(top.len(), 1);

        let group = graph.node(top[0]).unwrap();
        assert!(group.mesh.is_none());
        assert_eq!(group.children.len(), 2);
        assert_eq!(graph.mesh_nodes().count(), 2);
    }

    #[test]
    fn test_triangulate_strip_and_fan() {
        assert_eq!(
            triangulate(Mode::TriangleStrip, &[0, 1, 2, 3]),
            vec![0, 1, 2, 3, 2, 1]
        );
        assert_eq!(
            triangulate(Mode::TriangleFan, &[0, 1, 2, 3]),
            vec![0, 1, 2, 0, 2, 3]
        );
        assert_eq!(triangulate(Mode::Triangles, &[0, 1, 2, 3]), vec![0, 1, 2]);
    }

    #[test]
    fn test_data_uri_decoding() {
        assert_eq!(
            decode_data_uri("data:application/octet-stream;base64,AAEC").unwrap(),
            vec![0, 1, 2]
        );
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(LoadError::SceneParse { .. })
        ));
    }
}
