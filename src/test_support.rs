//! Fixture builders shared by the unit tests

use std::io::{Cursor, Write};

use serde_json::{json, Value};
use zip::{write::FileOptions, ZipWriter};

/// Zips `files` (path, contents) after creating the `dirs` directory entries
pub(crate) fn zip_bytes(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    for dir in dirs {
        writer.add_directory(*dir, options).unwrap();
    }
    for (path, contents) in files {
        writer.start_file(*path, options).unwrap();
        writer.write_all(contents).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// A glTF document plus the binary payload it references as `scene.bin`
pub(crate) struct GltfFixture {
    pub document: Value,
    pub binary: Vec<u8>,
}

impl GltfFixture {
    /// One node drawing one indexed triangle-list mesh with one material
    pub fn mesh(positions: &[[f32; 3]], indices: &[u16]) -> Self {
        let mut binary = Vec::new();
        for p in positions {
            for c in p {
                binary.extend_from_slice(&c.to_le_bytes());
            }
        }
        let positions_len = binary.len();
        for i in indices {
            binary.extend_from_slice(&i.to_le_bytes());
        }

        let (min, max) = bounds(positions);
        let document = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "name": "fixture", "nodes": [0] }],
            "nodes": [{ "name": "body", "mesh": 0 }],
            "meshes": [{
                "name": "body",
                "primitives": [{
                    "attributes": { "POSITION": 0 },
                    "indices": 1,
                    "material": 0
                }]
            }],
            "materials": [{ "name": "surface" }],
            "accessors": [
                {
                    "bufferView": 0,
                    "componentType": 5126,
                    "count": positions.len(),
                    "type": "VEC3",
                    "min": min,
                    "max": max
                },
                {
                    "bufferView": 1,
                    "componentType": 5123,
                    "count": indices.len(),
                    "type": "SCALAR"
                }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": positions_len },
                {
                    "buffer": 0,
                    "byteOffset": positions_len,
                    "byteLength": binary.len() - positions_len
                }
            ],
            "buffers": [{ "uri": "scene.bin", "byteLength": binary.len() }]
        });

        Self { document, binary }
    }

    /// Single counter-clockwise triangle in the XY plane, facing +Z
    pub fn triangle() -> Self {
        Self::mesh(
            &[[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
            &[0, 1, 2],
        )
    }

    /// 2x2x2 cube centered on `center`, outward-facing
    pub fn cube(center: [f32; 3]) -> Self {
        let [x, y, z] = center;
        let positions: Vec<[f32; 3]> = (0..8)
            .map(|i| {
                [
                    x + if i & 1 == 0 { -1.0 } else { 1.0 },
                    y + if i & 2 == 0 { -1.0 } else { 1.0 },
                    z + if i & 4 == 0 { -1.0 } else { 1.0 },
                ]
            })
            .collect();
        #[rustfmt::skip]
        let indices: [u16; 36] = [
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        Self::mesh(&positions, &indices)
    }

    /// References `textures/<name>` as the base color texture of the material
    pub fn with_base_color_texture(mut self, name: &str) -> Self {
        self.document["images"] = json!([{ "uri": format!("textures/{}", name) }]);
        self.document["textures"] = json!([{ "source": 0 }]);
        self.document["materials"][0]["pbrMetallicRoughness"] =
            json!({ "baseColorTexture": { "index": 0 } });
        self
    }

    pub fn without_material(mut self) -> Self {
        if let Some(primitive) = self.document["meshes"][0]["primitives"][0].as_object_mut() {
            primitive.remove("material");
        }
        if let Some(root) = self.document.as_object_mut() {
            root.remove("materials");
        }
        self
    }

    /// Replaces the material with a specular-glossiness one
    pub fn with_specular_glossiness(mut self) -> Self {
        self.document["extensionsUsed"] = json!(["KHR_materials_pbrSpecularGlossiness"]);
        self.document["materials"][0]["extensions"] = json!({
            "KHR_materials_pbrSpecularGlossiness": { "diffuseFactor": [0.5, 0.5, 0.5, 1.0] }
        });
        self
    }

    /// Splits the mesh into two primitives sharing the same accessors
    pub fn with_duplicate_primitive(mut self) -> Self {
        let primitive = self.document["meshes"][0]["primitives"][0].clone();
        self.document["meshes"][0]["primitives"] = json!([primitive.clone(), primitive]);
        self
    }

    pub fn document_text(&self) -> String {
        self.document.to_string()
    }

    /// Zip bundle with `scene.gltf`, `scene.bin` and every `(name, bytes)` under `textures/`
    pub fn bundle(&self, textures: &[(&str, &[u8])]) -> Vec<u8> {
        let document = self.document_text();
        let texture_paths: Vec<String> = textures
            .iter()
            .map(|(name, _)| format!("textures/{}", name))
            .collect();

        let mut files: Vec<(&str, &[u8])> = vec![
            ("scene.gltf", document.as_bytes()),
            ("scene.bin", self.binary.as_slice()),
        ];
        for (path, (_, bytes)) in texture_paths.iter().zip(textures) {
            files.push((path.as_str(), *bytes));
        }

        zip_bytes(&files, &["textures/"])
    }
}

fn bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}
