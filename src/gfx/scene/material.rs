//! Material definitions
//!
//! Materials live in a [`MaterialLibrary`] owned by the scene graph and meshes
//! reference them by [`MaterialId`]. Several meshes may share one material;
//! painting gives a mesh its own copy first (see [`crate::paint`]).

/// Index of a material inside its [`MaterialLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Metallic-roughness PBR
    Standard,
    /// Blinn-Phong
    Phong,
    /// Unlit
    Basic,
    /// Legacy specular-glossiness PBR; rendered through a custom path that
    /// ignores vertex colors
    SpecularGlossiness,
}

impl MaterialKind {
    /// Whether painting may switch this material to per-vertex colors
    pub fn supports_vertex_colors(self) -> bool {
        matches!(self, Self::Standard | Self::Phong | Self::Basic)
    }

    pub fn is_unlit(self) -> bool {
        self == Self::Basic
    }
}

/// Which faces are rendered and hit by picking rays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Double,
}

/// A texture bound to one material channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    /// Image index in the scene document
    pub image: usize,
    /// Image name or source reference, for diagnostics
    pub name: String,
}

/// Texture channels a material can carry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureChannels {
    pub base_color: Option<TextureRef>,
    pub normal: Option<TextureRef>,
    pub metalness: Option<TextureRef>,
    pub roughness: Option<TextureRef>,
}

impl TextureChannels {
    /// `(channel name, texture)` for every channel, present or not
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&TextureRef>)> {
        [
            ("base color", self.base_color.as_ref()),
            ("normal", self.normal.as_ref()),
            ("metalness", self.metalness.as_ref()),
            ("roughness", self.roughness.as_ref()),
        ]
        .into_iter()
    }
}

/// Surface appearance of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub side: Side,
    pub textures: TextureChannels,
    /// Multiply the base color by the mesh's per-vertex colors
    pub vertex_colors: bool,
    version: u64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            kind: MaterialKind::Standard,
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
            side: Side::Front,
            textures: TextureChannels::default(),
            vertex_colors: false,
            version: 0,
        }
    }
}

impl Material {
    pub fn new(name: &str, kind: MaterialKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ..Default::default()
        }
    }

    /// Builder pattern: Set base color from RGBA values
    pub fn with_base_color(mut self, base_color: [f32; 4]) -> Self {
        self.base_color = base_color;
        self
    }

    pub fn with_metallic_roughness(mut self, metallic: f32, roughness: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_textures(mut self, textures: TextureChannels) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_vertex_colors(mut self, enabled: bool) -> Self {
        self.vertex_colors = enabled;
        self
    }

    /// Bumped whenever the material needs to be re-uploaded
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn mark_dirty(&mut self) {
        self.version += 1;
    }
}

/// Storage for every material of one scene graph
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    /// Adds a copy of `id` under a new name and returns the copy's id
    pub fn duplicate(&mut self, id: MaterialId, name: String) -> Option<MaterialId> {
        let mut copy = self.get(id)?.clone();
        copy.name = name;
        copy.version = 0;
        Some(self.add(copy))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_set_of_paintable_kinds() {
        assert!(MaterialKind::Standard.supports_vertex_colors());
        assert!(MaterialKind::Phong.supports_vertex_colors());
        assert!(MaterialKind::Basic.supports_vertex_colors());
        assert!(!MaterialKind::SpecularGlossiness.supports_vertex_colors());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut library = MaterialLibrary::new();
        let original = library.add(Material::new("shared", MaterialKind::Standard));
        let copy = library.duplicate(original, "shared (copy)".into()).unwrap();

        library.get_mut(copy).unwrap().vertex_colors = true;

        assert_ne!(original, copy);
        assert!(!library.get(original).unwrap().vertex_colors);
        assert_eq!(library.get(copy).unwrap().name, "shared (copy)");
        assert_eq!(library.len(), 2);
    }
}
