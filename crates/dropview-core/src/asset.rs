//! Decoded asset types
//!
//! These are renderer-agnostic: the scene host turns them into GPU meshes,
//! materials, and images.

use std::fmt;
use std::sync::Arc;

/// Pixel storage for a decoded texture
#[derive(Clone, PartialEq)]
pub enum TexturePixels {
    /// Tightly packed RGBA8, sRGB
    Rgba8(Vec<u8>),
    /// A complete DDS container, uploaded as-is (may be block compressed)
    Dds { bytes: Vec<u8>, mip_levels: u32 },
}

/// A decoded 2D texture
#[derive(Clone, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: TexturePixels,
}

impl TextureData {
    pub fn rgba8(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pixels: TexturePixels::Rgba8(pixels),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl fmt::Debug for TextureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.pixels {
            TexturePixels::Rgba8(p) => format!("rgba8, {} bytes", p.len()),
            TexturePixels::Dds { bytes, mip_levels } => {
                format!("dds, {} bytes, {} mips", bytes.len(), mip_levels)
            }
        };
        f.debug_struct("TextureData")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &kind)
            .finish()
    }
}

/// Surface description attached to every mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: Option<String>,
    /// Linear RGBA multiplier
    pub base_color: [f32; 4],
    /// Color texture
    pub map: Option<Arc<TextureData>>,
    /// Unlit materials ignore scene lighting (helper lines)
    pub unlit: bool,
    /// Set when `map` changed and the renderer must re-upload the material
    pub needs_update: bool,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            map: None,
            unlit: false,
            needs_update: false,
        }
    }
}

impl MaterialData {
    pub fn colored(rgba: [f32; 4]) -> Self {
        Self {
            base_color: rgba,
            ..Default::default()
        }
    }

    pub fn unlit(rgba: [f32; 4]) -> Self {
        Self {
            base_color: rgba,
            unlit: true,
            ..Default::default()
        }
    }
}

/// Primitive topology of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
}

/// Indexed geometry with a material
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals; computed by the renderer when absent
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    pub topology: Topology,
    pub material: MaterialData,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Two triangles spanning `width` x `height` in the XY plane, facing +Z
    pub fn quad(width: f32, height: f32, material: MaterialData) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            name: Some("quad".to_string()),
            positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 4]),
            uvs: Some(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]),
            indices: vec![0, 1, 2, 0, 2, 3],
            topology: Topology::Triangles,
            material,
        }
    }
}

/// Local transform of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: [f32; 3],
    /// Quaternion, xyzw
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl NodeTransform {
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Rotation of `angle` radians around the X axis
    pub fn from_rotation_x(angle: f32) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self {
            rotation: [s, 0.0, 0.0, c],
            ..Self::IDENTITY
        }
    }
}

/// What a node is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRole {
    /// User content
    #[default]
    Content,
    /// Axes / grid helpers; never receive dropped textures
    ReferenceHelper,
}

/// A decoded node: meshes plus child nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetNode {
    pub name: String,
    pub transform: NodeTransform,
    pub role: NodeRole,
    pub meshes: Vec<MeshData>,
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_child(mut self, child: AssetNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_reference_helper(&self) -> bool {
        self.role == NodeRole::ReferenceHelper
    }

    /// Total number of meshes in this subtree
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(|c| c.mesh_count()).sum::<usize>()
    }

    /// Total number of vertices in this subtree
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertex_count()).sum::<usize>()
            + self.children.iter().map(|c| c.vertex_count()).sum::<usize>()
    }

    /// Visit every mesh depth-first (own meshes, then children in order)
    pub fn visit_meshes<'a>(&'a self, f: &mut impl FnMut(&'a MeshData)) {
        for mesh in &self.meshes {
            f(mesh);
        }
        for child in &self.children {
            child.visit_meshes(f);
        }
    }

    /// Mutable depth-first mesh visit, same order as [`AssetNode::visit_meshes`]
    pub fn visit_meshes_mut(&mut self, f: &mut impl FnMut(&mut MeshData)) {
        for mesh in &mut self.meshes {
            f(mesh);
        }
        for child in &mut self.children {
            child.visit_meshes_mut(f);
        }
    }

    /// Red/green/blue line segments along +X/+Y/+Z
    pub fn axes_helper(length: f32) -> Self {
        let axis = |name: &str, end: [f32; 3], rgba: [f32; 4]| MeshData {
            name: Some(name.to_string()),
            positions: vec![[0.0, 0.0, 0.0], end],
            normals: None,
            uvs: None,
            indices: vec![0, 1],
            topology: Topology::Lines,
            material: MaterialData::unlit(rgba),
        };
        Self {
            name: "axes".to_string(),
            role: NodeRole::ReferenceHelper,
            meshes: vec![
                axis("x", [length, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]),
                axis("y", [0.0, length, 0.0], [0.0, 1.0, 0.0, 1.0]),
                axis("z", [0.0, 0.0, length], [0.0, 0.0, 1.0, 1.0]),
            ],
            ..Default::default()
        }
    }

    /// White wireframe square of side `size` on the XZ ground plane, with
    /// `divisions` cells per side
    pub fn grid_plane(size: f32, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        let half = size / 2.0;
        let step = size / divisions as f32;
        let mut positions = Vec::new();
        for i in 0..=divisions {
            let offset = -half + step * i as f32;
            positions.push([offset, 0.0, -half]);
            positions.push([offset, 0.0, half]);
            positions.push([-half, 0.0, offset]);
            positions.push([half, 0.0, offset]);
        }
        let indices = (0..positions.len() as u32).collect();
        Self {
            name: "grid".to_string(),
            role: NodeRole::ReferenceHelper,
            meshes: vec![MeshData {
                name: Some("grid".to_string()),
                positions,
                normals: None,
                uvs: None,
                indices,
                topology: Topology::Lines,
                material: MaterialData::unlit([1.0, 1.0, 1.0, 1.0]),
            }],
            ..Default::default()
        }
    }
}

/// A named animation clip surfaced from a GLTF file
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: Option<String>,
    pub duration_secs: f32,
    pub channel_count: usize,
}

/// Output of a decoder
#[derive(Debug, Clone)]
pub enum DecodedAsset {
    Node {
        node: AssetNode,
        animations: Vec<AnimationClip>,
    },
    Texture(Arc<TextureData>),
}

impl DecodedAsset {
    pub fn node(node: AssetNode) -> Self {
        DecodedAsset::Node {
            node,
            animations: Vec::new(),
        }
    }
}
