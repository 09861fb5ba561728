//! GLTF / GLB scene decoding
//!
//! Files must be self-contained: GLB, or GLTF with data URIs. A dropped
//! file has no directory to resolve external buffers or images against.

use std::collections::HashMap;
use std::sync::Arc;

use gltf::image::Format;
use gltf::mesh::Mode;
use tracing::warn;

use super::{stem, Decoder};
use crate::asset::{
    AnimationClip, AssetNode, DecodedAsset, MaterialData, MeshData, NodeTransform, TextureData,
    Topology,
};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

pub struct GltfDecoder;

impl Decoder for GltfDecoder {
    fn name(&self) -> &'static str {
        "gltf"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Gltf, SupportedFormat::Glb]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let (document, buffers, images) = gltf::import_slice(bytes)?;
        let mut ctx = SceneBuilder {
            file_name,
            buffers: &buffers,
            images: &images,
            textures: HashMap::new(),
        };

        let mut root = AssetNode::new(stem(file_name));
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    root.children.push(ctx.node(&node));
                }
            }
            // Scene-less files still carry meshes worth showing
            None => {
                for mesh in document.meshes() {
                    let mut node = AssetNode::new(
                        mesh.name()
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("mesh{}", mesh.index())),
                    );
                    node.meshes = ctx.meshes(&mesh);
                    root.children.push(node);
                }
            }
        }

        let animations: Vec<AnimationClip> = document
            .animations()
            .map(|animation| {
                let duration_secs = animation
                    .channels()
                    .filter_map(|channel| {
                        channel
                            .reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]))
                            .read_inputs()
                    })
                    .flatten()
                    .fold(0.0f32, f32::max);
                AnimationClip {
                    name: animation.name().map(str::to_string),
                    duration_secs,
                    channel_count: animation.channels().count(),
                }
            })
            .collect();

        if root.vertex_count() == 0 {
            return Err(DecodeError::NoGeometry);
        }

        tracing::debug!(
            file = file_name,
            meshes = root.mesh_count(),
            animations = animations.len(),
            "Decoded GLTF"
        );
        Ok(DecodedAsset::Node {
            node: root,
            animations,
        })
    }
}

struct SceneBuilder<'a> {
    file_name: &'a str,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    /// Converted images by index, shared between materials
    textures: HashMap<usize, Arc<TextureData>>,
}

impl SceneBuilder<'_> {
    fn node(&mut self, node: &gltf::Node) -> AssetNode {
        let (translation, rotation, scale) = node.transform().decomposed();
        let mut out = AssetNode::new(
            node.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node{}", node.index())),
        )
        .with_transform(NodeTransform {
            translation,
            rotation,
            scale,
        });

        if let Some(mesh) = node.mesh() {
            out.meshes = self.meshes(&mesh);
        }
        for child in node.children() {
            out.children.push(self.node(&child));
        }
        out
    }

    fn meshes(&mut self, mesh: &gltf::Mesh) -> Vec<MeshData> {
        let buffers = self.buffers;
        let mut out = Vec::new();

        for primitive in mesh.primitives() {
            let topology = match primitive.mode() {
                Mode::Triangles => Topology::Triangles,
                Mode::Lines => Topology::Lines,
                mode => {
                    warn!(file = self.file_name, ?mode, "Skipping primitive with unsupported mode");
                    continue;
                }
            };

            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            out.push(MeshData {
                name: mesh.name().map(str::to_string),
                normals: reader.read_normals().map(|n| n.collect()),
                uvs: reader.read_tex_coords(0).map(|t| t.into_f32().collect()),
                positions,
                indices,
                topology,
                material: self.material(primitive.material()),
            });
        }
        out
    }

    fn material(&mut self, material: gltf::Material) -> MaterialData {
        let pbr = material.pbr_metallic_roughness();
        let map = pbr
            .base_color_texture()
            .and_then(|info| self.texture(info.texture().source().index()));

        MaterialData {
            name: material.name().map(str::to_string),
            base_color: pbr.base_color_factor(),
            map,
            ..Default::default()
        }
    }

    fn texture(&mut self, index: usize) -> Option<Arc<TextureData>> {
        if let Some(texture) = self.textures.get(&index) {
            return Some(Arc::clone(texture));
        }

        let image = self.images.get(index)?;
        let pixels: Vec<u8> = match image.format {
            Format::R8G8B8A8 => image.pixels.clone(),
            Format::R8G8B8 => image
                .pixels
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            Format::R8G8 => image
                .pixels
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            format => {
                warn!(file = self.file_name, ?format, "Unsupported embedded image format");
                return None;
            }
        };

        let texture = Arc::new(TextureData::rgba8(
            format!("{}#image{}", self.file_name, index),
            image.width,
            image.height,
            pixels,
        ));
        self.textures.insert(index, Arc::clone(&texture));
        Some(texture)
    }
}
