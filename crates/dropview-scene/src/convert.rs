//! Conversion from decoded assets to bevy meshes, images, and materials

use bevy::asset::RenderAssetUsages;
use bevy::image::{CompressedImageFormats, ImageSampler, ImageType, TextureError};
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::render::renderer::RenderDevice;
use dropview_core::{MaterialData, MeshData, NodeTransform, TextureData, TexturePixels, Topology};

pub fn mesh_from_data(data: &MeshData) -> Mesh {
    let topology = match data.topology {
        Topology::Triangles => PrimitiveTopology::TriangleList,
        Topology::Lines => PrimitiveTopology::LineList,
    };

    let mut mesh = Mesh::new(topology, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone())
        .with_inserted_indices(Indices::U32(data.indices.clone()));

    if let Some(uvs) = &data.uvs {
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs.clone());
    }
    match &data.normals {
        Some(normals) => mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals.clone()),
        None if data.topology == Topology::Triangles => mesh.compute_normals(),
        None => {}
    }
    mesh
}

/// Compressed formats the GPU can sample. Nothing compressed without a device.
pub fn device_formats(device: Option<&RenderDevice>) -> CompressedImageFormats {
    device.map_or(CompressedImageFormats::NONE, |device| {
        CompressedImageFormats::from_features(device.features())
    })
}

/// Build a GPU image from decoded pixels. DDS containers are handed to
/// bevy's own DDS reader so compressed formats stay compressed; a format
/// outside `formats` is an error rather than a texture the GPU rejects.
pub fn image_from_texture(
    texture: &TextureData,
    formats: CompressedImageFormats,
) -> Result<Image, TextureError> {
    match &texture.pixels {
        TexturePixels::Rgba8(pixels) => Ok(Image::new(
            Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            pixels.clone(),
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        )),
        TexturePixels::Dds { bytes, .. } => Image::from_buffer(
            bytes,
            ImageType::Extension("dds"),
            formats,
            true,
            ImageSampler::Default,
            RenderAssetUsages::default(),
        ),
    }
}

pub fn material_from_data(data: &MaterialData, texture: Option<Handle<Image>>) -> StandardMaterial {
    let [r, g, b, a] = data.base_color;
    StandardMaterial {
        base_color: Color::linear_rgba(r, g, b, a),
        base_color_texture: texture,
        unlit: data.unlit,
        alpha_mode: if a < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        // Swatches and texture previews are single quads
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

pub fn transform_from_node(transform: &NodeTransform) -> Transform {
    Transform {
        translation: Vec3::from(transform.translation),
        rotation: Quat::from_array(transform.rotation),
        scale: Vec3::from(transform.scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropview_core::AssetNode;

    #[test]
    fn test_triangle_mesh_gets_normals() {
        let data = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let mesh = mesh_from_data(&data);
        assert_eq!(mesh.count_vertices(), 3);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_line_helpers_convert() {
        let grid = AssetNode::grid_plane(10.0, 2);
        let mesh = mesh_from_data(&grid.meshes[0]);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_none());
    }

    #[test]
    fn test_rgba_image() {
        let texture = TextureData::rgba8("t.png", 2, 1, vec![255; 8]);
        let image = image_from_texture(&texture, CompressedImageFormats::NONE).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
    }

    /// 4x4 DXT1 (BC1) DDS holding one block
    fn bc1_dds() -> Vec<u8> {
        let mut b = Vec::new();
        let push = |b: &mut Vec<u8>, v: u32| b.extend_from_slice(&v.to_le_bytes());
        b.extend_from_slice(b"DDS ");
        push(&mut b, 124);
        push(&mut b, 0x1 | 0x2 | 0x4 | 0x1000 | 0x2_0000 | 0x8_0000); // caps, height, width, pixel format, mips, linear size
        push(&mut b, 4);
        push(&mut b, 4);
        push(&mut b, 8); // linear size
        push(&mut b, 0);
        push(&mut b, 1);
        for _ in 0..11 {
            push(&mut b, 0);
        }
        push(&mut b, 32);
        push(&mut b, 0x4); // fourcc
        b.extend_from_slice(b"DXT1");
        for _ in 0..5 {
            push(&mut b, 0);
        }
        push(&mut b, 0x1000);
        for _ in 0..4 {
            push(&mut b, 0);
        }
        b.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 0, 0, 0, 0]);
        b
    }

    fn dds_texture(bytes: Vec<u8>) -> TextureData {
        TextureData {
            name: "block.dds".to_string(),
            width: 4,
            height: 4,
            pixels: TexturePixels::Dds {
                bytes,
                mip_levels: 1,
            },
        }
    }

    #[test]
    fn test_compressed_dds_needs_device_support() {
        let texture = dds_texture(bc1_dds());
        assert!(image_from_texture(&texture, CompressedImageFormats::NONE).is_err());

        let image = image_from_texture(&texture, CompressedImageFormats::BC).unwrap();
        assert!(image.texture_descriptor.format.is_compressed());
        assert_eq!(image.width(), 4);
    }

    #[test]
    fn test_no_device_supports_nothing_compressed() {
        assert_eq!(device_formats(None), CompressedImageFormats::NONE);
    }

    #[test]
    fn test_translucent_material_blends() {
        let material = material_from_data(&MaterialData::colored([1.0, 0.0, 0.0, 0.5]), None);
        assert!(matches!(material.alpha_mode, AlphaMode::Blend));
        let opaque = material_from_data(&MaterialData::default(), None);
        assert!(matches!(opaque.alpha_mode, AlphaMode::Opaque));
    }

    #[test]
    fn test_transform() {
        let t = transform_from_node(&NodeTransform::from_translation([1.0, 2.0, 3.0]));
        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
    }
}
