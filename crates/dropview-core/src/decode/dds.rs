//! DDS texture decoding
//!
//! The container is validated and measured with `ddsfile` but kept encoded:
//! block-compressed formats go to the GPU untouched.

use std::sync::Arc;

use super::{stem, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, TextureData, TexturePixels};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

/// Height of the preview quad in scene units
const PREVIEW_HEIGHT: f32 = 1.0;

/// Decodes a DDS file into a node holding one quad textured with it
pub struct DdsDecoder;

impl Decoder for DdsDecoder {
    fn name(&self) -> &'static str {
        "dds"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Dds]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let dds = ddsfile::Dds::read(&mut std::io::Cursor::new(bytes))?;
        let (width, height) = (dds.get_width(), dds.get_height());
        if width == 0 || height == 0 {
            return Err(DecodeError::Unsupported("DDS has zero size".to_string()));
        }

        tracing::debug!(
            file = file_name,
            width,
            height,
            dxgi = ?dds.get_dxgi_format(),
            d3d = ?dds.get_d3d_format(),
            "Decoded DDS header"
        );

        let texture = Arc::new(TextureData {
            name: file_name.to_string(),
            width,
            height,
            pixels: TexturePixels::Dds {
                bytes: bytes.to_vec(),
                mip_levels: dds.get_num_mipmap_levels(),
            },
        });

        let material = MaterialData {
            map: Some(Arc::clone(&texture)),
            ..Default::default()
        };
        let quad = MeshData::quad(PREVIEW_HEIGHT * texture.aspect_ratio(), PREVIEW_HEIGHT, material);

        Ok(DecodedAsset::node(AssetNode::new(stem(file_name)).with_mesh(quad)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal uncompressed 32-bit RGBA DDS
    pub(crate) fn rgba_dds(width: u32, height: u32) -> Vec<u8> {
        let mut b = Vec::new();
        let push = |b: &mut Vec<u8>, v: u32| b.extend_from_slice(&v.to_le_bytes());
        b.extend_from_slice(b"DDS ");
        push(&mut b, 124); // header size
        push(&mut b, 0x1 | 0x2 | 0x4 | 0x8 | 0x1000); // caps, height, width, pitch, pixel format
        push(&mut b, height);
        push(&mut b, width);
        push(&mut b, width * 4); // pitch
        push(&mut b, 0); // depth
        push(&mut b, 1); // mip count
        for _ in 0..11 {
            push(&mut b, 0);
        }
        // pixel format
        push(&mut b, 32);
        push(&mut b, 0x1 | 0x40); // alpha pixels | rgb
        push(&mut b, 0); // fourcc
        push(&mut b, 32); // bit count
        push(&mut b, 0x00ff_0000);
        push(&mut b, 0x0000_ff00);
        push(&mut b, 0x0000_00ff);
        push(&mut b, 0xff00_0000);
        push(&mut b, 0x1000); // caps: texture
        for _ in 0..4 {
            push(&mut b, 0);
        }
        b.extend(std::iter::repeat(0x80).take((width * height * 4) as usize));
        b
    }

    #[test]
    fn test_decode_dds() {
        let bytes = rgba_dds(4, 2);
        let asset = DdsDecoder.decode("sky.dds", &bytes).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.name, "sky");
        let mesh = &node.meshes[0];
        let texture = mesh.material.map.as_ref().unwrap();
        assert_eq!((texture.width, texture.height), (4, 2));
        // Quad keeps the 2:1 aspect
        assert_eq!(mesh.positions[1], [1.0, -0.5, 0.0]);
        match &texture.pixels {
            TexturePixels::Dds { bytes: kept, mip_levels } => {
                assert_eq!(kept.len(), bytes.len());
                assert_eq!(*mip_levels, 1);
            }
            _ => panic!("expected dds pixels"),
        }
    }

    #[test]
    fn test_bad_magic_fails() {
        let mut bytes = rgba_dds(1, 1);
        bytes[0] = b'X';
        assert!(DdsDecoder.decode("bad.dds", &bytes).is_err());
    }
}
