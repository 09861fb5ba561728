//! Wavefront MTL material library decoding

use super::{stem, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, NodeTransform};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

/// Gap between swatch centres, in swatch widths
const SWATCH_SPACING: f32 = 1.25;

/// Decodes an MTL library into a row of unit swatches, one per material,
/// so the library can be inspected on its own.
pub struct MtlDecoder;

impl Decoder for MtlDecoder {
    fn name(&self) -> &'static str {
        "mtl"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Mtl]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let (materials, _) = tobj::load_mtl_buf(&mut std::io::Cursor::new(bytes))?;
        if materials.is_empty() {
            return Err(DecodeError::Unsupported("material library is empty".to_string()));
        }

        let mut root = AssetNode::new(stem(file_name));
        for (i, material) in materials.iter().enumerate() {
            let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
            let alpha = material.dissolve.unwrap_or(1.0);
            let swatch = MaterialData {
                name: Some(material.name.clone()),
                base_color: [r, g, b, alpha],
                ..Default::default()
            };
            root.children.push(
                AssetNode::new(material.name.clone())
                    .with_transform(NodeTransform::from_translation([
                        i as f32 * SWATCH_SPACING,
                        0.5,
                        0.0,
                    ]))
                    .with_mesh(MeshData::quad(1.0, 1.0, swatch)),
            );
        }

        Ok(DecodedAsset::node(root))
    }
}
