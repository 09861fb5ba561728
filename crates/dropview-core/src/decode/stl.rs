//! STL decoding (ASCII and binary)

use super::{stem, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, Topology};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

pub struct StlDecoder;

impl Decoder for StlDecoder {
    fn name(&self) -> &'static str {
        "stl"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Stl]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let stl = stl_io::read_stl(&mut std::io::Cursor::new(bytes))?;
        if stl.faces.is_empty() {
            return Err(DecodeError::NoGeometry);
        }

        let positions = stl.vertices.iter().map(|v| [v[0], v[1], v[2]]).collect();
        let indices = stl
            .faces
            .iter()
            .flat_map(|face| face.vertices.iter().map(|&i| i as u32))
            .collect();

        let name = stem(file_name);
        let mesh = MeshData {
            name: Some(name.clone()),
            positions,
            // Facet normals don't map onto shared vertices; let the renderer smooth
            normals: None,
            uvs: None,
            indices,
            topology: Topology::Triangles,
            material: MaterialData::default(),
        };

        Ok(DecodedAsset::node(AssetNode::new(name).with_mesh(mesh)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "\
solid tetra
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 1 0 0
  endloop
endfacet
facet normal 0 -1 0
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 0 1
  endloop
endfacet
endsolid tetra
";

    #[test]
    fn test_decode_ascii() {
        let asset = StlDecoder.decode("tetra.stl", TETRA.as_bytes()).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.name, "tetra");
        let mesh = &node.meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        // Shared corners are deduplicated by the reader
        assert_eq!(mesh.positions.len(), 4);
    }

    #[test]
    fn test_decode_binary() {
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        let floats: [f32; 12] = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for f in floats {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());

        let asset = StlDecoder.decode("one.stl", &bytes).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.meshes[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_garbage_fails() {
        assert!(StlDecoder.decode("bad.stl", b"solid nope\nfacet\n").is_err());
    }
}
