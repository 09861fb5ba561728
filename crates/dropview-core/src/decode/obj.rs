//! Wavefront OBJ decoding

use super::{stem, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, Topology};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

/// Decodes OBJ text with `tobj`. Every object / group becomes a child node.
/// `mtllib` references are not followed: a dropped file has no siblings.
pub struct ObjDecoder;

impl Decoder for ObjDecoder {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Obj]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let (models, _materials) = tobj::load_obj_buf(
            &mut std::io::Cursor::new(bytes),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok((Vec::new(), Default::default())),
        )?;

        let mut root = AssetNode::new(stem(file_name));
        for model in models {
            let mesh = model.mesh;
            if mesh.positions.is_empty() || mesh.indices.is_empty() {
                continue;
            }

            let normals = (!mesh.normals.is_empty())
                .then(|| mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect());
            let uvs = (!mesh.texcoords.is_empty()).then(|| {
                mesh.texcoords
                    .chunks_exact(2)
                    // OBJ's V axis points up; textures are stored top row first
                    .map(|t| [t[0], 1.0 - t[1]])
                    .collect()
            });

            let data = MeshData {
                name: Some(model.name.clone()),
                positions: mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| [p[0], p[1], p[2]])
                    .collect(),
                normals,
                uvs,
                indices: mesh.indices,
                topology: Topology::Triangles,
                material: MaterialData::default(),
            };
            root.children.push(AssetNode::new(model.name).with_mesh(data));
        }

        if root.children.is_empty() {
            return Err(DecodeError::NoGeometry);
        }

        tracing::debug!(
            file = file_name,
            objects = root.children.len(),
            vertices = root.vertex_count(),
            "Decoded OBJ"
        );
        Ok(DecodedAsset::node(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_fixtures::TRIANGLE_OBJ;

    #[test]
    fn test_decode_triangle() {
        let asset = ObjDecoder.decode("tri.obj", TRIANGLE_OBJ.as_bytes()).unwrap();
        let DecodedAsset::Node { node, animations } = asset else {
            panic!("expected node");
        };
        assert!(animations.is_empty());
        assert_eq!(node.name, "tri");
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].name, "triangle");
        assert_eq!(node.mesh_count(), 1);
        assert_eq!(node.children[0].meshes[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_quads_are_triangulated() {
        let quad = "\
o plane
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";
        let asset = ObjDecoder.decode("plane.obj", quad.as_bytes()).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        let mesh = &node.children[0].meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        let uvs = mesh.uvs.as_ref().unwrap();
        assert_eq!(uvs.len(), mesh.positions.len());
        assert!(uvs.contains(&[0.0, 1.0]));
    }

    #[test]
    fn test_two_objects() {
        let two = format!("{}o second\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n", TRIANGLE_OBJ);
        let asset = ObjDecoder.decode("pair.obj", two.as_bytes()).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].name, "second");
    }

    #[test]
    fn test_no_faces_is_error() {
        let err = ObjDecoder.decode("points.obj", b"v 0 0 0\nv 1 1 1\n").unwrap_err();
        assert!(matches!(err, DecodeError::NoGeometry));
    }
}
