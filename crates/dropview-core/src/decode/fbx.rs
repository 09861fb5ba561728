//! Binary FBX decoding
//!
//! Only geometry is extracted: every `Objects/Geometry` node with vertices
//! and polygon indices becomes a child mesh. ASCII FBX is not supported by
//! the tree reader and fails to decode.

use fbxcel::low::v7400::AttributeValue;
use fbxcel::tree::any::AnyTree;
use fbxcel::tree::v7400::NodeHandle;

use super::{stem, triangulate_fan, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, Topology};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

pub struct FbxDecoder;

impl Decoder for FbxDecoder {
    fn name(&self) -> &'static str {
        "fbx"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Fbx]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let tree = match AnyTree::from_seekable_reader(std::io::Cursor::new(bytes)) {
            Ok(AnyTree::V7400(version, tree, _footer)) => {
                tracing::debug!(file = file_name, ?version, "Parsed FBX tree");
                tree
            }
            Ok(_) => return Err(DecodeError::Fbx("unsupported FBX version".to_string())),
            Err(e) => return Err(DecodeError::Fbx(e.to_string())),
        };

        let objects = tree
            .root()
            .first_child_by_name("Objects")
            .ok_or_else(|| DecodeError::Fbx("missing Objects section".to_string()))?;

        let mut root = AssetNode::new(stem(file_name));
        for geometry in objects.children_by_name("Geometry") {
            let name = geometry_name(&geometry);
            let vertices = child_attr(&geometry, "Vertices").and_then(|a| match a {
                AttributeValue::ArrF64(v) => Some(v.as_slice()),
                _ => None,
            });
            let polygons = child_attr(&geometry, "PolygonVertexIndex").and_then(|a| match a {
                AttributeValue::ArrI32(v) => Some(v.as_slice()),
                _ => None,
            });
            let (Some(vertices), Some(polygons)) = (vertices, polygons) else {
                // Shapes and curves carry no polygon data
                continue;
            };
            let mesh = polygon_mesh(&name, vertices, polygons)?;
            if !mesh.is_empty() {
                root.children.push(AssetNode::new(name).with_mesh(mesh));
            }
        }

        if root.children.is_empty() {
            return Err(DecodeError::NoGeometry);
        }
        Ok(DecodedAsset::node(root))
    }
}

/// First attribute of the named child node
fn child_attr<'a>(node: &NodeHandle<'a>, name: &str) -> Option<&'a AttributeValue> {
    node.first_child_by_name(name)?.attributes().first()
}

/// Object names are stored as `Name\0\x01Class`
fn geometry_name(node: &NodeHandle<'_>) -> String {
    match node.attributes().get(1) {
        Some(AttributeValue::String(s)) => s.split('\0').next().unwrap_or_default().to_string(),
        _ => "geometry".to_string(),
    }
}

/// Build a triangle mesh from FBX vertex coordinates and polygon indices.
/// The last index of each polygon is stored bitwise-negated.
fn polygon_mesh(name: &str, vertices: &[f64], polygons: &[i32]) -> Result<MeshData, DecodeError> {
    let positions: Vec<[f32; 3]> = vertices
        .chunks_exact(3)
        .map(|v| [v[0] as f32, v[1] as f32, v[2] as f32])
        .collect();

    let mut indices = Vec::new();
    let mut polygon = Vec::new();
    for &raw in polygons {
        let (index, last) = if raw < 0 { (!raw, true) } else { (raw, false) };
        let index = index as u32;
        if index as usize >= positions.len() {
            return Err(DecodeError::Fbx(format!(
                "{}: vertex index {} out of range",
                name, index
            )));
        }
        polygon.push(index);
        if last {
            triangulate_fan(&polygon, &mut indices);
            polygon.clear();
        }
    }

    Ok(MeshData {
        name: Some(name.to_string()),
        positions,
        normals: None,
        uvs: None,
        indices,
        topology: Topology::Triangles,
        material: MaterialData::default(),
    })
}
