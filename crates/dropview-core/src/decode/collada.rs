//! Collada (.dae) geometry decoding
//!
//! Reads `library_geometries` with quick-xml's serde support. Triangles,
//! polylists, polygons, and lines are supported; each primitive group is
//! unwelded so positions, normals, and texture coordinates can use
//! independent index streams. Scene hierarchy and effects are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use super::{stem, triangulate_fan, Decoder};
use crate::asset::{AssetNode, DecodedAsset, MaterialData, MeshData, NodeTransform, Topology};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

#[derive(Debug, Deserialize)]
struct Collada {
    asset: Option<ColladaAsset>,
    #[serde(default)]
    library_geometries: Vec<LibraryGeometries>,
}

#[derive(Debug, Deserialize)]
struct ColladaAsset {
    up_axis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LibraryGeometries {
    #[serde(default)]
    geometry: Vec<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@name")]
    name: Option<String>,
    mesh: Option<ColladaMesh>,
}

#[derive(Debug, Deserialize)]
struct ColladaMesh {
    #[serde(default)]
    source: Vec<Source>,
    vertices: Option<Vertices>,
    #[serde(default)]
    triangles: Vec<Primitive>,
    #[serde(default)]
    polylist: Vec<Primitive>,
    #[serde(default)]
    polygons: Vec<Primitive>,
    #[serde(default)]
    lines: Vec<Primitive>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(rename = "@id")]
    id: String,
    float_array: Option<FloatArray>,
    technique_common: Option<TechniqueCommon>,
}

#[derive(Debug, Deserialize)]
struct FloatArray {
    #[serde(rename = "$text", default)]
    values: String,
}

#[derive(Debug, Deserialize)]
struct TechniqueCommon {
    accessor: Accessor,
}

#[derive(Debug, Deserialize)]
struct Accessor {
    #[serde(rename = "@stride", default = "default_stride")]
    stride: usize,
}

fn default_stride() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct Vertices {
    #[serde(rename = "@id")]
    id: String,
    #[serde(default)]
    input: Vec<Input>,
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(rename = "@semantic")]
    semantic: String,
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "@offset", default)]
    offset: usize,
    #[serde(rename = "@set")]
    set: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Primitive {
    #[serde(rename = "@material")]
    material: Option<String>,
    #[serde(default)]
    input: Vec<Input>,
    vcount: Option<String>,
    #[serde(default)]
    p: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum PrimitiveKind {
    Triangles,
    Polylist,
    Polygons,
    Lines,
}

/// A float source with its accessor stride
struct FloatSource {
    values: Vec<f32>,
    stride: usize,
}

impl FloatSource {
    fn get<const N: usize>(&self, index: u32) -> Option<[f32; N]> {
        let start = (index as usize).checked_mul(self.stride)?;
        let slice = self.values.get(start..start.checked_add(N)?)?;
        let mut out = [0.0; N];
        out.copy_from_slice(slice);
        Some(out)
    }
}

/// Where each vertex attribute comes from within a primitive's index tuple
struct Streams<'a> {
    stride: usize,
    position: (usize, &'a FloatSource),
    normal: Option<(usize, &'a FloatSource)>,
    texcoord: Option<(usize, &'a FloatSource)>,
}

pub struct ColladaDecoder;

impl Decoder for ColladaDecoder {
    fn name(&self) -> &'static str {
        "collada"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[SupportedFormat::Collada]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
        let document: Collada = quick_xml::de::from_str(text)?;

        let mut root = AssetNode::new(stem(file_name));
        let up_axis = document.asset.and_then(|a| a.up_axis);
        if up_axis.as_deref().map(str::trim) == Some("Z_UP") {
            root.transform = NodeTransform::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        }

        for geometry in document
            .library_geometries
            .iter()
            .flat_map(|library| library.geometry.iter())
        {
            let Some(mesh) = &geometry.mesh else {
                continue;
            };
            let name = geometry
                .name
                .clone()
                .or_else(|| geometry.id.clone())
                .unwrap_or_else(|| "geometry".to_string());

            let meshes = convert_mesh(&name, mesh)?;
            if !meshes.is_empty() {
                let mut node = AssetNode::new(name);
                node.meshes = meshes;
                root.children.push(node);
            }
        }

        if root.children.is_empty() {
            return Err(DecodeError::NoGeometry);
        }

        tracing::debug!(
            file = file_name,
            geometries = root.children.len(),
            up_axis = up_axis.as_deref().unwrap_or("Y_UP"),
            "Decoded Collada"
        );
        Ok(DecodedAsset::node(root))
    }
}

fn convert_mesh(name: &str, mesh: &ColladaMesh) -> Result<Vec<MeshData>, DecodeError> {
    let mut sources = HashMap::new();
    for source in &mesh.source {
        let Some(array) = &source.float_array else {
            continue;
        };
        let values = parse_list::<f32>(&array.values)?;
        let stride = source
            .technique_common
            .as_ref()
            .map_or(1, |t| t.accessor.stride);
        if stride == 0 {
            return Err(DecodeError::Collada(format!(
                "source {} has a zero stride",
                source.id
            )));
        }
        sources.insert(source.id.as_str(), FloatSource { values, stride });
    }

    let groups = mesh
        .triangles
        .iter()
        .map(|p| (PrimitiveKind::Triangles, p))
        .chain(mesh.polylist.iter().map(|p| (PrimitiveKind::Polylist, p)))
        .chain(mesh.polygons.iter().map(|p| (PrimitiveKind::Polygons, p)))
        .chain(mesh.lines.iter().map(|p| (PrimitiveKind::Lines, p)));

    let mut out = Vec::new();
    for (kind, primitive) in groups {
        let streams = resolve_streams(mesh.vertices.as_ref(), primitive, &sources)?;
        let data = build_primitive(kind, primitive, &streams)?;
        if data.is_empty() {
            continue;
        }
        out.push(MeshData {
            name: Some(name.to_string()),
            material: MaterialData {
                name: primitive.material.clone(),
                ..Default::default()
            },
            ..data
        });
    }
    Ok(out)
}

fn source_ref(reference: &str) -> &str {
    reference.strip_prefix('#').unwrap_or(reference)
}

fn resolve_streams<'a>(
    vertices: Option<&Vertices>,
    primitive: &Primitive,
    sources: &'a HashMap<&str, FloatSource>,
) -> Result<Streams<'a>, DecodeError> {
    let lookup = |input: &Input| {
        sources
            .get(source_ref(&input.source))
            .ok_or_else(|| DecodeError::Collada(format!("unknown source {}", input.source)))
    };

    let stride = primitive
        .input
        .iter()
        .map(|i| i.offset.checked_add(1))
        .try_fold(1, |max, next| next.map(|n| max.max(n)))
        .ok_or_else(|| DecodeError::Collada("input offset out of range".to_string()))?;
    let mut position = None;
    let mut normal = None;
    let mut texcoord = None;

    for input in &primitive.input {
        match input.semantic.as_str() {
            "VERTEX" => {
                let vertices = vertices
                    .filter(|v| v.id == source_ref(&input.source))
                    .ok_or_else(|| {
                        DecodeError::Collada(format!("unknown vertices {}", input.source))
                    })?;
                // Attributes declared on <vertices> share the VERTEX index
                for shared in &vertices.input {
                    match shared.semantic.as_str() {
                        "POSITION" => position = Some((input.offset, lookup(shared)?)),
                        "NORMAL" => normal = Some((input.offset, lookup(shared)?)),
                        "TEXCOORD" if texcoord.is_none() => {
                            texcoord = Some((input.offset, lookup(shared)?))
                        }
                        _ => {}
                    }
                }
            }
            "NORMAL" => normal = Some((input.offset, lookup(input)?)),
            "TEXCOORD" if texcoord.is_none() || input.set == Some(0) => {
                texcoord = Some((input.offset, lookup(input)?))
            }
            _ => {}
        }
    }

    let position =
        position.ok_or_else(|| DecodeError::Collada("primitive has no positions".to_string()))?;
    Ok(Streams {
        stride,
        position,
        normal,
        texcoord,
    })
}

fn build_primitive(
    kind: PrimitiveKind,
    primitive: &Primitive,
    streams: &Streams<'_>,
) -> Result<MeshData, DecodeError> {
    // Each polygon as a flat list of index tuples
    let polygons: Vec<Vec<u32>> = match kind {
        PrimitiveKind::Polygons => primitive
            .p
            .iter()
            .map(|p| parse_list::<u32>(p))
            .collect::<Result<_, _>>()?,
        _ => {
            let indices = parse_list::<u32>(&primitive.p.join(" "))?;
            let tuple_len = |corners: usize| {
                corners
                    .checked_mul(streams.stride)
                    .ok_or_else(|| DecodeError::Collada("primitive stride too large".to_string()))
            };
            let sizes: Vec<usize> = match kind {
                PrimitiveKind::Polylist => {
                    parse_list::<usize>(primitive.vcount.as_deref().unwrap_or_default())?
                }
                PrimitiveKind::Lines => vec![2; indices.len() / tuple_len(2)?],
                _ => vec![3; indices.len() / tuple_len(3)?],
            };
            let mut polygons = Vec::with_capacity(sizes.len());
            let mut rest = indices.as_slice();
            for size in sizes {
                let len = tuple_len(size)?;
                if rest.len() < len {
                    return Err(DecodeError::Collada("index list too short".to_string()));
                }
                let (polygon, tail) = rest.split_at(len);
                polygons.push(polygon.to_vec());
                rest = tail;
            }
            polygons
        }
    };

    let corner = |tuple: &[u32], (offset, _): (usize, &FloatSource)| -> Result<u32, DecodeError> {
        tuple
            .get(offset)
            .copied()
            .ok_or_else(|| DecodeError::Collada("input offset out of range".to_string()))
    };
    let out_of_range = || DecodeError::Collada("index out of range".to_string());

    let mut data = MeshData {
        normals: streams.normal.map(|_| Vec::new()),
        uvs: streams.texcoord.map(|_| Vec::new()),
        topology: match kind {
            PrimitiveKind::Lines => Topology::Lines,
            _ => Topology::Triangles,
        },
        ..Default::default()
    };

    for polygon in polygons {
        let first = data.positions.len() as u32;
        for tuple in polygon.chunks_exact(streams.stride) {
            let i = corner(tuple, streams.position)?;
            data.positions.push(streams.position.1.get::<3>(i).ok_or_else(out_of_range)?);
            if let (Some(stream), Some(normals)) = (streams.normal, data.normals.as_mut()) {
                let i = corner(tuple, stream)?;
                normals.push(stream.1.get::<3>(i).ok_or_else(out_of_range)?);
            }
            if let (Some(stream), Some(uvs)) = (streams.texcoord, data.uvs.as_mut()) {
                let i = corner(tuple, stream)?;
                let [u, v] = stream.1.get::<2>(i).ok_or_else(out_of_range)?;
                uvs.push([u, 1.0 - v]);
            }
        }
        let corners: Vec<u32> = (first..data.positions.len() as u32).collect();
        match kind {
            PrimitiveKind::Lines => data.indices.extend_from_slice(&corners),
            _ => triangulate_fan(&corners, &mut data.indices),
        }
    }

    Ok(data)
}

fn parse_list<T: std::str::FromStr>(text: &str) -> Result<Vec<T>, DecodeError> {
    text.split_ascii_whitespace()
        .map(|token| {
            token
                .parse()
                .map_err(|_| DecodeError::Collada(format!("invalid number {:?}", token)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_DAE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <unit name="meter" meter="1"/>
    <up_axis>Z_UP</up_axis>
  </asset>
  <library_geometries>
    <geometry id="plane-mesh" name="Plane">
      <mesh>
        <source id="plane-positions">
          <float_array id="plane-positions-array" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#plane-positions-array" count="4" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <source id="plane-uvs">
          <float_array id="plane-uvs-array" count="8">0 0 1 0 1 1 0 1</float_array>
          <technique_common>
            <accessor source="#plane-uvs-array" count="4" stride="2"/>
          </technique_common>
        </source>
        <vertices id="plane-vertices">
          <input semantic="POSITION" source="#plane-positions"/>
        </vertices>
        <polylist material="paint" count="1">
          <input semantic="VERTEX" source="#plane-vertices" offset="0"/>
          <input semantic="TEXCOORD" source="#plane-uvs" offset="1" set="0"/>
          <vcount>4</vcount>
          <p>0 0 1 1 2 2 3 3</p>
        </polylist>
      </mesh>
    </geometry>
  </library_geometries>
</COLLADA>
"##;

    #[test]
    fn test_decode_polylist() {
        let asset = ColladaDecoder.decode("plane.dae", QUAD_DAE.as_bytes()).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.name, "plane");
        // Z-up files are rotated into the Y-up scene
        assert!(node.transform.rotation[0] < 0.0);

        let child = &node.children[0];
        assert_eq!(child.name, "Plane");
        let mesh = &child.meshes[0];
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.material.name.as_deref(), Some("paint"));
        assert_eq!(mesh.uvs.as_ref().unwrap()[0], [0.0, 1.0]);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_triangles_share_vertex_index() {
        let triangles = QUAD_DAE
            .replace("<up_axis>Z_UP</up_axis>", "<up_axis>Y_UP</up_axis>")
            .replace(
                r#"<polylist material="paint" count="1">"#,
                r#"<triangles count="2">"#,
            )
            .replace("</polylist>", "</triangles>")
            .replace("<vcount>4</vcount>", "")
            .replace(
                r##"<input semantic="TEXCOORD" source="#plane-uvs" offset="1" set="0"/>"##,
                "",
            )
            .replace("<p>0 0 1 1 2 2 3 3</p>", "<p>0 1 2 0 2 3</p>");

        let asset = ColladaDecoder.decode("plane.dae", triangles.as_bytes()).unwrap();
        let DecodedAsset::Node { node, .. } = asset else {
            panic!("expected node");
        };
        assert_eq!(node.transform, NodeTransform::IDENTITY);
        let mesh = &node.children[0].meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.positions[5], [0.0, 1.0, 0.0]);
        assert!(mesh.uvs.is_none());
    }

    #[test]
    fn test_bad_index_fails() {
        let broken = QUAD_DAE.replace("<p>0 0 1 1 2 2 3 3</p>", "<p>0 0 1 1 2 2 9 3</p>");
        let err = ColladaDecoder.decode("plane.dae", broken.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Collada(_)));
    }

    #[test]
    fn test_huge_offset_fails() {
        let broken = QUAD_DAE.replace(
            r##"offset="1" set="0""##,
            r##"offset="18446744073709551615" set="0""##,
        );
        let err = ColladaDecoder.decode("plane.dae", broken.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Collada(_)), "{err}");

        // Large but not overflowing: every stride product must still be checked
        let triangles = broken
            .replace(r#"<polylist material="paint" count="1">"#, "<triangles>")
            .replace("</polylist>", "</triangles>")
            .replace("<vcount>4</vcount>", "");
        let big = triangles.replace("18446744073709551615", "9223372036854775807");
        for doc in [triangles, big] {
            assert!(ColladaDecoder.decode("plane.dae", doc.as_bytes()).is_err());
        }
    }

    #[test]
    fn test_bad_accessor_stride_fails() {
        let huge = QUAD_DAE.replace(
            r##"count="4" stride="3""##,
            r##"count="4" stride="18446744073709551615""##,
        );
        let err = ColladaDecoder.decode("plane.dae", huge.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Collada(_)), "{err}");

        let zero = QUAD_DAE.replace(r##"count="4" stride="3""##, r##"count="4" stride="0""##);
        let err = ColladaDecoder.decode("plane.dae", zero.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Collada(_)), "{err}");
    }

    #[test]
    fn test_huge_vcount_fails() {
        let broken = QUAD_DAE.replace(
            "<vcount>4</vcount>",
            "<vcount>18446744073709551615</vcount>",
        );
        let err = ColladaDecoder.decode("plane.dae", broken.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Collada(_)), "{err}");
    }

    #[test]
    fn test_not_xml_fails() {
        assert!(ColladaDecoder.decode("plane.dae", b"<COLLADA><asset>").is_err());
        assert!(matches!(
            ColladaDecoder.decode("plane.dae", &[0xff, 0xfe, 0x00]),
            Err(DecodeError::NotUtf8)
        ));
    }
}
