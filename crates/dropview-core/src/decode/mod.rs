//! Format decoders
//!
//! Each decoder turns the raw bytes of one file into a [`DecodedAsset`].
//! Decoders are atomic: they return a complete asset or an error, never a
//! partial result.

mod collada;
mod dds;
mod fbx;
mod gltf_scene;
mod mtl;
mod obj;
mod stl;
mod texture;

pub use self::collada::ColladaDecoder;
pub use self::dds::DdsDecoder;
pub use self::fbx::FbxDecoder;
pub use self::gltf_scene::GltfDecoder;
pub use self::mtl::MtlDecoder;
pub use self::obj::ObjDecoder;
pub use self::stl::StlDecoder;
pub use self::texture::TextureDecoder;

use std::collections::HashMap;
use std::rc::Rc;

use crate::asset::DecodedAsset;
use crate::error::DecodeError;
use crate::format::SupportedFormat;

/// A decoder for one format or a family of formats
pub trait Decoder {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Formats this decoder accepts
    fn formats(&self) -> &'static [SupportedFormat];

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError>;
}

/// Registry mapping each format to its decoder
#[derive(Clone, Default)]
pub struct DecoderSet {
    decoders: HashMap<SupportedFormat, Rc<dyn Decoder>>,
}

impl DecoderSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All built-in decoders
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.register(Rc::new(TextureDecoder));
        set.register(Rc::new(GltfDecoder));
        set.register(Rc::new(FbxDecoder));
        set.register(Rc::new(ObjDecoder));
        set.register(Rc::new(ColladaDecoder));
        set.register(Rc::new(DdsDecoder));
        set.register(Rc::new(MtlDecoder));
        set.register(Rc::new(StlDecoder));
        set
    }

    /// Register a decoder for every format it lists, replacing any
    /// previous decoder for those formats
    pub fn register(&mut self, decoder: Rc<dyn Decoder>) {
        for format in decoder.formats() {
            self.decoders.insert(*format, Rc::clone(&decoder));
        }
    }

    pub fn get(&self, format: SupportedFormat) -> Option<Rc<dyn Decoder>> {
        self.decoders.get(&format).cloned()
    }

    pub fn decode(
        &self,
        format: SupportedFormat,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DecodedAsset, DecodeError> {
        let decoder = self.get(format).ok_or(DecodeError::NoDecoder(format))?;
        decoder.decode(file_name, bytes)
    }
}

/// File name without directory or extension, used to name decoded nodes
pub(crate) fn stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Fan-triangulate a polygon given as vertex indices
pub(crate) fn triangulate_fan(polygon: &[u32], out: &mut Vec<u32>) {
    for i in 1..polygon.len().saturating_sub(1) {
        out.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetNode;

    struct Fixed;

    impl Decoder for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn formats(&self) -> &'static [SupportedFormat] {
            &[SupportedFormat::Obj]
        }

        fn decode(&self, file_name: &str, _bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
            Ok(DecodedAsset::node(AssetNode::new(file_name)))
        }
    }

    #[test]
    fn test_standard_covers_every_format() {
        let set = DecoderSet::standard();
        for format in SupportedFormat::all() {
            assert!(set.get(format).is_some(), "missing decoder for {:?}", format);
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut set = DecoderSet::standard();
        set.register(Rc::new(Fixed));
        assert_eq!(set.get(SupportedFormat::Obj).unwrap().name(), "fixed");
        assert_eq!(set.get(SupportedFormat::Stl).unwrap().name(), "stl");
    }

    #[test]
    fn test_missing_decoder() {
        let set = DecoderSet::empty();
        let err = set.decode(SupportedFormat::Stl, "a.stl", b"").unwrap_err();
        assert!(matches!(err, DecodeError::NoDecoder(SupportedFormat::Stl)));
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("robot.glb"), "robot");
        assert_eq!(stem("dir/sub/arm.v2.obj"), "arm.v2");
        assert_eq!(stem(".obj"), ".obj");
        assert_eq!(stem("noext"), "noext");
    }

    #[test]
    fn test_triangulate_fan() {
        let mut out = Vec::new();
        triangulate_fan(&[0, 1, 2, 3], &mut out);
        assert_eq!(out, vec![0, 1, 2, 0, 2, 3]);

        out.clear();
        triangulate_fan(&[4, 5], &mut out);
        assert!(out.is_empty());
    }
}
