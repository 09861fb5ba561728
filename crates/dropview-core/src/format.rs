//! Supported file formats and extension-based classification
//!
//! The file extension is the only classification signal: no content sniffing
//! is done here. Decoders may still reject bytes that don't match.

use std::fmt;

/// A file format the viewer knows how to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    TextureJpg,
    TexturePng,
    TextureGif,
    Fbx,
    Gltf,
    Glb,
    Obj,
    Collada,
    Dds,
    Mtl,
    Stl,
}

/// How a decoded asset is attached to the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// Applied to the materials of existing meshes
    Texture,
    /// Inserted as a new top-level node
    Model,
}

/// Extension (lower-case, no dot) to format table
pub const FORMAT_TABLE: &[(&str, SupportedFormat)] = &[
    ("jpg", SupportedFormat::TextureJpg),
    ("png", SupportedFormat::TexturePng),
    ("gif", SupportedFormat::TextureGif),
    ("fbx", SupportedFormat::Fbx),
    ("gltf", SupportedFormat::Gltf),
    ("glb", SupportedFormat::Glb),
    ("obj", SupportedFormat::Obj),
    ("dae", SupportedFormat::Collada),
    ("dds", SupportedFormat::Dds),
    ("mtl", SupportedFormat::Mtl),
    ("stl", SupportedFormat::Stl),
];

impl SupportedFormat {
    /// Every supported format, in table order
    pub fn all() -> impl Iterator<Item = SupportedFormat> {
        FORMAT_TABLE.iter().map(|(_, format)| *format)
    }

    /// Look up a format by an already-extracted extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, format)| *format)
    }

    /// The canonical extension for this format
    pub fn extension(self) -> &'static str {
        FORMAT_TABLE
            .iter()
            .find(|(_, format)| *format == self)
            .map(|(ext, _)| *ext)
            .unwrap_or_default()
    }

    pub fn family(self) -> FormatFamily {
        match self {
            SupportedFormat::TextureJpg
            | SupportedFormat::TexturePng
            | SupportedFormat::TextureGif => FormatFamily::Texture,
            _ => FormatFamily::Model,
        }
    }

    pub fn is_texture(self) -> bool {
        self.family() == FormatFamily::Texture
    }

    /// Name used in log messages ("Error loading GLTF file")
    pub fn display_name(self) -> &'static str {
        match self {
            SupportedFormat::TextureJpg
            | SupportedFormat::TexturePng
            | SupportedFormat::TextureGif => "Texture",
            SupportedFormat::Fbx => "FBX",
            SupportedFormat::Gltf | SupportedFormat::Glb => "GLTF",
            SupportedFormat::Obj => "OBJ",
            SupportedFormat::Collada => "Collada",
            SupportedFormat::Dds => "DDS",
            SupportedFormat::Mtl => "MTL",
            SupportedFormat::Stl => "STL",
        }
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Extract the extension of a file name: the text after the last `.`,
/// lower-cased. Returns `None` when there is no `.` or nothing follows it.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a file by name. `None` means the format is unrecognized.
pub fn classify(file_name: &str) -> Option<SupportedFormat> {
    extension_of(file_name).and_then(|ext| SupportedFormat::from_extension(&ext))
}

/// Accept string for an HTML file input (".jpg,.png,...")
pub fn accept_string() -> String {
    FORMAT_TABLE
        .iter()
        .map(|(ext, _)| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_every_table_entry() {
        for (ext, format) in FORMAT_TABLE {
            assert_eq!(classify(&format!("model.{}", ext)), Some(*format));
            assert_eq!(
                classify(&format!("MODEL.{}", ext.to_ascii_uppercase())),
                Some(*format)
            );
        }
    }

    #[test]
    fn test_classify_mixed_case() {
        assert_eq!(classify("MODEL.FBX"), Some(SupportedFormat::Fbx));
        assert_eq!(classify("Scene.GlTf"), Some(SupportedFormat::Gltf));
        assert_eq!(classify("crate.Dae"), Some(SupportedFormat::Collada));
    }

    #[test]
    fn test_classify_uses_last_dot() {
        assert_eq!(classify("robot.v2.final.stl"), Some(SupportedFormat::Stl));
        assert_eq!(classify("archive.obj.txt"), None);
        assert_eq!(classify("texture.png.gz"), None);
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("notes.txt"), None);
        assert_eq!(classify("model.3ds"), None);
        assert_eq!(classify("collada.xml"), None);
        assert_eq!(classify("photo.jpeg"), None);
    }

    #[test]
    fn test_classify_missing_extension() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("obj"), None);
        assert_eq!(classify("model."), None);
    }

    #[test]
    fn test_families() {
        assert!(SupportedFormat::TextureGif.is_texture());
        assert!(!SupportedFormat::Dds.is_texture());
        assert_eq!(SupportedFormat::Glb.family(), FormatFamily::Model);
        assert_eq!(SupportedFormat::all().count(), 11);
    }

    #[test]
    fn test_accept_string() {
        let accept = accept_string();
        assert!(accept.starts_with(".jpg,.png,.gif"));
        assert!(accept.contains(".dae"));
        assert_eq!(accept.split(',').count(), FORMAT_TABLE.len());
    }

    #[test]
    fn test_canonical_extension() {
        assert_eq!(SupportedFormat::Collada.extension(), "dae");
        assert_eq!(SupportedFormat::Glb.display_name(), "GLTF");
    }
}
