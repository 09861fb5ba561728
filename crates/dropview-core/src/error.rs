//! Error types for dispatch and decoding

use thiserror::Error;

use crate::format::SupportedFormat;

/// Failure inside a format decoder
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("GLTF parse failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("OBJ parse failed: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("DDS parse failed: {0}")]
    Dds(#[from] ddsfile::Error),
    #[error("XML parse failed: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("FBX parse failed: {0}")]
    Fbx(String),
    #[error("Collada parse failed: {0}")]
    Collada(String),
    #[error("file is not valid UTF-8")]
    NotUtf8,
    #[error("no geometry found in file")]
    NoGeometry,
    #[error("unsupported content: {0}")]
    Unsupported(String),
    #[error("no decoder registered for {0}")]
    NoDecoder(SupportedFormat),
    #[error("decoder panicked: {0}")]
    Panicked(String),
}

/// Failure acquiring or reading a file's bytes
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("byte handle unavailable: {0}")]
    Unavailable(String),
    #[error("read failed: {0}")]
    Read(String),
}

/// Errors surfaced by the dispatcher. All of them are non-fatal.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Unsupported file type: {file_name}")]
    UnrecognizedFormat { file_name: String },
    #[error("Error reading file: {0}")]
    Source(#[from] SourceError),
    #[error("Error loading {format} file: {source}")]
    Decode {
        format: SupportedFormat,
        #[source]
        source: DecodeError,
    },
    #[error("{format} decoder produced an asset of the wrong kind")]
    UnexpectedAsset { format: SupportedFormat },
    #[error("No file selected")]
    EmptySelection,
    #[error("failed to start decode task: {0}")]
    Spawn(#[from] futures::task::SpawnError),
}
