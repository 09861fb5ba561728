//! Dropview Core - Format dispatch, decoders, and the live scene graph
//!
//! This crate provides everything in the viewer that is independent of the
//! renderer:
//! - Extension-based format classification
//! - Decoders turning file bytes into renderer-agnostic assets
//! - The format dispatcher and its completion policy
//! - The scene graph mirrored by the bevy scene host
//! - Viewer configuration

pub mod asset;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod scene;
pub mod source;

pub use asset::{
    AnimationClip, AssetNode, DecodedAsset, MaterialData, MeshData, NodeRole, NodeTransform,
    TextureData, TexturePixels, Topology,
};
pub use config::{load_config, ViewerConfig};
pub use decode::{Decoder, DecoderSet};
pub use dispatch::{Completion, DispatchId, Dispatcher, InFlight};
pub use error::{DecodeError, SourceError, ViewerError};
pub use format::{accept_string, classify, FormatFamily, SupportedFormat};
pub use scene::{MeshKey, NodeId, SceneGraph, SceneNode};
pub use source::{ByteHandle, ByteSource, InputFile, MemorySource, PathSource, Progress};
