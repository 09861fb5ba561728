//! JPEG / PNG / GIF texture decoding

use std::sync::Arc;

use super::Decoder;
use crate::asset::{DecodedAsset, TextureData};
use crate::error::DecodeError;
use crate::format::SupportedFormat;

/// Decodes images to RGBA8 with the `image` crate. GIFs yield their first frame.
pub struct TextureDecoder;

impl Decoder for TextureDecoder {
    fn name(&self) -> &'static str {
        "texture"
    }

    fn formats(&self) -> &'static [SupportedFormat] {
        &[
            SupportedFormat::TextureJpg,
            SupportedFormat::TexturePng,
            SupportedFormat::TextureGif,
        ]
    }

    fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedAsset, DecodeError> {
        // The browser sniffs image content regardless of extension; do the same
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(DecodedAsset::Texture(Arc::new(TextureData::rgba8(
            file_name,
            width,
            height,
            rgba.into_raw(),
        ))))
    }
}
