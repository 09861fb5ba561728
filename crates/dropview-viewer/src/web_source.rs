//! Browser file contents, read through an object URL
//!
//! Opening a [`BlobSource`] creates an object URL for the `File`. Reading
//! fetches that URL and streams the body so progress can be reported per
//! chunk. The URL is revoked when the handle is dropped.

use dropview_core::{ByteHandle, ByteSource, Progress, SourceError};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStreamDefaultReader, Response, Url};

fn js_error(context: &str, value: JsValue) -> SourceError {
    SourceError::Read(format!("{}: {:?}", context, value))
}

/// A `File` from a drop or the Browse dialog
pub struct BlobSource {
    file: web_sys::File,
}

impl BlobSource {
    pub fn new(file: web_sys::File) -> Self {
        Self { file }
    }
}

impl ByteSource for BlobSource {
    fn size_hint(&self) -> Option<u64> {
        Some(self.file.size() as u64)
    }

    fn open(self: Box<Self>) -> Result<Box<dyn ByteHandle>, SourceError> {
        let url = Url::create_object_url_with_blob(&self.file)
            .map_err(|e| SourceError::Unavailable(format!("{:?}", e)))?;
        tracing::debug!(file = %self.file.name(), %url, "Created object URL");
        Ok(Box::new(ObjectUrlHandle {
            url,
            total: self.file.size() as u64,
        }))
    }
}

struct ObjectUrlHandle {
    url: String,
    total: u64,
}

impl ObjectUrlHandle {
    async fn fetch(&self, on_progress: &mut dyn FnMut(Progress)) -> Result<Vec<u8>, SourceError> {
        let window =
            web_sys::window().ok_or_else(|| SourceError::Unavailable("no window".to_string()))?;

        let response = JsFuture::from(window.fetch_with_str(&self.url))
            .await
            .map_err(|e| js_error("fetch failed", e))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| SourceError::Read("response cast failed".to_string()))?;
        if !response.ok() {
            return Err(SourceError::Read(format!(
                "HTTP {}: {}",
                response.status(),
                response.status_text()
            )));
        }

        let body = response
            .body()
            .ok_or_else(|| SourceError::Read("response has no body".to_string()))?;
        let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();

        let mut bytes = Vec::with_capacity(self.total as usize);
        loop {
            let chunk = JsFuture::from(reader.read())
                .await
                .map_err(|e| js_error("stream read failed", e))?;
            let done = Reflect::get(&chunk, &JsValue::from_str("done"))
                .map_err(|e| js_error("stream read failed", e))?
                .as_bool()
                .unwrap_or(true);
            if done {
                break;
            }
            let value = Reflect::get(&chunk, &JsValue::from_str("value"))
                .map_err(|e| js_error("stream read failed", e))?;
            let array = Uint8Array::new(&value);

            let start = bytes.len();
            bytes.resize(start + array.length() as usize, 0);
            array.copy_to(&mut bytes[start..]);
            on_progress(Progress {
                loaded: bytes.len() as u64,
                total: self.total,
            });
        }
        Ok(bytes)
    }
}

impl ByteHandle for ObjectUrlHandle {
    fn read<'a>(
        &'a mut self,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, SourceError>> {
        self.fetch(on_progress).boxed_local()
    }
}

impl Drop for ObjectUrlHandle {
    fn drop(&mut self) {
        if let Err(e) = Url::revoke_object_url(&self.url) {
            tracing::warn!(url = %self.url, "Failed to revoke object URL: {:?}", e);
        }
    }
}
