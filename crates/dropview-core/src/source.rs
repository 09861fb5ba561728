//! Input files and their ephemeral byte handles
//!
//! An [`InputFile`] is what the input surface hands to the dispatcher: a
//! name and something that can be opened into a [`ByteHandle`]. The handle
//! is the temporary, revocable reference to the contents (an object URL in
//! the browser). Dropping a handle releases it.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::SourceError;

/// Read granularity used when reporting progress
pub const READ_CHUNK_SIZE: usize = 256 * 1024;

/// Bytes loaded so far versus the expected total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: u64,
}

impl Progress {
    /// `loaded / total * 100`, or `None` when the total is unknown
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.loaded as f64 / self.total as f64 * 100.0)
        }
    }
}

/// Ephemeral access to a file's contents
pub trait ByteHandle {
    /// Read the whole file, reporting progress as chunks arrive
    fn read<'a>(
        &'a mut self,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, SourceError>>;
}

/// Something that can be opened into a [`ByteHandle`]
pub trait ByteSource {
    /// Size in bytes, if known up front
    fn size_hint(&self) -> Option<u64> {
        None
    }

    fn open(self: Box<Self>) -> Result<Box<dyn ByteHandle>, SourceError>;
}

/// A file handed over by the input surface, consumed by one dispatch
pub struct InputFile {
    pub name: String,
    pub source: Box<dyn ByteSource>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, source: impl ByteSource + 'static) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// In-memory file; mainly useful for tests and embedded assets
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, MemorySource::new(bytes))
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("size", &self.source.size_hint())
            .finish()
    }
}

/// Bytes already in memory
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ByteSource for MemorySource {
    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    fn open(self: Box<Self>) -> Result<Box<dyn ByteHandle>, SourceError> {
        Ok(Box::new(MemoryHandle {
            bytes: Some(self.bytes),
        }))
    }
}

struct MemoryHandle {
    bytes: Option<Vec<u8>>,
}

impl ByteHandle for MemoryHandle {
    fn read<'a>(
        &'a mut self,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, SourceError>> {
        async move {
            let bytes = self
                .bytes
                .take()
                .ok_or_else(|| SourceError::Unavailable("handle already read".to_string()))?;
            let total = bytes.len() as u64;
            let mut loaded = 0u64;
            for chunk in bytes.chunks(READ_CHUNK_SIZE) {
                loaded += chunk.len() as u64;
                on_progress(Progress { loaded, total });
            }
            Ok::<_, SourceError>(bytes)
        }
        .boxed_local()
    }
}

/// A file on the local filesystem (native drag-and-drop)
pub struct PathSource {
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ByteSource for PathSource {
    fn size_hint(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    fn open(self: Box<Self>) -> Result<Box<dyn ByteHandle>, SourceError> {
        let file = std::fs::File::open(&self.path)?;
        let total = file.metadata()?.len();
        Ok(Box::new(FileHandle { file, total }))
    }
}

struct FileHandle {
    file: std::fs::File,
    total: u64,
}

impl ByteHandle for FileHandle {
    fn read<'a>(
        &'a mut self,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, SourceError>> {
        async move {
            let mut bytes = Vec::with_capacity(self.total as usize);
            let mut chunk = vec![0u8; READ_CHUNK_SIZE];
            loop {
                let n = self.file.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                bytes.extend_from_slice(&chunk[..n]);
                on_progress(Progress {
                    loaded: bytes.len() as u64,
                    total: self.total,
                });
            }
            Ok::<_, SourceError>(bytes)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::io::Write;

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress { loaded: 50, total: 200 }.percent(), Some(25.0));
        assert_eq!(Progress { loaded: 10, total: 0 }.percent(), None);
    }

    #[test]
    fn test_memory_source_reports_chunks() {
        let data = vec![7u8; READ_CHUNK_SIZE * 2 + 10];
        let source: Box<dyn ByteSource> = Box::new(MemorySource::new(data.clone()));
        assert_eq!(source.size_hint(), Some(data.len() as u64));

        let mut handle = source.open().unwrap();
        let mut updates = Vec::new();
        let bytes = block_on(handle.read(&mut |p| updates.push(p))).unwrap();

        assert_eq!(bytes, data);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates.last().unwrap().loaded, data.len() as u64);
    }

    #[test]
    fn test_memory_handle_reads_once() {
        let mut handle = Box::new(MemorySource::new(vec![1, 2, 3])).open().unwrap();
        block_on(handle.read(&mut |_| {})).unwrap();
        assert!(block_on(handle.read(&mut |_| {})).is_err());
    }

    #[test]
    fn test_path_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cube.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"v 0 0 0\n").unwrap();
        drop(file);

        let mut handle = Box::new(PathSource::new(&path)).open().unwrap();
        let mut last = None;
        let bytes = block_on(handle.read(&mut |p| last = Some(p))).unwrap();
        assert_eq!(bytes, b"v 0 0 0\n");
        assert_eq!(last, Some(Progress { loaded: 8, total: 8 }));
    }

    #[test]
    fn test_path_source_missing_file() {
        let result = Box::new(PathSource::new("/nonexistent/model.stl")).open();
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
