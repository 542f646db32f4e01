//! Byte Sources
//!
//! Abstraction over the file-like input an upload reads from. Sources are
//! read one bounded range at a time, so memory stays at a single chunk
//! regardless of file size.

use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

// ============================================================================
// Byte Source Trait
// ============================================================================

/// A random-access byte source of known length.
#[async_trait]
pub trait ByteSource: Send {
    /// Total length in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read bytes `[start, end)`. Callers only request in-bounds ranges.
    async fn read_range(&mut self, start: u64, end: u64) -> std::io::Result<Vec<u8>>;
}

// ============================================================================
// In-Memory Source
// ============================================================================

/// Source backed by an in-memory buffer (pasted data, tests).
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read_range(&mut self, start: u64, end: u64) -> std::io::Result<Vec<u8>> {
        let span = self
            .bytes
            .get(start as usize..end as usize)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("range {start}..{end} outside source of {} bytes", self.bytes.len()),
                )
            })?;
        Ok(span.to_vec())
    }
}

// ============================================================================
// File Source
// ============================================================================

/// Source backed by a file on disk, read with seek + exact-length reads.
pub struct FileSource {
    file: tokio::fs::File,
    len: u64,
}

impl FileSource {
    /// Open a file and record its length.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_range(&mut self, start: u64, end: u64) -> std::io::Result<Vec<u8>> {
        if start > end {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("inverted range {start}..{end}"),
            ));
        }
        self.file.seek(SeekFrom::Start(start)).await?;
        let mut buffer = vec![0u8; (end - start) as usize];
        self.file.read_exact(&mut buffer).await?;
        Ok(buffer)
    }
}

// ============================================================================
// Tests
// ============================================================================
