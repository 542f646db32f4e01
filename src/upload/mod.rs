//! Resumable Upload Module
//!
//! Client-side driver for Google Drive resumable uploads:
//! - Fixed 256 KiB chunking with one chunk in memory at a time
//! - Sequential byte-range submission over a pluggable transport
//! - Continuation from the backend-reported offset after partial writes
//!
//! Protocol flow:
//! 1. Open an upload session (`INIT`) and record its location URI
//! 2. PUT sequential byte ranges until Drive reports completion
//! 3. Hand the stored-file id and media type to the caller

pub mod driver;
pub mod source;
pub mod transport;
pub mod types;

pub use driver::{NullObserver, UploadDriver, UploadObserver};
pub use source::{ByteSource, FileSource, MemorySource};
pub use transport::{ChunkTransport, ProxyTransport};
pub use types::*;
