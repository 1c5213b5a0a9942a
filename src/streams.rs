//! Byte streams with known size and write-through hashing.
//!
//! Uploads flow through a [`ByteStream`] so a checksum can be computed while
//! the bytes pass by; after the backend acknowledges the write, the local
//! digest is compared against the backend-reported one. Downloads reuse the
//! same type so callers always see a sized chunk stream.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use md5::{Digest, Md5};
use sha1::Sha1;

type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Observes every chunk that passes through a [`ByteStream`].
pub trait StreamWriter: Send {
    fn update(&mut self, chunk: &[u8]);
    /// Hex digest of everything seen so far.
    fn hexdigest(&self) -> String;
}

pub struct Md5Writer(Md5);

impl Md5Writer {
    pub fn new() -> Self {
        Self(Md5::new())
    }
}

impl Default for Md5Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter for Md5Writer {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn hexdigest(&self) -> String {
        hex::encode(self.0.clone().finalize())
    }
}

pub struct Sha1Writer(Sha1);

impl Sha1Writer {
    pub fn new() -> Self {
        Self(Sha1::new())
    }
}

impl Default for Sha1Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter for Sha1Writer {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn hexdigest(&self) -> String {
        hex::encode(self.0.clone().finalize())
    }
}

/// A chunked byte stream with a known total size (when the source knows it)
/// and pluggable write-through hash writers.
pub struct ByteStream {
    inner: ChunkStream,
    size: Option<u64>,
    writers: HashMap<String, Box<dyn StreamWriter>>,
}

impl ByteStream {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            inner: Box::pin(stream::iter(vec![Ok(bytes)])),
            size: Some(size),
            writers: HashMap::new(),
        }
    }

    pub fn from_chunks(
        chunks: impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
        size: Option<u64>,
    ) -> Self {
        Self {
            inner: Box::pin(chunks),
            size,
            writers: HashMap::new(),
        }
    }

    /// Total size in bytes, when known up front.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn add_writer(&mut self, name: &str, writer: Box<dyn StreamWriter>) {
        self.writers.insert(name.to_string(), writer);
    }

    /// Digest of the named writer over everything read so far.
    pub fn writer_hexdigest(&self, name: &str) -> Option<String> {
        self.writers.get(name).map(|w| w.hexdigest())
    }

    /// Next chunk, fed through every registered writer.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Vec<u8>>> {
        let chunk = self.inner.next().await?;
        if let Ok(ref bytes) = chunk {
            for writer in self.writers.values_mut() {
                writer.update(bytes);
            }
        }
        Some(chunk)
    }

    /// Drain the stream into one buffer, feeding every registered writer.
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut out = match self.size {
            Some(size) => Vec::with_capacity(size as usize),
            None => Vec::new(),
        };
        while let Some(chunk) = self.next_chunk().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("size", &self.size)
            .field("writers", &self.writers.keys().collect::<Vec<_>>())
            .finish()
    }
}
