//! Compression collaborator used by the context transfer protocol.
//!
//! [`Compressor`] is the seam; [`DeflateCompressor`] is the zlib
//! implementation shipped with the crate. Any implementation must round-trip
//! byte-identically: `decompress(compress(s)) == s`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::domain::error::{Result, SwarmError, ValidationError};

/// Options passed with every compression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// 1 (fastest, largest) to 10 (slowest, smallest).
    pub quality: u8,
    /// Hint that the payload is structured text whose meaning must survive.
    /// Lossless implementations may ignore it.
    pub preserve_semantic: bool,
}

impl CompressionOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality,
            preserve_semantic: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.quality) {
            return Err(ValidationError::single(format!(
                "compression quality must be in [1, 10] (got {})",
                self.quality
            ))
            .into());
        }
        Ok(())
    }
}

/// Byte-level compression service.
pub trait Compressor: Send + Sync {
    fn compress(&self, text: &str, options: CompressionOptions) -> Result<Vec<u8>>;

    fn decompress(&self, bytes: &[u8]) -> Result<String>;
}

/// zlib compressor. Quality 1-10 maps onto zlib levels 1-9.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCompressor;

impl DeflateCompressor {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for DeflateCompressor {
    fn compress(&self, text: &str, options: CompressionOptions) -> Result<Vec<u8>> {
        options.validate()?;
        let level = u32::from(options.quality.min(9));
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
        encoder
            .write_all(text.as_bytes())
            .map_err(|e| SwarmError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| SwarmError::Compression(e.to_string()))
    }

    fn decompress(&self, bytes: &[u8]) -> Result<String> {
        let mut decoder = ZlibDecoder::new(bytes);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|e| SwarmError::Compression(e.to_string()))?;
        Ok(text)
    }
}
