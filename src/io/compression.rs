//! Pluggable compression for object bodies.
//!
//! Bodies are whole in memory, so codecs work on byte slices rather than
//! streams. Built-in codecs are compiled in by feature flag:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//!
//! Detection checks the key extension first and falls back to magic bytes, so
//! warehouse exports named `..._part_00` (no extension) still decode.

use std::io::{Read, Write};

/// Pluggable compression codec trait.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "zstd").
    fn name(&self) -> &str;

    /// Lowercase key extensions including the leading dot.
    fn extensions(&self) -> &[&str];

    /// Optional magic byte signature for content-based detection.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Decompress a whole body.
    ///
    /// # Errors
    /// Returns an error if `data` is not valid for this codec.
    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Compress a whole body.
    ///
    /// # Errors
    /// Returns an error if the encoder fails.
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;
}

static BUILTIN_CODECS: &[&dyn CompressionCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
    #[cfg(feature = "compression-zstd")]
    &ZstdCodec,
];

/// Codecs compiled into this build.
#[must_use]
pub fn builtin_codecs() -> &'static [&'static dyn CompressionCodec] {
    BUILTIN_CODECS
}

/// Look a codec up by name.
#[must_use]
pub fn codec_by_name(name: &str) -> Option<&'static dyn CompressionCodec> {
    BUILTIN_CODECS.iter().copied().find(|c| c.name() == name)
}

/// Detect compression codec from the object key extension (case-insensitive).
#[must_use]
pub fn detect_from_key(key: &str) -> Option<&'static dyn CompressionCodec> {
    let key = key.to_lowercase();
    BUILTIN_CODECS
        .iter()
        .copied()
        .find(|c| c.extensions().iter().any(|ext| key.ends_with(ext)))
}

/// Detect compression codec from magic bytes at the start of a body.
#[must_use]
pub fn detect_from_magic(data: &[u8]) -> Option<&'static dyn CompressionCodec> {
    BUILTIN_CODECS
        .iter()
        .copied()
        .find(|c| c.magic_bytes().is_some_and(|m| data.starts_with(m)))
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        // Multi-member: concatenated gzip streams are common in exports
        let mut out = Vec::new();
        flate2::read::MultiGzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data)?;
        enc.finish()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        zstd::stream::read::Decoder::new(data)?.read_to_end(&mut out)?;
        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut enc = zstd::stream::write::Encoder::new(Vec::new(), 3)?;
        enc.write_all(data)?;
        enc.finish()
    }
}
