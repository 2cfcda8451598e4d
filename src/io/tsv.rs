//! Delimited text bodies, optionally compressed.
//!
//! Warehouse unloads write headerless, tab-delimited, gzip-compressed parts;
//! [`TsvFormat::default`] reads that shape (with compression auto-detected)
//! and [`TsvFormat::gzip`] writes it. Rows may be ragged: width is not
//! validated on either side.

use crate::error::{EtlError, Result};
use crate::io::compression::{
    CompressionCodec, codec_by_name, detect_from_key, detect_from_magic,
};
use crate::rows::Row;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

/// Which codec wraps the delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// By key extension, then magic bytes (reads only; writes use the extension).
    #[default]
    Auto,
    None,
    Gzip,
    Zstd,
}

impl Compression {
    fn named(name: &str, key: &str) -> Result<&'static dyn CompressionCodec> {
        codec_by_name(name).ok_or_else(|| {
            EtlError::config(format!("{name} support is not compiled in (needed for {key})"))
        })
    }

    fn for_read(self, key: &str, body: &[u8]) -> Result<Option<&'static dyn CompressionCodec>> {
        match self {
            Compression::Auto => Ok(detect_from_key(key).or_else(|| detect_from_magic(body))),
            Compression::None => Ok(None),
            Compression::Gzip => Self::named("gzip", key).map(Some),
            Compression::Zstd => Self::named("zstd", key).map(Some),
        }
    }

    fn for_write(self, key: &str) -> Result<Option<&'static dyn CompressionCodec>> {
        match self {
            Compression::Auto => Ok(detect_from_key(key)),
            Compression::None => Ok(None),
            Compression::Gzip => Self::named("gzip", key).map(Some),
            Compression::Zstd => Self::named("zstd", key).map(Some),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsvFormat {
    pub delimiter: u8,
    pub compression: Compression,
}

impl Default for TsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            compression: Compression::Auto,
        }
    }
}

impl TsvFormat {
    /// Tab-delimited, always gzip-compressed.
    #[must_use]
    pub fn gzip() -> Self {
        Self {
            compression: Compression::Gzip,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Decode a body into rows. An empty body, or one that decompresses to
    /// nothing, yields no rows.
    ///
    /// # Errors
    /// [`EtlError::Decode`] on corrupt compression, invalid UTF-8 or a
    /// malformed quoted field.
    pub fn decode(&self, key: &str, body: &[u8]) -> Result<Vec<Row>> {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        let text = match self.compression.for_read(key, body)? {
            Some(codec) => codec
                .decompress(body)
                .map_err(|e| EtlError::decode(key, format!("{} decompression: {e}", codec.name())))?,
            None => body.to_vec(),
        };

        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_slice());

        let mut rows = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.map_err(|e| EtlError::decode(key, format!("record #{}: {e}", i + 1)))?;
            rows.push(rec.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    /// Encode rows for writing at `key`. No header line is written.
    ///
    /// # Errors
    /// [`EtlError::Encode`] if serialisation or compression fails.
    pub fn encode(&self, key: &str, rows: &[Row]) -> Result<Vec<u8>> {
        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for (i, row) in rows.iter().enumerate() {
            wtr.write_record(row)
                .map_err(|e| EtlError::encode(key, format!("row #{}: {e}", i + 1)))?;
        }
        let text = wtr
            .into_inner()
            .map_err(|e| EtlError::encode(key, e.error().to_string()))?;

        match self.compression.for_write(key)? {
            Some(codec) => codec
                .compress(&text)
                .map_err(|e| EtlError::encode(key, format!("{} compression: {e}", codec.name()))),
            None => Ok(text),
        }
    }
}
