//! Compression codecs for JSONL objects.

use std::pin::Pin;

use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncRead, BufReader};

const READ_BUFFER_BYTES: usize = 8192;

/// Compression applied to a JSONL object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Detect compression from a file name or key.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.ends_with(".gz") || lower.ends_with(".gzip") {
            Compression::Gzip
        } else if lower.ends_with(".zst") || lower.ends_with(".zstd") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    /// Wraps a raw byte reader with the matching decoder and a line buffer.
    pub fn decode<R>(self, raw: R) -> Pin<Box<dyn AsyncBufRead + Send>>
    where
        R: AsyncRead + Send + 'static,
    {
        let buffered = BufReader::with_capacity(READ_BUFFER_BYTES, raw);
        match self {
            Compression::None => Box::pin(buffered),
            Compression::Gzip => Box::pin(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                GzipDecoder::new(buffered),
            )),
            Compression::Zstd => Box::pin(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                ZstdDecoder::new(buffered),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Compression::from_path("data/a.jsonl"), Compression::None);
        assert_eq!(Compression::from_path("data/a.jsonl.gz"), Compression::Gzip);
        assert_eq!(Compression::from_path("A.JSONL.GZIP"), Compression::Gzip);
        assert_eq!(Compression::from_path("a.jsonl.zst"), Compression::Zstd);
    }
}
