//! Compression handling for the dump reader.
//!
//! The codec is inferred from the input file extension and wraps the raw
//! file stream in a decompressing reader, so the rest of the pipeline only
//! ever sees plain text lines.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Supported input compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    None,
}

impl Compression {
    /// Infer the codec from the input file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") | Some("zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a raw byte stream in a decompressing buffered reader.
    pub fn wrap(
        self,
        inner: Box<dyn Read + Send>,
    ) -> std::io::Result<Box<dyn BufRead + Send>> {
        Ok(match self {
            Compression::Gzip => {
                Box::new(BufReader::new(flate2::read::GzDecoder::new(inner)))
            }
            Compression::Zstd => Box::new(BufReader::new(zstd::stream::Decoder::new(inner)?)),
            Compression::None => Box::new(BufReader::new(inner)),
        })
    }

    /// Human-readable name of this codec (for logging).
    pub fn name(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
            Compression::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_DATA: &[u8] = b"INSERT INTO t (a) VALUES (1);\nINSERT INTO t (a) VALUES (2);\n";

    fn read_all(compression: Compression, data: Vec<u8>) -> Vec<u8> {
        let mut reader = compression
            .wrap(Box::new(std::io::Cursor::new(data)))
            .unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Compression::from_path(Path::new("dump.sql.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("dump.sql.zst")), Compression::Zstd);
        assert_eq!(Compression::from_path(Path::new("dump.sql.zstd")), Compression::Zstd);
        assert_eq!(Compression::from_path(Path::new("dump.sql")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("dump")), Compression::None);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(TEST_DATA).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(read_all(Compression::Gzip, compressed), TEST_DATA);
    }

    #[test]
    fn test_zstd_roundtrip() {
        let compressed = zstd::encode_all(TEST_DATA, 3).unwrap();
        assert_eq!(read_all(Compression::Zstd, compressed), TEST_DATA);
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(read_all(Compression::None, TEST_DATA.to_vec()), TEST_DATA);
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(Compression::Gzip.name(), "gzip");
        assert_eq!(Compression::Zstd.name(), "zstd");
        assert_eq!(Compression::None.name(), "none");
    }
}
