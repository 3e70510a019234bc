use std::io::{self, BufRead, BufReader};

use flate2::bufread::{MultiGzDecoder, ZlibDecoder};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Zlib,
}

impl CompressionType {
    /// Guesses the compression of a stream from its first bytes.
    pub fn sniff(head: &[u8]) -> Self {
        match head {
            [0x1f, 0x8b, ..] => CompressionType::Gzip,
            // Deflate with a 32K window; the two header bytes must be a multiple of 31.
            [0x78, flg, ..] if (0x7800 | u16::from(*flg)) % 31 == 0 => CompressionType::Zlib,
            _ => CompressionType::None,
        }
    }
}

/// Wraps `stream` in the decoder matching its leading bytes, without
/// consuming anything from it.
pub fn decompressed<R: BufRead + 'static>(mut stream: R) -> io::Result<Box<dyn BufRead>> {
    let compression = CompressionType::sniff(stream.fill_buf()?);
    debug!("Input compression: {:?}", compression);
    Ok(match compression {
        CompressionType::None => Box::new(stream),
        CompressionType::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(stream))),
        CompressionType::Zlib => Box::new(BufReader::new(ZlibDecoder::new(stream))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::{Cursor, Read, Write};

    const TEXT: &[u8] = b"12.5 -8240000.0 4980000.0\n";

    fn read_all(bytes: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        decompressed(Cursor::new(bytes)).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(CompressionType::sniff(TEXT), CompressionType::None);
        assert_eq!(read_all(TEXT.to_vec()), TEXT);
    }

    #[test]
    fn gzip_is_detected_and_decoded() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TEXT).unwrap();
        let bytes = enc.finish().unwrap();
        assert_eq!(CompressionType::sniff(&bytes), CompressionType::Gzip);
        assert_eq!(read_all(bytes), TEXT);
    }

    #[test]
    fn zlib_is_detected_and_decoded() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TEXT).unwrap();
        let bytes = enc.finish().unwrap();
        assert_eq!(CompressionType::sniff(&bytes), CompressionType::Zlib);
        assert_eq!(read_all(bytes), TEXT);
    }

    #[test]
    fn numeric_text_is_never_mistaken_for_zlib() {
        assert_eq!(CompressionType::sniff(b"80.5 1 2"), CompressionType::None);
        assert_eq!(CompressionType::sniff(b"-1.0 1 2"), CompressionType::None);
    }

    #[test]
    fn empty_stream_is_uncompressed() {
        assert_eq!(CompressionType::sniff(&[]), CompressionType::None);
        assert!(read_all(Vec::new()).is_empty());
    }
}
