use std::error::Error;

/// A zlib inflate routine: takes the compressed bytes and the expected
/// uncompressed size (a hint only) and returns the uncompressed bytes.
///
/// The reader never trusts the output length; it compares it with the size
/// declared in the file itself.
pub type Decompressor<'a> = dyn FnMut(&[u8], usize) -> Result<Vec<u8>, Box<dyn Error>> + 'a;

/// Never preallocate more than this, whatever the file claims
#[cfg(feature = "z")]
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Upper bound on the output of a single stream
#[cfg(feature = "z")]
const ONE_GIGABYTE: u64 = 1024 * 1024 * 1024;

#[cfg(feature = "z")]
/// Decompress a zlib stream using flate2
pub fn decompress_z(compressed_data: &[u8], size_hint: usize) -> Result<Vec<u8>, Box<dyn Error>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read as _;

    let mut output: Vec<u8> = Vec::with_capacity(size_hint.min(MAX_PREALLOCATION));
    ZlibDecoder::new(compressed_data)
        .take(ONE_GIGABYTE)
        .read_to_end(&mut output)?;
    Ok(output)
}

#[cfg(all(test, feature = "z"))]
mod tests {
    use std::io::Write as _;

    use flate2::{Compression, write::ZlibEncoder};

    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_whole_stream() {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabc".repeat(8);
        let compressed = compress(&data);
        // a wrong hint does not truncate the output
        assert_eq!(decompress_z(&compressed, 4).unwrap(), data);
        assert_eq!(decompress_z(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decompress_z(b"definitely not zlib", 100).is_err());
    }
}
