//! Hashing helpers shared by the rest of the `rattler_*` crates.
//!
//! The cache core needs to compute and compare `Md5`/`Sha256` digests of
//! tarballs without every crate re-deriving the same `Read`-wrapping
//! boilerplate, so this crate centralizes it.

use std::io::{self, Read};

pub use digest::Digest;
pub use md5::Md5;
pub use sha2::Sha256;

/// A convenience alias for the raw output of an [`Md5`] digest.
pub type Md5Hash = digest::Output<Md5>;
/// A convenience alias for the raw output of a [`Sha256`] digest.
pub type Sha256Hash = digest::Output<Sha256>;

/// A [`Read`] adapter that feeds every byte read through it into a digest,
/// so the hash of a stream can be computed while it is being consumed for
/// some other purpose (e.g. extraction).
pub struct HashingReader<R, D: Digest> {
    inner: R,
    hasher: D,
}

impl<R: Read, D: Digest + Default> HashingReader<R, D> {
    /// Wraps `inner`, hashing every byte read from it.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: D::new(),
        }
    }

    /// Consumes the reader, returning the original reader and the finalized
    /// digest of everything that was read through it.
    pub fn finalize(self) -> (R, digest::Output<D>) {
        (self.inner, self.hasher.finalize())
    }
}

impl<R: Read, D: Digest> Read for HashingReader<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.hasher.update(&buf[..bytes_read]);
        Ok(bytes_read)
    }
}

/// Computes the digest of an entire reader by draining it.
pub fn compute_digest<D: Digest + Default, R: Read>(mut reader: R) -> io::Result<digest::Output<D>> {
    let mut hasher = D::new();
    let mut buf = [0u8; 8 * 1024];
    loop {
        let bytes_read = reader.read(&mut buf)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buf[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// Computes the digest of a file on disk.
pub fn compute_file_digest<D: Digest + Default>(path: &std::path::Path) -> io::Result<digest::Output<D>> {
    compute_digest::<D, _>(std::io::BufReader::new(std::fs::File::open(path)?))
}

/// Parses a lowercase (or uppercase) hex string into a digest output,
/// returning `None` if the string isn't valid hex or has the wrong length.
pub fn parse_digest_from_hex<D: Digest>(hex_str: &str) -> Option<digest::Output<D>> {
    let bytes = hex::decode(hex_str).ok()?;
    let mut output = digest::Output::<D>::default();
    if bytes.len() != output.len() {
        return None;
    }
    output.copy_from_slice(&bytes);
    Some(output)
}

/// Formats a digest output as a lowercase hex string.
pub fn digest_to_hex<D: Digest>(output: &digest::Output<D>) -> String {
    hex::encode(output)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn hashing_reader_matches_direct_digest() {
        let data = b"the quick brown fox jumps over the lazy dog";

        let direct = compute_digest::<Sha256, _>(Cursor::new(data)).unwrap();

        let mut reader = HashingReader::<_, Sha256>::new(Cursor::new(data));
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).unwrap();
        let (_, via_reader) = reader.finalize();

        assert_eq!(direct, via_reader);
        assert_eq!(sink, data);
    }

    #[test]
    fn hex_round_trip() {
        let data = b"hello world";
        let digest = compute_digest::<Sha256, _>(Cursor::new(data)).unwrap();
        let hex_str = digest_to_hex::<Sha256>(&digest);
        let parsed = parse_digest_from_hex::<Sha256>(&hex_str).unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn rejects_wrong_length_hex() {
        assert!(parse_digest_from_hex::<Sha256>("deadbeef").is_none());
    }
}
