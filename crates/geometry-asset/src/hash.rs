use std::fmt::{self, Display, Formatter, LowerHex, UpperHex};

use sha2::{Digest, Sha256};

pub const CONTENT_HASH_LENGTH: usize = 32;

/// SHA-256 fingerprint of asset content, used for identity and change
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; CONTENT_HASH_LENGTH]);

impl LowerHex for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl UpperHex for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl AsRef<[u8; CONTENT_HASH_LENGTH]> for ContentHash {
    fn as_ref(&self) -> &[u8; CONTENT_HASH_LENGTH] {
        &self.0
    }
}

impl From<[u8; CONTENT_HASH_LENGTH]> for ContentHash {
    fn from(bytes: [u8; CONTENT_HASH_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl ContentHash {
    /// Hash the whole buffer.
    ///
    /// Empty input has no digest: `None` is a distinct state from the
    /// digest of some content, never an all-zero placeholder.
    pub fn digest(buffer: &[u8]) -> Option<Self> {
        if buffer.is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(buffer);
        let hash = hasher.finalize();
        Some(Self(hash.into()))
    }

    /// Hash `length` bytes of `buffer` starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range lies outside `buffer`, like slice indexing.
    pub fn digest_range(buffer: &[u8], offset: usize, length: usize) -> Option<Self> {
        Self::digest(&buffer[offset..offset + length])
    }

    /// Fold a list of digests into one by hashing their concatenation.
    pub fn combine<'a, I>(hashes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ContentHash>,
    {
        let mut concatenated = Vec::new();
        for hash in hashes {
            concatenated.extend_from_slice(&hash.0);
        }
        Self::digest(&concatenated)
    }

    pub fn digest_from_reader<R: std::io::Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;

        let hash = hasher.finalize();
        Ok(Self(hash.into()))
    }
}

#[cfg(test)]
mod test {
    use super::ContentHash;

    #[test]
    fn test_empty_has_no_digest() {
        assert_eq!(ContentHash::digest(&[]), None);
        assert_eq!(ContentHash::digest_range(&[1, 2, 3], 1, 0), None);
        assert!(ContentHash::digest(&[0]).is_some());
    }

    #[test]
    fn test_known_digest() {
        let hash = ContentHash::digest(b"abc").unwrap();
        assert_eq!(
            hash.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            format!("{:X}", hash),
            "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"
        );
    }

    #[test]
    fn test_range_matches_slice() {
        let buffer = b"xxabcyy";
        assert_eq!(
            ContentHash::digest_range(buffer, 2, 3),
            ContentHash::digest(b"abc")
        );
    }

    #[test]
    fn test_combine_is_order_sensitive() {
        let a = ContentHash::digest(b"a").unwrap();
        let b = ContentHash::digest(b"b").unwrap();
        assert_ne!(ContentHash::combine(&[a, b]), ContentHash::combine(&[b, a]));
        let none: [ContentHash; 0] = [];
        assert_eq!(ContentHash::combine(&none), None);

        let mut concatenated = a.0.to_vec();
        concatenated.extend_from_slice(&b.0);
        assert_eq!(
            ContentHash::combine(&[a, b]),
            ContentHash::digest(&concatenated)
        );
    }

    #[test]
    fn test_reader_matches_buffer() {
        let from_reader = ContentHash::digest_from_reader(&b"geometry"[..]).unwrap();
        assert_eq!(Some(from_reader), ContentHash::digest(b"geometry"));
    }
}
