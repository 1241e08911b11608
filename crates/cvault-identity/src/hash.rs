//! Content fingerprints.
//!
//! Fingerprints are lowercase hex SHA-256 digests. Sources are consumed in
//! fixed-size chunks, so memory use does not depend on file size, and the
//! digest does not depend on the chunk size.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Default read size when hashing a stream.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Hash everything `reader` yields, reading at most `chunk_size` bytes at a
/// time.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> Result<String> {
  let mut hasher = Sha256::new();
  let mut buf = vec![0u8; chunk_size.max(1)];
  loop {
    match reader.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => hasher.update(&buf[..n]),
      Err(e) if e.kind() == ErrorKind::Interrupted => continue,
      Err(e) => return Err(Error::HashComputationFailed(e)),
    }
  }
  Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> String {
  hex::encode(Sha256::digest(bytes))
}

/// Hash a seekable source from its start, then rewind it so the caller can
/// read the same bytes again (e.g. to hand them to blob storage).
pub fn hash_seekable<R: Read + Seek>(source: &mut R, chunk_size: usize) -> Result<String> {
  source
    .seek(SeekFrom::Start(0))
    .map_err(Error::HashComputationFailed)?;
  let digest = hash_reader(&mut *source, chunk_size)?;
  source
    .seek(SeekFrom::Start(0))
    .map_err(Error::HashComputationFailed)?;
  Ok(digest)
}

#[cfg(test)]
mod tests {
  use std::io::{self, Cursor};

  use super::*;

  const EMPTY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
  const ABC_SHA256: &str =
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

  #[test]
  fn known_digests() {
    assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    assert_eq!(hash_bytes(b"abc"), ABC_SHA256);
    assert_ne!(hash_bytes(b"content-A"), hash_bytes(b"content-B"));
  }

  #[test]
  fn chunk_size_does_not_change_digest() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let expected = hash_bytes(&data);
    for chunk in [1, 7, 64, 4096, DEFAULT_CHUNK_SIZE, 1 << 20] {
      assert_eq!(hash_reader(data.as_slice(), chunk).unwrap(), expected);
    }
    // Zero is clamped rather than looping forever.
    assert_eq!(hash_reader(data.as_slice(), 0).unwrap(), expected);
  }

  #[test]
  fn repeated_calls_are_stable() {
    let a = hash_bytes(b"resume body");
    let b = hash_bytes(b"resume body");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
  }

  #[test]
  fn seekable_source_is_rewound() {
    let mut cursor = Cursor::new(b"abc".to_vec());
    cursor.set_position(2);

    assert_eq!(hash_seekable(&mut cursor, 2).unwrap(), ABC_SHA256);
    assert_eq!(cursor.position(), 0);
  }

  struct Broken;

  impl Read for Broken {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
      Err(io::Error::other("disk gone"))
    }
  }

  #[test]
  fn unreadable_source_is_an_error() {
    let err = hash_reader(Broken, 16).unwrap_err();
    assert!(matches!(err, Error::HashComputationFailed(_)));
  }
}
