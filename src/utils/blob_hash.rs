//! Git blob digests
//!
//! GitHub identifies file contents by the SHA-1 of the framed payload
//! `blob <size>\0<bytes>`. Computing the same digest locally lets a
//! candidate file be compared against a tree listing without downloading
//! the remote blob.

use std::fmt::Write;

use sha1::{Digest, Sha1};

use crate::models::FileContent;

/// Digest of a text or binary payload.
///
/// Text is hashed as its UTF-8 bytes; binary bytes are hashed verbatim.
pub fn hash_content(content: &FileContent) -> String {
    hash_bytes(content.as_bytes())
}

/// Digest of a UTF-8 string
pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// Digest of raw bytes framed as a blob
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    to_hex(&hasher.finalize())
}

fn to_hex(digest: &[u8]) -> String {
    let mut oid = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail
        let _ = write!(&mut oid, "{:02x}", byte);
    }
    oid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_blob_digests() {
        assert_eq!(hash_text("hello"), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
        assert_eq!(hash_text(""), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        assert_eq!(
            hash_text("hello world\n"),
            "3b18e512dba79e4c8300dd08aeb37f8e728b8dad"
        );
    }

    #[test]
    fn test_size_counts_utf8_bytes() {
        // "é" is two bytes, so the header must read "blob 2"
        let text = "é";
        assert_eq!(hash_text(text), hash_bytes(&[0xc3, 0xa9]));
        assert_ne!(hash_text(text), hash_bytes(&[0xe9]));
    }

    #[test]
    fn test_binary_bytes_hashed_verbatim() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe];
        let digest = hash_content(&FileContent::Binary(bytes.clone()));
        assert_eq!(digest, hash_bytes(&bytes));
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_deterministic_and_distinct() {
        assert_eq!(hash_text("same"), hash_text("same"));
        assert_ne!(hash_text("a"), hash_text("b"));
        assert_eq!(
            hash_content(&FileContent::Text("x".to_string())),
            hash_content(&FileContent::Binary(b"x".to_vec()))
        );
    }
}
