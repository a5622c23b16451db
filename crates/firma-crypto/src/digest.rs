#![forbid(unsafe_code)]

//! Reference and fingerprint digests.

use firma_core::{algorithm, Error};
use sha2::{Digest, Sha256};

/// Digest `data` with the method named by `uri`.
///
/// SHA-256 is the only digest a reference may use; anything else is
/// reported as unsupported.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    if uri != algorithm::SHA256 {
        return Err(Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}")));
    }
    Ok(sha256(data).to_vec())
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_reference_digest() {
        let canonical = br#"<Invoice Id="signed-doc"></Invoice>"#;
        let value = digest(algorithm::SHA256, canonical).unwrap();
        assert_eq!(value.len(), 32);
        assert_eq!(value, sha256(canonical).to_vec());
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_other_digests_unsupported() {
        for uri in [algorithm::SHA1, algorithm::SHA384, algorithm::SHA512, ""] {
            assert!(matches!(
                digest(uri, b"data"),
                Err(Error::UnsupportedAlgorithm(_))
            ));
        }
    }
}
