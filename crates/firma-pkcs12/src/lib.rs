#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) container parser.
//!
//! Supports the modern PBES2 (PBKDF2 + AES-256-CBC) encryption written by
//! OpenSSL 3.x and the legacy pbeWithSHAAnd3-KeyTripleDES-CBC scheme, with
//! the integrity MAC computed over SHA-1 or SHA-256.

use std::fmt;

use firma_core::Error;
use zeroize::Zeroizing;

mod kdf;
mod parse;

/// Contents extracted from a PKCS#12 container.
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys, wiped on drop.
    pub private_keys: Vec<Zeroizing<Vec<u8>>>,
    /// DER-encoded X.509 certificates, in container order.
    pub certificates: Vec<Vec<u8>>,
}

impl fmt::Debug for Pkcs12Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs12Contents")
            .field("private_keys", &format_args!("[{} redacted]", self.private_keys.len()))
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// Parse a PKCS#12 container, checking its MAC and decrypting with `passphrase`.
///
/// Every failure is reported as [`Error::Certificate`]; a MAC mismatch says
/// so explicitly since it almost always means a wrong passphrase.
pub fn parse_pkcs12(data: &[u8], passphrase: &str) -> Result<Pkcs12Contents, Error> {
    parse::parse_pfx(data, passphrase)
}
