#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use firma_core::algorithm;

/// Signer and verifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerOptions {
    /// Treat signature algorithms that cannot be read from the document as
    /// errors instead of assuming the profile default.
    pub strict_validation: bool,
    /// Signature method URIs accepted by verification.
    pub allowed_algorithms: BTreeSet<String>,
    /// Embed the signer certificate in `KeyInfo/X509Data`.
    pub include_key_info: bool,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            strict_validation: true,
            allowed_algorithms: BTreeSet::from([algorithm::RSA_SHA256.to_owned()]),
            include_key_info: true,
        }
    }
}

impl SignerOptions {
    pub fn allows(&self, signature_method: &str) -> bool {
        self.allowed_algorithms.contains(signature_method)
    }
}
