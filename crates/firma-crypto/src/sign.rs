#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signature algorithms.

use firma_core::{algorithm, Error};
use signature::SignatureEncoding;

/// Key material for signature operations.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
}

impl SigningKey {
    pub fn public_key(&self) -> rsa::RsaPublicKey {
        match self {
            SigningKey::Rsa(k) => k.to_public_key(),
            SigningKey::RsaPublic(k) => k.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningKey::Rsa(_) => f.write_str("SigningKey::Rsa([redacted])"),
            SigningKey::RsaPublic(_) => f.write_str("SigningKey::RsaPublic"),
        }
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
///
/// RSA PKCS#1 v1.5 with SHA-256, SHA-384 or SHA-512. RSA-SHA1 is not
/// available.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    let (uri, hash) = match uri {
        algorithm::RSA_SHA256 => (algorithm::RSA_SHA256, HashType::Sha256),
        algorithm::RSA_SHA384 => (algorithm::RSA_SHA384, HashType::Sha384),
        algorithm::RSA_SHA512 => (algorithm::RSA_SHA512, HashType::Sha512),
        _ => return Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    };
    Ok(Box::new(RsaPkcs1v15 { uri, hash }))
}

#[derive(Debug, Clone, Copy)]
enum HashType {
    Sha256,
    Sha384,
    Sha512,
}

struct RsaPkcs1v15 {
    uri: &'static str,
    hash: HashType,
}

impl RsaPkcs1v15 {
    fn sign_with_key(&self, private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    fn verify_with_key(
        &self,
        public_key: &rsa::RsaPublicKey,
        data: &[u8],
        sig_bytes: &[u8],
    ) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
        }
    }
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        match key {
            SigningKey::Rsa(pk) => self.sign_with_key(pk, data),
            SigningKey::RsaPublic(_) => Err(Error::Key("RSA private key required for signing".into())),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        self.verify_with_key(&key.public_key(), data, sig_bytes)
    }
}
