#![forbid(unsafe_code)]

//! The signing identity: a private key with its certificate and the details
//! derived from it.

use std::fmt;

use chrono::{DateTime, Utc};
use const_oid::AssociatedOid;
use der::Decode;
use firma_core::Error;
use x509_cert::ext::pkix::KeyUsage;
use x509_cert::time::Time;
use x509_cert::Certificate;
use zeroize::Zeroizing;

use crate::loader;

/// An RSA private key paired with the X.509 certificate it belongs to.
///
/// Identities are immutable once built; the manager shares them as
/// `Arc<SigningIdentity>`.
#[derive(Clone)]
pub struct SigningIdentity {
    /// PKCS#1 or PKCS#8 PEM. Never printed.
    pub private_key_pem: Zeroizing<String>,
    pub certificate_pem: String,
    pub certificate_der: Vec<u8>,
    /// SubjectPublicKeyInfo PEM of the certificate key.
    pub public_key_pem: String,
    /// RFC 4514 string.
    pub issuer: String,
    /// RFC 4514 string.
    pub subject: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    /// Lowercase hex SHA-256 of `certificate_der`.
    pub fingerprint: String,
    /// Lowercase hex serial number.
    pub serial_number: String,
    pub key_usage: Option<KeyUsage>,
}

impl SigningIdentity {
    /// Build an identity from PEM text. The key must belong to the certificate.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, Error> {
        let key = loader::load_rsa_private_pem(private_key_pem)?;
        let der = crate::pem::decode_certificate(certificate_pem)?;
        Self::from_parts(&key, Zeroizing::new(private_key_pem.trim().to_owned()), der)
    }

    /// Build an identity from a decoded key, its PEM form and certificate DER.
    pub fn from_parts(
        private_key: &rsa::RsaPrivateKey,
        private_key_pem: Zeroizing<String>,
        certificate_der: Vec<u8>,
    ) -> Result<Self, Error> {
        let cert = loader::parse_certificate_der(&certificate_der)?;
        let public = loader::certificate_rsa_public_key(&cert)?;
        if !loader::key_matches(private_key, &public) {
            return Err(Error::Certificate(
                "private key does not match the certificate".into(),
            ));
        }

        let tbs = &cert.tbs_certificate;
        let valid_from = to_utc(&tbs.validity.not_before)?;
        let valid_to = to_utc(&tbs.validity.not_after)?;
        if valid_from > valid_to {
            return Err(Error::Certificate(format!(
                "certificate validity window is inverted ({valid_from} > {valid_to})"
            )));
        }

        Ok(Self {
            private_key_pem,
            certificate_pem: crate::pem::encode_certificate(&certificate_der)?,
            public_key_pem: loader::rsa_public_to_pem(&public)?,
            issuer: tbs.issuer.to_string(),
            subject: tbs.subject.to_string(),
            valid_from,
            valid_to,
            fingerprint: hex::encode(firma_crypto::digest::sha256(&certificate_der)),
            serial_number: hex::encode(tbs.serial_number.as_bytes()),
            key_usage: key_usage(&cert)?,
            certificate_der,
        })
    }

    /// Decode the private key for signing.
    pub fn private_key(&self) -> Result<rsa::RsaPrivateKey, Error> {
        loader::load_rsa_private_pem(&self.private_key_pem)
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("private_key_pem", &"[redacted]")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("valid_from", &self.valid_from)
            .field("valid_to", &self.valid_to)
            .field("fingerprint", &self.fingerprint)
            .field("serial_number", &self.serial_number)
            .finish_non_exhaustive()
    }
}

fn to_utc(time: &Time) -> Result<DateTime<Utc>, Error> {
    let secs = time.to_unix_duration().as_secs();
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| Error::Certificate(format!("certificate time out of range: {time:?}")))
}

fn key_usage(cert: &Certificate) -> Result<Option<KeyUsage>, Error> {
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(None);
    };
    extensions
        .iter()
        .find(|ext| ext.extn_id == KeyUsage::OID)
        .map(|ext| {
            KeyUsage::from_der(ext.extn_value.as_bytes())
                .map_err(|e| Error::Certificate(format!("malformed key usage extension: {e}")))
        })
        .transpose()
}
