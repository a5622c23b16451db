#![forbid(unsafe_code)]

//! Signing identities for firma.
//!
//! A [`SigningIdentity`] pairs an RSA private key with the X.509 certificate
//! it belongs to. The [`CertificateManager`] loads identities from PKCS#12
//! containers or PEM pairs, caches them by certificate fingerprint and
//! validates them before use.

pub mod identity;
pub mod loader;
pub mod manager;
pub mod pem;
pub mod validation;

pub use identity::SigningIdentity;
pub use manager::{CertificateManager, CertificateManagerConfig};
pub use pem::is_pem_format;
pub use validation::CertificateValidation;
