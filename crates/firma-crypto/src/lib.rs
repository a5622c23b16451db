#![forbid(unsafe_code)]

//! Cryptographic primitives for firma signatures.
//!
//! SHA-256 reference digests and RSA PKCS#1 v1.5 signatures, looked up by
//! their XML-DSig algorithm URI.

pub mod digest;
pub mod sign;

pub use sign::{SignatureAlgorithm, SigningKey};
