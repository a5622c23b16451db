#![forbid(unsafe_code)]

//! Enveloped XML-DSig signatures in a fixed, hardened profile.
//!
//! Documents are signed with RSA-SHA256 over exclusive-canonical `SignedInfo`,
//! referencing the root element by `Id` through the enveloped-signature and
//! exclusive c14n transforms. Verification reports problems as data in a
//! [`VerificationResult`] and never fails.

pub mod options;
pub mod reference;
pub mod result;
pub mod sign;
pub mod signer;
pub mod template;
pub mod verify;

pub use options::SignerOptions;
pub use result::VerificationResult;
pub use signer::XmlDsigSigner;
