#![forbid(unsafe_code)]

//! Enveloped XML signatures with a fixed RSA-SHA256 / exclusive c14n profile.
//!
//! Load a signing identity with [`CertificateManager`], sign and verify with
//! [`XmlDsigSigner`], and optionally attach a development signing time with
//! [`TimestampService`].

pub use firma_c14n as c14n;
pub use firma_core as core;
pub use firma_crypto as crypto;
pub use firma_dsig as dsig;
pub use firma_keys as keys;
pub use firma_pkcs12 as pkcs12;
pub use firma_timestamp as timestamp;
pub use firma_transforms as transforms;
pub use firma_xml as xml;

pub use firma_core::{Error, Result, TimestampErrorKind};
pub use firma_dsig::{SignerOptions, VerificationResult, XmlDsigSigner};
pub use firma_keys::{
    CertificateManager, CertificateManagerConfig, CertificateValidation, SigningIdentity,
};
pub use firma_timestamp::{
    Environment, LocalClockProvider, NullTimestampProvider, TimestampConfig, TimestampProvider,
    TimestampService,
};
