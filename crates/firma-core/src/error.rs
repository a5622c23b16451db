#![forbid(unsafe_code)]

use std::fmt;

/// Errors produced by the firma signing stack.
///
/// Verification problems are never reported through this type; they are
/// collected as strings in a `VerificationResult` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input handed to `sign`: malformed XML, empty or non-PEM credentials.
    #[error("validation error: {0}")]
    Validation(String),

    /// Signing could not proceed with otherwise valid inputs.
    #[error("signing error: {0}")]
    Signing(String),

    /// Container, certificate or identity cache problems.
    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("timestamp error ({kind}): {message}")]
    Timestamp {
        kind: TimestampErrorKind,
        message: String,
    },

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn timestamp(kind: TimestampErrorKind, message: impl Into<String>) -> Self {
        Self::Timestamp {
            kind,
            message: message.into(),
        }
    }
}

/// Machine-readable cause of a timestamp failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampErrorKind {
    /// The stub service was asked to run in a production environment.
    ProductionDisallowed,
    /// The time source could not be reached.
    TsaUnavailable,
    /// The time source did not answer within the configured timeout.
    Timeout,
    /// The time source answered with something unusable.
    InvalidResponse,
    /// The document could not be augmented.
    InvalidXml,
}

impl TimestampErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProductionDisallowed => "PRODUCTION_DISALLOWED",
            Self::TsaUnavailable => "TSA_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::InvalidXml => "INVALID_XML",
        }
    }
}

impl fmt::Display for TimestampErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
