#![forbid(unsafe_code)]

//! XML namespace constants used across the workspace.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XAdES 1.3.2 namespace (signing-time properties)
pub const XADES: &str = "http://uri.etsi.org/01903/v1.3.2#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix used for the signature elements this library writes.
pub const DSIG_PREFIX: &str = "ds";

/// Prefix used for the XAdES elements this library writes.
pub const XADES_PREFIX: &str = "xades";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const OBJECT: &str = "Object";

    // XAdES
    pub const QUALIFYING_PROPERTIES: &str = "QualifyingProperties";
    pub const SIGNED_PROPERTIES: &str = "SignedProperties";
    pub const SIGNED_SIGNATURE_PROPERTIES: &str = "SignedSignatureProperties";
    pub const SIGNING_TIME: &str = "SigningTime";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const ALGORITHM: &str = "Algorithm";
    pub const TARGET: &str = "Target";
}
