#![forbid(unsafe_code)]

//! Structural and temporal checks on a signing identity.

use chrono::{DateTime, Utc};

use crate::identity::SigningIdentity;

/// Outcome of [`validate_at`]: one error string per failed check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check `identity` at instant `now`.
pub fn validate_at(identity: &SigningIdentity, now: DateTime<Utc>) -> CertificateValidation {
    let mut errors = Vec::new();

    if !crate::pem::is_pem_format(&identity.private_key_pem) {
        errors.push("private key is not in PEM format".to_owned());
    }
    if !crate::pem::is_pem_format(&identity.certificate_pem) {
        errors.push("certificate is not in PEM format".to_owned());
    }

    if now < identity.valid_from {
        errors.push(format!(
            "certificate not yet valid (valid from {})",
            identity.valid_from.to_rfc3339()
        ));
    }
    if now > identity.valid_to {
        errors.push(format!(
            "certificate expired (expired on {})",
            identity.valid_to.to_rfc3339()
        ));
    }

    if !is_well_formed_dn(&identity.issuer) {
        errors.push(format!("issuer is not a well-formed distinguished name: {:?}", identity.issuer));
    }
    if !is_well_formed_dn(&identity.subject) {
        errors.push(format!("subject is not a well-formed distinguished name: {:?}", identity.subject));
    }

    if let Some(usage) = identity.key_usage {
        if !(usage.digital_signature() || usage.non_repudiation()) {
            errors.push("key usage does not permit digital signatures".to_owned());
        }
    }

    CertificateValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// A non-empty sequence of `type=value` components separated by unescaped
/// `,` (RDNs) or `+` (multi-valued RDNs).
pub fn is_well_formed_dn(dn: &str) -> bool {
    let components = split_unescaped(dn);
    !components.is_empty()
        && components.iter().all(|c| match c.split_once('=') {
            Some((ty, value)) => !ty.trim().is_empty() && !value.trim().is_empty(),
            None => false,
        })
}

fn split_unescaped(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' | '+' => {
                parts.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !dn.trim().is_empty() {
        parts.push(&dn[start..]);
    }
    parts
}
