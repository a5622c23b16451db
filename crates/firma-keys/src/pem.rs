#![forbid(unsafe_code)]

//! PEM (RFC 7468) helpers.

use firma_core::Error;
use pem_rfc7468::LineEnding;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

/// Structural PEM check: a `-----BEGIN <LABEL>-----` header at the start, a
/// matching `-----END <LABEL>-----` footer and a non-empty body in between.
///
/// The body is not base64-decoded here.
pub fn is_pem_format(text: &str) -> bool {
    let text = text.trim();
    let Some(rest) = text.strip_prefix(BEGIN) else {
        return false;
    };
    let Some(label_end) = rest.find(DASHES) else {
        return false;
    };
    let label = &rest[..label_end];
    if label.trim().is_empty() || label.contains('\n') {
        return false;
    }
    let after_header = &rest[label_end + DASHES.len()..];
    let footer = format!("{END}{label}{DASHES}");
    match after_header.find(&footer) {
        Some(pos) => !after_header[..pos].trim().is_empty(),
        None => false,
    }
}

/// Decode a single PEM block, returning its label and DER payload.
pub fn decode(pem: &str) -> Result<(String, Vec<u8>), Error> {
    let (label, der) = pem_rfc7468::decode_vec(pem.trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode PEM: {e}")))?;
    Ok((label.to_owned(), der))
}

/// Decode a `CERTIFICATE` PEM block into DER.
pub fn decode_certificate(pem: &str) -> Result<Vec<u8>, Error> {
    let (label, der) = decode(pem)?;
    if label != "CERTIFICATE" {
        return Err(Error::Key(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    Ok(der)
}

/// Encode certificate DER as PEM with LF line endings.
pub fn encode_certificate(der: &[u8]) -> Result<String, Error> {
    pem_rfc7468::encode_string("CERTIFICATE", LineEnding::LF, der)
        .map_err(|e| Error::Key(format!("failed to encode certificate PEM: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../../../test-data/keys/signer-cert.pem");

    #[test]
    fn test_is_pem_format() {
        assert!(is_pem_format(CERT_PEM));
        assert!(is_pem_format("-----BEGIN X-----\nAAAA\n-----END X-----\n"));
        assert!(!is_pem_format(""));
        assert!(!is_pem_format("not-a-pem"));
        assert!(!is_pem_format("-----BEGIN X-----\n-----END X-----"));
        assert!(!is_pem_format("-----BEGIN -----\nAAAA\n-----END -----"));
        assert!(!is_pem_format("-----BEGIN X-----\nAAAA\n-----END Y-----"));
        assert!(!is_pem_format("junk\n-----BEGIN X-----\nAAAA\n-----END X-----"));
    }

    #[test]
    fn test_certificate_round_trip_through_pem() {
        let der = decode_certificate(CERT_PEM).unwrap();
        let pem = encode_certificate(&der).unwrap();
        assert_eq!(pem.trim(), CERT_PEM.trim());
    }

    #[test]
    fn test_wrong_label() {
        let key = include_str!("../../../test-data/keys/signer-key.pem");
        let err = decode_certificate(key).unwrap_err();
        assert!(err.to_string().contains("expected CERTIFICATE"));
    }
}
