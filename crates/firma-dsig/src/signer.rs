#![forbid(unsafe_code)]

use firma_core::Error;
use firma_keys::SigningIdentity;
use firma_xml::document::find_signatures;

use crate::options::SignerOptions;
use crate::result::VerificationResult;
use crate::verify::{self, KeySource};

/// Signs and verifies enveloped XML signatures under one set of options.
///
/// Stateless apart from its options; safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct XmlDsigSigner {
    options: SignerOptions,
}

impl XmlDsigSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SignerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SignerOptions {
        &self.options
    }

    /// Return a copy of `xml` carrying an enveloped signature by the key and
    /// certificate given as PEM.
    ///
    /// Documents with a DOCTYPE declaration are refused; see
    /// [`crate::sign::sign`].
    pub fn sign(&self, xml: &str, private_key_pem: &str, certificate_pem: &str) -> Result<String, Error> {
        crate::sign::sign(xml, private_key_pem, certificate_pem, &self.options)
    }

    /// Sign with a loaded identity.
    pub fn sign_with_identity(&self, xml: &str, identity: &SigningIdentity) -> Result<String, Error> {
        log::debug!("signing with identity {}", identity.fingerprint);
        self.sign(xml, &identity.private_key_pem, &identity.certificate_pem)
    }

    /// Check the first signature against the certificate it embeds.
    pub fn verify(&self, xml: &str) -> VerificationResult {
        verify::verify(xml, &self.options, KeySource::Embedded)
    }

    /// Check the first signature against a caller-supplied certificate.
    pub fn verify_with_certificate(&self, xml: &str, certificate_pem: &str) -> VerificationResult {
        verify::verify(xml, &self.options, KeySource::Certificate(certificate_pem))
    }

    /// Base64 DER of the certificate embedded in the first signature.
    pub fn extract_certificate_from_signature(&self, xml: &str) -> Option<String> {
        let doc = firma_xml::parse(xml).ok()?;
        let signature = *find_signatures(&doc).first()?;
        verify::embedded_certificate(signature)
    }

    pub fn is_well_formed_xml(&self, xml: &str) -> bool {
        firma_xml::is_well_formed(xml)
    }

    pub fn is_pem_format(&self, text: &str) -> bool {
        firma_keys::is_pem_format(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{DISALLOWED_ALGORITHM, MALFORMED_XML, NO_SIGNATURE, SIGNATURE_INVALID};
    use base64::Engine;
    use firma_core::algorithm;
    use firma_keys::CertificateManager;

    const KEY: &str = include_str!("../../../test-data/keys/signer-key.pem");
    const CERT: &str = include_str!("../../../test-data/keys/signer-cert.pem");
    const OTHER_KEY: &str = include_str!("../../../test-data/keys/other-key.pem");
    const OTHER_CERT: &str = include_str!("../../../test-data/keys/other-cert.pem");
    const CONTAINER: &[u8] = include_bytes!("../../../test-data/keys/signer.p12");

    const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- issued by the billing run -->
<inv:Invoice xmlns:inv="urn:test:invoice" xmlns:vat="urn:test:vat">
  <inv:Number>F-2024-001</inv:Number>
  <inv:Lines>
    <inv:Line qty="2">Widget &amp; bolt</inv:Line>
  </inv:Lines>
  <vat:Total currency="EUR">121.00</vat:Total>
</inv:Invoice>"#;

    fn signer() -> XmlDsigSigner {
        XmlDsigSigner::new()
    }

    fn signed() -> String {
        signer().sign(INVOICE, KEY, CERT).unwrap()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_signer_is_send_sync() {
        assert_send_sync::<XmlDsigSigner>();
    }

    #[test]
    fn test_round_trip() {
        let result = signer().verify(&signed());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_round_trip_with_identity_from_container() {
        let manager = CertificateManager::new();
        let identity = manager.load_from_container(CONTAINER, "secret123").unwrap();
        let signed = signer().sign_with_identity(INVOICE, &identity).unwrap();
        assert!(signer().verify(&signed).valid);
        // Same key and certificate as the PEM fixtures.
        assert_eq!(signed, self::signed());
    }

    #[test]
    fn test_tampered_content() {
        let xml = signed().replace("121.00", "12.00");
        let result = signer().verify(&xml);
        assert!(!result.valid);
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_tampered_signed_info() {
        let xml = signed();
        let doc = firma_xml::parse(&xml).unwrap();
        let digest = doc
            .descendants()
            .find(|n| n.has_tag_name((firma_core::ns::DSIG, "DigestValue")))
            .and_then(|n| n.text())
            .unwrap()
            .to_owned();
        let mut bytes = base64::engine::general_purpose::STANDARD.decode(&digest).unwrap();
        bytes[0] ^= 0x01;
        let forged = base64::engine::general_purpose::STANDARD.encode(bytes);
        let xml = xml.replace(&digest, &forged);

        let result = signer().verify(&xml);
        assert!(result.has_error(SIGNATURE_INVALID));
        assert!(result.errors[0].contains("digest mismatch"));
    }

    #[test]
    fn test_tampered_signature_value() {
        let xml = signed();
        let start = xml.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
        let first = &xml[start..start + 1];
        let replacement = if first == "A" { "B" } else { "A" };
        let xml = format!("{}{replacement}{}", &xml[..start], &xml[start + 1..]);

        let result = signer().verify(&xml);
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_downgrade_to_rsa_sha1() {
        let xml = signed().replace(algorithm::RSA_SHA256, algorithm::RSA_SHA1);
        let result = signer().verify(&xml);
        assert!(!result.valid);
        assert!(result.has_error(DISALLOWED_ALGORITHM));
    }

    #[test]
    fn test_allowing_more_algorithms_does_not_weaken_digest() {
        let mut options = SignerOptions::default();
        options.allowed_algorithms.insert(algorithm::RSA_SHA1.to_owned());
        let signer = XmlDsigSigner::with_options(options);
        assert!(signer.options().allows(algorithm::RSA_SHA1));

        let xml = signed().replace(algorithm::RSA_SHA256, algorithm::RSA_SHA1);
        let result = signer.verify(&xml);
        assert!(!result.has_error(DISALLOWED_ALGORITHM));
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_multiple_signatures_warn() {
        let xml = signed();
        let start = xml.find("<ds:Signature ").unwrap();
        let end = xml.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
        let twice = format!("{}{}", &xml[..end], &xml[start..]);

        let result = signer().verify(&twice);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("multiple signatures detected"));
        // The second copy is part of the signed content now.
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_unsigned_and_malformed() {
        let result = signer().verify(INVOICE);
        assert!(!result.valid);
        assert_eq!(result.errors, [NO_SIGNATURE]);

        for xml in ["", "<a>", "<a></b>", "not xml at all"] {
            let result = signer().verify(xml);
            assert!(!result.valid);
            assert_eq!(result.errors.len(), 1);
            assert!(result.has_error(MALFORMED_XML), "{xml:?}");
        }
    }

    #[test]
    fn test_verify_with_supplied_certificate() {
        let options = SignerOptions {
            include_key_info: false,
            ..SignerOptions::default()
        };
        let signer = XmlDsigSigner::with_options(options);
        let xml = signer.sign(INVOICE, KEY, CERT).unwrap();

        assert!(!signer.verify(&xml).valid);
        let result = signer.verify_with_certificate(&xml, CERT);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());

        let result = signer.verify_with_certificate(&xml, OTHER_CERT);
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_supplied_certificate_differs_from_embedded() {
        let result = signer().verify_with_certificate(&signed(), OTHER_CERT);
        assert!(!result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("differs")));

        let result = signer().verify_with_certificate(&signed(), "garbage");
        assert!(result.has_error(SIGNATURE_INVALID));
    }

    #[test]
    fn test_signed_by_other_identity() {
        let xml = signer().sign(INVOICE, OTHER_KEY, OTHER_CERT).unwrap();
        assert!(signer().verify(&xml).valid);
        assert!(!signer().verify_with_certificate(&xml, CERT).valid);
    }

    #[test]
    fn test_extract_certificate() {
        let b64 = signer().extract_certificate_from_signature(&signed()).unwrap();
        let der = base64::engine::general_purpose::STANDARD.decode(&b64).unwrap();
        assert_eq!(der, firma_keys::pem::decode_certificate(CERT).unwrap());

        assert_eq!(signer().extract_certificate_from_signature(INVOICE), None);
        assert_eq!(signer().extract_certificate_from_signature("<a>"), None);
        assert_eq!(signer().extract_certificate_from_signature(""), None);

        let bare = XmlDsigSigner::with_options(SignerOptions {
            include_key_info: false,
            ..SignerOptions::default()
        });
        let xml = bare.sign(INVOICE, KEY, CERT).unwrap();
        assert_eq!(bare.extract_certificate_from_signature(&xml), None);
    }

    #[test]
    fn test_predicates() {
        let s = signer();
        assert!(!s.is_well_formed_xml(""));
        assert!(!s.is_well_formed_xml("<a>"));
        assert!(s.is_well_formed_xml(INVOICE));

        assert!(!s.is_pem_format(""));
        assert!(!s.is_pem_format("not-a-pem"));
        assert!(s.is_pem_format(KEY));
        assert!(s.is_pem_format(CERT));
    }

    #[test]
    fn test_sign_rejects_empty_credentials() {
        assert!(matches!(signer().sign(INVOICE, "", CERT), Err(Error::Validation(_))));
        assert!(matches!(signer().sign(INVOICE, KEY, ""), Err(Error::Validation(_))));
    }
}
