#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! The document gets a template `<ds:Signature>` as the last child of its
//! root, then the digest and signature values are computed on the parsed
//! result and spliced into the empty `DigestValue` and `SignatureValue`.

use base64::Engine;
use firma_core::{algorithm, ns, Error};
use firma_keys::{loader, pem};
use firma_xml::document::{build_id_map, find_child_element, find_signatures};
use firma_xml::edit;
use roxmltree::Node;

use crate::options::SignerOptions;
use crate::reference;
use crate::template::{self, DEFAULT_ROOT_ID};

/// Sign `xml` with an enveloped RSA-SHA256 signature.
///
/// The input is never modified; the signed document is returned. A
/// document with a DOCTYPE declaration is refused as not well-formed, even
/// when the DTD itself is valid.
pub fn sign(
    xml: &str,
    private_key_pem: &str,
    certificate_pem: &str,
    options: &SignerOptions,
) -> Result<String, Error> {
    if !firma_xml::is_well_formed(xml) {
        return Err(Error::Validation("XML is not well-formed".into()));
    }
    if !pem::is_pem_format(private_key_pem) {
        return Err(Error::Validation("private key is empty or not in PEM format".into()));
    }
    if !pem::is_pem_format(certificate_pem) {
        return Err(Error::Validation("certificate is empty or not in PEM format".into()));
    }

    let key = loader::load_rsa_private_pem(private_key_pem)
        .map_err(|e| Error::Validation(format!("unusable private key: {e}")))?;
    let certificate_der = pem::decode_certificate(certificate_pem)
        .map_err(|e| Error::Validation(format!("unusable certificate: {e}")))?;
    let certificate_key = loader::parse_certificate_der(&certificate_der)
        .and_then(|cert| loader::certificate_rsa_public_key(&cert))
        .map_err(|e| Error::Validation(format!("unusable certificate: {e}")))?;
    if !loader::key_matches(&key, &certificate_key) {
        return Err(Error::Validation(
            "private key does not match the certificate".into(),
        ));
    }

    let (xml, root_id) = ensure_root_id(xml)?;

    let template = template::signature_template(
        &root_id,
        options.include_key_info.then_some(certificate_der.as_slice()),
    )
    .map_err(signing_error)?;
    let doc = firma_xml::parse(&xml)?;
    let xml = edit::append_child(&xml, doc.root_element(), &template).map_err(signing_error)?;

    // Digest the referenced root through the profile transforms.
    let doc = firma_xml::parse(&xml)?;
    let signature = single_signature(&doc)?;
    let digest = reference::digest_reference(
        &doc,
        &xml,
        signature,
        &format!("#{root_id}"),
        algorithm::SHA256,
    )
    .map_err(signing_error)?;
    let digest_value = find_path(
        signature,
        &[ns::node::SIGNED_INFO, ns::node::REFERENCE, ns::node::DIGEST_VALUE],
    )?;
    let xml = edit::set_text(&xml, digest_value, &b64(&digest)).map_err(signing_error)?;

    // Sign the canonical SignedInfo, which now carries the digest.
    let doc = firma_xml::parse(&xml)?;
    let signature = single_signature(&doc)?;
    let signed_info = find_path(signature, &[ns::node::SIGNED_INFO])?;
    let octets = reference::canonical_signed_info(&doc, signed_info).map_err(signing_error)?;
    let signing_key = firma_crypto::SigningKey::Rsa(key);
    let signature_value = firma_crypto::sign::from_uri(algorithm::RSA_SHA256)?
        .sign(&signing_key, &octets)
        .map_err(signing_error)?;
    let signature_value_node = find_path(signature, &[ns::node::SIGNATURE_VALUE])?;
    let signed = edit::set_text(&xml, signature_value_node, &b64(&signature_value))
        .map_err(signing_error)?;

    log::debug!(
        "signed document root #{root_id} ({} bytes, key info: {})",
        signed.len(),
        options.include_key_info
    );
    Ok(signed)
}

/// Make sure the root carries a unique `Id`, injecting the default one.
fn ensure_root_id(xml: &str) -> Result<(String, String), Error> {
    let doc = firma_xml::parse(xml)?;
    if !find_signatures(&doc).is_empty() {
        return Err(Error::Signing(
            "document already contains a signature".into(),
        ));
    }

    let root = doc.root_element();
    let ids = build_id_map(&doc);
    let root_id = root.attribute(ns::attr::ID).unwrap_or(DEFAULT_ROOT_ID);
    let carriers = ids.get(root_id).map_or(0, Vec::len);
    let already_on_root = root.attribute(ns::attr::ID).is_some();
    if carriers > usize::from(already_on_root) {
        return Err(Error::Signing(format!(
            "Id {root_id} is carried by more than one element"
        )));
    }

    if already_on_root {
        Ok((xml.to_owned(), root_id.to_owned()))
    } else {
        let with_id = edit::insert_attribute(xml, root, ns::attr::ID, DEFAULT_ROOT_ID);
        Ok((with_id, DEFAULT_ROOT_ID.to_owned()))
    }
}

fn single_signature<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
) -> Result<Node<'a, 'input>, Error> {
    match find_signatures(doc).as_slice() {
        [sig] => Ok(*sig),
        _ => Err(Error::Signing("signature template not found".into())),
    }
}

fn find_path<'a, 'input>(
    start: Node<'a, 'input>,
    path: &[&str],
) -> Result<Node<'a, 'input>, Error> {
    path.iter().try_fold(start, |node, name| {
        find_child_element(node, ns::DSIG, name)
            .ok_or_else(|| Error::Signing(format!("signature template has no {name}")))
    })
}

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn signing_error(err: Error) -> Error {
    match err {
        Error::Signing(_) | Error::Validation(_) => err,
        other => Error::Signing(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = include_str!("../../../test-data/keys/signer-key.pem");
    const KEY_PKCS1: &str = include_str!("../../../test-data/keys/signer-key-pkcs1.pem");
    const CERT: &str = include_str!("../../../test-data/keys/signer-cert.pem");
    const OTHER_CERT: &str = include_str!("../../../test-data/keys/other-cert.pem");

    const INVOICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:test:invoice"><Number>F-2024-001</Number><Total currency="EUR">121.00</Total></Invoice>"#;

    fn sign_default(xml: &str) -> Result<String, Error> {
        sign(xml, KEY, CERT, &SignerOptions::default())
    }

    #[test]
    fn test_sign_injects_id_and_appends_signature() {
        let signed = sign_default(INVOICE).unwrap();
        assert!(signed.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(signed.contains(r#"<Invoice Id="signed-doc" xmlns="urn:test:invoice">"#));
        assert!(signed.contains(r##"<ds:Reference URI="#signed-doc">"##));
        assert!(signed.contains(r#"Id="signature-signed-doc""#));
        assert!(signed.ends_with("</ds:Signature></Invoice>"));
        assert!(signed.contains("<ds:X509Certificate>MII"));
        assert!(!signed.contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(!signed.contains("<ds:SignatureValue></ds:SignatureValue>"));
    }

    #[test]
    fn test_sign_keeps_existing_root_id() {
        let xml = r#"<Invoice Id="inv-42"><Total>1</Total></Invoice>"#;
        let signed = sign_default(xml).unwrap();
        assert!(signed.contains(r##"URI="#inv-42""##));
        assert!(signed.contains(r#"Id="signature-inv-42""#));
        assert!(!signed.contains("signed-doc"));
    }

    #[test]
    fn test_sign_is_deterministic_and_pure() {
        let input = INVOICE.to_owned();
        let a = sign_default(&input).unwrap();
        let b = sign_default(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(input, INVOICE);
    }

    #[test]
    fn test_sign_accepts_pkcs1_key() {
        assert_eq!(
            sign(INVOICE, KEY_PKCS1, CERT, &SignerOptions::default()).unwrap(),
            sign_default(INVOICE).unwrap()
        );
    }

    #[test]
    fn test_sign_without_key_info() {
        let options = SignerOptions {
            include_key_info: false,
            ..SignerOptions::default()
        };
        let signed = sign(INVOICE, KEY, CERT, &options).unwrap();
        assert!(!signed.contains("KeyInfo"));
    }

    #[test]
    fn test_sign_self_closing_root() {
        let signed = sign_default("<Empty/>").unwrap();
        assert!(signed.starts_with(r#"<Empty Id="signed-doc"><ds:Signature"#));
        assert!(signed.ends_with("</ds:Signature></Empty>"));
    }

    #[test]
    fn test_sign_validation_errors() {
        for (xml, key, cert) in [
            ("<a>", KEY, CERT),
            ("", KEY, CERT),
            (INVOICE, "", CERT),
            (INVOICE, KEY, ""),
            (INVOICE, "not-a-pem", CERT),
            (INVOICE, KEY, KEY),
            (INVOICE, KEY, OTHER_CERT),
            (INVOICE, CERT, CERT),
            ("<!DOCTYPE Invoice><Invoice/>", KEY, CERT),
        ] {
            let err = sign(xml, key, cert, &SignerOptions::default()).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "unexpected {err:?}");
        }
    }

    #[test]
    fn test_sign_rejects_signed_document() {
        let signed = sign_default(INVOICE).unwrap();
        let err = sign_default(&signed).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert!(err.to_string().contains("already contains a signature"));
    }

    #[test]
    fn test_sign_rejects_ambiguous_id() {
        let xml = r#"<Invoice Id="x"><Line Id="x"/></Invoice>"#;
        assert!(matches!(sign_default(xml), Err(Error::Signing(_))));

        let xml = r#"<Invoice><Line Id="signed-doc"/></Invoice>"#;
        assert!(matches!(sign_default(xml), Err(Error::Signing(_))));
    }
}
