#![forbid(unsafe_code)]

//! The `<ds:Signature>` template appended to documents before digesting.

use base64::Engine;
use firma_core::{algorithm, ns, Error};
use firma_xml::XmlWriter;

/// Root `Id` injected when the document root has none.
pub const DEFAULT_ROOT_ID: &str = "signed-doc";

/// `Id` given to the signature element for a document root `Id`.
pub fn signature_id(root_id: &str) -> String {
    format!("signature-{root_id}")
}

fn ds(local: &str) -> String {
    format!("{}:{local}", ns::DSIG_PREFIX)
}

/// Build the signature template with empty `DigestValue` and
/// `SignatureValue`, referencing `#root_id`.
pub fn signature_template(root_id: &str, certificate_der: Option<&[u8]>) -> Result<String, Error> {
    let xmlns = format!("xmlns:{}", ns::DSIG_PREFIX);
    let sig_id = signature_id(root_id);
    let uri = format!("#{root_id}");

    let mut w = XmlWriter::new();
    w.start_element(
        &ds(ns::node::SIGNATURE),
        &[(xmlns.as_str(), ns::DSIG), (ns::attr::ID, sig_id.as_str())],
    )?;

    w.start_element(&ds(ns::node::SIGNED_INFO), &[])?;
    w.empty_element(
        &ds(ns::node::CANONICALIZATION_METHOD),
        &[(ns::attr::ALGORITHM, algorithm::EXC_C14N)],
    )?;
    w.empty_element(
        &ds(ns::node::SIGNATURE_METHOD),
        &[(ns::attr::ALGORITHM, algorithm::RSA_SHA256)],
    )?;
    w.start_element(&ds(ns::node::REFERENCE), &[(ns::attr::URI, uri.as_str())])?;
    w.start_element(&ds(ns::node::TRANSFORMS), &[])?;
    for transform in [algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N] {
        w.empty_element(&ds(ns::node::TRANSFORM), &[(ns::attr::ALGORITHM, transform)])?;
    }
    w.end_element(&ds(ns::node::TRANSFORMS))?;
    w.empty_element(
        &ds(ns::node::DIGEST_METHOD),
        &[(ns::attr::ALGORITHM, algorithm::SHA256)],
    )?;
    w.text_element(&ds(ns::node::DIGEST_VALUE), &[], "")?;
    w.end_element(&ds(ns::node::REFERENCE))?;
    w.end_element(&ds(ns::node::SIGNED_INFO))?;

    w.text_element(&ds(ns::node::SIGNATURE_VALUE), &[], "")?;

    if let Some(der) = certificate_der {
        let b64 = base64::engine::general_purpose::STANDARD.encode(der);
        w.start_element(&ds(ns::node::KEY_INFO), &[])?;
        w.start_element(&ds(ns::node::X509_DATA), &[])?;
        w.text_element(&ds(ns::node::X509_CERTIFICATE), &[], &b64)?;
        w.end_element(&ds(ns::node::X509_DATA))?;
        w.end_element(&ds(ns::node::KEY_INFO))?;
    }

    w.end_element(&ds(ns::node::SIGNATURE))?;
    w.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_without_key_info() {
        let xml = signature_template("inv-1", None).unwrap();
        assert_eq!(
            xml,
            concat!(
                r##"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Id="signature-inv-1">"##,
                r##"<ds:SignedInfo>"##,
                r##"<ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>"##,
                r##"<ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>"##,
                r##"<ds:Reference URI="#inv-1"><ds:Transforms>"##,
                r##"<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"##,
                r##"<ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>"##,
                r##"</ds:Transforms>"##,
                r##"<ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>"##,
                r##"<ds:DigestValue></ds:DigestValue>"##,
                r##"</ds:Reference></ds:SignedInfo>"##,
                r##"<ds:SignatureValue></ds:SignatureValue>"##,
                r##"</ds:Signature>"##,
            )
        );
    }

    #[test]
    fn test_template_with_certificate() {
        let xml = signature_template(DEFAULT_ROOT_ID, Some(&[1, 2, 3])).unwrap();
        assert!(xml.contains(r#"Id="signature-signed-doc""#));
        assert!(xml.ends_with(
            "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>AQID</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature>"
        ));
        assert!(firma_xml::is_well_formed(&xml));
    }
}
