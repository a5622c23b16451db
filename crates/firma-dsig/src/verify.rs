#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Checks run in a fixed order and stop at the first blocking error:
//! 1. the document parses
//! 2. a `Signature` is present (more than one only warns; the first is used)
//! 3. its single `Reference` points at the document root by `Id`
//! 4. every algorithm matches the profile and the allow-lists
//! 5. the reference digest and the signature value check out

use std::fmt;

use base64::Engine;
use firma_core::{algorithm, ns, Error};
use firma_xml::document::{compact_text, find_child_element, find_child_elements, find_signatures};
use firma_xml::xpath;
use roxmltree::{Document, Node};

use crate::options::SignerOptions;
use crate::reference::{self, PROFILE_TRANSFORMS};
use crate::result::{self, VerificationResult};

/// Where the verification key comes from.
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// The certificate embedded in `KeyInfo/X509Data`.
    Embedded,
    /// A caller-supplied certificate PEM.
    Certificate(&'a str),
}

struct ReferenceInfo<'a, 'input> {
    signed_info: Node<'a, 'input>,
    reference: Node<'a, 'input>,
    uri: &'a str,
}

struct Algorithms<'a> {
    signature: &'a str,
    digest: &'a str,
}

/// Verify the first signature in `xml`. Never fails; problems are reported
/// in the returned result.
pub fn verify(xml: &str, options: &SignerOptions, key_source: KeySource<'_>) -> VerificationResult {
    let mut outcome = VerificationResult::new();

    let doc = match firma_xml::parse(xml) {
        Ok(doc) => doc,
        Err(e) => return outcome.fail(result::MALFORMED_XML, Some(&e)),
    };

    let signatures = find_signatures(&doc);
    let Some(&signature) = signatures.first() else {
        return outcome.fail(result::NO_SIGNATURE, None);
    };
    if signatures.len() > 1 {
        outcome.warn(format!(
            "{}: {} signatures found, only the first is evaluated",
            result::MULTIPLE_SIGNATURES,
            signatures.len()
        ));
    }

    let info = match check_reference(&doc, signature) {
        Ok(info) => info,
        Err(detail) => return outcome.fail(result::REFERENCE_MISMATCH, Some(&detail)),
    };

    let algorithms = match check_algorithms(&info, options, &mut outcome) {
        Ok(algorithms) => algorithms,
        Err(detail) => return outcome.fail(result::DISALLOWED_ALGORITHM, Some(&detail)),
    };

    if let Err(detail) = check_crypto(&doc, xml, signature, &info, &algorithms, key_source, &mut outcome) {
        return outcome.fail(result::SIGNATURE_INVALID, Some(&detail));
    }

    log::debug!("signature over {} verified", info.uri);
    outcome.finish()
}

fn check_reference<'a, 'input>(
    doc: &'a Document<'input>,
    signature: Node<'a, 'input>,
) -> Result<ReferenceInfo<'a, 'input>, String> {
    let signed_info = find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or("signature has no SignedInfo")?;

    let references = find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE);
    let [reference] = references.as_slice() else {
        return Err(format!(
            "expected exactly one Reference, found {}",
            references.len()
        ));
    };
    let reference = *reference;

    let uri = reference
        .attribute(ns::attr::URI)
        .ok_or("Reference has no URI")?;
    let id = xpath::parse_same_document_ref(uri)
        .ok_or_else(|| format!("URI {uri:?} is not a same-document Id reference"))?;
    let target = xpath::resolve_id(doc, id).map_err(|e| match e {
        Error::XmlStructure(detail) => detail,
        other => other.to_string(),
    })?;

    if target.id() != doc.root_element().id() {
        return Err(format!("{uri} does not identify the document root"));
    }
    if target.id() == signature.id() {
        return Err(format!("{uri} identifies the signature itself"));
    }

    Ok(ReferenceInfo {
        signed_info,
        reference,
        uri,
    })
}

/// Read an `Algorithm` attribute, applying the strict-mode policy when it is
/// missing.
fn algorithm_of<'a>(
    node: Option<Node<'a, '_>>,
    what: &str,
    default: &'static str,
    options: &SignerOptions,
    outcome: &mut VerificationResult,
) -> Result<&'a str, String> {
    match node.and_then(|n| n.attribute(ns::attr::ALGORITHM)) {
        Some(uri) => Ok(uri),
        None if options.strict_validation => Err(format!("{what} algorithm is not specified")),
        None => {
            outcome.warn(format!("{what} algorithm is not specified, assuming {default}"));
            Ok(default)
        }
    }
}

fn check_algorithms<'a>(
    info: &ReferenceInfo<'a, '_>,
    options: &SignerOptions,
    outcome: &mut VerificationResult,
) -> Result<Algorithms<'a>, String> {
    let c14n = algorithm_of(
        find_child_element(info.signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD),
        "canonicalization",
        algorithm::EXC_C14N,
        options,
        outcome,
    )?;
    if c14n != algorithm::EXC_C14N {
        return Err(format!("canonicalization method {c14n} is not supported"));
    }

    let signature_method = algorithm_of(
        find_child_element(info.signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD),
        "signature",
        algorithm::RSA_SHA256,
        options,
        outcome,
    )?;
    if !options.allows(signature_method) {
        return Err(format!("signature method {signature_method} is not allowed"));
    }

    let digest = algorithm_of(
        find_child_element(info.reference, ns::DSIG, ns::node::DIGEST_METHOD),
        "digest",
        algorithm::SHA256,
        options,
        outcome,
    )?;
    if !algorithm::DIGEST_ALLOW_LIST.contains(&digest) {
        return Err(format!("digest method {digest} is not allowed"));
    }

    let transforms: Vec<&str> = match find_child_element(info.reference, ns::DSIG, ns::node::TRANSFORMS) {
        Some(transforms) => find_child_elements(transforms, ns::DSIG, ns::node::TRANSFORM)
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let default = PROFILE_TRANSFORMS.get(i).copied().unwrap_or(algorithm::EXC_C14N);
                algorithm_of(Some(t), "transform", default, options, outcome)
            })
            .collect::<Result<_, _>>()?,
        None if options.strict_validation => return Err("Reference has no Transforms".into()),
        None => {
            outcome.warn("Reference has no Transforms, assuming the enveloped profile");
            PROFILE_TRANSFORMS.to_vec()
        }
    };
    if transforms != PROFILE_TRANSFORMS {
        return Err(format!("transforms [{}] do not match the profile", transforms.join(", ")));
    }

    log::trace!("algorithms accepted for {}: {signature_method}, {digest}", info.uri);
    Ok(Algorithms {
        signature: signature_method,
        digest,
    })
}

fn check_crypto(
    doc: &Document<'_>,
    xml: &str,
    signature: Node<'_, '_>,
    info: &ReferenceInfo<'_, '_>,
    algorithms: &Algorithms<'_>,
    key_source: KeySource<'_>,
    outcome: &mut VerificationResult,
) -> Result<(), Detail> {
    let embedded = embedded_certificate(signature);
    let certificate_der = match key_source {
        KeySource::Certificate(pem) => {
            let der = firma_keys::pem::decode_certificate(pem)?;
            if let Some(embedded) = &embedded {
                if decode_b64(embedded).ok().as_deref() != Some(der.as_slice()) {
                    outcome.warn("embedded certificate differs from the supplied certificate");
                }
            }
            der
        }
        KeySource::Embedded => {
            let embedded = embedded.ok_or("no certificate available to check the signature")?;
            decode_b64(&embedded)?
        }
    };
    let certificate = firma_keys::loader::parse_certificate_der(&certificate_der)?;
    let public_key = firma_keys::loader::certificate_rsa_public_key(&certificate)?;

    let expected_digest = find_child_element(info.reference, ns::DSIG, ns::node::DIGEST_VALUE)
        .map(compact_text)
        .ok_or("Reference has no DigestValue")?;
    let expected_digest = decode_b64(&expected_digest)?;
    let digest = reference::digest_reference(doc, xml, signature, info.uri, algorithms.digest)?;
    if digest != expected_digest {
        return Err(Detail::from(format!("digest mismatch for reference {}", info.uri)));
    }

    let signature_value = find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .map(compact_text)
        .ok_or("signature has no SignatureValue")?;
    let signature_value = decode_b64(&signature_value)?;
    let octets = reference::canonical_signed_info(doc, info.signed_info)?;
    let key = firma_crypto::SigningKey::RsaPublic(public_key);
    let valid = firma_crypto::sign::from_uri(algorithms.signature)?.verify(&key, &octets, &signature_value)?;
    if !valid {
        return Err(Detail::from("signature value mismatch"));
    }
    Ok(())
}

/// Base64 text of the first `KeyInfo/X509Data/X509Certificate`, if any.
pub(crate) fn embedded_certificate(signature: Node<'_, '_>) -> Option<String> {
    let key_info = find_child_element(signature, ns::DSIG, ns::node::KEY_INFO)?;
    let x509_data = find_child_element(key_info, ns::DSIG, ns::node::X509_DATA)?;
    let certificate = find_child_element(x509_data, ns::DSIG, ns::node::X509_CERTIFICATE)?;
    Some(compact_text(certificate)).filter(|text| !text.is_empty())
}

fn decode_b64(text: &str) -> Result<Vec<u8>, Error> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| Error::Base64(e.to_string()))
}

/// Failure detail of the cryptographic check.
struct Detail(String);

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Error> for Detail {
    fn from(err: Error) -> Self {
        Self(err.to_string())
    }
}

impl From<String> for Detail {
    fn from(detail: String) -> Self {
        Self(detail)
    }
}

impl From<&str> for Detail {
    fn from(detail: &str) -> Self {
        Self(detail.to_owned())
    }
}
