#![forbid(unsafe_code)]

//! Reference digesting shared by signing and verification.

use firma_core::{algorithm, Error};
use firma_transforms::{uri, C14nTransform, EnvelopedSignatureTransform, TransformPipeline};
use firma_xml::NodeSet;
use roxmltree::{Document, Node};

/// Transform URIs every reference must carry, in order.
pub const PROFILE_TRANSFORMS: [&str; 2] = [algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N];

/// The enveloped-signature then exclusive c14n pipeline for `signature`.
pub fn profile_pipeline(signature: Node<'_, '_>) -> TransformPipeline {
    let mut pipeline = TransformPipeline::new();
    pipeline.push(Box::new(EnvelopedSignatureTransform::from_node(signature)));
    pipeline.push(Box::new(C14nTransform));
    pipeline
}

/// Digest the data selected by `reference_uri` after the profile transforms.
///
/// `doc` must be the parse of `xml`.
pub fn digest_reference(
    doc: &Document<'_>,
    xml: &str,
    signature: Node<'_, '_>,
    reference_uri: &str,
    digest_uri: &str,
) -> Result<Vec<u8>, Error> {
    let input = uri::resolve_uri(reference_uri, doc, xml)?;
    let output = profile_pipeline(signature).execute(input)?;
    let octets = output.to_binary()?;
    firma_crypto::digest::digest(digest_uri, &octets)
}

/// Exclusive canonical form of `SignedInfo`, the octets that get signed.
pub fn canonical_signed_info(doc: &Document<'_>, signed_info: Node<'_, '_>) -> Result<Vec<u8>, Error> {
    let subset = NodeSet::tree_without_comments(signed_info);
    firma_c14n::canonicalize_doc(doc, Some(&subset))
}
