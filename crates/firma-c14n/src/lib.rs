#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for firma.
//!
//! Only Exclusive Canonical XML 1.0 without comments is implemented; it is
//! the one method the signing profile uses both for `SignedInfo` and for
//! the reference transform chain.

pub mod escape;
pub mod exclusive;
pub mod render;

use firma_core::Error;
use firma_xml::NodeSet;

/// Canonicalize an XML document, or the part of it in `node_set`.
pub fn canonicalize(xml: &str, node_set: Option<&NodeSet>) -> Result<Vec<u8>, Error> {
    let doc = firma_xml::parse(xml)?;
    canonicalize_doc(&doc, node_set)
}

/// Canonicalize an already parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    exclusive::canonicalize(doc, node_set)
}
