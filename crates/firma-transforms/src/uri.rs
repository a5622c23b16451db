#![forbid(unsafe_code)]

//! URI resolution for signature references.
//!
//! Handles:
//! - Empty URI (""): the entire document minus comments
//! - Same-document references ("#id"): the identified subtree minus comments
//!
//! External references are refused.

use crate::pipeline::TransformData;
use firma_core::Error;
use firma_xml::{xpath, NodeSet};
use roxmltree::Document;

/// Resolve a reference URI against `doc` (parsed from `xml_text`) and return
/// the initial transform input.
pub fn resolve_uri(uri: &str, doc: &Document<'_>, xml_text: &str) -> Result<TransformData, Error> {
    let node_set = if uri.is_empty() {
        NodeSet::all_without_comments(doc)
    } else if let Some(id) = xpath::parse_same_document_ref(uri) {
        let node = xpath::resolve_id(doc, id)?;
        NodeSet::tree_without_comments(node)
    } else {
        return Err(Error::Transform(format!("external URI not supported: {uri}")));
    };
    Ok(TransformData::Xml {
        xml_text: xml_text.to_owned(),
        node_set: Some(node_set),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<a><!--c--><b Id="x">1</b></a>"#;

    #[test]
    fn test_same_document_reference() {
        let doc = firma_xml::parse(XML).unwrap();
        let data = resolve_uri("#x", &doc, XML).unwrap();
        assert_eq!(data.to_binary().unwrap(), br#"<b Id="x">1</b>"#);
    }

    #[test]
    fn test_empty_uri_drops_comments() {
        let doc = firma_xml::parse(XML).unwrap();
        let data = resolve_uri("", &doc, XML).unwrap();
        assert_eq!(data.to_binary().unwrap(), br#"<a><b Id="x">1</b></a>"#);
    }

    #[test]
    fn test_unknown_and_external_references() {
        let doc = firma_xml::parse(XML).unwrap();
        assert!(resolve_uri("#nope", &doc, XML).is_err());
        assert!(resolve_uri("https://example.com/doc.xml", &doc, XML).is_err());
    }
}
