#![forbid(unsafe_code)]

//! Same-document reference resolution.
//!
//! Only the bare-name `#id` form is supported; XPointer and external URIs
//! are outside the signing profile.

use crate::document::build_id_map;
use firma_core::Error;
use roxmltree::{Document, Node};

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#').filter(|id| !id.is_empty())
}

/// Resolve an `Id` value to the single element carrying it.
///
/// Fails when the value is unknown or carried by more than one element.
pub fn resolve_id<'a, 'input>(
    doc: &'a Document<'input>,
    id: &str,
) -> Result<Node<'a, 'input>, Error> {
    let map = build_id_map(doc);
    match map.get(id).map(Vec::as_slice) {
        Some([node_id]) => doc
            .get_node(*node_id)
            .ok_or_else(|| Error::XmlStructure(format!("dangling node for Id {id}"))),
        Some(many) if many.len() > 1 => Err(Error::XmlStructure(format!(
            "Id {id} is carried by {} elements",
            many.len()
        ))),
        _ => Err(Error::XmlStructure(format!("Id not found: {id}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_same_document_ref() {
        assert_eq!(parse_same_document_ref("#signed-doc"), Some("signed-doc"));
        assert_eq!(parse_same_document_ref("#"), None);
        assert_eq!(parse_same_document_ref(""), None);
        assert_eq!(parse_same_document_ref("http://example.com/#a"), None);
    }

    #[test]
    fn test_resolve_id() {
        let doc = crate::parse(r#"<a Id="root"><b Id="dup"/><c Id="dup"/></a>"#).unwrap();
        let root = resolve_id(&doc, "root").unwrap();
        assert_eq!(root.id(), doc.root_element().id());
        assert!(resolve_id(&doc, "dup").is_err());
        assert!(resolve_id(&doc, "missing").is_err());
    }
}
