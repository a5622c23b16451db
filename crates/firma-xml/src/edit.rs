#![forbid(unsafe_code)]

//! Structural edits on serialized XML.
//!
//! Nodes are located on a parsed tree; the edit is then applied by splicing
//! the source text at the node's byte range, so everything outside the edit
//! point stays byte-for-byte identical.

use crate::document::qualified_name;
use firma_core::Error;
use roxmltree::Node;

/// Insert an attribute right after the element name in its start tag.
///
/// The value is escaped; the caller is responsible for the attribute not
/// already being present.
pub fn insert_attribute(xml: &str, node: Node<'_, '_>, name: &str, value: &str) -> String {
    let at = node.range().start + 1 + qualified_name(node).len();
    let mut out = String::with_capacity(xml.len() + name.len() + value.len() + 4);
    out.push_str(&xml[..at]);
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
    out.push_str(&xml[at..]);
    out
}

/// Insert `markup` as the last child of `node`, i.e. immediately before its
/// closing tag.  A self-closing element is expanded to a start/end tag pair.
pub fn append_child(xml: &str, node: Node<'_, '_>, markup: &str) -> Result<String, Error> {
    let range = node.range();
    let element = &xml[range.clone()];
    let mut out = String::with_capacity(xml.len() + markup.len() + 32);

    if element.ends_with("/>") {
        let close = range.end - 2;
        out.push_str(&xml[..close]);
        out.push('>');
        out.push_str(markup);
        out.push_str("</");
        out.push_str(qualified_name(node));
        out.push('>');
        out.push_str(&xml[range.end..]);
    } else {
        let end_tag = element
            .rfind("</")
            .ok_or_else(|| Error::XmlStructure("element has no closing tag".into()))?;
        let at = range.start + end_tag;
        out.push_str(&xml[..at]);
        out.push_str(markup);
        out.push_str(&xml[at..]);
    }
    Ok(out)
}

/// Replace the content of an element that has no element children with
/// escaped `text`.
pub fn set_text(xml: &str, node: Node<'_, '_>, text: &str) -> Result<String, Error> {
    if node.children().any(|c| c.is_element()) {
        return Err(Error::XmlStructure(format!(
            "cannot set text of <{}>: it has element children",
            qualified_name(node)
        )));
    }
    let range = node.range();
    let element = &xml[range.clone()];
    let escaped = escape_text(text);

    let mut out = String::with_capacity(xml.len() + escaped.len());
    if element.ends_with("/>") {
        out.push_str(&xml[..range.end - 2]);
        out.push('>');
        out.push_str(&escaped);
        out.push_str("</");
        out.push_str(qualified_name(node));
        out.push('>');
    } else {
        let content_start = range.start + start_tag_len(element)?;
        let content_end = range.start
            + element
                .rfind("</")
                .ok_or_else(|| Error::XmlStructure("element has no closing tag".into()))?;
        out.push_str(&xml[..content_start]);
        out.push_str(&escaped);
        out.push_str(&xml[content_end..range.end]);
    }
    out.push_str(&xml[range.end..]);
    Ok(out)
}

/// Length of the start tag at the beginning of `element`, including `>`.
/// Quoted attribute values may contain `>`.
fn start_tag_len(element: &str) -> Result<usize, Error> {
    let mut quote: Option<char> = None;
    for (i, c) in element.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Ok(i + 1),
            _ => {}
        }
    }
    Err(Error::XmlStructure("unterminated start tag".into()))
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_attribute_on_root() {
        let xml = r#"<?xml version="1.0"?><inv:Invoice xmlns:inv="urn:x"><inv:Total>1</inv:Total></inv:Invoice>"#;
        let doc = crate::parse(xml).unwrap();
        let out = insert_attribute(xml, doc.root_element(), "Id", "signed-doc");
        assert_eq!(
            out,
            r#"<?xml version="1.0"?><inv:Invoice Id="signed-doc" xmlns:inv="urn:x"><inv:Total>1</inv:Total></inv:Invoice>"#
        );
        let reparsed = crate::parse(&out).unwrap();
        assert_eq!(reparsed.root_element().attribute("Id"), Some("signed-doc"));
    }

    #[test]
    fn test_insert_attribute_escapes_value() {
        let xml = "<a/>";
        let doc = crate::parse(xml).unwrap();
        let out = insert_attribute(xml, doc.root_element(), "Id", "x\"<y");
        let reparsed = crate::parse(&out).unwrap();
        assert_eq!(reparsed.root_element().attribute("Id"), Some("x\"<y"));
    }

    #[test]
    fn test_append_child_before_closing_tag() {
        let xml = "<Invoice>\n  <Total>1</Total>\n</Invoice>\n";
        let doc = crate::parse(xml).unwrap();
        let out = append_child(xml, doc.root_element(), "<Sig/>").unwrap();
        assert_eq!(out, "<Invoice>\n  <Total>1</Total>\n<Sig/></Invoice>\n");
    }

    #[test]
    fn test_append_child_expands_self_closing() {
        let xml = r#"<Invoice Id="a" />"#;
        let doc = crate::parse(xml).unwrap();
        let out = append_child(xml, doc.root_element(), "<Sig/>").unwrap();
        assert_eq!(out, r#"<Invoice Id="a" ><Sig/></Invoice>"#);
    }

    #[test]
    fn test_append_child_to_nested_element() {
        let xml = "<a><b><c/></b><b/></a>";
        let doc = crate::parse(xml).unwrap();
        let first_b = doc.root_element().first_element_child().unwrap();
        let out = append_child(xml, first_b, "<d/>").unwrap();
        assert_eq!(out, "<a><b><c/><d/></b><b/></a>");
    }

    #[test]
    fn test_set_text_on_empty_element() {
        let xml = r#"<a><v a=">"></v><w/></a>"#;
        let doc = crate::parse(xml).unwrap();
        let v = doc.root_element().first_element_child().unwrap();
        let out = set_text(xml, v, "QUJD").unwrap();
        assert_eq!(out, r#"<a><v a=">">QUJD</v><w/></a>"#);

        let doc = crate::parse(&out).unwrap();
        let w = doc.root_element().last_element_child().unwrap();
        let out2 = set_text(&out, w, "a&b").unwrap();
        assert_eq!(out2, r#"<a><v a=">">QUJD</v><w>a&amp;b</w></a>"#);
    }

    #[test]
    fn test_set_text_refuses_mixed_content() {
        let xml = "<a><b/></a>";
        let doc = crate::parse(xml).unwrap();
        assert!(set_text(xml, doc.root_element(), "x").is_err());
    }
}
