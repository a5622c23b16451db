#![forbid(unsafe_code)]

//! Lookup helpers over a parsed `roxmltree` tree.

use firma_core::ns;
use roxmltree::{Attribute, Document, Node, NodeId};
use std::collections::HashMap;

/// Whether `node` is an element with the given namespace and local name.
pub fn is_element_named(node: Node<'_, '_>, ns_uri: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns_uri
}

/// Find all descendant elements with the given namespace and local name.
pub fn find_elements<'a, 'input>(
    doc: &'a Document<'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| is_element_named(*n, ns_uri, local_name))
        .collect()
}

pub fn find_child_element<'a, 'input>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| is_element_named(*n, ns_uri, local_name))
}

pub fn find_child_elements<'a, 'input>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_element_named(*n, ns_uri, local_name))
        .collect()
}

/// All XML-DSig `Signature` elements in document order.
pub fn find_signatures<'a, 'input>(doc: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
    find_elements(doc, ns::DSIG, ns::node::SIGNATURE)
}

/// Map every `Id` attribute value to the elements carrying it.
///
/// A value mapped to more than one element is ambiguous and must not be used
/// as a reference target.
pub fn build_id_map(doc: &Document<'_>) -> HashMap<String, Vec<NodeId>> {
    let mut map: HashMap<String, Vec<NodeId>> = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        if let Some(val) = node.attribute(ns::attr::ID) {
            map.entry(val.to_owned()).or_default().push(node.id());
        }
    }
    map
}

/// The qualified name (`prefix:local` or `local`) of an element, exactly as
/// written in the source.
pub fn qualified_name<'input>(node: Node<'_, 'input>) -> &'input str {
    let text = node.document().input_text();
    let start = node.range().start + 1;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// The namespace prefix of an element as written ("" when unprefixed).
pub fn element_prefix<'input>(node: Node<'_, 'input>) -> &'input str {
    match qualified_name(node).split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// The namespace prefix of an attribute of `node` as written ("" when
/// unprefixed).
pub fn attribute_prefix<'input>(node: Node<'_, 'input>, attr: &Attribute<'_, 'input>) -> &'input str {
    let qname = &node.document().input_text()[attr.range_qname()];
    match qname.split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// Text content of an element with all whitespace removed (base64 payloads).
pub fn compact_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .flat_map(|t| t.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}
