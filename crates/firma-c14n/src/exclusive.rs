#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Comments are never output. Only "visibly utilized" namespace
//! declarations are: those whose prefix the element's tag name or one of
//! its attributes uses.

use crate::escape::{write_escaped, Context};
use crate::render::{Attr, NsDecl};
use firma_core::Error;
use firma_xml::document::{attribute_prefix, element_prefix, qualified_name};
use firma_xml::NodeSet;
use roxmltree::{Document, Node, NodeType};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(doc: &Document<'_>, node_set: Option<&NodeSet>) -> Result<Vec<u8>, Error> {
    let ctx = ExcC14nContext { node_set };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    node_set: Option<&'a NodeSet>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns)?,
            NodeType::Text => {
                if self.is_visible(node) {
                    write_escaped(output, node.text().unwrap_or(""), Context::Text);
                }
            }
            NodeType::Comment => {}
            NodeType::PI => {
                if self.is_visible(node) {
                    if let Some(pi) = node.pi() {
                        write_top_level(node, output, |out| {
                            out.extend_from_slice(b"<?");
                            out.extend_from_slice(pi.target.as_bytes());
                            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                                out.push(b' ');
                                write_escaped(out, value, Context::Instruction);
                            }
                            out.extend_from_slice(b"?>");
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(node) {
            // Invisible elements render nothing themselves and do not change
            // the visible ancestor's namespace context.
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let inscope_ns = collect_inscope_namespaces(node);

        // Visibly utilized prefixes: tag name and attributes.
        let mut utilized: BTreeSet<String> = BTreeSet::new();
        utilized.insert(element_prefix(node).to_owned());

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            let qualified_name = if ns_uri.is_empty() {
                attr.name().to_owned()
            } else {
                // Keep the prefix as written; several may be bound to one URI.
                let prefix = attribute_prefix(node, &attr);
                if prefix.is_empty() {
                    return Err(Error::Canonicalization(format!(
                        "namespaced attribute {} has no prefix",
                        attr.name()
                    )));
                }
                utilized.insert(prefix.to_owned());
                format!("{prefix}:{}", attr.name())
            };
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name,
                value: attr.value().to_owned(),
            });
        }
        attrs.sort();

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            match inscope_ns.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // Default namespace undeclared here but rendered above: emit xmlns="".
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let elem_name = qualified_name(node);

        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for decl in &ns_decls {
            decl.write_to(output);
        }
        for attr in &attrs {
            attr.write_to(output);
        }
        output.push(b'>');

        let mut child_rendered_ns = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered_ns.insert(decl.prefix, decl.uri);
        }

        for child in node.children() {
            self.process_node(child, output, &child_rendered_ns)?;
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(elem_name.as_bytes());
        output.push(b'>');
        Ok(())
    }
}

/// PIs outside the document element are separated from it by a line feed
/// on the side where the element is.
fn write_top_level(node: Node<'_, '_>, output: &mut Vec<u8>, write: impl FnOnce(&mut Vec<u8>)) {
    let top_level = node
        .parent()
        .is_some_and(|p| p.node_type() == NodeType::Root);

    if top_level && has_preceding_element(node) {
        output.push(b'\n');
    }
    write(output);
    if top_level && has_following_element(node) {
        output.push(b'\n');
    }
}

fn has_preceding_element(node: Node<'_, '_>) -> bool {
    let mut sib = node.prev_sibling();
    while let Some(s) = sib {
        if s.is_element() {
            return true;
        }
        sib = s.prev_sibling();
    }
    false
}

fn has_following_element(node: Node<'_, '_>) -> bool {
    let mut sib = node.next_sibling();
    while let Some(s) = sib {
        if s.is_element() {
            return true;
        }
        sib = s.next_sibling();
    }
    false
}

/// In-scope namespace bindings of an element, keyed by prefix ("" = default).
fn collect_inscope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .filter(|(_, uri)| !uri.is_empty())
        .collect()
}
