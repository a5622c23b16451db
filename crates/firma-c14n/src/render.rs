#![forbid(unsafe_code)]

//! Namespace declarations and attributes in canonical order.

use crate::escape::{write_escaped, Context};
use std::cmp::Ordering;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b" xmlns");
        if !self.prefix.is_empty() {
            out.push(b':');
            out.extend_from_slice(self.prefix.as_bytes());
        }
        write_value(out, &self.uri);
    }
}

impl Ord for NsDecl {
    // Default namespace first, then by prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// `prefix:local` or just `local`.
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        write_value(out, &self.value);
    }
}

fn write_value(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(b"=\"");
    write_escaped(out, value, Context::Attribute);
    out.push(b'"');
}

impl Ord for Attr {
    // Unqualified attributes first (by local name), then by (namespace URI, local name).
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(ns_uri: &str, local: &str, qname: &str) -> Attr {
        Attr {
            ns_uri: ns_uri.into(),
            local_name: local.into(),
            qualified_name: qname.into(),
            value: String::new(),
        }
    }

    #[test]
    fn test_attribute_order() {
        let mut attrs = vec![
            attr("urn:z", "a", "z:a"),
            attr("", "Id", "Id"),
            attr("urn:b", "lang", "b:lang"),
            attr("", "Currency", "Currency"),
        ];
        attrs.sort();
        let names: Vec<_> = attrs.iter().map(|a| a.qualified_name.as_str()).collect();
        assert_eq!(names, ["Currency", "Id", "b:lang", "z:a"]);
    }

    #[test]
    fn test_namespace_order_default_first() {
        let mut decls = vec![
            NsDecl { prefix: "ds".into(), uri: "urn:ds".into() },
            NsDecl { prefix: String::new(), uri: "urn:inv".into() },
            NsDecl { prefix: "cac".into(), uri: "urn:cac".into() },
        ];
        decls.sort();
        let mut out = Vec::new();
        for decl in &decls {
            decl.write_to(&mut out);
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#" xmlns="urn:inv" xmlns:cac="urn:cac" xmlns:ds="urn:ds""#
        );
    }

    #[test]
    fn test_attribute_value_escaped() {
        let mut a = attr("", "Note", "Note");
        a.value = "\"R&D\"\n".into();
        let mut out = Vec::new();
        a.write_to(&mut out);
        assert_eq!(String::from_utf8(out).unwrap(), r#" Note="&quot;R&amp;D&quot;&#xA;""#);
    }
}
