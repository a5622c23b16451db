#![forbid(unsafe_code)]

//! XML document abstraction for firma.
//!
//! Provides lookup helpers over `roxmltree`, the `NodeSet` used by
//! canonicalization and transforms, range-based structural edits and a
//! small writer for emitting new elements.

pub mod document;
pub mod edit;
pub mod nodeset;
pub mod writer;
pub mod xpath;

pub use nodeset::NodeSet;
pub use writer::XmlWriter;

/// Parsing options used for every document handled by firma.
///
/// DTDs are refused: invoices never need them and entity declarations are
/// the usual vehicle for expansion attacks.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`].
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, firma_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| firma_core::Error::XmlParse(e.to_string()))
}

/// Whether `text` is a well-formed XML document. Empty input is not.
///
/// Stricter than XML 1.0 well-formedness: any document with a DOCTYPE
/// declaration is refused, see [`parsing_options`].
pub fn is_well_formed(text: &str) -> bool {
    !text.trim().is_empty() && parse(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("<Invoice><Total>10</Total></Invoice>"));
        assert!(is_well_formed("<?xml version=\"1.0\"?>\n<a/>"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("   \n"));
        assert!(!is_well_formed("<Invoice><Total>10</Invoice>"));
        assert!(!is_well_formed("not xml at all"));
    }

    #[test]
    fn test_dtd_rejected() {
        let xml = "<!DOCTYPE a [<!ENTITY x \"y\">]><a>&x;</a>";
        assert!(!is_well_formed(xml));
    }
}
