#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element being processed, with all its
//! descendants, from the node set.

use crate::pipeline::{Transform, TransformData};
use firma_core::{algorithm, Error};
use firma_xml::NodeSet;
use roxmltree::{Node, NodeId};

pub struct EnvelopedSignatureTransform {
    signature: NodeId,
}

impl EnvelopedSignatureTransform {
    /// `signature` must come from parsing the same text the transform will see.
    pub fn from_node(signature: Node<'_, '_>) -> Self {
        Self {
            signature: signature.id(),
        }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        match input {
            TransformData::Xml { xml_text, node_set } => {
                let doc = firma_xml::parse(&xml_text)?;
                let mut ns = node_set.unwrap_or_else(|| NodeSet::all_without_comments(&doc));

                let signature = doc
                    .get_node(self.signature)
                    .filter(|n| n.is_element())
                    .ok_or_else(|| {
                        Error::Transform("enveloped signature node not found".into())
                    })?;
                ns.remove_subtree(signature);

                Ok(TransformData::Xml {
                    xml_text,
                    node_set: Some(ns),
                })
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}
