#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use firma_core::{algorithm, Error};
use firma_xml::NodeSet;

/// Data flowing through the transform pipeline.
///
/// The node set refers to node ids of `xml_text` as parsed by
/// [`firma_xml::parse`]; parsing the same text always yields the same ids.
#[derive(Debug, Clone)]
pub enum TransformData {
    /// XML node set (for XML-aware transforms like C14N).
    Xml {
        xml_text: String,
        node_set: Option<NodeSet>,
    },
    /// Octet stream.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Convert to octets, applying exclusive C14N (without comments) when the
    /// data is still a node set.
    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data.clone()),
            TransformData::Xml { xml_text, node_set } => {
                firma_c14n::canonicalize(xml_text, node_set.as_ref())
            }
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    fn execute(&self, input: TransformData) -> Result<TransformData, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let mut data = input;
        for transform in &self.transforms {
            log::trace!("applying transform {}", transform.uri());
            data = transform.execute(data)?;
        }
        Ok(data)
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// Exclusive canonicalization without comments.
///
/// Accepts only a node set.
#[derive(Debug, Default, Clone, Copy)]
pub struct C14nTransform;

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        algorithm::EXC_C14N
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        match input {
            TransformData::Xml { xml_text, node_set } => Ok(TransformData::Binary(
                firma_c14n::canonicalize(&xml_text, node_set.as_ref())?,
            )),
            TransformData::Binary(_) => Err(Error::Transform(
                "exclusive C14N requires a node set, got octets".into(),
            )),
        }
    }
}
