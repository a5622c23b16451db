#![forbid(unsafe_code)]

//! Transform pipeline for firma signature references.
//!
//! Each reference carries a sequence of transforms applied in order to the
//! node set it selects: the signing profile uses the enveloped-signature
//! transform followed by exclusive canonicalization.

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use enveloped::EnvelopedSignatureTransform;
pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
