#![forbid(unsafe_code)]

//! Core types shared by every firma crate: the error enum, algorithm URIs
//! of the signing profile and XML-DSig namespace/element names.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result, TimestampErrorKind};
