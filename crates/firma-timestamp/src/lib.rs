#![forbid(unsafe_code)]

//! Signing-time assertions for signed documents.
//!
//! [`TimestampService`] appends a XAdES `SigningTime` to the first signature
//! of a document. It is a development stub: it refuses to be built or used
//! when the [`Environment`] is production. The time itself comes from a
//! [`TimestampProvider`], which is where a real time-stamp authority client
//! plugs in.

pub mod config;
pub mod environment;
pub mod provider;
pub mod service;

pub use config::TimestampConfig;
pub use environment::{Environment, EnvironmentParseError};
pub use provider::{LocalClockProvider, NullTimestampProvider, TimestampProvider};
pub use service::TimestampService;
