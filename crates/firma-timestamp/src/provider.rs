#![forbid(unsafe_code)]

//! Sources of signing time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firma_core::{Error, TimestampErrorKind};

/// Supplies the time asserted in a signature.
///
/// A client for an RFC 3161 time-stamp authority implements this trait.
#[async_trait]
pub trait TimestampProvider: Send + Sync {
    async fn signing_time(&self) -> Result<DateTime<Utc>, Error>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}

/// Provider for setups without a time-stamp authority; always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTimestampProvider;

#[async_trait]
impl TimestampProvider for NullTimestampProvider {
    async fn signing_time(&self) -> Result<DateTime<Utc>, Error> {
        Err(Error::timestamp(
            TimestampErrorKind::TsaUnavailable,
            "no time-stamp authority configured",
        ))
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// The system clock. Not a trusted time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClockProvider;

#[async_trait]
impl TimestampProvider for LocalClockProvider {
    async fn signing_time(&self) -> Result<DateTime<Utc>, Error> {
        Ok(Utc::now())
    }

    fn name(&self) -> &str {
        "local-clock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_is_unavailable() {
        let err = NullTimestampProvider.signing_time().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Timestamp {
                kind: TimestampErrorKind::TsaUnavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_local_clock() {
        let before = Utc::now();
        let t = LocalClockProvider.signing_time().await.unwrap();
        assert!(t >= before);
        assert!(t <= Utc::now());
    }
}
