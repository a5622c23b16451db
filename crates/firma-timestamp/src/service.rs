#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use firma_core::{ns, Error, TimestampErrorKind};
use firma_xml::document::{element_prefix, find_signatures};
use firma_xml::{edit, XmlWriter};

use crate::config::TimestampConfig;
use crate::environment::Environment;
use crate::provider::TimestampProvider;

/// `Target` fragment used when the signature carries no `Id`.
pub const DEFAULT_TARGET: &str = "Signature";

/// Development-only stub that attaches a signing time to signed documents.
pub struct TimestampService {
    environment: Environment,
    config: TimestampConfig,
    provider: Arc<dyn TimestampProvider>,
}

impl std::fmt::Debug for TimestampService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampService")
            .field("environment", &self.environment)
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl TimestampService {
    /// Build the service. Fails in production.
    pub fn new(
        environment: Environment,
        config: TimestampConfig,
        provider: Arc<dyn TimestampProvider>,
    ) -> Result<Self, Error> {
        if environment.is_production() {
            return Err(Error::timestamp(
                TimestampErrorKind::ProductionDisallowed,
                "TimestampService is a development-only stub and cannot be constructed in production",
            ));
        }
        log::warn!(
            "timestamp stub enabled ({environment}, provider {}, local clock fallback: {})",
            provider.name(),
            config.enable_stub
        );
        Ok(Self {
            environment,
            config,
            provider,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> &TimestampConfig {
        &self.config
    }

    /// Append a signing-time `Object` to the first signature of `signed_xml`.
    ///
    /// The assertion targets the signature's `Id`, or `#Signature` when it
    /// has none. Every call adds a new `Object`. Returns `Ok(None)` when the
    /// input is malformed or carries no signature. The rest of the document
    /// is left byte-for-byte intact.
    pub async fn add_timestamp(&self, signed_xml: &str) -> Result<Option<String>, Error> {
        if self.environment.is_production() {
            return Err(Error::timestamp(
                TimestampErrorKind::ProductionDisallowed,
                "add_timestamp is not allowed in production",
            ));
        }

        let Ok(doc) = firma_xml::parse(signed_xml) else {
            log::debug!("not timestamping: document is not well-formed");
            return Ok(None);
        };
        let Some(&signature) = find_signatures(&doc).first() else {
            log::debug!("not timestamping: document has no signature");
            return Ok(None);
        };
        let target = signature.attribute(ns::attr::ID).unwrap_or(DEFAULT_TARGET);

        let signing_time = self.signing_time().await?;
        let markup = signing_time_object(element_prefix(signature), target, signing_time)?;
        let stamped = edit::append_child(signed_xml, signature, &markup)
            .map_err(|e| Error::timestamp(TimestampErrorKind::InvalidXml, e.to_string()))?;

        log::debug!("signature #{target} timestamped at {signing_time}");
        Ok(Some(stamped))
    }

    async fn signing_time(&self) -> Result<DateTime<Utc>, Error> {
        let timeout = self.config.timeout;
        let err = match tokio::time::timeout(timeout, self.provider.signing_time()).await {
            Ok(Ok(time)) => return Ok(time),
            Ok(Err(err @ Error::Timestamp { .. })) => err,
            Ok(Err(other)) => Error::timestamp(TimestampErrorKind::TsaUnavailable, other.to_string()),
            Err(_) => Error::timestamp(
                TimestampErrorKind::Timeout,
                format!("{} did not answer within {timeout:?}", self.provider.name()),
            ),
        };

        if self.config.enable_stub {
            log::warn!("time source failed ({err}), falling back to the local clock");
            Ok(Utc::now())
        } else {
            Err(err)
        }
    }
}

/// `<Object>` in the signature's prefix wrapping the XAdES signing time.
fn signing_time_object(
    dsig_prefix: &str,
    signature_id: &str,
    time: DateTime<Utc>,
) -> Result<String, Error> {
    let object = match dsig_prefix {
        "" => ns::node::OBJECT.to_owned(),
        prefix => format!("{prefix}:{}", ns::node::OBJECT),
    };
    let xades = |local: &str| format!("{}:{local}", ns::XADES_PREFIX);
    let xmlns = format!("xmlns:{}", ns::XADES_PREFIX);
    let target = format!("#{signature_id}");
    let time = time.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut w = XmlWriter::new();
    w.start_element(&object, &[])?;
    w.start_element(
        &xades(ns::node::QUALIFYING_PROPERTIES),
        &[(xmlns.as_str(), ns::XADES), (ns::attr::TARGET, target.as_str())],
    )?;
    w.start_element(&xades(ns::node::SIGNED_PROPERTIES), &[])?;
    w.start_element(&xades(ns::node::SIGNED_SIGNATURE_PROPERTIES), &[])?;
    w.text_element(&xades(ns::node::SIGNING_TIME), &[], &time)?;
    w.end_element(&xades(ns::node::SIGNED_SIGNATURE_PROPERTIES))?;
    w.end_element(&xades(ns::node::SIGNED_PROPERTIES))?;
    w.end_element(&xades(ns::node::QUALIFYING_PROPERTIES))?;
    w.end_element(&object)?;
    w.into_string()
}
