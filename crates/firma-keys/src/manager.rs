#![forbid(unsafe_code)]

//! Certificate manager with a fingerprint-keyed identity cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use firma_core::Error;

use crate::identity::SigningIdentity;
use crate::loader;
use crate::validation::{self, CertificateValidation};

const REDACTED: &str = "[redacted]";
const SENSITIVE_MARKERS: &[&str] = &["-----BEGIN", "-----END", "PRIVATE KEY"];

/// Settings for [`CertificateManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateManagerConfig {
    /// How long a cached identity is served before it is treated as absent.
    /// Expired entries are dropped on the next load. `None` keeps entries
    /// until [`CertificateManager::clear_cache`].
    pub cache_ttl: Option<Duration>,
}

impl Default for CertificateManagerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Some(Duration::from_secs(3600)),
        }
    }
}

struct CacheEntry {
    identity: Arc<SigningIdentity>,
    loaded_at: Instant,
}

/// Loads, caches and validates signing identities.
///
/// Identities are keyed by the SHA-256 fingerprint of their certificate, so
/// the same certificate loaded from a container and from PEM files resolves
/// to one shared entry.
pub struct CertificateManager {
    config: CertificateManagerConfig,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for CertificateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateManager {
    /// Create a manager with the default one hour cache lifetime.
    pub fn new() -> Self {
        Self::with_config(CertificateManagerConfig::default())
    }

    pub fn with_config(config: CertificateManagerConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CertificateManagerConfig {
        &self.config
    }

    /// Load an identity from a PKCS#12 container.
    ///
    /// The leaf certificate is the one whose public key matches the first
    /// private key in the container.
    pub fn load_from_container(
        &self,
        data: &[u8],
        passphrase: &str,
    ) -> Result<Arc<SigningIdentity>, Error> {
        log::debug!("loading signing identity from PKCS#12 container ({} bytes)", data.len());
        let contents = firma_pkcs12::parse_pkcs12(data, passphrase)?;

        let Some(key_der) = contents.private_keys.first() else {
            return Err(Error::Certificate("container has no private key".into()));
        };
        if contents.certificates.is_empty() {
            return Err(Error::Certificate("container has no certificate".into()));
        }

        let key = loader::load_rsa_private_pkcs8_der(key_der).map_err(certificate_error)?;
        let public = key.to_public_key();
        let leaf = contents
            .certificates
            .iter()
            .find(|der| {
                loader::parse_certificate_der(der)
                    .and_then(|cert| loader::certificate_rsa_public_key(&cert))
                    .is_ok_and(|cert_key| cert_key == public)
            })
            .ok_or_else(|| {
                Error::Certificate("no certificate in the container matches the private key".into())
            })?;

        let key_pem = loader::rsa_private_to_pem(&key).map_err(certificate_error)?;
        let identity =
            SigningIdentity::from_parts(&key, key_pem, leaf.clone()).map_err(certificate_error)?;
        self.insert(identity)
    }

    /// Read a PKCS#12 container from disk and load it.
    pub fn load_from_container_file(
        &self,
        path: impl AsRef<Path>,
        passphrase: &str,
    ) -> Result<Arc<SigningIdentity>, Error> {
        let data = std::fs::read(path.as_ref())?;
        self.load_from_container(&data, passphrase)
    }

    /// Load an identity from a certificate PEM and its private key PEM.
    pub fn load_from_pem(
        &self,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<Arc<SigningIdentity>, Error> {
        log::debug!("loading signing identity from PEM pair");
        let identity =
            SigningIdentity::from_pem(certificate_pem, private_key_pem).map_err(certificate_error)?;
        self.insert(identity)
    }

    /// Read a certificate PEM and key PEM from disk and load them.
    pub fn load_from_pem_files(
        &self,
        certificate_path: impl AsRef<Path>,
        private_key_path: impl AsRef<Path>,
    ) -> Result<Arc<SigningIdentity>, Error> {
        let certificate_pem = std::fs::read_to_string(certificate_path.as_ref())?;
        let private_key_pem = zeroize::Zeroizing::new(std::fs::read_to_string(private_key_path.as_ref())?);
        self.load_from_pem(&certificate_pem, &private_key_pem)
    }

    /// Look up a cached identity by certificate fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<Arc<SigningIdentity>> {
        let cache = self.cache.read().ok()?;
        cache
            .get(fingerprint)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| Arc::clone(&entry.identity))
    }

    /// Number of fresh cached identities.
    pub fn len(&self) -> usize {
        self.cache
            .read()
            .map(|cache| cache.values().filter(|e| self.is_fresh(e)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every cached identity.
    pub fn clear_cache(&self) {
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let evicted = cache.len();
        cache.clear();
        log::info!("certificate cache cleared ({evicted} identities evicted)");
    }

    /// Validate `identity` against the current time.
    pub fn validate_certificate(&self, identity: &SigningIdentity) -> CertificateValidation {
        self.validate_certificate_at(identity, Utc::now())
    }

    /// Validate `identity` as of `now`.
    pub fn validate_certificate_at(
        &self,
        identity: &SigningIdentity,
        now: DateTime<Utc>,
    ) -> CertificateValidation {
        let result = validation::validate_at(identity, now);
        if !result.valid {
            log::warn!(
                "certificate {} failed validation: {}",
                identity.fingerprint,
                result.errors.join("; ")
            );
        }
        result
    }

    /// One-line summary safe for logs: subject, issuer, validity window and
    /// fingerprint. Anything resembling PEM armour is replaced.
    pub fn get_certificate_info(&self, identity: &SigningIdentity) -> String {
        let info = format!(
            "Subject: {} | Issuer: {} | Valid: {} to {} | SHA-256: {}",
            identity.subject,
            identity.issuer,
            identity.valid_from.format("%Y-%m-%d"),
            identity.valid_to.format("%Y-%m-%d"),
            identity.fingerprint,
        );
        let info = redact(&info);
        debug_assert!(SENSITIVE_MARKERS.iter().all(|m| !info.contains(m)));
        info
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.config.cache_ttl {
            Some(ttl) => entry.loaded_at.elapsed() < ttl,
            None => true,
        }
    }

    fn insert(&self, identity: SigningIdentity) -> Result<Arc<SigningIdentity>, Error> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| Error::Certificate("certificate cache is inconsistent".into()))?;

        let before = cache.len();
        cache.retain(|_, entry| self.is_fresh(entry));
        let expired = before - cache.len();
        if expired > 0 {
            log::info!("certificate cache evicted {expired} expired identities");
        }

        if let Some(entry) = cache.get(&identity.fingerprint) {
            log::debug!("signing identity {} served from cache", identity.fingerprint);
            return Ok(Arc::clone(&entry.identity));
        }

        let fingerprint = identity.fingerprint.clone();
        log::info!(
            "cached signing identity {fingerprint} ({})",
            redact(&identity.subject)
        );
        let identity = Arc::new(identity);
        cache.insert(
            fingerprint,
            CacheEntry {
                identity: Arc::clone(&identity),
                loaded_at: Instant::now(),
            },
        );
        Ok(identity)
    }
}

fn redact(text: &str) -> String {
    SENSITIVE_MARKERS
        .iter()
        .fold(text.to_owned(), |acc, marker| acc.replace(marker, REDACTED))
}

fn certificate_error(err: Error) -> Error {
    match err {
        Error::Certificate(_) => err,
        other => Error::Certificate(other.to_string()),
    }
}
