#![forbid(unsafe_code)]

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time-stamp settings.
///
/// `timeout` is written as whole seconds in serialized form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Time-stamp authority endpoint, for providers that talk to one.
    pub tsa_url: Option<String>,
    /// Upper bound on waiting for the provider.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Fall back to the local clock when the provider fails or times out.
    pub enable_stub: bool,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            tsa_url: None,
            timeout: Duration::from_secs(30),
            username: None,
            password: None,
            enable_stub: false,
        }
    }
}

impl fmt::Debug for TimestampConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampConfig")
            .field("tsa_url", &self.tsa_url)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("enable_stub", &self.enable_stub)
            .finish()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
