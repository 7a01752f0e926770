//! Configuration for key ring fetching and token verification.
//!
//! [`KeyRingConfig`] says where the published key set lives and how long a
//! fetch may take. [`VerifierConfig`] holds the optional claim checks
//! applied after the signature verifies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Default total timeout for one key ring fetch (5 seconds).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout for the key-publishing endpoint (2 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Where and how to fetch the published key set.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cloudfiles_authn::KeyRingConfig;
///
/// let config = KeyRingConfig::builder()
///     .jwks_url("https://auth.example.com/.well-known/jwks.json")
///     .fetch_timeout(Duration::from_secs(3))
///     .build()?;
/// assert_eq!(config.connect_timeout(), Duration::from_secs(2));
///
/// let cognito = KeyRingConfig::for_cognito("eu-west-1", "eu-west-1_AbCdEf")?;
/// assert_eq!(
///     cognito.jwks_url(),
///     "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf/.well-known/jwks.json"
/// );
/// # Ok::<(), cloudfiles_authn::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRingConfig {
    /// URL of the JSON Web Key Set document.
    pub(crate) jwks_url: String,

    /// Total time allowed for one fetch, including reading the body.
    #[serde(with = "humantime_serde", default = "default_fetch_timeout")]
    pub(crate) fetch_timeout: Duration,

    /// Time allowed to establish the connection.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub(crate) connect_timeout: Duration,
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

#[bon::bon]
impl KeyRingConfig {
    /// Creates a new configuration, validating the URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if the URL is empty or not
    /// `http(s)`, or if a timeout is zero.
    #[builder]
    pub fn new(
        #[builder(into)] jwks_url: String,
        #[builder(default = DEFAULT_FETCH_TIMEOUT)] fetch_timeout: Duration,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
    ) -> Result<Self> {
        let config = Self { jwks_url, fetch_timeout, connect_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for an AWS Cognito user pool's published keys.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `region` or `pool_id` is empty.
    pub fn for_cognito(region: &str, pool_id: &str) -> Result<Self> {
        if region.is_empty() || pool_id.is_empty() {
            return Err(AuthError::invalid_config("cognito region and pool id are required"));
        }
        Self::builder()
            .jwks_url(format!(
                "https://cognito-idp.{region}.amazonaws.com/{pool_id}/.well-known/jwks.json"
            ))
            .build()
    }

    /// Checks a configuration obtained through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] on the same conditions as the
    /// builder.
    pub fn validate(&self) -> Result<()> {
        if self.jwks_url.trim().is_empty() {
            return Err(AuthError::invalid_config("jwks_url cannot be empty"));
        }
        if !(self.jwks_url.starts_with("https://") || self.jwks_url.starts_with("http://")) {
            return Err(AuthError::invalid_config(format!(
                "jwks_url must be an http(s) URL, got '{}'",
                self.jwks_url
            )));
        }
        if self.fetch_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(AuthError::invalid_config("timeouts must be non-zero"));
        }
        Ok(())
    }

    /// Returns the key set URL.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Returns the total fetch timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Claim checks applied after a token's signature verifies.
///
/// The algorithm is not configurable: only RS256 is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Expected `iss` claim; unchecked when absent.
    #[builder(into)]
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected `aud` claim; unchecked when absent.
    #[builder(into)]
    #[serde(default)]
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp` and `nbf`.
    #[builder(default)]
    #[serde(with = "humantime_serde", default)]
    pub leeway: Duration,
}
