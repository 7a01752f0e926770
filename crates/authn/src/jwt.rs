//! Bearer token verification.
//!
//! Verification is two explicit steps:
//!
//! 1. [`decode_token_header`] reads the unverified header. Its only use is
//!    picking a key: the algorithm must be RS256 and the `kid` well formed.
//! 2. [`verify_signature`] checks the signature with the selected key and
//!    validates expiry and the configured issuer and audience.
//!
//! [`TokenVerifier`] ties both steps to a [`KeyRingCache`], refetching the
//! key ring once when a token names a `kid` the cached ring lacks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudfiles_authn::{
//!     HttpKeyRingSource, KeyRingCache, KeyRingConfig, TokenVerifier, VerifierConfig,
//!     jwt::bearer_token,
//! };
//!
//! # async fn example(authorization: Option<&str>) -> Result<(), cloudfiles_authn::AuthError> {
//! let source = HttpKeyRingSource::new(KeyRingConfig::for_cognito("us-east-1", "us-east-1_Pool")?)?;
//! let verifier = TokenVerifier::new(
//!     Arc::new(KeyRingCache::new(Arc::new(source))),
//!     VerifierConfig::default(),
//! );
//!
//! let owner = verifier.verify(bearer_token(authorization)?).await?;
//! println!("request made by {owner}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{
    cache::KeyRingCache,
    config::VerifierConfig,
    error::{AuthError, Result},
    validation::{validate_algorithm, validate_kid},
};

/// Claims read from a verified token.
///
/// Registered claims are optional at this level; expiry is enforced by
/// [`verify_signature`] and the subject by [`TokenVerifier::verify`].
/// Provider-specific claims (`email`, `token_use`, ...) land in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject; becomes the caller identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience, a string or an array of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    /// Expiration time (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Not before (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// All other claims.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Returns the subject, rejecting absent or empty values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSubject`] if `sub` is absent or empty.
    pub fn require_subject(&self) -> Result<&str> {
        match self.sub.as_deref() {
            Some(sub) if !sub.trim().is_empty() => Ok(sub),
            _ => Err(AuthError::missing_subject()),
        }
    }
}

/// The header fields used for key selection, already policy-checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm, always `RS256` once decoded.
    pub alg: String,
    /// Key identifier.
    pub kid: String,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
    kid: Option<String>,
}

/// Extracts the token from an `Authorization` header value.
///
/// The `Bearer ` scheme prefix is optional.
///
/// # Errors
///
/// Returns [`AuthError::MissingCredential`] if the header is absent or
/// carries no token.
///
/// # Examples
///
/// ```
/// use cloudfiles_authn::jwt::bearer_token;
///
/// assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
/// assert_eq!(bearer_token(Some("abc.def.ghi")).unwrap(), "abc.def.ghi");
/// assert!(bearer_token(Some("Bearer ")).is_err());
/// assert!(bearer_token(None).is_err());
/// ```
pub fn bearer_token(authorization: Option<&str>) -> Result<&str> {
    let value = authorization.map(str::trim).unwrap_or_default();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();

    if token.is_empty() {
        return Err(AuthError::missing_credential());
    }
    Ok(token)
}

/// Decodes and policy-checks a token header without verifying anything.
///
/// The algorithm check runs before the `kid` check, so a forged `none` or
/// HMAC header is reported as [`AuthError::InvalidToken`] even when it
/// carries no `kid`.
///
/// # Errors
///
/// - [`AuthError::MalformedToken`] if the token is not three dot-separated
///   parts, the header is not base64url JSON, or the `kid` is absent or
///   malformed
/// - [`AuthError::InvalidToken`] if the algorithm is not RS256
pub fn decode_token_header(token: &str) -> Result<TokenHeader> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::malformed_token("token must have 3 parts separated by dots"));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::malformed_token(format!("failed to decode token header: {e}")))?;
    let raw: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::malformed_token(format!("failed to parse token header: {e}")))?;

    let alg = raw.alg.ok_or_else(|| AuthError::malformed_token("token header missing 'alg'"))?;
    validate_algorithm(&alg)?;

    let kid = raw.kid.ok_or_else(|| AuthError::malformed_token("token header missing 'kid'"))?;
    validate_kid(&kid)?;

    Ok(TokenHeader { alg, kid })
}

/// Verifies a token's RS256 signature with `key` and validates its claims.
///
/// `exp` is required and, like `nbf`, checked with the configured leeway.
/// `iss` and `aud` are checked only when configured.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] carrying the reason on signature,
/// expiry, issuer or audience failure.
pub fn verify_signature(token: &str, key: &DecodingKey, config: &VerifierConfig) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = config.leeway.as_secs();
    validation.validate_nbf = true;

    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(token, key, &validation)?;
    Ok(token_data.claims)
}

/// Verifies bearer tokens against the issuer's rotating key ring.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    cache: Arc<KeyRingCache>,
    config: VerifierConfig,
}

impl TokenVerifier {
    /// Creates a verifier sharing `cache` with any other verifiers.
    #[must_use]
    pub fn new(cache: Arc<KeyRingCache>, config: VerifierConfig) -> Self {
        Self { cache, config }
    }

    /// Returns the key ring cache.
    #[must_use]
    pub fn cache(&self) -> &KeyRingCache {
        &self.cache
    }

    /// Returns the claim checks in use.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies `token` and returns its subject as the caller identity.
    ///
    /// # Errors
    ///
    /// Everything [`verify_claims`](Self::verify_claims) returns, plus
    /// [`AuthError::MissingSubject`] if the verified token has no `sub`.
    #[tracing::instrument(skip(self, token))]
    pub async fn verify(&self, token: &str) -> Result<String> {
        let claims = self.verify_claims(token).await?;
        let subject = claims.require_subject()?.to_owned();
        tracing::debug!(subject = %subject, "token verified");
        Ok(subject)
    }

    /// Verifies `token` and returns all of its claims.
    ///
    /// The key ring is fetched on first use. When the token's `kid` is not
    /// in the cached ring, the ring is refetched once; concurrent callers
    /// share that refetch.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredential`] if `token` is empty
    /// - [`AuthError::MalformedToken`] or [`AuthError::InvalidToken`] from
    ///   header checks, before the key ring is touched
    /// - [`AuthError::KeyRingUnavailable`] if a needed fetch fails
    /// - [`AuthError::UnknownSigningKey`] if the `kid` is still absent after
    ///   the refetch
    /// - [`AuthError::InvalidToken`] if signature or claim checks fail
    #[tracing::instrument(skip(self, token))]
    pub async fn verify_claims(&self, token: &str) -> Result<Claims> {
        if token.trim().is_empty() {
            return Err(AuthError::missing_credential());
        }

        let header = decode_token_header(token)?;

        let mut snapshot = self.cache.get_or_fetch().await?;
        if !snapshot.ring().contains(&header.kid) {
            tracing::warn!(
                kid = %header.kid,
                generation = snapshot.generation(),
                "signing key not in key ring, refetching"
            );
            snapshot = self.cache.refresh_after(snapshot.generation()).await?;
        }

        let key = snapshot
            .ring()
            .get(&header.kid)
            .ok_or_else(|| AuthError::unknown_signing_key(header.kid.as_str()))?;

        let claims = verify_signature(token, key, &self.config).inspect_err(|e| {
            tracing::debug!(kid = %header.kid, error = %e, "token rejected");
        })?;

        tracing::debug!(kid = %header.kid, "token signature verified");
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::{
        error::InvalidTokenReason,
        keyring::{KeyRing, PublishedKey},
        testutil::{
            RSA_EXPONENT, RSA_MODULUS_A, RSA_PEM_A, RSA_PEM_B, TEST_AUDIENCE, TEST_ISSUER,
            craft_raw_jwt, sign_token, standard_claims, token_for,
        },
    };

    fn key_a() -> DecodingKey {
        let ring = KeyRing::from_keys("memory", [PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        ring.get("a").cloned().expect("key a")
    }

    fn reason(result: Result<Claims>) -> InvalidTokenReason {
        match result {
            Err(AuthError::InvalidToken(reason)) => reason,
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer t.o.k")).unwrap(), "t.o.k");
        assert_eq!(bearer_token(Some("  bearer t.o.k  ")).unwrap(), "t.o.k");
        assert_eq!(bearer_token(Some("t.o.k")).unwrap(), "t.o.k");
        assert!(matches!(bearer_token(Some("")), Err(AuthError::MissingCredential)));
        assert!(matches!(bearer_token(Some("Bearer    ")), Err(AuthError::MissingCredential)));
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredential)));
    }

    #[test]
    fn test_decode_token_header() {
        let header = decode_token_header(&token_for("kid-1", "user-1")).unwrap();
        assert_eq!(header, TokenHeader { alg: "RS256".into(), kid: "kid-1".into() });
    }

    #[test]
    fn test_decode_token_header_structural_failures() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.", "bm90LWpzb24.e30."] {
            assert!(
                matches!(decode_token_header(token), Err(AuthError::MalformedToken(_))),
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_decode_token_header_checks_algorithm_before_kid() {
        let none = craft_raw_jwt(&json!({"alg": "none"}), &json!({"sub": "x"}));
        assert!(matches!(decode_token_header(&none), Err(AuthError::InvalidToken(_))));

        let no_kid = craft_raw_jwt(&json!({"alg": "RS256"}), &json!({"sub": "x"}));
        assert!(matches!(decode_token_header(&no_kid), Err(AuthError::MalformedToken(_))));

        let empty_kid = craft_raw_jwt(&json!({"alg": "RS256", "kid": ""}), &json!({}));
        assert!(matches!(decode_token_header(&empty_kid), Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_verify_signature_accepts_valid_token() {
        let claims =
            verify_signature(&token_for("a", "user-1"), &key_a(), &VerifierConfig::default()).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.iss.as_deref(), Some(TEST_ISSUER));
        assert_eq!(claims.extra.get("token_use"), Some(&json!("id")));
    }

    #[test]
    fn test_verify_signature_rejects_other_key() {
        let token = sign_token(RSA_PEM_B, "a", &standard_claims("user-1"));
        let result = verify_signature(&token, &key_a(), &VerifierConfig::default());
        assert_eq!(reason(result), InvalidTokenReason::BadSignature);
    }

    #[test]
    fn test_verify_signature_expiry_and_leeway() {
        let mut claims = standard_claims("user-1");
        claims["exp"] = json!(Utc::now().timestamp() - 30);
        let token = sign_token(RSA_PEM_A, "a", &claims);

        let strict = verify_signature(&token, &key_a(), &VerifierConfig::default());
        assert_eq!(reason(strict), InvalidTokenReason::Expired);

        let lenient = VerifierConfig::builder().leeway(Duration::from_secs(120)).build();
        assert!(verify_signature(&token, &key_a(), &lenient).is_ok());
    }

    #[test]
    fn test_verify_signature_not_yet_valid() {
        let mut claims = standard_claims("user-1");
        claims["nbf"] = json!(Utc::now().timestamp() + 600);
        let token = sign_token(RSA_PEM_A, "a", &claims);

        let result = verify_signature(&token, &key_a(), &VerifierConfig::default());
        assert_eq!(reason(result), InvalidTokenReason::NotYetValid);
    }

    #[test]
    fn test_verify_signature_issuer_and_audience() {
        let token = token_for("a", "user-1");

        let matching = VerifierConfig::builder().issuer(TEST_ISSUER).audience(TEST_AUDIENCE).build();
        assert!(verify_signature(&token, &key_a(), &matching).is_ok());

        let wrong_issuer = VerifierConfig::builder().issuer("https://elsewhere").build();
        assert_eq!(
            reason(verify_signature(&token, &key_a(), &wrong_issuer)),
            InvalidTokenReason::IssuerMismatch
        );

        let wrong_audience = VerifierConfig::builder().audience("other-app").build();
        assert_eq!(
            reason(verify_signature(&token, &key_a(), &wrong_audience)),
            InvalidTokenReason::AudienceMismatch
        );
    }

    #[test]
    fn test_verify_signature_requires_exp() {
        let token = sign_token(RSA_PEM_A, "a", &json!({"sub": "user-1"}));
        let result = verify_signature(&token, &key_a(), &VerifierConfig::default());
        assert!(matches!(reason(result), InvalidTokenReason::InvalidClaims(_)));
    }

    #[test]
    fn test_require_subject() {
        let claims = Claims { sub: Some("user-1".into()), ..Claims::default() };
        assert_eq!(claims.require_subject().unwrap(), "user-1");

        for sub in [None, Some(String::new()), Some("  ".into())] {
            let claims = Claims { sub, ..Claims::default() };
            assert!(matches!(claims.require_subject(), Err(AuthError::MissingSubject)));
        }
    }
}
