//! Authentication error types.
//!
//! This module defines the errors a bearer token can fail with on its way to
//! becoming a caller identity, plus configuration errors for the key ring.
//! Every variant is terminal for the current request.

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Why a structurally sound token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidTokenReason {
    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// The `nbf` claim is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// The signature does not verify against the selected key.
    #[error("invalid signature")]
    BadSignature,

    /// The header names an algorithm other than RS256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The `iss` claim does not match the configured issuer.
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// The `aud` claim does not match the configured audience.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// Claims are missing or have the wrong shape.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// The selected key could not be used for verification.
    #[error("unusable key: {0}")]
    UnusableKey(String),
}

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("Missing bearer credential")]
    MissingCredential,

    /// The token's header could not be decoded, or carries no usable `kid`.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The key ring could not be fetched from the key-publishing endpoint.
    #[error("Key ring unavailable: {message}")]
    KeyRingUnavailable {
        /// Description of the fetch failure.
        message: String,
        /// The underlying transport or decoding error.
        #[source]
        source: Option<BoxError>,
    },

    /// The token's `kid` is absent from the key ring, even after a refetch.
    #[error("Unknown signing key: {kid}")]
    UnknownSigningKey {
        /// Key ID that was not found.
        kid: String,
    },

    /// The token was rejected during verification.
    #[error("Invalid token: {0}")]
    InvalidToken(#[source] InvalidTokenReason),

    /// The verified token carries no `sub` claim.
    #[error("Token has no subject claim")]
    MissingSubject,

    /// Key ring or verifier configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// Creates a `MissingCredential` error.
    #[must_use]
    pub fn missing_credential() -> Self {
        Self::MissingCredential
    }

    /// Creates a `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }

    /// Creates a `KeyRingUnavailable` error without a source.
    #[must_use]
    pub fn key_ring_unavailable(message: impl Into<String>) -> Self {
        Self::KeyRingUnavailable { message: message.into(), source: None }
    }

    /// Creates a `KeyRingUnavailable` error with a message and source error.
    #[must_use]
    pub fn key_ring_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::KeyRingUnavailable { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates an `UnknownSigningKey` error.
    #[must_use]
    pub fn unknown_signing_key(kid: impl Into<String>) -> Self {
        Self::UnknownSigningKey { kid: kid.into() }
    }

    /// Creates an `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(reason: InvalidTokenReason) -> Self {
        Self::InvalidToken(reason)
    }

    /// Creates a `MissingSubject` error.
    #[must_use]
    pub fn missing_subject() -> Self {
        Self::MissingSubject
    }

    /// Creates an `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => {
                AuthError::malformed_token(format!("failed to decode token: {err}"))
            },
            ErrorKind::InvalidSignature | ErrorKind::Crypto(_) => {
                AuthError::invalid_token(InvalidTokenReason::BadSignature)
            },
            ErrorKind::ExpiredSignature => AuthError::invalid_token(InvalidTokenReason::Expired),
            ErrorKind::ImmatureSignature => {
                AuthError::invalid_token(InvalidTokenReason::NotYetValid)
            },
            ErrorKind::InvalidIssuer => AuthError::invalid_token(InvalidTokenReason::IssuerMismatch),
            ErrorKind::InvalidAudience => {
                AuthError::invalid_token(InvalidTokenReason::AudienceMismatch)
            },
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::invalid_token(
                InvalidTokenReason::UnsupportedAlgorithm("algorithm does not match key".into()),
            ),
            ErrorKind::MissingRequiredClaim(claim) => AuthError::invalid_token(
                InvalidTokenReason::InvalidClaims(format!("missing required claim '{claim}'")),
            ),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey => {
                AuthError::invalid_token(InvalidTokenReason::UnusableKey(err.to_string()))
            },
            _ => AuthError::invalid_token(InvalidTokenReason::InvalidClaims(err.to_string())),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::error::Error;

    use jsonwebtoken::errors::ErrorKind;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::missing_credential().to_string(), "Missing bearer credential");
        assert_eq!(
            AuthError::unknown_signing_key("key-123").to_string(),
            "Unknown signing key: key-123"
        );
        assert_eq!(
            AuthError::invalid_token(InvalidTokenReason::Expired).to_string(),
            "Invalid token: token expired"
        );
        assert_eq!(AuthError::missing_subject().to_string(), "Token has no subject claim");
    }

    #[test]
    fn test_error_from_jsonwebtoken() {
        let cases = [
            (ErrorKind::ExpiredSignature, InvalidTokenReason::Expired),
            (ErrorKind::ImmatureSignature, InvalidTokenReason::NotYetValid),
            (ErrorKind::InvalidSignature, InvalidTokenReason::BadSignature),
            (ErrorKind::InvalidIssuer, InvalidTokenReason::IssuerMismatch),
            (ErrorKind::InvalidAudience, InvalidTokenReason::AudienceMismatch),
        ];
        for (kind, expected) in cases {
            let auth_err: AuthError = jsonwebtoken::errors::Error::from(kind).into();
            assert!(
                matches!(auth_err, AuthError::InvalidToken(ref reason) if *reason == expected),
                "expected {expected:?}, got {auth_err:?}"
            );
        }
    }

    #[test]
    fn test_structural_errors_are_malformed() {
        let auth_err: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into();
        assert!(matches!(auth_err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn test_invalid_token_exposes_reason_as_source() {
        let err = AuthError::invalid_token(InvalidTokenReason::BadSignature);
        let source = err.source().expect("reason is the source");
        assert_eq!(source.to_string(), "invalid signature");
    }

    #[test]
    fn test_key_ring_unavailable_preserves_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed");
        let err = AuthError::key_ring_unavailable_with_source("fetch failed", io);

        assert_eq!(err.to_string(), "Key ring unavailable: fetch failed");
        let source = err.source().expect("source chain must be preserved");
        assert_eq!(source.to_string(), "deadline elapsed");
    }
}
