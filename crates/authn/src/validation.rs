//! Token header policy checks.
//!
//! These checks run on the unverified header, before the key ring is
//! consulted. A forged header therefore never causes a key fetch.
//!
//! # Security
//!
//! - Only RS256 is accepted
//! - `none` and the HMAC family are always rejected, which rules out
//!   algorithm-substitution attacks against the published RSA keys

use crate::error::{AuthError, InvalidTokenReason};

/// Algorithms that are never accepted.
///
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric; a published public key would
///   become the shared secret
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Algorithms accepted for verification.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256"];

/// Maximum accepted length of a `kid` header value, in bytes.
pub const MAX_KID_LENGTH: usize = 256;

/// Validate a token's `alg` header against the RS256-only policy.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] with
/// [`InvalidTokenReason::UnsupportedAlgorithm`] for forbidden or unknown
/// algorithms.
///
/// # Examples
///
/// ```
/// use cloudfiles_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// assert!(validate_algorithm("ES256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.iter().any(|forbidden| forbidden.eq_ignore_ascii_case(alg)) {
        return Err(AuthError::invalid_token(InvalidTokenReason::UnsupportedAlgorithm(format!(
            "'{alg}' is not allowed for security reasons"
        ))));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::invalid_token(InvalidTokenReason::UnsupportedAlgorithm(format!(
            "'{alg}' is not in accepted list (only RS256 is supported)"
        ))));
    }

    Ok(())
}

/// Validate a token's `kid` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the `kid` is empty, longer
/// than [`MAX_KID_LENGTH`], or contains control characters.
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    if kid.is_empty() {
        return Err(AuthError::malformed_token("token header has an empty 'kid'"));
    }
    if kid.len() > MAX_KID_LENGTH {
        return Err(AuthError::malformed_token(format!(
            "'kid' exceeds {MAX_KID_LENGTH} bytes"
        )));
    }
    if kid.chars().any(char::is_control) {
        return Err(AuthError::malformed_token("'kid' contains control characters"));
    }
    Ok(())
}
