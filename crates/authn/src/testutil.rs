//! Shared test utilities for token verification testing.
//!
//! This module provides two fixed RSA key pairs (private PEMs plus the
//! matching published moduli), helpers for signing RS256 tokens, crafting
//! raw tokens for attack testing, and an assertion macro for
//! [`AuthError`](crate::error::AuthError) variants. It is feature-gated
//! behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! cloudfiles-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use cloudfiles_authn::testutil::{RSA_PEM_A, RSA_MODULUS_A, published_key_a, sign_token};
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

use crate::{
    cache::KeyRingCache, config::VerifierConfig, jwt::TokenVerifier, keyring::PublishedKey,
    source::MemoryKeyRingSource,
};

/// Private key A, PKCS#1 PEM.
pub const RSA_PEM_A: &str = include_str!("../testdata/rsa_key_a.pem");

/// Private key B, PKCS#1 PEM.
pub const RSA_PEM_B: &str = include_str!("../testdata/rsa_key_b.pem");

/// Base64url modulus of key A.
pub const RSA_MODULUS_A: &str = "zPcq4dJEKeU0xSNBzXmfVc6FXgdZROZX4h2VceS1NhqhBbVQ7-cmvV44XL5TQ4Db-vhym4SNaF4ENknv1dR6M6vKVw5yVvV94D4gPQptAN85RwwkOmMdD6O-ePqu0vzza_Fw0dalM5sAgJJ18cCJSFg2vLLeRvIrz9ZrVK61eIpf6wAhxKpT8ZWMdKol4FzaXxHdKFRQV4p3iSt3mmvsDdFqteIalNJnTV0HIqKF1Lk-VRJ-OJrmq5HB7nLVLY13MklosHbaKQcjO9VYn3da6z98gqybuei-5JHmUUYc2Il2Nk4gQGdTrVdMpndkBC7wifxwXePmfet_5pAXE1Kf1Q";

/// Base64url modulus of key B.
pub const RSA_MODULUS_B: &str = "kmexKkO2jLfMmc9KuRWyuLpQCooV_uw0OBYtbBfy5bV5OQfroDIpkHXfW1vjWJM4FFC7FP-YRspbu1XOllGdOg4eBnTKnyIAc8H_DM0AwSXU_5JexD5Q3klfDiQ-c8eDgWHo6KsshV_JoWBE9rAIdMdnvMoNVkMm_Ayla7BTwT00DybhF8h7vfeRFPhK8VrV8hKqIAK4FmarY-oG6Ibdmw2MFa_YF0DyGiieHU__sV0NDOILXjcbGG1TchXKG-xU1K-ZeCoOfHxrDew7J81hI398K_vufFVlmlexm1sGYXhgTEg7IrSmr4DaQPSXEKna6GZPZNub4qPDSiG0R9g4dQ";

/// Public exponent shared by both keys (65537).
pub const RSA_EXPONENT: &str = "AQAB";

/// Issuer placed in tokens built by [`standard_claims`].
pub const TEST_ISSUER: &str = "https://issuer.cloudfiles.test";

/// Audience placed in tokens built by [`standard_claims`].
pub const TEST_AUDIENCE: &str = "cloudfiles-web";

/// Published form of key A under `kid`.
#[must_use]
pub fn published_key_a(kid: &str) -> PublishedKey {
    PublishedKey::rsa(kid, RSA_MODULUS_A, RSA_EXPONENT)
}

/// Published form of key B under `kid`.
#[must_use]
pub fn published_key_b(kid: &str) -> PublishedKey {
    PublishedKey::rsa(kid, RSA_MODULUS_B, RSA_EXPONENT)
}

/// Claims for `sub` valid for one hour, with the test issuer and audience.
#[must_use]
pub fn standard_claims(sub: &str) -> serde_json::Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "sub": sub,
        "iat": now,
        "exp": now + 3600,
        "token_use": "id",
    })
}

/// Signs `claims` with RS256 using the PKCS#1 `pem`, setting `kid`.
///
/// # Panics
///
/// Panics if the PEM is invalid or encoding fails.
pub fn sign_token(pem: &str, kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());

    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("invalid test RSA PEM");
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("Failed to encode test JWT")
}

/// A one-hour token for `sub` signed with key A under `kid`.
pub fn token_for(kid: &str, sub: &str) -> String {
    sign_token(RSA_PEM_A, kid, &standard_claims(sub))
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The resulting JWT has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature, for testing rejection of forged headers
/// (e.g., `alg: "none"`, algorithm confusion).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// A verifier over an in-memory source publishing `keys`.
///
/// Returns the source too, so tests can rotate keys and count fetches.
#[must_use]
pub fn memory_verifier(
    keys: Vec<PublishedKey>,
    config: VerifierConfig,
) -> (Arc<MemoryKeyRingSource>, TokenVerifier) {
    let source = Arc::new(MemoryKeyRingSource::new(keys));
    let cache = Arc::new(KeyRingCache::new(source.clone()));
    (source, TokenVerifier::new(cache, config))
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given [`AuthError`] variant.
///
/// Works with any `AuthError` variant. On failure, prints the expected variant
/// and the actual result for debugging.
///
/// [`AuthError`]: crate::error::AuthError
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use cloudfiles_authn::assert_auth_error;
/// use cloudfiles_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::unknown_signing_key("k1"));
/// assert_auth_error!(result, UnknownSigningKey);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
