//! # Cloudfiles Authentication
//!
//! Bearer token verification against an issuer's rotating published key set.
//!
//! This crate provides:
//! - **Token verification**: two-step header inspection then RS256 signature and claim checks,
//!   yielding the token subject as the caller identity
//! - **Key ring cache**: a lazily fetched, whole-value-replaced set of verification keys that is
//!   refetched once when a token names an unknown `kid`
//! - **Key ring sources**: HTTP(S) JSON Web Key Set endpoints and an in-memory source
//! - **Algorithm validation**: `none` and HMAC algorithms are rejected before any key lookup
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudfiles_authn::{
//!     HttpKeyRingSource, KeyRingCache, KeyRingConfig, TokenVerifier, VerifierConfig,
//! };
//!
//! # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = KeyRingConfig::builder()
//!     .jwks_url("https://auth.example.com/.well-known/jwks.json")
//!     .build()?;
//! let cache = Arc::new(KeyRingCache::new(Arc::new(HttpKeyRingSource::new(config)?)));
//! let verifier = TokenVerifier::new(cache, VerifierConfig::default());
//!
//! let owner = verifier.verify(token).await?;
//! println!("verified caller: {owner}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`testutil`**: RSA fixtures, token signing helpers and the `assert_auth_error!` macro.
//! - **`failpoints`**: Enables the `keyring-before-fetch` fail point for fault injection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Process-wide key ring cache.
pub mod cache;
/// Key ring and verifier configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Token decoding and verification.
pub mod jwt;
/// Published verification keys.
pub mod keyring;
/// Key ring sources.
pub mod source;
/// Shared fixtures and assertion macros for tests.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
/// Algorithm validation.
pub mod validation;

// Re-export key types for convenience
pub use cache::{KeyRingCache, KeyRingSnapshot};
pub use config::{KeyRingConfig, VerifierConfig};
pub use error::{AuthError, InvalidTokenReason, Result};
pub use jwt::{Claims, TokenHeader, TokenVerifier, bearer_token};
pub use keyring::{KeyRing, PublishedKey};
pub use source::{HttpKeyRingSource, KeyRingSource, MemoryKeyRingSource};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
