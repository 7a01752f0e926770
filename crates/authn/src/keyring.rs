//! The verification key set published by the token issuer.
//!
//! A [`KeyRing`] is an immutable snapshot of one fetch of the issuer's JSON
//! Web Key Set. It is never mutated after construction: a newer key set
//! replaces the whole value in [`KeyRingCache`](crate::KeyRingCache).
//!
//! Keys that cannot be used for RS256 verification (other key types, keys
//! published for encryption, keys without a `kid`) are skipped with a
//! warning rather than failing the whole set.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// One entry of a published JSON Web Key Set.
///
/// Only the members needed for RSA signature keys are modelled; unknown
/// members are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedKey {
    /// Key identifier matched against a token's `kid` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Key type, `RSA` for usable keys.
    pub kty: String,
    /// Intended algorithm, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Intended use, `sig` for signature keys.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url without padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url without padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl PublishedKey {
    /// An RS256 signature key with the given modulus and exponent.
    #[must_use]
    pub fn rsa(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kid: Some(kid.into()),
            kty: "RSA".to_owned(),
            alg: Some("RS256".to_owned()),
            key_use: Some("sig".to_owned()),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }

    fn decoding_key(&self) -> std::result::Result<(String, DecodingKey), String> {
        let kid = self.kid.clone().filter(|kid| !kid.is_empty()).ok_or("missing kid")?;
        if self.kty != "RSA" {
            return Err(format!("unsupported key type '{}'", self.kty));
        }
        if let Some(key_use) = &self.key_use
            && key_use != "sig"
        {
            return Err(format!("key published for '{key_use}', not signatures"));
        }
        if let Some(alg) = &self.alg
            && alg != "RS256"
        {
            return Err(format!("key published for algorithm '{alg}'"));
        }
        let n = self.n.as_deref().ok_or("missing RSA modulus")?;
        let e = self.e.as_deref().ok_or("missing RSA exponent")?;
        let key = DecodingKey::from_rsa_components(n, e).map_err(|err| err.to_string())?;
        Ok((kid, key))
    }
}

/// Wire shape of a key set document. Entries stay untyped so a single odd
/// entry does not reject the whole document.
#[derive(Deserialize)]
struct KeySetDocument {
    keys: Vec<serde_json::Value>,
}

/// An immutable set of verification keys indexed by `kid`.
#[derive(Clone)]
pub struct KeyRing {
    keys: HashMap<String, DecodingKey>,
    source: String,
    fetched_at: DateTime<Utc>,
}

impl KeyRing {
    /// Builds a key ring from published keys, skipping unusable entries.
    pub fn from_keys(source: impl Into<String>, keys: impl IntoIterator<Item = PublishedKey>) -> Self {
        let source = source.into();
        let mut ring = HashMap::new();
        for key in keys {
            match key.decoding_key() {
                Ok((kid, decoding_key)) => {
                    if ring.insert(kid.clone(), decoding_key).is_some() {
                        tracing::warn!(%source, %kid, "duplicate kid in key set, keeping the last");
                    }
                },
                Err(reason) => {
                    tracing::warn!(%source, kid = ?key.kid, %reason, "skipping unusable key");
                },
            }
        }
        Self { keys: ring, source, fetched_at: Utc::now() }
    }

    /// Parses a JSON Web Key Set document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyRingUnavailable`] if the document is not a
    /// JSON object with a `keys` array.
    pub fn from_json(source: impl Into<String>, body: &[u8]) -> Result<Self> {
        let source = source.into();
        let document: KeySetDocument = serde_json::from_slice(body).map_err(|err| {
            AuthError::key_ring_unavailable_with_source(
                format!("invalid key set document from {source}"),
                err,
            )
        })?;

        let keys = document.keys.into_iter().filter_map(|value| {
            serde_json::from_value::<PublishedKey>(value)
                .inspect_err(|err| {
                    tracing::warn!(%source, error = %err, "skipping unparseable key set entry");
                })
                .ok()
        });
        Ok(Self::from_keys(source.clone(), keys))
    }

    /// Looks up the key for `kid`.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    /// Returns `true` if the ring holds a key for `kid`.
    #[must_use]
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no usable key was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key identifiers in the ring, in no particular order.
    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Where the key set was fetched from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// When the key set was fetched.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&str> = self.kids().collect();
        kids.sort_unstable();
        f.debug_struct("KeyRing")
            .field("source", &self.source)
            .field("kids", &kids)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}
