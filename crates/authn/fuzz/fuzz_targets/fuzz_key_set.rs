//! Structured fuzz target for key set parsing.
//!
//! Uses the `arbitrary` crate to build JWKS-shaped documents with plausible
//! members, so the per-key skip logic is reached rather than only the
//! top-level JSON parser.

#![no_main]

use arbitrary::Arbitrary;
use cloudfiles_authn::KeyRing;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzedKey {
    kid: Option<String>,
    kty: String,
    alg: Option<String>,
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Arbitrary)]
enum FuzzedInput {
    Raw(Vec<u8>),
    Keys(Vec<FuzzedKey>),
}

fuzz_target!(|input: FuzzedInput| {
    let body = match input {
        FuzzedInput::Raw(bytes) => bytes,
        FuzzedInput::Keys(keys) => {
            let keys: Vec<serde_json::Value> = keys
                .into_iter()
                .map(|k| {
                    serde_json::json!({
                        "kid": k.kid, "kty": k.kty, "alg": k.alg, "use": k.key_use, "n": k.n, "e": k.e,
                    })
                })
                .collect();
            serde_json::json!({ "keys": keys }).to_string().into_bytes()
        },
    };

    if let Ok(ring) = KeyRing::from_json("fuzz", &body) {
        for kid in ring.kids() {
            assert!(!kid.is_empty(), "keys without a kid must be skipped");
            assert!(ring.get(kid).is_some());
        }
    }
});
