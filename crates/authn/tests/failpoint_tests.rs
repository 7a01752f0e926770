#![cfg(feature = "failpoints")]
#![allow(clippy::expect_used, clippy::panic)]
//! Integration tests for fail-point injection in the authn crate.
//!
//! These tests require both `failpoints` and `testutil` features:
//! ```bash
//! cargo test -p cloudfiles-authn --features failpoints,testutil --test failpoint_tests
//! ```

use std::sync::Arc;

use cloudfiles_authn::{
    KeyRingCache, MemoryKeyRingSource, TokenVerifier, VerifierConfig, assert_auth_error,
    testutil::{published_key_a, token_for},
};

const FAIL_POINT: &str = "keyring-before-fetch";

fn setup() -> (Arc<MemoryKeyRingSource>, TokenVerifier) {
    let source = Arc::new(MemoryKeyRingSource::new(vec![published_key_a("fp-test-key")]));
    let cache = Arc::new(KeyRingCache::new(source.clone()));
    (source, TokenVerifier::new(cache, VerifierConfig::default()))
}

#[tokio::test]
async fn keyring_fetch_failpoint_returns_unavailable() {
    let scenario = fail::FailScenario::setup();
    let (source, verifier) = setup();

    fail::cfg(FAIL_POINT, "return").expect("failed to configure fail point");

    let result = verifier.verify(&token_for("fp-test-key", "user-1")).await;
    assert_auth_error!(result, KeyRingUnavailable, "fetch should fail when fail point is active");
    assert!(!verifier.cache().is_populated());
    assert_eq!(source.fetch_count(), 0, "the source is never reached");

    scenario.teardown();
}

#[tokio::test]
async fn keyring_fetch_failpoint_clears_warm_cache_on_refetch() {
    let scenario = fail::FailScenario::setup();
    let (_, verifier) = setup();
    verifier.verify(&token_for("fp-test-key", "user-1")).await.expect("warm the cache");

    fail::cfg(FAIL_POINT, "return").expect("failed to configure fail point");
    let result = verifier.verify(&token_for("rotated-key", "user-1")).await;
    assert_auth_error!(result, KeyRingUnavailable);
    assert!(!verifier.cache().is_populated());

    fail::remove(FAIL_POINT);
    assert!(verifier.verify(&token_for("fp-test-key", "user-1")).await.is_ok());

    scenario.teardown();
}

#[tokio::test]
async fn keyring_fetch_without_failpoint_succeeds() {
    let scenario = fail::FailScenario::setup();
    let (source, verifier) = setup();

    let result = verifier.verify(&token_for("fp-test-key", "user-1")).await;
    assert!(result.is_ok(), "fetch should succeed without fail point");
    assert_eq!(source.fetch_count(), 1);

    scenario.teardown();
}
