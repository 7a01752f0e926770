//! Fuzz target for bearer extraction and token header decoding.
//!
//! Feeds arbitrary strings through [`bearer_token`] and
//! [`decode_token_header`]. Every result must be either `Ok(...)` or
//! `Err(AuthError)`, and a decoded header must satisfy the algorithm and
//! `kid` policy.

#![no_main]

use cloudfiles_authn::{
    AuthError,
    jwt::{bearer_token, decode_token_header},
    validation::MAX_KID_LENGTH,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8; header values are always strings
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let token = match bearer_token(Some(input)) {
        Ok(token) => token,
        Err(AuthError::MissingCredential) => return,
        Err(other) => panic!("bearer_token returned unexpected error: {other:?}"),
    };

    if let Ok(header) = decode_token_header(token) {
        assert_eq!(header.alg, "RS256", "only RS256 may pass header checks");
        assert!(!header.kid.is_empty());
        assert!(header.kid.len() <= MAX_KID_LENGTH);
        assert!(!header.kid.chars().any(char::is_control));
    }
});
