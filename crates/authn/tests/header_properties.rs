//! Property tests for bearer extraction and header policy checks.
#![allow(clippy::expect_used, clippy::panic)]

use cloudfiles_authn::{
    AuthError,
    jwt::{bearer_token, decode_token_header},
    testutil::craft_raw_jwt,
    validation::{MAX_KID_LENGTH, validate_kid},
};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn bearer_prefix_is_optional(token in "[A-Za-z0-9_.-]{1,64}") {
        let with_scheme = format!("Bearer {token}");
        prop_assert_eq!(bearer_token(Some(&with_scheme)).expect("with scheme"), token.as_str());
        prop_assert_eq!(bearer_token(Some(&token)).expect("bare"), token.as_str());
    }

    #[test]
    fn header_accepted_iff_kid_valid(kid in any::<String>()) {
        let token = craft_raw_jwt(&json!({"alg": "RS256", "kid": &kid}), &json!({}));
        let result = decode_token_header(&token);

        if validate_kid(&kid).is_ok() {
            let header = result.expect("valid kid accepted");
            prop_assert_eq!(header.kid, kid);
        } else {
            prop_assert!(matches!(result, Err(AuthError::MalformedToken(_))));
        }
    }

    #[test]
    fn printable_kids_within_limit_are_accepted(kid in "[ -~]{1,256}") {
        prop_assert!(kid.len() <= MAX_KID_LENGTH);
        prop_assert!(validate_kid(&kid).is_ok());
    }

    #[test]
    fn non_rs256_algorithms_never_pass(alg in "[A-Za-z0-9]{0,8}") {
        prop_assume!(alg != "RS256");
        let token = craft_raw_jwt(&json!({"alg": alg, "kid": "k1"}), &json!({}));
        prop_assert!(matches!(decode_token_header(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn arbitrary_input_never_panics(input in any::<String>()) {
        let _ = decode_token_header(&input);
        let _ = bearer_token(Some(&input));
    }
}
