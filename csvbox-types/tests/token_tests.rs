use csvbox_types::{Error, SessionToken};
use std::collections::HashSet;
use std::str::FromStr;

// ── SessionToken ──────────────────────────────────────────────────

#[test]
fn generated_tokens_are_unique() {
    let tokens: HashSet<SessionToken> = (0..256).map(|_| SessionToken::generate()).collect();
    assert_eq!(tokens.len(), 256);
}

#[test]
fn generated_token_is_alphanumeric() {
    let token = SessionToken::generate();
    assert_eq!(token.as_str().len(), 32);
    assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn display_and_parse_roundtrip() {
    let token = SessionToken::generate();
    let parsed = SessionToken::parse(&token.to_string()).unwrap();
    assert_eq!(token, parsed);
}

#[test]
fn from_str_accepts_plain_token() {
    let token = SessionToken::from_str("abc123").unwrap();
    assert_eq!(token.as_str(), "abc123");
}

#[test]
fn parse_rejects_empty() {
    assert!(matches!(SessionToken::parse(""), Err(Error::InvalidToken(_))));
}

#[test]
fn parse_rejects_markup() {
    assert!(SessionToken::parse("abc\"><script>").is_err());
    assert!(SessionToken::parse("with-dash").is_err());
}

#[test]
fn matches_is_exact() {
    let token = SessionToken::parse("tok123").unwrap();
    assert!(token.matches("tok123"));
    assert!(!token.matches("tok1234"));
    assert!(!token.matches("TOK123"));
    assert!(!token.matches(""));
}

#[test]
fn holder_id_embeds_token() {
    let token = SessionToken::parse("tok123").unwrap();
    assert_eq!(token.holder_id(), "csvbox-embed-tok123");
}

#[test]
fn serde_is_transparent() {
    let token = SessionToken::parse("tok123").unwrap();
    let json = serde_json::to_string(&token).unwrap();
    assert_eq!(json, "\"tok123\"");
    let back: SessionToken = serde_json::from_str(&json).unwrap();
    assert_eq!(back, token);
}

#[test]
fn default_is_fresh() {
    assert_ne!(SessionToken::default(), SessionToken::default());
}

mod parse_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn alphanumeric_tokens_parse_verbatim(s in "[A-Za-z0-9]{1,40}") {
            let token = SessionToken::parse(&s).unwrap();
            prop_assert_eq!(token.as_str(), s.as_str());
            prop_assert_eq!(token.holder_id(), format!("csvbox-embed-{s}"));
        }

        #[test]
        fn any_non_alphanumeric_char_is_rejected(
            prefix in "[a-z0-9]{0,8}",
            bad in "[^A-Za-z0-9]",
            suffix in "[a-z0-9]{0,8}",
        ) {
            let candidate = format!("{prefix}{bad}{suffix}");
            prop_assert!(SessionToken::parse(&candidate).is_err());
        }
    }
}
