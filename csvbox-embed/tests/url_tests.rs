//! Importer URL construction and policy tests.

use csvbox_embed::{
    DEFAULT_DOMAIN, EmbedConfig, EmbedError, EmbedUrl, FRAMEWORK, JsonMap, LIBRARY_VERSION, unescape_env,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn env(value: Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| match pair.split_once('=') {
        Some((key, value)) if key == name => Some(value),
        None if pair == name => Some(""),
        _ => None,
    })
}

// ================================================================
// Fixed shapes
// ================================================================

#[test]
fn minimal_url() {
    let url = EmbedUrl::build(&EmbedConfig::new("abc123")).unwrap();
    assert_eq!(
        url.as_str(),
        format!("https://app.csvbox.io/embed/abc123?library-version={LIBRARY_VERSION}&framework=rust")
    );
    assert_eq!(url.host(), DEFAULT_DOMAIN);
    assert_eq!(FRAMEWORK, "rust");
    assert_eq!(LIBRARY_VERSION, "1.1.16");
}

#[test]
fn full_url_keeps_parameter_order() {
    let config = EmbedConfig::new("abc123")
        .with_custom_domain("import.example.com")
        .with_data_location("eu")
        .with_language("de")
        .with_environment(env(json!({ "tenant": "acme" })));
    let url = EmbedUrl::build(&config).unwrap();

    assert_eq!(
        url.as_str(),
        format!(
            "https://eu-import.example.com/embed/abc123?library-version={LIBRARY_VERSION}\
             &framework=rust&preventRedirect&language=de&env={{\\\"tenant\\\":\\\"acme\\\"}}"
        )
    );
    assert_eq!(url.host(), "eu-import.example.com");
    assert_eq!(url.to_string(), url.as_str());
}

#[test]
fn region_without_custom_domain_prefixes_default() {
    let url = EmbedUrl::build(&EmbedConfig::new("k").with_data_location("ca")).unwrap();
    assert!(url.as_str().starts_with("https://ca-app.csvbox.io/embed/k?"));
    assert_eq!(query_param(url.as_str(), "preventRedirect"), Some(""));
}

#[test]
fn language_without_region() {
    let url = EmbedUrl::build(&EmbedConfig::new("k").with_language("fr")).unwrap();
    assert_eq!(query_param(url.as_str(), "language"), Some("fr"));
    assert_eq!(query_param(url.as_str(), "preventRedirect"), None);
}

#[test]
fn env_escapes_single_quotes_too() {
    let config = EmbedConfig::new("k").with_environment(env(json!({ "name": "o'brien" })));
    let url = EmbedUrl::build(&config).unwrap();
    let raw = query_param(url.as_str(), "env").unwrap();
    assert_eq!(raw, r#"{\"name\":\"o\'brien\"}"#);
    assert_eq!(unescape_env(raw), r#"{"name":"o'brien"}"#);
}

#[test]
fn env_with_hash_and_percent_is_encoded() {
    let config = EmbedConfig::new("k").with_environment(env(json!({ "theme_color": "#ff0000", "ratio": "50%" })));
    let url = EmbedUrl::build(&config).unwrap();
    let raw = query_param(url.as_str(), "env").unwrap();
    assert_eq!(raw, r#"{\"theme_color\":\"%23ff0000\",\"ratio\":\"50%25\"}"#);
    assert!(!url.as_str().contains('#'));
    assert_eq!(unescape_env(raw), r##"{"theme_color":"#ff0000","ratio":"50%"}"##);
}

#[test]
fn env_keeps_insertion_order() {
    let config = EmbedConfig::new("k").with_environment(env(json!({ "zeta": 1, "alpha": 2, "mid": 3 })));
    let url = EmbedUrl::build(&config).unwrap();
    let raw = query_param(url.as_str(), "env").unwrap();
    assert_eq!(unescape_env(raw), r#"{"zeta":1,"alpha":2,"mid":3}"#);
}

#[test]
fn empty_environment_is_still_sent() {
    let config = EmbedConfig::new("k").with_environment(JsonMap::new());
    let url = EmbedUrl::build(&config).unwrap();
    assert_eq!(query_param(url.as_str(), "env"), Some("{}"));
}

// ================================================================
// Policy rejections
// ================================================================

#[test]
fn domain_with_credentials_is_rejected() {
    let config = EmbedConfig::new("k").with_custom_domain("user:pw@evil.com");
    assert!(matches!(EmbedUrl::build(&config), Err(EmbedError::UnsafeUrl { .. })));
}

#[test]
fn domain_with_path_is_rejected() {
    let config = EmbedConfig::new("k").with_custom_domain("evil.com/steal#");
    assert!(matches!(EmbedUrl::build(&config), Err(EmbedError::UnsafeUrl { .. })));
}

#[test]
fn region_that_changes_host_is_rejected() {
    let config = EmbedConfig::new("k").with_data_location("x@evil.com/");
    assert!(matches!(EmbedUrl::build(&config), Err(EmbedError::UnsafeUrl { .. })));
}

#[test]
fn license_key_with_separators_is_rejected() {
    for key in ["../admin", "k?x=1", "k#frag"] {
        assert!(
            matches!(EmbedUrl::build(&EmbedConfig::new(key)), Err(EmbedError::InvalidConfig(_))),
            "{key} accepted"
        );
    }
}

#[test]
fn domain_with_port_is_accepted() {
    let config = EmbedConfig::new("k").with_custom_domain("localhost:8443");
    let url = EmbedUrl::build(&config).unwrap();
    assert_eq!(url.host(), "localhost:8443");
}

#[test]
fn uppercase_domain_is_accepted() {
    let config = EmbedConfig::new("k").with_custom_domain("Import.Example.COM");
    assert!(EmbedUrl::build(&config).is_ok());
}

// ================================================================
// Properties
// ================================================================

fn label() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,10}").unwrap()
}

fn key() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9_-]{1,24}").unwrap()
}

fn env_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::from),
    ]
}

fn env_map() -> impl Strategy<Value = JsonMap> {
    prop::collection::btree_map("[a-z_#%]{1,8}", env_value(), 0..5)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    /// Region set exactly when the host carries the prefix and preventRedirect is sent.
    #[test]
    fn region_controls_prefix_and_redirect(
        license in key(),
        region in prop::option::of(label()),
        domain in prop::option::of((label(), label()).prop_map(|(a, b)| format!("{a}.{b}"))),
    ) {
        let mut config = EmbedConfig::new(license.clone());
        if let Some(d) = &domain {
            config = config.with_custom_domain(d.clone());
        }
        if let Some(r) = &region {
            config = config.with_data_location(r.clone());
        }
        let url = EmbedUrl::build(&config).unwrap();
        let base = domain.clone().unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

        match &region {
            Some(r) => {
                prop_assert_eq!(url.host(), format!("{r}-{base}"));
                prop_assert_eq!(query_param(url.as_str(), "preventRedirect"), Some(""));
            }
            None => {
                prop_assert_eq!(url.host(), base.as_str());
                prop_assert_eq!(query_param(url.as_str(), "preventRedirect"), None);
            }
        }
        let expected_prefix = format!("https://{}/embed/{}?", url.host(), license);
        prop_assert!(url.as_str().starts_with(&expected_prefix));
    }

    /// The env parameter unescapes back to the serialized environment.
    #[test]
    fn env_round_trips(environment in env_map()) {
        let config = EmbedConfig::new("k").with_environment(environment.clone());
        let url = EmbedUrl::build(&config).unwrap();
        let (_, raw) = url.as_str().split_once("&env=").unwrap();
        let decoded: JsonMap = serde_json::from_str(&unescape_env(raw)).unwrap();
        prop_assert_eq!(decoded, environment);
    }
}
