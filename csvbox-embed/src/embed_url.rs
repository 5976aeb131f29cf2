//! Importer URL construction and the resource-URL policy it must pass.
//!
//! The URL is assembled as a plain string, in a fixed parameter order, then
//! re-parsed and checked before anything is allowed to load it:
//!
//! ```text
//! https://[{region}-]{domain}/embed/{license}?library-version={v}&framework=rust
//!     [&preventRedirect][&language={lang}][&env={json, quotes backslash-escaped, % and # percent-encoded}]
//! ```

use crate::config::EmbedConfig;
use crate::error::{EmbedError, EmbedResult};
use tracing::debug;
use url::Url;

/// Importer host used when no custom domain is configured.
pub const DEFAULT_DOMAIN: &str = "app.csvbox.io";

/// Reported to the importer as `library-version`.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reported to the importer as `framework`.
pub const FRAMEWORK: &str = "rust";

/// A vetted importer URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedUrl {
    url: String,
    host: String,
}

impl EmbedUrl {
    /// Builds the URL for `config` and checks it against the resource policy.
    pub fn build(config: &EmbedConfig) -> EmbedResult<Self> {
        config.validate()?;
        let host = host_for(config);
        let url = assemble(config, &host)?;
        check_policy(&url, &host, &config.license_key)?;
        debug!(host = %host, "Built importer URL");
        Ok(Self { url, host })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// `{region}-{domain}` or `{domain}`.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Display for EmbedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Prefixes every `"` and `'` with a backslash. `%` and `#` become `%25`
/// and `%23` so the value can never open a fragment.
pub fn escape_env(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '"' | '\'' => {
                out.push('\\');
                out.push(c);
            }
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// Exact inverse of [`escape_env`].
pub fn unescape_env(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '\\' if rest.starts_with(['"', '\'']) => {}
            '%' if rest.starts_with("25") => {
                out.push('%');
                rest = &rest[2..];
            }
            '%' if rest.starts_with("23") => {
                out.push('#');
                rest = &rest[2..];
            }
            _ => out.push(c),
        }
    }
    out
}

fn host_for(config: &EmbedConfig) -> String {
    let domain = config.custom_domain.as_deref().unwrap_or(DEFAULT_DOMAIN);
    match config.data_location.as_deref() {
        Some(region) => format!("{region}-{domain}"),
        None => domain.to_string(),
    }
}

fn assemble(config: &EmbedConfig, host: &str) -> EmbedResult<String> {
    let mut url = format!("https://{host}/embed/{}", config.license_key);
    url.push_str(&format!("?library-version={LIBRARY_VERSION}"));
    url.push_str(&format!("&framework={FRAMEWORK}"));
    if config.data_location.is_some() {
        url.push_str("&preventRedirect");
    }
    if let Some(language) = &config.language {
        url.push_str(&format!("&language={language}"));
    }
    if let Some(environment) = &config.environment {
        let json = serde_json::to_string(environment)?;
        url.push_str(&format!("&env={}", escape_env(&json)));
    }
    Ok(url)
}

fn check_policy(raw: &str, expected_host: &str, license_key: &str) -> EmbedResult<()> {
    let reject = |reason: String| EmbedError::UnsafeUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(raw).map_err(|e| reject(format!("does not parse: {e}")))?;
    if parsed.scheme() != "https" {
        return Err(reject(format!("scheme '{}' is not https", parsed.scheme())));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(reject("credentials are not allowed".into()));
    }

    let authority = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(reject("missing host".into())),
    };
    if !authority.eq_ignore_ascii_case(expected_host) {
        return Err(reject(format!(
            "host resolves to '{authority}', expected '{expected_host}'"
        )));
    }

    let expected_path = format!("/embed/{license_key}");
    if parsed.path() != expected_path {
        return Err(reject(format!("path resolves to '{}'", parsed.path())));
    }
    if parsed.fragment().is_some() {
        return Err(reject("fragments are not allowed".into()));
    }
    Ok(())
}
