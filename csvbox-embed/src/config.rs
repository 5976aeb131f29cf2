//! Importer configuration, built in code or read from a TOML file.
//!
//! ```toml
//! [importer]
//! license_key = "abc123"
//! data_location = "eu"
//! language = "de"
//! lazy = true
//!
//! [importer.environment]
//! tenant = "acme"
//!
//! [importer.user]
//! user_id = "42"
//! ```

use crate::error::{EmbedError, EmbedResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// A JSON object with string keys.
pub type JsonMap = Map<String, Value>;

/// Everything the embed needs to know about the importer instance.
///
/// Immutable once a controller is built from it, except `user`, which the
/// controller lets the host replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub license_key: String,
    /// Importer host. Defaults to `app.csvbox.io`.
    pub custom_domain: Option<String>,
    /// Data residency region, prefixed to the host as `<region>-`.
    pub data_location: Option<String>,
    pub language: Option<String>,
    /// Free-form values forwarded to the importer as the `env` query parameter.
    pub environment: Option<JsonMap>,
    /// Customer attributes attached to every import.
    pub user: Option<JsonMap>,
    pub dynamic_columns: Option<JsonMap>,
    /// Importer UI options.
    pub options: Option<JsonMap>,
    /// Defer frame creation until the first open request.
    pub lazy: bool,
}

impl EmbedConfig {
    pub fn new(license_key: impl Into<String>) -> Self {
        Self {
            license_key: license_key.into(),
            ..Default::default()
        }
    }

    pub fn with_custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.custom_domain = Some(domain.into());
        self
    }

    pub fn with_data_location(mut self, region: impl Into<String>) -> Self {
        self.data_location = Some(region.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_environment(mut self, environment: JsonMap) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_user(mut self, user: JsonMap) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_dynamic_columns(mut self, columns: JsonMap) -> Self {
        self.dynamic_columns = Some(columns);
        self
    }

    pub fn with_options(mut self, options: JsonMap) -> Self {
        self.options = Some(options);
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Checks the fields that end up verbatim in the embed URL path.
    ///
    /// Host parts are vetted later by the URL policy.
    pub fn validate(&self) -> EmbedResult<()> {
        if self.license_key.is_empty() {
            return Err(EmbedError::InvalidConfig("license key is required".into()));
        }
        if !self
            .license_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(EmbedError::InvalidConfig(format!(
                "license key '{}' contains characters outside [A-Za-z0-9_-]",
                self.license_key
            )));
        }
        for (name, value) in [
            ("custom_domain", &self.custom_domain),
            ("data_location", &self.data_location),
        ] {
            if value.as_deref() == Some("") {
                return Err(EmbedError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Parses the `[importer]` table of a TOML document.
    pub fn from_toml_str(contents: &str) -> EmbedResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.importer.validate()?;
        Ok(file.importer)
    }

    /// Reads and parses a TOML config file.
    pub fn load_from(path: &Path) -> EmbedResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| EmbedError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded importer config from {:?}", path);
        Ok(config)
    }
}

/// Raw TOML structure of an importer config file.
#[derive(Deserialize)]
struct ConfigFile {
    importer: EmbedConfig,
}
