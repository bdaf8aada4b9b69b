//! Client configuration loaded from the environment, and the endpoint URLs derived from it.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::ConfigurationError;

pub const DELIVERY_HOST: &str = "cdn.contentful.com";
pub const PREVIEW_HOST: &str = "preview.contentful.com";

fn default_environment() -> String {
    "master".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for one space environment.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub space_id: String,
    pub access_token: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Talk to the preview API; unpublished content is visible but sync is unavailable.
    #[serde(default)]
    pub preview: bool,
    /// Base URL overriding the public host, e.g. a proxy or a local test server.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Projection locale for decoded resources; `None` uses the space default.
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("space_id", &self.space_id)
            .field("access_token", &"<redacted>")
            .field("environment", &self.environment)
            .field("preview", &self.preview)
            .field("api_url", &self.api_url)
            .field("locale", &self.locale)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(space_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            access_token: access_token.into(),
            environment: default_environment(),
            preview: false,
            api_url: None,
            locale: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Reads the configuration from `CDA_*` environment variables, loading `.env` first
    /// if present.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();

        let space_id = required("CDA_SPACE_ID")?;
        let access_token = required("CDA_ACCESS_TOKEN")?;
        let mut config = Self::new(space_id, access_token);

        if let Some(environment) = optional("CDA_ENVIRONMENT") {
            config.environment = environment;
        }
        if let Some(preview) = optional("CDA_PREVIEW") {
            config.preview = parse_bool("CDA_PREVIEW", &preview)?;
        }
        config.api_url = optional("CDA_API_URL");
        config.locale = optional("CDA_LOCALE");
        if let Some(timeout) = optional("CDA_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse::<u64>().map_err(|e| {
                error!(error = ?e, value = %timeout, "CDA_TIMEOUT_SECS must be a whole number of seconds");
                ConfigurationError::InvalidSetting {
                    name: "CDA_TIMEOUT_SECS".into(),
                    value: timeout.clone(),
                }
            })?;
        }

        config.trace_loaded();
        Ok(config)
    }

    pub fn trace_loaded(&self) {
        info!(
            space_id = %self.space_id,
            environment = %self.environment,
            preview = self.preview,
            base_url = %self.base_url(),
            locale = self.locale.as_deref().unwrap_or("<default>"),
            "Loaded ClientConfig"
        );
        debug!(?self, "ClientConfig loaded (full debug)");
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Scheme and host every endpoint hangs off, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.preview => format!("https://{PREVIEW_HOST}"),
            None => format!("https://{DELIVERY_HOST}"),
        }
    }

    pub fn environment_url(&self) -> String {
        format!(
            "{}/spaces/{}/environments/{}",
            self.base_url(),
            self.space_id,
            self.environment
        )
    }

    pub fn sync_url(&self) -> String {
        format!("{}/sync", self.environment_url())
    }

    pub fn entries_url(&self) -> String {
        format!("{}/entries", self.environment_url())
    }

    pub fn assets_url(&self) -> String {
        format!("{}/assets", self.environment_url())
    }

    pub fn content_types_url(&self) -> String {
        format!("{}/content_types", self.environment_url())
    }

    pub fn locales_url(&self) -> String {
        format!("{}/locales", self.environment_url())
    }
}

fn required(name: &str) -> Result<String, ConfigurationError> {
    match optional(name) {
        Some(value) => Ok(value),
        None => {
            error!(var = name, "Required environment variable not set");
            Err(ConfigurationError::MissingSetting(name.to_string()))
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::InvalidSetting {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
