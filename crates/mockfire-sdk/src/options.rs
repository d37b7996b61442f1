use std::path::Path;

use mockfire_database::StagePolicy;
use mockfire_rules::{RulesConfig, Ruleset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SdkError, SdkResult};

/// Client options, as passed to `initialize_app`.
///
/// Recorded for inspection only; nothing connects anywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppOptions {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    #[serde(rename = "databaseURL")]
    pub database_url: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
}

/// Everything needed to stand up one mock app.
///
/// Loadable from TOML or JSON:
///
/// ```toml
/// stage_policy = "commit_on_success"
///
/// [options]
/// databaseURL = "https://demo.firebaseio.com"
///
/// [rules.rules]
/// ".read" = true
///
/// [data.users.ann]
/// name = "Ann"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub options: AppOptions,
    /// A `{"rules": {...}}` document. Fully open when absent.
    pub rules: Option<Value>,
    /// Seed data.
    pub data: Value,
    pub stage_policy: StagePolicy,
    pub evaluator: RulesConfig,
}

impl MockConfig {
    /// Read a config file. `.toml` files are parsed as TOML, anything else
    /// as JSON.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let config_error = |reason: String| SdkError::Config {
            path: path.to_path_buf(),
            reason,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: Self = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&contents).map_err(|e| config_error(e.to_string()))?
        } else {
            serde_json::from_str(&contents).map_err(|e| config_error(e.to_string()))?
        };
        // Surface rule errors at load time rather than at first use.
        config.ruleset()?;

        tracing::debug!(path = %path.display(), "loaded mock config");
        Ok(config)
    }

    pub fn with_options(options: AppOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// The parsed rules, or the open ruleset when none were given.
    pub fn ruleset(&self) -> SdkResult<Ruleset> {
        match &self.rules {
            Some(document) => Ok(Ruleset::from_json(document)?),
            None => Ok(Ruleset::open()),
        }
    }
}
