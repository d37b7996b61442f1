use std::sync::Arc;

use mockfire_auth::{Auth, Unsubscribe};
use mockfire_database::{DataEngine, Database};
use mockfire_rules::RulesEvaluator;

use crate::error::SdkResult;
use crate::options::{AppOptions, MockConfig};

/// One mock app: an identity store and a database bound to it.
#[derive(Debug)]
pub struct App {
    name: String,
    options: AppOptions,
    auth: Auth,
    database: Database,
    binding: Unsubscribe,
}

impl App {
    /// Build an app from `config`. The database follows the app's auth.
    pub fn new(name: impl Into<String>, config: MockConfig) -> SdkResult<Self> {
        let name = name.into();
        let evaluator = RulesEvaluator::with_default_stages(config.evaluator.clone());
        let engine = DataEngine::new(
            Arc::new(evaluator),
            config.ruleset()?,
            config.data,
            config.stage_policy,
        )?;
        let auth = Auth::new();
        let binding = engine.bind_auth(&auth);

        tracing::info!(app = %name, policy = ?config.stage_policy, "app initialized");
        Ok(Self {
            name,
            options: config.options,
            auth,
            database: Database::new(engine),
            binding,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Detach the database from auth and complete every auth observer.
    pub(crate) fn shut_down(&self) {
        self.binding.unsubscribe();
        self.auth.shutdown();
        tracing::info!(app = %self.name, "app deleted");
    }
}
