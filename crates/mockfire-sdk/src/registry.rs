use std::sync::{Arc, RwLock};

use mockfire_auth::Auth;
use mockfire_database::Database;

use crate::app::App;
use crate::error::{SdkError, SdkResult};
use crate::options::{AppOptions, MockConfig};

/// Name given to an app initialized without one.
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// A caller-owned set of apps, in registration order.
///
/// The first registered app is the default one: [`AppRegistry::auth`] and
/// [`AppRegistry::database`] use it.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: RwLock<Vec<Arc<App>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an app with open rules and no data. `name` defaults to
    /// [`DEFAULT_APP_NAME`].
    pub fn initialize_app(&self, options: AppOptions, name: Option<&str>) -> SdkResult<Arc<App>> {
        self.initialize_app_with(MockConfig::with_options(options), name)
    }

    /// Register an app built from a full [`MockConfig`].
    pub fn initialize_app_with(
        &self,
        config: MockConfig,
        name: Option<&str>,
    ) -> SdkResult<Arc<App>> {
        let name = name.unwrap_or(DEFAULT_APP_NAME);
        let mut apps = self
            .apps
            .write()
            .map_err(|e| SdkError::Internal(format!("lock poisoned: {e}")))?;
        if apps.iter().any(|app| app.name() == name) {
            return Err(SdkError::DuplicateApp(name.to_string()));
        }
        let app = Arc::new(App::new(name, config)?);
        apps.push(Arc::clone(&app));
        Ok(app)
    }

    /// The app registered as `name`.
    pub fn app(&self, name: &str) -> SdkResult<Arc<App>> {
        let apps = self
            .apps
            .read()
            .map_err(|e| SdkError::Internal(format!("lock poisoned: {e}")))?;
        apps.iter()
            .find(|app| app.name() == name)
            .cloned()
            .ok_or_else(|| SdkError::AppNotFound(name.to_string()))
    }

    /// The first registered app.
    pub fn default_app(&self) -> SdkResult<Arc<App>> {
        let apps = self
            .apps
            .read()
            .map_err(|e| SdkError::Internal(format!("lock poisoned: {e}")))?;
        apps.first().cloned().ok_or(SdkError::NotInitialized)
    }

    /// All registered apps, oldest first.
    pub fn apps(&self) -> SdkResult<Vec<Arc<App>>> {
        let apps = self
            .apps
            .read()
            .map_err(|e| SdkError::Internal(format!("lock poisoned: {e}")))?;
        Ok(apps.clone())
    }

    /// Unregister `name` and complete its auth observers.
    pub fn delete_app(&self, name: &str) -> SdkResult<()> {
        let removed = {
            let mut apps = self
                .apps
                .write()
                .map_err(|e| SdkError::Internal(format!("lock poisoned: {e}")))?;
            let index = apps
                .iter()
                .position(|app| app.name() == name)
                .ok_or_else(|| SdkError::AppNotFound(name.to_string()))?;
            apps.remove(index)
        };
        removed.shut_down();
        Ok(())
    }

    /// Auth of the default app.
    pub fn auth(&self) -> SdkResult<Auth> {
        Ok(self.default_app()?.auth().clone())
    }

    /// Database of the default app.
    pub fn database(&self) -> SdkResult<Database> {
        Ok(self.default_app()?.database().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockfire_auth::Observer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn accessors_fail_before_initialization() {
        let registry = AppRegistry::new();
        assert!(matches!(registry.default_app(), Err(SdkError::NotInitialized)));
        assert!(matches!(registry.auth(), Err(SdkError::NotInitialized)));
        assert!(matches!(registry.database(), Err(SdkError::NotInitialized)));
        assert!(registry.apps().unwrap().is_empty());
    }

    #[test]
    fn default_name_and_first_app_default() {
        let registry = AppRegistry::new();
        let first = registry.initialize_app(AppOptions::default(), None).unwrap();
        assert_eq!(first.name(), DEFAULT_APP_NAME);
        let second = registry
            .initialize_app(AppOptions::default(), Some("secondary"))
            .unwrap();

        assert_eq!(registry.default_app().unwrap().name(), DEFAULT_APP_NAME);
        assert_eq!(registry.app("secondary").unwrap().name(), second.name());
        let names: Vec<String> = registry
            .apps()
            .unwrap()
            .iter()
            .map(|app| app.name().to_string())
            .collect();
        assert_eq!(names, vec![DEFAULT_APP_NAME, "secondary"]);
        assert!(matches!(registry.app("nope"), Err(SdkError::AppNotFound(_))));
    }

    #[test]
    fn duplicate_names_rejected() {
        let registry = AppRegistry::new();
        registry.initialize_app(AppOptions::default(), Some("a")).unwrap();
        assert!(matches!(
            registry.initialize_app(AppOptions::default(), Some("a")),
            Err(SdkError::DuplicateApp(name)) if name == "a"
        ));
        assert_eq!(registry.apps().unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_and_completes_observers() {
        let registry = AppRegistry::new();
        registry.initialize_app(AppOptions::default(), None).unwrap();
        registry.initialize_app(AppOptions::default(), Some("b")).unwrap();

        let completed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completed);
        registry.auth().unwrap().on_auth_state_changed(
            Observer::new(|_| {}).on_complete(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        registry.delete_app(DEFAULT_APP_NAME).unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(registry.default_app().unwrap().name(), "b");
        assert!(matches!(
            registry.delete_app(DEFAULT_APP_NAME),
            Err(SdkError::AppNotFound(_))
        ));

        // The name is free again.
        registry.initialize_app(AppOptions::default(), None).unwrap();
    }
}
