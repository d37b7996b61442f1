use std::sync::{Arc, OnceLock};

use mockfire_auth::Auth;
use mockfire_database::Database;

use crate::app::App;
use crate::error::SdkResult;
use crate::options::{AppOptions, MockConfig};
use crate::registry::AppRegistry;

static REGISTRY: OnceLock<AppRegistry> = OnceLock::new();

/// Process-wide default registry, for code written against the
/// `firebase.initializeApp()` / `firebase.auth()` style.
///
/// Prefer an owned [`AppRegistry`] in tests; state registered here lives
/// until the process exits or [`Firebase::delete_app`] is called.
pub struct Firebase;

impl Firebase {
    pub fn registry() -> &'static AppRegistry {
        REGISTRY.get_or_init(AppRegistry::new)
    }

    pub fn initialize_app(options: AppOptions, name: Option<&str>) -> SdkResult<Arc<App>> {
        Self::registry().initialize_app(options, name)
    }

    pub fn initialize_app_with(config: MockConfig, name: Option<&str>) -> SdkResult<Arc<App>> {
        Self::registry().initialize_app_with(config, name)
    }

    pub fn apps() -> SdkResult<Vec<Arc<App>>> {
        Self::registry().apps()
    }

    pub fn app(name: &str) -> SdkResult<Arc<App>> {
        Self::registry().app(name)
    }

    pub fn auth() -> SdkResult<Auth> {
        Self::registry().auth()
    }

    pub fn database() -> SdkResult<Database> {
        Self::registry().database()
    }

    pub fn delete_app(name: &str) -> SdkResult<()> {
        Self::registry().delete_app(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use crate::registry::DEFAULT_APP_NAME;
    use mockfire_database::EventType;
    use mockfire_types::UserInfo;
    use serde_json::json;

    // The only test touching the process-wide registry.
    #[tokio::test]
    async fn default_instance_lifecycle() {
        assert!(matches!(Firebase::auth(), Err(SdkError::NotInitialized)));

        let options = AppOptions {
            database_url: Some("https://demo.firebaseio.com".into()),
            ..Default::default()
        };
        let app = Firebase::initialize_app(options, None).unwrap();
        assert_eq!(app.name(), DEFAULT_APP_NAME);
        assert!(matches!(
            Firebase::initialize_app(AppOptions::default(), None),
            Err(SdkError::DuplicateApp(_))
        ));

        let auth = Firebase::auth().unwrap();
        auth.set_custom_token_sign_in_handler(|token| Ok(UserInfo::with_uid(token)));
        let user = auth.sign_in_with_custom_token("42").await.unwrap();
        assert_eq!(Firebase::auth().unwrap().current_user(), Some(user));

        let ada = Firebase::database().unwrap().reference("users/ada").unwrap();
        ada.set(&json!({"name": "Ada"})).await.unwrap();
        let snap = Firebase::app(DEFAULT_APP_NAME)
            .unwrap()
            .database()
            .reference("users/ada/name")
            .unwrap()
            .once(EventType::Value)
            .await
            .unwrap();
        assert_eq!(snap.val(), json!("Ada"));

        Firebase::delete_app(DEFAULT_APP_NAME).unwrap();
        assert!(Firebase::apps().unwrap().is_empty());
        assert!(matches!(Firebase::database(), Err(SdkError::NotInitialized)));
    }
}
