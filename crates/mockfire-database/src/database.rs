use std::sync::Arc;

use mockfire_types::DbPath;

use crate::engine::DataEngine;
use crate::error::DatabaseResult;
use crate::reference::Reference;

/// Entry point for handing out references into one [`DataEngine`].
#[derive(Clone, Debug)]
pub struct Database {
    engine: Arc<DataEngine>,
}

impl Database {
    pub fn new(engine: Arc<DataEngine>) -> Self {
        Self { engine }
    }

    /// A reference to `path`; `""` or `"/"` is the root.
    pub fn reference(&self, path: &str) -> DatabaseResult<Reference> {
        Ok(Reference::new(Arc::clone(&self.engine), DbPath::parse(path)?))
    }

    pub fn root(&self) -> Reference {
        Reference::new(Arc::clone(&self.engine), DbPath::root())
    }

    pub fn engine(&self) -> &Arc<DataEngine> {
        &self.engine
    }

    /// # Panics
    ///
    /// There is no connection to manage.
    pub fn go_online(&self) {
        unimplemented!("go_online")
    }

    /// # Panics
    ///
    /// There is no connection to manage.
    pub fn go_offline(&self) {
        unimplemented!("go_offline")
    }

    /// # Panics
    ///
    /// URL references are not implemented.
    pub fn ref_from_url(&self, _url: &str) -> DatabaseResult<Reference> {
        unimplemented!("ref_from_url")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use serde_json::json;

    #[tokio::test]
    async fn references_share_the_engine() {
        let db = Database::new(DataEngine::open());
        db.reference("a/b").unwrap().set(&1).await.unwrap();
        let snap = db.root().once(EventType::Value).await.unwrap();
        assert_eq!(snap.val(), json!({"a": {"b": 1}}));
        assert_eq!(db.reference("/").unwrap(), db.root());
        assert!(db.reference("a/$b").is_err());
    }

    #[test]
    #[should_panic(expected = "not implemented: go_online")]
    fn go_online_is_unsupported() {
        Database::new(DataEngine::open()).go_online();
    }

    #[test]
    #[should_panic(expected = "not implemented: go_offline")]
    fn go_offline_is_unsupported() {
        Database::new(DataEngine::open()).go_offline();
    }

    #[test]
    #[should_panic(expected = "not implemented: ref_from_url")]
    fn ref_from_url_is_unsupported() {
        let _ = Database::new(DataEngine::open()).ref_from_url("https://example.firebaseio.com/a");
    }
}
