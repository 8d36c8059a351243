//! Content Type Registry
//!
//! Tree nodes are thin index rows; the domain payload ("specific object")
//! lives in an external store, joined by `content_type` + `page_id`. This
//! registry maps each content type to the store that owns its payloads so
//! subtree deletion can clean them up. It is an explicit object injected
//! into the mutator at construction time; no package-level registry state.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::services::TreeServiceError;

/// External home of one content type's specific objects.
#[async_trait]
pub trait SpecificStore: Send + Sync {
    /// Fetch one payload, if present.
    async fn get(&self, page_id: i64) -> Option<Value>;

    /// Delete the payloads for the given ids. Missing ids are not errors
    /// (the index row may outlive a manually removed payload).
    async fn delete_many(&self, page_ids: &[i64]) -> Result<(), TreeServiceError>;
}

/// Registry of content types known to the tree, keyed by type name.
#[derive(Default)]
pub struct ContentTypeRegistry {
    stores: HashMap<String, Arc<dyn SpecificStore>>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the store for a content type, replacing any previous one.
    pub fn register(&mut self, content_type: impl Into<String>, store: Arc<dyn SpecificStore>) {
        self.stores.insert(content_type.into(), store);
    }

    /// Remove a content type registration.
    pub fn unregister(&mut self, content_type: &str) -> Option<Arc<dyn SpecificStore>> {
        self.stores.remove(content_type)
    }

    /// Look up the store for a content type.
    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn SpecificStore>> {
        self.stores.get(content_type)
    }

    /// Like [`get`](Self::get), but an unknown type is an error. Used on the
    /// delete path, where a dangling payload would otherwise leak silently.
    pub fn require(&self, content_type: &str) -> Result<&Arc<dyn SpecificStore>, TreeServiceError> {
        self.stores
            .get(content_type)
            .ok_or_else(|| TreeServiceError::UnregisteredContentType {
                content_type: content_type.to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory specific store used across the service tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemorySpecificStore {
        pub payloads: Mutex<HashMap<i64, Value>>,
    }

    impl MemorySpecificStore {
        pub fn with_payloads(entries: Vec<(i64, Value)>) -> Self {
            Self {
                payloads: Mutex::new(entries.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl SpecificStore for MemorySpecificStore {
        async fn get(&self, page_id: i64) -> Option<Value> {
            self.payloads.lock().unwrap().get(&page_id).cloned()
        }

        async fn delete_many(&self, page_ids: &[i64]) -> Result<(), TreeServiceError> {
            let mut payloads = self.payloads.lock().unwrap();
            for id in page_ids {
                payloads.remove(id);
            }
            Ok(())
        }
    }
}
