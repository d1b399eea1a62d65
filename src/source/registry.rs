// Process-wide mapping from stream URL to Source.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::Request;

use super::source::{source_key, Source};

/// `find_or_create` / `get` are the only entry points; the map itself is
/// never exposed. Sources are never reaped — there is no removal method,
/// by design (see the source-lifetime decision in DESIGN.md). Insertion
/// takes a write lock, lookups a read lock.
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<Source>>>,
}

impl SourceRegistry {
    pub fn new() -> SourceRegistry {
        SourceRegistry {
            sources: RwLock::new(HashMap::new()),
        }
    }

    pub fn find_or_create(&self, request: &Request) -> Arc<Source> {
        let key = source_key(request);

        if let Some(existing) = self.sources.read().expect("registry lock poisoned").get(&key) {
            return existing.clone();
        }

        let mut sources = self.sources.write().expect("registry lock poisoned");
        sources
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Source::new(key)))
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Source>> {
        self.sources.read().expect("registry lock poisoned").get(key).cloned()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(vhost: &str, app: &str, stream: &str) -> Request {
        Request {
            vhost: vhost.to_string(),
            app: app.to_string(),
            stream: stream.to_string(),
            ..Request::default()
        }
    }

    #[test]
    fn find_or_create_returns_the_same_source_for_the_same_key() {
        let registry = SourceRegistry::new();
        let a = registry.find_or_create(&request("v", "live", "s1"));
        let b = registry.find_or_create(&request("v", "live", "s1"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn find_or_create_separates_distinct_keys() {
        let registry = SourceRegistry::new();
        let a = registry.find_or_create(&request("v", "live", "s1"));
        let b = registry.find_or_create(&request("v", "live", "s2"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_finds_an_already_created_source() {
        let registry = SourceRegistry::new();
        let created = registry.find_or_create(&request("v", "live", "s1"));
        let found = registry.get(&source_key(&request("v", "live", "s1"))).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
    }

    #[test]
    fn get_returns_none_for_an_unknown_key() {
        let registry = SourceRegistry::new();
        assert!(registry.get("v/live/missing").is_none());
    }
}
