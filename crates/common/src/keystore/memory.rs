use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::{BackendError, KeyValueBackend};
use crate::key_format::KeyVariant;
use crate::kid::Kid;

/// Process-local backend, mostly for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<(KeyVariant, Kid), String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, variant: KeyVariant, kid: &Kid) -> Result<Option<String>, BackendError> {
        Ok(self.records.read().get(&(variant, *kid)).cloned())
    }

    async fn put(&self, variant: KeyVariant, kid: &Kid, value: String) -> Result<(), BackendError> {
        self.records.write().insert((variant, *kid), value);
        Ok(())
    }

    async fn remove(&self, variant: KeyVariant, kid: &Kid) -> Result<bool, BackendError> {
        Ok(self.records.write().remove(&(variant, *kid)).is_some())
    }

    async fn list(&self, variant: KeyVariant) -> Result<BTreeSet<Kid>, BackendError> {
        Ok(self
            .records
            .read()
            .keys()
            .filter(|(v, _)| *v == variant)
            .map(|(_, kid)| *kid)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_variants_are_separate() {
        let backend = MemoryBackend::new();
        let kid = Kid::generate();
        backend
            .put(KeyVariant::Public, &kid, "public".to_string())
            .await
            .unwrap();

        assert_eq!(
            backend.get(KeyVariant::Public, &kid).await.unwrap().as_deref(),
            Some("public")
        );
        assert!(backend.get(KeyVariant::Private, &kid).await.unwrap().is_none());
        assert!(backend.list(KeyVariant::Private).await.unwrap().is_empty());
        assert!(backend.list(KeyVariant::Public).await.unwrap().contains(&kid));

        assert!(backend.remove(KeyVariant::Public, &kid).await.unwrap());
        assert!(!backend.remove(KeyVariant::Public, &kid).await.unwrap());
    }
}
