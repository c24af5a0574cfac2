//! Shared test utilities for key client integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;

use async_trait::async_trait;
use common::client::KeyClient;
use common::crypto::KeyPairParams;
use common::key_format::{HashAlgorithm, KeyVariant};
use common::keystore::{BackendError, FsBackend, KeyStore, KeyValueBackend, MemoryBackend};
use common::kid::Kid;
use tempfile::TempDir;

/// A key client persisting to a fresh temporary directory
pub fn setup_fs_client() -> (KeyClient, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let client = KeyClient::new(fs_store(&temp_dir));
    (client, temp_dir)
}

pub fn fs_store(dir: &TempDir) -> KeyStore {
    KeyStore::new(FsBackend::new(dir.path().join("keys")))
}

/// Generate an RSA-OAEP key pair into `client`
pub async fn generate_rsa(client: &KeyClient, name: &str) -> Kid {
    client
        .generate_key_pair(KeyPairParams::rsa_oaep(
            name,
            Kid::generate(),
            HashAlgorithm::Sha256,
        ))
        .await
        .unwrap()
}

/// In-memory backend that refuses every private key write, and every
///  removal too when `fail_removes` is set
#[derive(Debug, Default)]
pub struct BrokenPrivateBackend {
    inner: MemoryBackend,
    fail_removes: bool,
}

impl BrokenPrivateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_removes() -> Self {
        Self {
            fail_removes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl KeyValueBackend for BrokenPrivateBackend {
    async fn get(&self, variant: KeyVariant, kid: &Kid) -> Result<Option<String>, BackendError> {
        self.inner.get(variant, kid).await
    }

    async fn put(&self, variant: KeyVariant, kid: &Kid, value: String) -> Result<(), BackendError> {
        if variant == KeyVariant::Private {
            return Err(anyhow::anyhow!("disk full").into());
        }
        self.inner.put(variant, kid, value).await
    }

    async fn remove(&self, variant: KeyVariant, kid: &Kid) -> Result<bool, BackendError> {
        if self.fail_removes {
            return Err(anyhow::anyhow!("read-only").into());
        }
        self.inner.remove(variant, kid).await
    }

    async fn list(&self, variant: KeyVariant) -> Result<BTreeSet<Kid>, BackendError> {
        self.inner.list(variant).await
    }
}
