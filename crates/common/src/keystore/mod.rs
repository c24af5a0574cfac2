//! Local persistence of key records
//!
//! Records are stored as [`ExportedKey`] JSON, addressed by
//! `(variant, kid)`. Reading a record back is two steps: schema validation,
//! then cryptographic import. A record failing either step is
//! [`KeyStoreError::Corrupt`], never silently treated as missing.

mod backend;
mod fs;
mod memory;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use backend::{BackendError, KeyValueBackend};
pub use fs::FsBackend;
pub use memory::MemoryBackend;

use crate::crypto::{export_key, import_key, ImportedKey, ImportedKeyPair};
use crate::key_format::{validate_name, ExportedKey, FormatError, KeyVariant};
use crate::kid::Kid;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("no {variant} key with kid {kid}")]
    NotFound { variant: KeyVariant, kid: Kid },
    #[error("{variant} key with kid {kid} is corrupt: {reason}")]
    Corrupt {
        variant: KeyVariant,
        kid: Kid,
        reason: String,
    },
    #[error("invalid key: {0}")]
    Invalid(#[from] FormatError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("saving key pair {kid} failed ({reason}) and its public half could not be rolled back: {cleanup}")]
    PartialSave {
        kid: Kid,
        reason: String,
        cleanup: String,
    },
}

/// Result of a best-effort delete across every variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub removed: Vec<KeyVariant>,
    pub failed: Vec<(KeyVariant, String)>,
}

impl DeleteReport {
    pub fn removed_any(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameStatus {
    Renamed,
    Missing,
    Failed(String),
}

/// Per-half result of renaming a key pair. The halves are updated
///  independently; one may succeed while the other fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub new_name: String,
    pub public: RenameStatus,
    pub private: RenameStatus,
}

impl RenameOutcome {
    pub fn fully_renamed(&self) -> bool {
        self.public == RenameStatus::Renamed && self.private == RenameStatus::Renamed
    }

    pub fn status(&self, variant: KeyVariant) -> Option<&RenameStatus> {
        match variant {
            KeyVariant::Public => Some(&self.public),
            KeyVariant::Private => Some(&self.private),
            KeyVariant::Imported => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl KeyStore {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub async fn list(&self, variant: KeyVariant) -> Result<BTreeSet<Kid>, KeyStoreError> {
        Ok(self.backend.list(variant).await?)
    }

    pub async fn unrecognised(&self, variant: KeyVariant) -> Result<Vec<String>, KeyStoreError> {
        Ok(self.backend.unrecognised(variant).await?)
    }

    pub async fn contains(&self, variant: KeyVariant, kid: &Kid) -> Result<bool, KeyStoreError> {
        Ok(self.backend.get(variant, kid).await?.is_some())
    }

    /// Read and validate a record without importing it
    pub async fn load(&self, variant: KeyVariant, kid: &Kid) -> Result<ExportedKey, KeyStoreError> {
        let raw = self
            .backend
            .get(variant, kid)
            .await?
            .ok_or(KeyStoreError::NotFound { variant, kid: *kid })?;

        let corrupt = |reason: String| KeyStoreError::Corrupt {
            variant,
            kid: *kid,
            reason,
        };
        let exported = ExportedKey::from_json(&raw).map_err(|e| corrupt(e.to_string()))?;
        if exported.kid != *kid {
            return Err(corrupt(format!("record claims kid {}", exported.kid)));
        }
        Ok(exported)
    }

    /// Load a record and import it for use
    pub async fn import(&self, variant: KeyVariant, kid: &Kid) -> Result<ImportedKey, KeyStoreError> {
        let exported = self.load(variant, kid).await?;
        import_key(&exported).map_err(|e| KeyStoreError::Corrupt {
            variant,
            kid: *kid,
            reason: e.to_string(),
        })
    }

    pub async fn import_pair(&self, kid: &Kid) -> Result<ImportedKeyPair, KeyStoreError> {
        Ok(ImportedKeyPair {
            public_key: self.import(KeyVariant::Public, kid).await?,
            private_key: self.import(KeyVariant::Private, kid).await?,
        })
    }

    /// Export and persist `key`, overwriting any record at the same slot
    pub async fn save(&self, variant: KeyVariant, key: &ImportedKey) -> Result<(), KeyStoreError> {
        self.save_exported(variant, &export_key(key)).await
    }

    pub async fn save_exported(
        &self,
        variant: KeyVariant,
        key: &ExportedKey,
    ) -> Result<(), KeyStoreError> {
        key.validate()?;
        let json = key.to_json()?;
        self.backend.put(variant, &key.kid, json).await?;
        tracing::debug!(%variant, kid = %key.kid, "saved key");
        Ok(())
    }

    /// Persist both halves of `pair`, or neither.
    ///
    /// If the private write fails the public slot is put back the way it
    ///  was. A rollback that fails too is reported as
    ///  [`KeyStoreError::PartialSave`].
    pub async fn save_pair(&self, pair: &ImportedKeyPair) -> Result<(), KeyStoreError> {
        let public = export_key(&pair.public_key);
        let private = export_key(&pair.private_key);
        public.validate()?;
        private.validate()?;

        let kid = public.kid;
        let previous = self.backend.get(KeyVariant::Public, &kid).await?;
        self.save_exported(KeyVariant::Public, &public).await?;

        let Err(e) = self.save_exported(KeyVariant::Private, &private).await else {
            return Ok(());
        };
        tracing::warn!(%kid, "private half failed to save, rolling back: {}", e);
        let rollback = match previous {
            Some(raw) => self.backend.put(KeyVariant::Public, &kid, raw).await,
            None => self.backend.remove(KeyVariant::Public, &kid).await.map(|_| ()),
        };
        match rollback {
            Ok(()) => Err(e),
            Err(cleanup) => {
                tracing::error!(%kid, "failed to roll back public half: {}", cleanup);
                Err(KeyStoreError::PartialSave {
                    kid,
                    reason: e.to_string(),
                    cleanup: cleanup.to_string(),
                })
            }
        }
    }

    /// Remove `kid` from every variant, carrying on past failures
    pub async fn delete(&self, kid: &Kid) -> DeleteReport {
        let mut report = DeleteReport::default();
        for variant in KeyVariant::ALL {
            match self.backend.remove(variant, kid).await {
                Ok(true) => report.removed.push(variant),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%variant, %kid, "failed to delete key: {}", e);
                    report.failed.push((variant, e.to_string()));
                }
            }
        }
        report
    }

    /// Rename both halves of a key pair, each independently
    pub async fn rename(&self, kid: &Kid, new_name: &str) -> Result<RenameOutcome, KeyStoreError> {
        validate_name(new_name)?;

        let public = self.rename_variant(KeyVariant::Public, kid, new_name).await;
        let private = self.rename_variant(KeyVariant::Private, kid, new_name).await;

        Ok(RenameOutcome {
            new_name: new_name.to_string(),
            public,
            private,
        })
    }

    async fn rename_variant(&self, variant: KeyVariant, kid: &Kid, new_name: &str) -> RenameStatus {
        let result = async {
            let mut exported = self.load(variant, kid).await?;
            exported.name = new_name.to_string();
            self.save_exported(variant, &exported).await
        }
        .await;

        match result {
            Ok(()) => RenameStatus::Renamed,
            Err(KeyStoreError::NotFound { .. }) => RenameStatus::Missing,
            Err(e) => {
                tracing::warn!(%variant, %kid, "failed to rename key: {}", e);
                RenameStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{generate_asymmetric_keypair, KeyPairParams};
    use crate::key_format::HashAlgorithm;

    fn pair() -> ImportedKeyPair {
        let params = KeyPairParams::rsa_oaep("store test", Kid::generate(), HashAlgorithm::Sha256);
        generate_asymmetric_keypair(&params).unwrap()
    }

    #[tokio::test]
    async fn test_save_import_round_trip() {
        let store = KeyStore::memory();
        let pair = pair();
        store.save_pair(&pair).await.unwrap();

        let kids = store.list(KeyVariant::Private).await.unwrap();
        assert!(kids.contains(&pair.kid()));

        let back = store.import_pair(&pair.kid()).await.unwrap();
        assert_eq!(
            export_key(&back.private_key),
            export_key(&pair.private_key)
        );
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = KeyStore::memory();
        let result = store.import(KeyVariant::Public, &Kid::generate()).await;
        assert!(matches!(result, Err(KeyStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt() {
        let backend = MemoryBackend::new();
        let kid = Kid::generate();
        backend
            .put(KeyVariant::Public, &kid, "not json".to_string())
            .await
            .unwrap();
        let store = KeyStore::new(backend);

        let result = store.import(KeyVariant::Public, &kid).await;
        assert!(matches!(result, Err(KeyStoreError::Corrupt { .. })));
        assert!(store.list(KeyVariant::Public).await.unwrap().contains(&kid));
    }

    #[tokio::test]
    async fn test_record_under_wrong_kid_is_corrupt() {
        let pair = pair();
        let backend = MemoryBackend::new();
        let other = Kid::generate();
        backend
            .put(
                KeyVariant::Public,
                &other,
                export_key(&pair.public_key).to_json().unwrap(),
            )
            .await
            .unwrap();
        let store = KeyStore::new(backend);
        assert!(matches!(
            store.import(KeyVariant::Public, &other).await,
            Err(KeyStoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_variants() {
        let store = KeyStore::memory();
        let pair = pair();
        store.save_pair(&pair).await.unwrap();

        let report = store.delete(&pair.kid()).await;
        assert_eq!(report.removed, vec![KeyVariant::Public, KeyVariant::Private]);
        assert!(report.failed.is_empty());

        let again = store.delete(&pair.kid()).await;
        assert!(!again.removed_any());
    }

    #[tokio::test]
    async fn test_rename_reports_each_half() {
        let store = KeyStore::memory();
        let pair = pair();
        store.save(KeyVariant::Public, &pair.public_key).await.unwrap();

        let outcome = store.rename(&pair.kid(), "renamed key").await.unwrap();
        assert_eq!(outcome.public, RenameStatus::Renamed);
        assert_eq!(outcome.private, RenameStatus::Missing);
        assert!(!outcome.fully_renamed());

        let public = store.load(KeyVariant::Public, &pair.kid()).await.unwrap();
        assert_eq!(public.name, "renamed key");
    }

    #[tokio::test]
    async fn test_rename_validates_name() {
        let store = KeyStore::memory();
        let result = store.rename(&Kid::generate(), "abc").await;
        assert!(matches!(result, Err(KeyStoreError::Invalid(_))));
    }
}
