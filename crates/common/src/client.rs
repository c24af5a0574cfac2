//! Session-scoped key client
//!
//! [`KeyClient`] owns the working set of keys for one session, backed by a
//! [`KeyStore`]. Construct one explicitly and hand it to whatever needs it.
//! The working set only ever holds keys that imported cleanly; records that
//! did not are visible through the [`InitReport`] and nowhere else.

use std::collections::BTreeMap;

use futures::future::join_all;
use parking_lot::RwLock;

use crate::crypto::{
    decrypt, export_key, generate_asymmetric_keypair, generate_symmetric_key, import_key, seal,
    unwrap_key, wrap_key, CryptoError, ImportedKey, ImportedKeyPair, Iv, KeyPairParams, Sealed,
};
use crate::fingerprint::{fingerprint_imported, UNKNOWN_FINGERPRINT};
use crate::key_format::{
    AlgorithmDescriptor, ExportedKey, ExportedKeyPair, FormatError, KeyBundle, KeyVariant,
};
use crate::keystore::{DeleteReport, KeyStore, KeyStoreError, RenameOutcome, RenameStatus};
use crate::kid::Kid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("no key with kid {0}")]
    NotFound(Kid),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("key store error: {0}")]
    Store(#[from] KeyStoreError),
    #[error("client error: {0}")]
    Default(#[from] anyhow::Error),
}

impl From<FormatError> for ClientError {
    fn from(e: FormatError) -> Self {
        ClientError::InvalidKey(e.to_string())
    }
}

/// Outcome of loading persisted keys into a fresh client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub attempted: usize,
    pub loaded: usize,
    /// Sorted by variant then kid
    pub failed: Vec<(KeyVariant, Kid, String)>,
    /// Record names whose kid could not be parsed, so nothing was loaded
    ///  from them. Counted in `attempted`.
    pub unrecognised: Vec<(KeyVariant, String)>,
}

impl InitReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len() + self.unrecognised.len()
    }
}

/// Listing entry for a key in the working set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySummary {
    pub kid: Kid,
    pub variant: KeyVariant,
    pub name: String,
    pub alg: AlgorithmDescriptor,
    pub fingerprint: String,
}

/// A plaintext encrypted for one recipient
#[derive(Debug, Clone)]
pub struct SealedShare {
    /// Symmetric key wrapped under the recipient's public key
    pub wrapped_key: Vec<u8>,
    pub sealed: Sealed,
}

#[derive(Debug, Default)]
struct Keyring {
    public: BTreeMap<Kid, ImportedKey>,
    private: BTreeMap<Kid, ImportedKey>,
    imported: BTreeMap<Kid, ImportedKey>,
}

impl Keyring {
    fn slot(&self, variant: KeyVariant) -> &BTreeMap<Kid, ImportedKey> {
        match variant {
            KeyVariant::Public => &self.public,
            KeyVariant::Private => &self.private,
            KeyVariant::Imported => &self.imported,
        }
    }

    fn slot_mut(&mut self, variant: KeyVariant) -> &mut BTreeMap<Kid, ImportedKey> {
        match variant {
            KeyVariant::Public => &mut self.public,
            KeyVariant::Private => &mut self.private,
            KeyVariant::Imported => &mut self.imported,
        }
    }
}

#[derive(Debug)]
pub struct KeyClient {
    store: KeyStore,
    keys: RwLock<Keyring>,
}

impl KeyClient {
    /// A client with an empty working set. Call
    ///  [`KeyClient::initialize_from_store`] to pick up persisted keys.
    pub fn new(store: KeyStore) -> Self {
        Self {
            store,
            keys: RwLock::new(Keyring::default()),
        }
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    /// Load every persisted key. Failures are counted and logged, never
    ///  fatal.
    pub async fn initialize_from_store(&self) -> Result<InitReport, ClientError> {
        tracing::info!("initialising key client from store");

        let mut slots = Vec::new();
        let mut unrecognised = Vec::new();
        for variant in KeyVariant::ALL {
            for kid in self.store.list(variant).await? {
                slots.push((variant, kid));
            }
            for name in self.store.unrecognised(variant).await? {
                tracing::warn!(%variant, file = %name, "skipping key record with unreadable kid");
                unrecognised.push((variant, name));
            }
        }

        let results = join_all(
            slots
                .iter()
                .map(|(variant, kid)| self.store.import(*variant, kid)),
        )
        .await;

        let mut report = InitReport {
            attempted: slots.len() + unrecognised.len(),
            unrecognised,
            ..Default::default()
        };
        {
            let mut keys = self.keys.write();
            for ((variant, kid), result) in slots.into_iter().zip(results) {
                match result {
                    Ok(key) => {
                        tracing::debug!(%variant, %kid, "loaded key");
                        keys.slot_mut(variant).insert(kid, key);
                        report.loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(%variant, %kid, "skipping key: {}", e);
                        report.failed.push((variant, kid, e.to_string()));
                    }
                }
            }
        }

        tracing::info!(
            "attempted to load {} key(s), {} succeeded ({} failed)",
            report.attempted,
            report.loaded,
            report.failed_count()
        );
        Ok(report)
    }

    /// Generate a keypair, persist it and add it to the working set
    pub async fn generate_key_pair(&self, params: KeyPairParams) -> Result<Kid, ClientError> {
        tracing::info!(kid = %params.kid, alg = %params.alg, "generating key pair");
        let pair = tokio::task::spawn_blocking(move || generate_asymmetric_keypair(&params))
            .await
            .map_err(|e| anyhow::anyhow!("key generation task failed: {}", e))??;

        self.store.save_pair(&pair).await?;
        let kid = pair.kid();
        self.add_pair(pair);
        Ok(kid)
    }

    /// Parse, validate and import a serialized key.
    ///
    /// A key pair lands in the public and private variants, a lone public
    ///  key in `imported`. Nothing is stored unless every part imports.
    pub async fn import_key_string(
        &self,
        serialized: &str,
        expected_kid: Option<Kid>,
    ) -> Result<Kid, ClientError> {
        let bundle = KeyBundle::from_json(serialized)?;
        let kid = bundle.kid();
        if let Some(expected) = expected_kid {
            if expected != kid {
                return Err(FormatError::KidMismatch {
                    expected,
                    found: kid,
                }
                .into());
            }
        }

        let invalid = |e: CryptoError| ClientError::InvalidKey(e.to_string());
        match bundle {
            KeyBundle::Pair(pair) => {
                let pair = ImportedKeyPair {
                    public_key: import_key(&pair.public_key).map_err(invalid)?,
                    private_key: import_key(&pair.private_key).map_err(invalid)?,
                };
                self.store.save_pair(&pair).await?;
                self.add_pair(pair);
            }
            KeyBundle::Single(key) => {
                if key.key.is_private() {
                    return Err(ClientError::InvalidKey(
                        "a private key can only be imported with its public half".to_string(),
                    ));
                }
                let key = import_key(&key).map_err(invalid)?;
                self.store.save(KeyVariant::Imported, &key).await?;
                self.keys.write().imported.insert(kid, key);
            }
        }

        tracing::info!(%kid, "imported key");
        Ok(kid)
    }

    /// Serialize both halves of a key pair, for backup
    pub fn export_key_string(&self, kid: &Kid) -> Result<Option<String>, ClientError> {
        let keys = self.keys.read();
        let (Some(public), Some(private)) = (keys.public.get(kid), keys.private.get(kid)) else {
            return Ok(None);
        };
        let pair = ExportedKeyPair {
            public_key: export_key(public),
            private_key: export_key(private),
        };
        Ok(Some(
            serde_json::to_string(&pair).map_err(FormatError::from)?,
        ))
    }

    /// The public half of one of our key pairs, as uploaded to the registry
    pub fn export_public_key(&self, kid: &Kid) -> Option<ExportedKey> {
        self.keys.read().public.get(kid).map(export_key)
    }

    pub fn key(&self, variant: KeyVariant, kid: &Kid) -> Option<ImportedKey> {
        self.keys.read().slot(variant).get(kid).cloned()
    }

    /// Our own public key, or else an imported one
    pub fn public_key(&self, kid: &Kid) -> Option<ImportedKey> {
        let keys = self.keys.read();
        keys.public
            .get(kid)
            .or_else(|| keys.imported.get(kid))
            .cloned()
    }

    pub fn contains(&self, variant: KeyVariant, kid: &Kid) -> bool {
        self.keys.read().slot(variant).contains_key(kid)
    }

    pub fn list(&self, variant: KeyVariant) -> Vec<KeySummary> {
        self.keys
            .read()
            .slot(variant)
            .values()
            .map(|key| KeySummary {
                kid: key.kid,
                variant,
                name: key.name.clone(),
                alg: key.alg,
                fingerprint: fingerprint_imported(key),
            })
            .collect()
    }

    pub fn private_key_count(&self) -> usize {
        self.keys.read().private.len()
    }

    /// `"?"` when the key is unknown or has no fingerprint
    pub fn fingerprint(&self, kid: &Kid) -> String {
        self.public_key(kid)
            .map(|key| fingerprint_imported(&key))
            .unwrap_or_else(|| UNKNOWN_FINGERPRINT.to_string())
    }

    pub async fn rename(&self, kid: &Kid, new_name: &str) -> Result<RenameOutcome, ClientError> {
        let outcome = self.store.rename(kid, new_name).await?;

        let mut keys = self.keys.write();
        for variant in [KeyVariant::Public, KeyVariant::Private] {
            if outcome.status(variant) == Some(&RenameStatus::Renamed) {
                if let Some(key) = keys.slot_mut(variant).get_mut(kid) {
                    key.name = outcome.new_name.clone();
                }
            }
        }
        Ok(outcome)
    }

    pub async fn delete(&self, kid: &Kid) -> DeleteReport {
        let report = self.store.delete(kid).await;
        let mut keys = self.keys.write();
        for variant in &report.removed {
            keys.slot_mut(*variant).remove(kid);
        }
        report
    }

    /// Encrypt `plaintext` under a fresh symmetric key wrapped for `recipient`
    pub fn seal_for(recipient: &ImportedKey, plaintext: &[u8]) -> Result<SealedShare, ClientError> {
        let secret = generate_symmetric_key();
        let wrapped_key = wrap_key(recipient, &secret)?;
        let sealed = seal(&secret, plaintext)?;
        Ok(SealedShare {
            wrapped_key,
            sealed,
        })
    }

    /// Decrypt a share addressed to our key pair `kid`
    pub fn open(
        &self,
        kid: &Kid,
        wrapped_key: &[u8],
        iv: &Iv,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, ClientError> {
        let private = self
            .key(KeyVariant::Private, kid)
            .ok_or(ClientError::NotFound(*kid))?;
        let secret = unwrap_key(&private, wrapped_key)?;
        Ok(decrypt(&secret, iv, ciphertext)?)
    }

    fn add_pair(&self, pair: ImportedKeyPair) {
        let kid = pair.kid();
        let mut keys = self.keys.write();
        keys.public.insert(kid, pair.public_key);
        keys.private.insert(kid, pair.private_key);
    }
}

/// Import a public key as served by the registry
pub fn parse_public_key(bytes: &[u8]) -> Result<ImportedKey, ClientError> {
    let raw = std::str::from_utf8(bytes).map_err(|e| ClientError::InvalidKey(e.to_string()))?;
    let exported = ExportedKey::from_json(raw)?;
    if exported.key.is_private() {
        return Err(ClientError::InvalidKey("expected a public key".to_string()));
    }
    import_key(&exported).map_err(|e| ClientError::InvalidKey(e.to_string()))
}
