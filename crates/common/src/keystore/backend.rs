use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::key_format::KeyVariant;
use crate::kid::Kid;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Durable string storage indexed by `(variant, kid)`
///
/// Implementations only move strings around; parsing and validation belong
///  to [`super::KeyStore`].
#[async_trait]
pub trait KeyValueBackend: Send + Sync + std::fmt::Debug {
    /// Read the record stored at `(variant, kid)`
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing is stored there
    async fn get(&self, variant: KeyVariant, kid: &Kid) -> Result<Option<String>, BackendError>;

    /// Store `value` at `(variant, kid)`, replacing whatever was there
    async fn put(&self, variant: KeyVariant, kid: &Kid, value: String) -> Result<(), BackendError>;

    /// Remove the record at `(variant, kid)`
    ///
    /// # Returns
    /// * `Ok(true)` - A record existed and was removed
    /// * `Ok(false)` - There was nothing to remove
    async fn remove(&self, variant: KeyVariant, kid: &Kid) -> Result<bool, BackendError>;

    /// Every kid stored under `variant`
    async fn list(&self, variant: KeyVariant) -> Result<BTreeSet<Kid>, BackendError>;

    /// Names of records under `variant` that are laid out like key records
    ///  but carry no valid kid. Backends that cannot hold such records keep
    ///  the default.
    async fn unrecognised(&self, _variant: KeyVariant) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }
}
