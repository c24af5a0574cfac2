/**
 * Session key client: the working set of keys,
 *  generation, import/export and sealing files
 *  for a recipient.
 */
pub mod client;
/**
 * Cryptographic types and operations.
 *  - RSA-OAEP and P-256 keypairs
 *  - AES-256-GCM content encryption
 *  - Symmetric key wrapping
 */
pub mod crypto;
pub mod fingerprint;
/**
 * Canonical key record format and its
 *  strict parsing.
 */
pub mod key_format;
/**
 * Local persistence of key records,
 *  addressed by variant and kid.
 */
pub mod keystore;
pub mod kid;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::client::{ClientError, KeyClient};
    pub use crate::crypto::{ImportedKey, ImportedKeyPair, Iv, KeyPairParams, SymmetricKey};
    pub use crate::fingerprint::fingerprint;
    pub use crate::key_format::{AlgorithmDescriptor, ExportedKey, HashAlgorithm, KeyVariant};
    pub use crate::keystore::{FsBackend, KeyStore, MemoryBackend};
    pub use crate::kid::Kid;
    pub use crate::version::build_info;
}
