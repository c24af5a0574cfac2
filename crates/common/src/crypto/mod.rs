//! Cryptographic primitives for Jailbird
//!
//! Jailbird uses hybrid encryption to share files:
//!
//! - **Identity**: every user owns an RSA-OAEP keypair. The private half never
//!   leaves the device unencrypted; the public half is registered with the
//!   server under a reserved KID.
//! - **Content encryption**: each upload gets a fresh AES-256-GCM
//!   [`SymmetricKey`]. Every ciphertext travels with its own [`Iv`].
//! - **Key sharing**: the symmetric key is exported as a JWK and encrypted
//!   with RSA-OAEP for the recipient ([`wrap_key`]). Only the holder of the
//!   matching private key can recover it ([`unwrap_key`]).
//!
//! ECDSA and ECDH (P-256) keypairs can also be generated, imported and
//!  exported. ECDSA keys can [`sign`] and [`verify`].

mod jwk;
mod keys;
mod secret;
mod wrap;

pub use jwk::{export_key, import_key};
pub use keys::{
    generate_asymmetric_keypair, sign, verify, ImportedKey, ImportedKeyPair, KeyMaterial,
    KeyPairParams, DEFAULT_MODULUS_LENGTH,
};
pub use secret::{
    decrypt, encrypt, generate_symmetric_key, seal, Iv, Sealed, SymmetricKey, IV_SIZE,
    SYMMETRIC_KEY_SIZE,
};
pub use wrap::{unwrap_key, wrap_key};

/// Errors raised by the crypto layer
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid iv: expected {IV_SIZE} bytes, got {0}")]
    InvalidIv(usize),
    #[error("failed to wrap key: {0}")]
    WrapFailure(String),
    /// Deliberately carries no cause
    #[error("failed to unwrap key")]
    UnwrapFailure,
    #[error("ciphertext failed authentication")]
    AuthenticationFailure,
    #[error("crypto error: {0}")]
    Default(#[from] anyhow::Error),
}
