//! Content encryption using AES-256-GCM
//!
//! Every upload is encrypted under its own [`SymmetricKey`]. A ciphertext is
//! useless without the [`Iv`] it was produced with, so the two are carried
//! together as a [`Sealed`] value wherever possible.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use super::CryptoError;

/// Size of an AES-GCM initialization vector in bytes (96 bits)
pub const IV_SIZE: usize = 12;
/// Size of an AES-256 key in bytes
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// A 256-bit AES-GCM key
///
/// Not serializable on its own. Use [`super::export_key`] or
/// [`super::wrap_key`] to move it anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

impl SymmetricKey {
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != SYMMETRIC_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "invalid AES-256 key size, expected {}, got {}",
                SYMMETRIC_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; SYMMETRIC_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(Self(buff))
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()))
    }
}

/// Generate a new AES-256-GCM key from the OS RNG
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut buff = [0; SYMMETRIC_KEY_SIZE];
    OsRng.fill_bytes(&mut buff);
    SymmetricKey(buff)
}

/// A 96-bit AES-GCM initialization vector
///
/// Only obtainable by [`Iv::generate`] or by parsing exactly [`IV_SIZE`]
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    pub fn generate() -> Self {
        let mut buff = [0; IV_SIZE];
        OsRng.fill_bytes(&mut buff);
        Self(buff)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl TryFrom<&[u8]> for Iv {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; IV_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidIv(bytes.len()))?;
        Ok(Self(buff))
    }
}

impl AsRef<[u8]> for Iv {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// A ciphertext together with the IV it was produced under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under a freshly generated IV
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Sealed, CryptoError> {
    let iv = Iv::generate();
    let ciphertext = encrypt(key, &iv, plaintext)?;
    Ok(Sealed { iv, ciphertext })
}

/// AES-GCM encrypt. The output carries the 16 byte tag at its end.
pub fn encrypt(key: &SymmetricKey, iv: &Iv, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    key.cipher()
        .encrypt(Nonce::from_slice(iv.as_bytes()), plaintext)
        .map_err(|_| anyhow::anyhow!("encrypt error").into())
}

/// AES-GCM decrypt. Any tag mismatch is an [`CryptoError::AuthenticationFailure`].
pub fn decrypt(key: &SymmetricKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    key.cipher()
        .decrypt(Nonce::from_slice(iv.as_bytes()), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)
}
