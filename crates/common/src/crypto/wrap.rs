//! Symmetric key wrapping with RSA-OAEP
//!
//! The wrapped payload is the symmetric key's JWK serialized as compact JSON,
//! encrypted with RSA-OAEP under the recipient's public key. The OAEP and MGF1
//! digest is the hash named by the wrapping key's algorithm.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};

use super::jwk::b64url;
use super::keys::{ImportedKey, KeyMaterial};
use super::secret::SymmetricKey;
use super::CryptoError;
use crate::key_format::{AlgorithmDescriptor, HashAlgorithm, KeyUsage};

#[derive(Serialize, Deserialize)]
struct WrappedJwk {
    kty: String,
    k: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ext: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_ops: Option<Vec<String>>,
}

fn oaep(hash: HashAlgorithm) -> Oaep {
    match hash {
        HashAlgorithm::Sha1 => Oaep::new::<sha1::Sha1>(),
        HashAlgorithm::Sha256 => Oaep::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Oaep::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Oaep::new::<sha2::Sha512>(),
    }
}

/// Wrap `target` for the holder of `wrapping_key`'s private half
pub fn wrap_key(wrapping_key: &ImportedKey, target: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    let (hash, public) = match (&wrapping_key.alg, &wrapping_key.key) {
        (AlgorithmDescriptor::RsaOaep { hash }, KeyMaterial::RsaPublic(public)) => (*hash, public),
        (alg, material) => {
            return Err(CryptoError::WrapFailure(format!(
                "{:?} under {} cannot wrap keys",
                material, alg
            )))
        }
    };
    if !wrapping_key.allows(KeyUsage::WrapKey) {
        return Err(CryptoError::WrapFailure(format!(
            "key {} is not allowed to wrap keys",
            wrapping_key.kid
        )));
    }

    let payload = serde_json::to_vec(&WrappedJwk {
        kty: "oct".to_string(),
        k: b64url(target.bytes()),
        alg: Some("A256GCM".to_string()),
        ext: Some(true),
        key_ops: Some(vec!["encrypt".to_string(), "decrypt".to_string()]),
    })
    .map_err(|e| CryptoError::WrapFailure(e.to_string()))?;

    public
        .encrypt(&mut OsRng, oaep(hash), &payload)
        .map_err(|e| CryptoError::WrapFailure(e.to_string()))
}

/// Recover a symmetric key wrapped by [`wrap_key`].
///
/// Every failure is reported as [`CryptoError::UnwrapFailure`], whatever the
///  cause.
pub fn unwrap_key(unwrapping_key: &ImportedKey, wrapped: &[u8]) -> Result<SymmetricKey, CryptoError> {
    let (hash, private) = match (&unwrapping_key.alg, &unwrapping_key.key) {
        (AlgorithmDescriptor::RsaOaep { hash }, KeyMaterial::RsaPrivate(private)) => (*hash, private),
        _ => return Err(CryptoError::UnwrapFailure),
    };
    if !unwrapping_key.allows(KeyUsage::UnwrapKey) {
        return Err(CryptoError::UnwrapFailure);
    }

    let payload = private
        .decrypt(oaep(hash), wrapped)
        .map_err(|_| CryptoError::UnwrapFailure)?;
    let jwk: WrappedJwk = serde_json::from_slice(&payload).map_err(|_| CryptoError::UnwrapFailure)?;
    if jwk.kty != "oct" {
        return Err(CryptoError::UnwrapFailure);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(jwk.k)
        .map_err(|_| CryptoError::UnwrapFailure)?;
    SymmetricKey::from_slice(&bytes).map_err(|_| CryptoError::UnwrapFailure)
}
