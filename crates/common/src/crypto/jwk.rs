//! Conversion between portable [`Jwk`] material and [`KeyMaterial`]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use super::keys::{ImportedKey, KeyMaterial};
use super::secret::SymmetricKey;
use super::CryptoError;
use crate::key_format::{AlgorithmDescriptor, ExportedKey, Jwk, KeyType, NamedCurve};

const P256_COORDINATE_SIZE: usize = 32;

pub(crate) fn b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn component(jwk: &Jwk, name: &'static str) -> Result<Vec<u8>, CryptoError> {
    let value = jwk
        .component(name)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::InvalidKey(format!("component '{}': {}", name, e)))
}

fn biguint(jwk: &Jwk, name: &'static str) -> Result<BigUint, CryptoError> {
    Ok(BigUint::from_bytes_be(&component(jwk, name)?))
}

/// Turn an exported record into a usable key.
///
/// Assumes [`ExportedKey::validate`] already passed; anything the crypto
///  backend still rejects surfaces as [`CryptoError::InvalidKey`].
pub fn import_key(exported: &ExportedKey) -> Result<ImportedKey, CryptoError> {
    let jwk = &exported.key;
    let material = match (&exported.alg, jwk.kty) {
        (AlgorithmDescriptor::RsaOaep { .. }, KeyType::Rsa) => import_rsa(jwk)?,
        (
            AlgorithmDescriptor::Ecdsa { named_curve } | AlgorithmDescriptor::Ecdh { named_curve },
            KeyType::Ec,
        ) => match named_curve {
            NamedCurve::P256 => import_p256(jwk)?,
            other => {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "{} on {:?}",
                    exported.alg, other
                )))
            }
        },
        (AlgorithmDescriptor::AesGcm, KeyType::Oct) => {
            KeyMaterial::Symmetric(SymmetricKey::from_slice(&component(jwk, "k")?)?)
        }
        (alg, kty) if alg.key_type() == kty => {
            return Err(CryptoError::UnsupportedAlgorithm(alg.name().to_string()))
        }
        (alg, kty) => {
            return Err(CryptoError::InvalidKey(format!(
                "{} material cannot be used with {}",
                kty, alg
            )))
        }
    };

    Ok(ImportedKey {
        name: exported.name.clone(),
        kid: exported.kid,
        usages: exported.usages.clone(),
        alg: exported.alg,
        key: material,
    })
}

fn import_rsa(jwk: &Jwk) -> Result<KeyMaterial, CryptoError> {
    let n = biguint(jwk, "n")?;
    let e = biguint(jwk, "e")?;

    if jwk.is_private() {
        let d = biguint(jwk, "d")?;
        let primes = vec![biguint(jwk, "p")?, biguint(jwk, "q")?];
        let private = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        private
            .validate()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(KeyMaterial::RsaPrivate(Box::new(private)))
    } else {
        let public = RsaPublicKey::new(n, e).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(KeyMaterial::RsaPublic(public))
    }
}

fn import_p256(jwk: &Jwk) -> Result<KeyMaterial, CryptoError> {
    let x = component(jwk, "x")?;
    let y = component(jwk, "y")?;
    if x.len() != P256_COORDINATE_SIZE || y.len() != P256_COORDINATE_SIZE {
        return Err(CryptoError::InvalidKey("invalid P-256 coordinate size".to_string()));
    }

    // SEC1 uncompressed point: 0x04 || x || y
    let mut sec1 = Vec::with_capacity(1 + 2 * P256_COORDINATE_SIZE);
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);
    let public = p256::PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| CryptoError::InvalidKey("point is not on P-256".to_string()))?;

    if jwk.is_private() {
        let secret = p256::SecretKey::from_slice(&component(jwk, "d")?)
            .map_err(|_| CryptoError::InvalidKey("invalid P-256 scalar".to_string()))?;
        if secret.public_key() != public {
            return Err(CryptoError::InvalidKey(
                "private scalar does not match public point".to_string(),
            ));
        }
        Ok(KeyMaterial::EcPrivate(secret))
    } else {
        Ok(KeyMaterial::EcPublic(public))
    }
}

/// Portable form of a key. The inverse of [`import_key`].
pub fn export_key(key: &ImportedKey) -> ExportedKey {
    let jwk = match &key.key {
        KeyMaterial::RsaPublic(public) => rsa_public_jwk(public),
        KeyMaterial::RsaPrivate(private) => {
            let mut jwk = rsa_public_jwk(&private.to_public_key());
            jwk.d = Some(b64url(&private.d().to_bytes_be()));
            if let [p, q, ..] = private.primes() {
                jwk.p = Some(b64url(&p.to_bytes_be()));
                jwk.q = Some(b64url(&q.to_bytes_be()));
            }
            jwk
        }
        KeyMaterial::EcPublic(public) => p256_public_jwk(public),
        KeyMaterial::EcPrivate(secret) => {
            let mut jwk = p256_public_jwk(&secret.public_key());
            jwk.d = Some(b64url(&secret.to_bytes()));
            jwk
        }
        KeyMaterial::Symmetric(secret) => {
            let mut jwk = Jwk::empty(KeyType::Oct);
            jwk.k = Some(b64url(secret.bytes()));
            jwk
        }
    };

    ExportedKey {
        name: key.name.clone(),
        kid: key.kid,
        usages: key.usages.clone(),
        alg: key.alg,
        key: jwk,
    }
}

fn rsa_public_jwk(public: &RsaPublicKey) -> Jwk {
    let mut jwk = Jwk::empty(KeyType::Rsa);
    jwk.n = Some(b64url(&public.n().to_bytes_be()));
    jwk.e = Some(b64url(&public.e().to_bytes_be()));
    jwk
}

fn p256_public_jwk(public: &p256::PublicKey) -> Jwk {
    let point = public.to_encoded_point(false);
    let bytes = point.as_bytes();
    let mut jwk = Jwk::empty(KeyType::Ec);
    jwk.crv = Some(NamedCurve::P256);
    jwk.x = Some(b64url(&bytes[1..1 + P256_COORDINATE_SIZE]));
    jwk.y = Some(b64url(&bytes[1 + P256_COORDINATE_SIZE..]));
    jwk
}
