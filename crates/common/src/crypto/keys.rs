use std::fmt;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::secret::SymmetricKey;
use super::CryptoError;
use crate::key_format::{AlgorithmDescriptor, HashAlgorithm, KeyUsage, KeyUsages, NamedCurve};
use crate::kid::Kid;

/// Modulus length used when none is requested
pub const DEFAULT_MODULUS_LENGTH: usize = 2048;

const PUBLIC_USAGES: [KeyUsage; 3] = [KeyUsage::Encrypt, KeyUsage::Verify, KeyUsage::WrapKey];

/// Opaque key handle. Only the crypto layer looks inside.
#[derive(Clone)]
pub enum KeyMaterial {
    RsaPublic(RsaPublicKey),
    RsaPrivate(Box<RsaPrivateKey>),
    EcPublic(p256::PublicKey),
    EcPrivate(p256::SecretKey),
    Symmetric(SymmetricKey),
}

impl KeyMaterial {
    pub fn is_private(&self) -> bool {
        matches!(self, KeyMaterial::RsaPrivate(_) | KeyMaterial::EcPrivate(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            KeyMaterial::RsaPublic(_) => "rsa-public",
            KeyMaterial::RsaPrivate(_) => "rsa-private",
            KeyMaterial::EcPublic(_) => "ec-public",
            KeyMaterial::EcPrivate(_) => "ec-private",
            KeyMaterial::Symmetric(_) => "symmetric",
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({})", self.kind())
    }
}

/// A key record whose material is usable by the crypto layer
#[derive(Debug, Clone)]
pub struct ImportedKey {
    pub name: String,
    pub kid: Kid,
    pub usages: KeyUsages,
    pub alg: AlgorithmDescriptor,
    pub key: KeyMaterial,
}

impl ImportedKey {
    pub fn allows(&self, usage: KeyUsage) -> bool {
        self.usages.contains(&usage)
    }
}

#[derive(Debug, Clone)]
pub struct ImportedKeyPair {
    pub public_key: ImportedKey,
    pub private_key: ImportedKey,
}

impl ImportedKeyPair {
    pub fn kid(&self) -> Kid {
        self.public_key.kid
    }
}

/// What to generate
#[derive(Debug, Clone)]
pub struct KeyPairParams {
    pub name: String,
    /// Usually a KID reserved from the server
    pub kid: Kid,
    pub alg: AlgorithmDescriptor,
    /// Requested usages, split between the halves. Empty means the
    ///  algorithm's defaults.
    pub usages: KeyUsages,
    /// RSA only
    pub modulus_length: usize,
}

impl KeyPairParams {
    /// RSA-OAEP keypair able to wrap and unwrap symmetric keys
    pub fn rsa_oaep(name: impl Into<String>, kid: Kid, hash: HashAlgorithm) -> Self {
        Self {
            name: name.into(),
            kid,
            alg: AlgorithmDescriptor::RsaOaep { hash },
            usages: KeyUsages::new(),
            modulus_length: DEFAULT_MODULUS_LENGTH,
        }
    }
}

fn default_usages(alg: &AlgorithmDescriptor) -> KeyUsages {
    match alg {
        AlgorithmDescriptor::RsaOaep { .. } => [
            KeyUsage::Encrypt,
            KeyUsage::Decrypt,
            KeyUsage::WrapKey,
            KeyUsage::UnwrapKey,
        ]
        .into_iter()
        .collect(),
        AlgorithmDescriptor::Ecdsa { .. } => [KeyUsage::Sign, KeyUsage::Verify].into_iter().collect(),
        AlgorithmDescriptor::Ecdh { .. } => [KeyUsage::DeriveKey, KeyUsage::DeriveBits].into_iter().collect(),
        _ => KeyUsages::new(),
    }
}

/// Generate an asymmetric keypair.
///
/// RSA generation is CPU heavy; async callers should run this on the
///  blocking pool.
pub fn generate_asymmetric_keypair(params: &KeyPairParams) -> Result<ImportedKeyPair, CryptoError> {
    let allowed = default_usages(&params.alg);
    let usages = if params.usages.is_empty() {
        allowed.clone()
    } else {
        params.usages.clone()
    };
    if usages.is_empty() || !usages.is_subset(&allowed) {
        return Err(CryptoError::UnsupportedAlgorithm(format!(
            "{} cannot be used for {:?}",
            params.alg, usages
        )));
    }

    let (public, private) = match params.alg {
        AlgorithmDescriptor::RsaOaep { .. } => {
            let private = RsaPrivateKey::new(&mut OsRng, params.modulus_length)
                .map_err(|e| CryptoError::UnsupportedAlgorithm(e.to_string()))?;
            let public = private.to_public_key();
            (
                KeyMaterial::RsaPublic(public),
                KeyMaterial::RsaPrivate(Box::new(private)),
            )
        }
        AlgorithmDescriptor::Ecdsa {
            named_curve: NamedCurve::P256,
        }
        | AlgorithmDescriptor::Ecdh {
            named_curve: NamedCurve::P256,
        } => {
            let secret = p256::SecretKey::random(&mut OsRng);
            (
                KeyMaterial::EcPublic(secret.public_key()),
                KeyMaterial::EcPrivate(secret),
            )
        }
        other => return Err(CryptoError::UnsupportedAlgorithm(other.name().to_string())),
    };

    let (public_usages, private_usages): (KeyUsages, KeyUsages) =
        usages.into_iter().partition(|u| PUBLIC_USAGES.contains(u));

    tracing::debug!(kid = %params.kid, alg = %params.alg, "generated keypair");

    Ok(ImportedKeyPair {
        public_key: ImportedKey {
            name: params.name.clone(),
            kid: params.kid,
            usages: public_usages,
            alg: params.alg,
            key: public,
        },
        private_key: ImportedKey {
            name: params.name.clone(),
            kid: params.kid,
            usages: private_usages,
            alg: params.alg,
            key: private,
        },
    })
}

/// Sign `data` with an ECDSA private key. Signatures are raw `r || s`.
pub fn sign(key: &ImportedKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let secret = match (&key.alg, &key.key) {
        (AlgorithmDescriptor::Ecdsa { .. }, KeyMaterial::EcPrivate(secret)) => secret,
        (alg, _) => return Err(CryptoError::UnsupportedAlgorithm(format!("sign with {}", alg))),
    };
    if !key.allows(KeyUsage::Sign) {
        return Err(CryptoError::InvalidKey("key may not sign".to_string()));
    }

    let signing = SigningKey::from(secret);
    let signature: Signature = signing
        .try_sign(data)
        .map_err(|e| anyhow::anyhow!("sign error: {}", e))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ECDSA signature produced by [`sign`]
pub fn verify(key: &ImportedKey, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    let public = match (&key.alg, &key.key) {
        (AlgorithmDescriptor::Ecdsa { .. }, KeyMaterial::EcPublic(public)) => public,
        (alg, _) => return Err(CryptoError::UnsupportedAlgorithm(format!("verify with {}", alg))),
    };
    if !key.allows(KeyUsage::Verify) {
        return Err(CryptoError::InvalidKey("key may not verify".to_string()));
    }

    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    let verifying = VerifyingKey::from(public);
    Ok(verifying.verify(data, &signature).is_ok())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ecdsa_params() -> KeyPairParams {
        KeyPairParams {
            name: "signing key".to_string(),
            kid: Kid::generate(),
            alg: AlgorithmDescriptor::Ecdsa {
                named_curve: NamedCurve::P256,
            },
            usages: KeyUsages::new(),
            modulus_length: DEFAULT_MODULUS_LENGTH,
        }
    }

    #[test]
    fn test_rsa_usages_split_between_halves() {
        let params = KeyPairParams::rsa_oaep("laptop key", Kid::generate(), HashAlgorithm::Sha256);
        let pair = generate_asymmetric_keypair(&params).unwrap();
        assert!(pair.public_key.allows(KeyUsage::WrapKey));
        assert!(pair.public_key.allows(KeyUsage::Encrypt));
        assert!(!pair.public_key.allows(KeyUsage::UnwrapKey));
        assert!(pair.private_key.allows(KeyUsage::UnwrapKey));
        assert!(pair.private_key.key.is_private());
        assert_eq!(pair.kid(), params.kid);
    }

    #[test]
    fn test_sign_verify() {
        let pair = generate_asymmetric_keypair(&ecdsa_params()).unwrap();
        let signature = sign(&pair.private_key, b"hello").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify(&pair.public_key, b"hello", &signature).unwrap());
        assert!(!verify(&pair.public_key, b"goodbye", &signature).unwrap());
        assert!(!verify(&pair.public_key, b"hello", &[0u8; 3]).unwrap());
    }

    #[test]
    fn test_unsupported_curve() {
        let mut params = ecdsa_params();
        params.alg = AlgorithmDescriptor::Ecdsa {
            named_curve: NamedCurve::P521,
        };
        assert!(matches!(
            generate_asymmetric_keypair(&params),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let mut params = ecdsa_params();
        params.alg = AlgorithmDescriptor::AesGcm;
        assert!(matches!(
            generate_asymmetric_keypair(&params),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_usages_must_fit_algorithm() {
        let mut params = ecdsa_params();
        params.usages = [KeyUsage::WrapKey].into_iter().collect();
        assert!(matches!(
            generate_asymmetric_keypair(&params),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
