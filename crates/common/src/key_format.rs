//! Canonical key record format
//!
//! A key record is `{ name, kid, usages, alg, key }`. It exists in two forms:
//! - [`ExportedKey`]: `key` is a portable [`Jwk`], safe to serialize
//! - [`crate::crypto::ImportedKey`]: `key` is an opaque handle only the
//!   crypto layer can use
//!
//! Parsing is strict and happens before any cryptographic import: the
//! algorithm must be one of the known [`AlgorithmDescriptor`] variants and the
//! key material must have the shape that algorithm requires.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::kid::Kid;

pub const MIN_KEY_NAME_LENGTH: usize = 4;
pub const MAX_KEY_NAME_LENGTH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("key is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("key name must be {MIN_KEY_NAME_LENGTH}..={MAX_KEY_NAME_LENGTH} characters, got {0}")]
    InvalidName(usize),
    #[error("key material of type {kty} does not fit algorithm {alg}")]
    MaterialMismatch { alg: String, kty: KeyType },
    #[error("key material is missing component '{0}'")]
    MissingComponent(&'static str),
    #[error("expected kid {expected}, found {found}")]
    KidMismatch { expected: Kid, found: Kid },
    #[error("public and private halves do not describe the same key")]
    PairMismatch,
}

/// Operations a key may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    DeriveKey,
    DeriveBits,
    WrapKey,
    UnwrapKey,
}

pub type KeyUsages = BTreeSet<KeyUsage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    /// Digest output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedCurve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

/// Algorithm a key is bound to, tagged by `name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum AlgorithmDescriptor {
    #[serde(rename = "RSASSA-PKCS1-v1_5")]
    RsassaPkcs1v15 { hash: HashAlgorithm },
    #[serde(rename = "RSA-PSS")]
    RsaPss { hash: HashAlgorithm },
    #[serde(rename = "RSA-OAEP")]
    RsaOaep { hash: HashAlgorithm },
    #[serde(rename = "ECDSA")]
    Ecdsa {
        #[serde(rename = "namedCurve")]
        named_curve: NamedCurve,
    },
    #[serde(rename = "ECDH")]
    Ecdh {
        #[serde(rename = "namedCurve")]
        named_curve: NamedCurve,
    },
    #[serde(rename = "HMAC")]
    Hmac {
        hash: HashAlgorithm,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u32>,
    },
    #[serde(rename = "AES-CTR")]
    AesCtr,
    #[serde(rename = "AES-CBC")]
    AesCbc,
    #[serde(rename = "AES-GCM")]
    AesGcm,
    #[serde(rename = "AES-KW")]
    AesKw,
    #[serde(rename = "PBKDF2")]
    Pbkdf2,
    #[serde(rename = "HKDF")]
    Hkdf,
    Ed25519,
    X25519,
}

impl AlgorithmDescriptor {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmDescriptor::RsassaPkcs1v15 { .. } => "RSASSA-PKCS1-v1_5",
            AlgorithmDescriptor::RsaPss { .. } => "RSA-PSS",
            AlgorithmDescriptor::RsaOaep { .. } => "RSA-OAEP",
            AlgorithmDescriptor::Ecdsa { .. } => "ECDSA",
            AlgorithmDescriptor::Ecdh { .. } => "ECDH",
            AlgorithmDescriptor::Hmac { .. } => "HMAC",
            AlgorithmDescriptor::AesCtr => "AES-CTR",
            AlgorithmDescriptor::AesCbc => "AES-CBC",
            AlgorithmDescriptor::AesGcm => "AES-GCM",
            AlgorithmDescriptor::AesKw => "AES-KW",
            AlgorithmDescriptor::Pbkdf2 => "PBKDF2",
            AlgorithmDescriptor::Hkdf => "HKDF",
            AlgorithmDescriptor::Ed25519 => "Ed25519",
            AlgorithmDescriptor::X25519 => "X25519",
        }
    }

    /// The JWK key type this algorithm's material must carry
    pub fn key_type(&self) -> KeyType {
        match self {
            AlgorithmDescriptor::RsassaPkcs1v15 { .. }
            | AlgorithmDescriptor::RsaPss { .. }
            | AlgorithmDescriptor::RsaOaep { .. } => KeyType::Rsa,
            AlgorithmDescriptor::Ecdsa { .. } | AlgorithmDescriptor::Ecdh { .. } => KeyType::Ec,
            AlgorithmDescriptor::Ed25519 | AlgorithmDescriptor::X25519 => KeyType::Okp,
            _ => KeyType::Oct,
        }
    }
}

impl fmt::Display for AlgorithmDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "OKP")]
    Okp,
    #[serde(rename = "oct")]
    Oct,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::Rsa => "RSA",
            KeyType::Ec => "EC",
            KeyType::Okp => "OKP",
            KeyType::Oct => "oct",
        };
        f.write_str(s)
    }
}

/// Portable key material, shaped like a JSON Web Key.
///
/// Every component is base64url (no padding) of its big-endian bytes.
/// Which components are present depends on `kty` and on whether the key is
/// public or private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: KeyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<NamedCurve>,
    // RSA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    // EC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    // private exponent (RSA) or scalar (EC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    // symmetric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    pub fn empty(kty: KeyType) -> Self {
        Self {
            kty,
            crv: None,
            n: None,
            e: None,
            p: None,
            q: None,
            x: None,
            y: None,
            d: None,
            k: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Fetch a required component
    pub fn component(&self, name: &'static str) -> Result<&str, FormatError> {
        let value = match name {
            "n" => &self.n,
            "e" => &self.e,
            "p" => &self.p,
            "q" => &self.q,
            "x" => &self.x,
            "y" => &self.y,
            "d" => &self.d,
            "k" => &self.k,
            _ => &None,
        };
        value.as_deref().ok_or(FormatError::MissingComponent(name))
    }
}

/// A key record in its portable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKey {
    pub name: String,
    pub kid: Kid,
    pub usages: KeyUsages,
    pub alg: AlgorithmDescriptor,
    pub key: Jwk,
}

impl ExportedKey {
    /// Parse and validate a single exported key
    pub fn from_json(s: &str) -> Result<Self, FormatError> {
        let key: ExportedKey = serde_json::from_str(s)?;
        key.validate()?;
        Ok(key)
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural checks that do not need the crypto layer
    pub fn validate(&self) -> Result<(), FormatError> {
        validate_name(&self.name)?;

        let expected = self.alg.key_type();
        if self.key.kty != expected {
            return Err(FormatError::MaterialMismatch {
                alg: self.alg.name().to_string(),
                kty: self.key.kty,
            });
        }

        match (&self.alg, self.key.kty) {
            (_, KeyType::Rsa) => {
                self.key.component("n")?;
                self.key.component("e")?;
                if self.key.is_private() {
                    self.key.component("p")?;
                    self.key.component("q")?;
                }
            }
            (
                AlgorithmDescriptor::Ecdsa { named_curve } | AlgorithmDescriptor::Ecdh { named_curve },
                KeyType::Ec,
            ) => {
                if self.key.crv != Some(*named_curve) {
                    return Err(FormatError::MaterialMismatch {
                        alg: self.alg.name().to_string(),
                        kty: self.key.kty,
                    });
                }
                self.key.component("x")?;
                self.key.component("y")?;
            }
            (_, KeyType::Oct) => {
                self.key.component("k")?;
            }
            _ => {}
        }

        Ok(())
    }
}

/// Both halves of an asymmetric key, as written to a backup file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKeyPair {
    #[serde(rename = "publicKey")]
    pub public_key: ExportedKey,
    #[serde(rename = "privateKey")]
    pub private_key: ExportedKey,
}

impl ExportedKeyPair {
    pub fn kid(&self) -> Kid {
        self.public_key.kid
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        self.public_key.validate()?;
        self.private_key.validate()?;
        if self.public_key.kid != self.private_key.kid
            || self.public_key.alg != self.private_key.alg
            || self.public_key.key.is_private()
            || !self.private_key.key.is_private()
        {
            return Err(FormatError::PairMismatch);
        }
        Ok(())
    }
}

/// Anything a user may hand us as a key file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyBundle {
    Pair(ExportedKeyPair),
    Single(ExportedKey),
}

impl KeyBundle {
    /// Parse a key file, dispatching on shape before validating
    pub fn from_json(s: &str) -> Result<Self, FormatError> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        let bundle = if value.get("publicKey").is_some() || value.get("privateKey").is_some() {
            KeyBundle::Pair(serde_json::from_value(value)?)
        } else {
            KeyBundle::Single(serde_json::from_value(value)?)
        };

        match &bundle {
            KeyBundle::Pair(pair) => pair.validate()?,
            KeyBundle::Single(key) => key.validate()?,
        }

        Ok(bundle)
    }

    pub fn kid(&self) -> Kid {
        match self {
            KeyBundle::Pair(pair) => pair.kid(),
            KeyBundle::Single(key) => key.kid,
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), FormatError> {
    let len = name.chars().count();
    if !(MIN_KEY_NAME_LENGTH..=MAX_KEY_NAME_LENGTH).contains(&len) {
        return Err(FormatError::InvalidName(len));
    }
    Ok(())
}

/// Role of a locally stored key record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyVariant {
    /// Public half of one of our own key pairs
    Public,
    /// Private half of one of our own key pairs
    Private,
    /// A key someone else gave us
    Imported,
}

impl KeyVariant {
    pub const ALL: [KeyVariant; 3] = [KeyVariant::Public, KeyVariant::Private, KeyVariant::Imported];

    /// Storage slot name of `kid` under this variant, `{variant}-key-{kid}`
    pub fn slot(&self, kid: &Kid) -> String {
        format!("{}-key-{}", self.as_str(), kid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyVariant::Public => "public",
            KeyVariant::Private => "private",
            KeyVariant::Imported => "imported",
        }
    }
}

impl fmt::Display for KeyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(KeyVariant::Public),
            "private" => Ok(KeyVariant::Private),
            "imported" => Ok(KeyVariant::Imported),
            other => Err(format!("unknown key variant: {}", other)),
        }
    }
}
