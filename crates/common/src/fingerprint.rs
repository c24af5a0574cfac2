//! Human-comparable key fingerprints
//!
//! A fingerprint is the MD5 of an RSA key's modulus, taken over the base64url
//! text exactly as it appears in the key's JWK, rendered as colon separated
//! lowercase hex pairs. It depends on nothing but the modulus, so the public
//! and private halves of a pair share one fingerprint.

use md5::{Digest, Md5};

use crate::crypto::{export_key, ImportedKey};
use crate::key_format::{ExportedKey, KeyType};

/// Shown for keys that have no fingerprint
pub const UNKNOWN_FINGERPRINT: &str = "?";

/// Fingerprint of an exported key, or `"?"` for anything but RSA
pub fn fingerprint(key: &ExportedKey) -> String {
    match (key.key.kty, key.key.n.as_deref()) {
        (KeyType::Rsa, Some(n)) => render(n.as_bytes()),
        _ => UNKNOWN_FINGERPRINT.to_string(),
    }
}

pub fn fingerprint_imported(key: &ImportedKey) -> String {
    fingerprint(&export_key(key))
}

fn render(input: &[u8]) -> String {
    let digest = hex::encode(Md5::digest(input));
    digest
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{generate_asymmetric_keypair, KeyPairParams};
    use crate::key_format::{AlgorithmDescriptor, HashAlgorithm, Jwk};
    use crate::kid::Kid;

    fn rsa_record(n: &str) -> ExportedKey {
        let mut jwk = Jwk::empty(KeyType::Rsa);
        jwk.n = Some(n.to_string());
        jwk.e = Some("AQAB".to_string());
        ExportedKey {
            name: "fingerprint".to_string(),
            kid: Kid::generate(),
            usages: Default::default(),
            alg: AlgorithmDescriptor::RsaOaep {
                hash: HashAlgorithm::Sha256,
            },
            key: jwk,
        }
    }

    #[test]
    fn test_known_digest() {
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        assert_eq!(
            fingerprint(&rsa_record("abc")),
            "90:01:50:98:3c:d2:4f:b0:d6:96:3f:7d:28:e1:7f:72"
        );
    }

    #[test]
    fn test_format() {
        let fp = fingerprint(&rsa_record("sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri"));
        assert_eq!(fp.len(), 16 * 2 + 15);
        assert_eq!(fp.split(':').count(), 16);
        assert!(fp.chars().all(|c| c == ':' || c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pair_shares_fingerprint() {
        let params = KeyPairParams::rsa_oaep("pair", Kid::generate(), HashAlgorithm::Sha256);
        let pair = generate_asymmetric_keypair(&params).unwrap();
        let public = fingerprint_imported(&pair.public_key);
        assert_ne!(public, UNKNOWN_FINGERPRINT);
        assert_eq!(public, fingerprint_imported(&pair.private_key));
        assert_eq!(public, fingerprint_imported(&pair.public_key));
    }

    #[test]
    fn test_non_rsa_is_unknown() {
        let mut record = rsa_record("abc");
        record.key = Jwk::empty(KeyType::Ec);
        assert_eq!(fingerprint(&record), "?");
    }
}
