//! Throwaway certificates and keys shared by the integration tests.
//!
//! WARNING: the RSA keys are 1024 bits and the certificates carry a dummy
//! signature. Nothing here is suitable outside of tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::time::Duration;

use cms_codec::{
    der::{
        asn1::{BitString, OctetString, UintRef, UtcTime},
        Any, Decode, Encode,
    },
    oid, p256, p384, rsa,
    spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned},
    x509_cert::{
        certificate::{TbsCertificate, Version},
        ext::{pkix::SubjectKeyIdentifier, Extension},
        name::Name,
        serial_number::SerialNumber,
        time::{Time, Validity},
        Certificate,
    },
};
use const_oid::AssociatedOid;
use pkcs8::{EncodePrivateKey, EncodePublicKey};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

pub const ISSUER: &str = "CN=CMS Test CA,O=RustCrypto";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    P256,
    P384,
}

/// A certificate and its PKCS#8 private key, both DER.
pub struct Identity {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// Deterministic RNG for a test.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Identity with a subject key identifier extension.
pub fn identity(kind: KeyKind, seed: u64) -> Identity {
    build(kind, seed, true)
}

/// Identity without a subject key identifier extension.
pub fn identity_without_ski(kind: KeyKind, seed: u64) -> Identity {
    build(kind, seed, false)
}

fn build(kind: KeyKind, seed: u64, with_ski: bool) -> Identity {
    let mut rng = rng(seed);
    let (spki, key) = match kind {
        KeyKind::Rsa => {
            let key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
            let spki = key.to_public_key().to_public_key_der().unwrap();
            (spki, key.to_pkcs8_der().unwrap())
        }
        KeyKind::P256 => {
            let key = p256::SecretKey::random(&mut rng);
            let spki = key.public_key().to_public_key_der().unwrap();
            (spki, key.to_pkcs8_der().unwrap())
        }
        KeyKind::P384 => {
            let key = p384::SecretKey::random(&mut rng);
            let spki = key.public_key().to_public_key_der().unwrap();
            (spki, key.to_pkcs8_der().unwrap())
        }
    };

    let spki = SubjectPublicKeyInfoOwned::from_der(spki.as_bytes()).unwrap();
    let cert = certificate(seed, spki, with_ski);
    Identity {
        cert,
        key: key.as_bytes().to_vec(),
    }
}

/// Certificate for a bare RSA public key with the given modulus. There is no
/// matching private key.
pub fn rsa_certificate(modulus: &[u8], seed: u64) -> Vec<u8> {
    let key = pkcs1::RsaPublicKey {
        modulus: UintRef::new(modulus).unwrap(),
        public_exponent: UintRef::new(&[0x01, 0x00, 0x01]).unwrap(),
    };
    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: oid::RSA_ENCRYPTION,
            parameters: Some(Any::null()),
        },
        subject_public_key: BitString::from_bytes(&key.to_der().unwrap()).unwrap(),
    };
    certificate(seed, spki, true)
}

fn certificate(seed: u64, spki: SubjectPublicKeyInfoOwned, with_ski: bool) -> Vec<u8> {
    let signature_alg = AlgorithmIdentifierOwned {
        oid: oid::SHA256_WITH_RSA,
        parameters: None,
    };

    let extensions = if with_ski {
        let ski = SubjectKeyIdentifier(OctetString::new(seed.to_be_bytes().to_vec()).unwrap());
        Some(vec![Extension {
            extn_id: SubjectKeyIdentifier::OID,
            critical: false,
            extn_value: OctetString::new(ski.to_der().unwrap()).unwrap(),
        }])
    } else {
        None
    };

    // 2024-01-01 .. 2034-01-01
    let not_before = UtcTime::from_unix_duration(Duration::from_secs(1_704_067_200)).unwrap();
    let not_after = UtcTime::from_unix_duration(Duration::from_secs(2_019_686_400)).unwrap();

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[0x4a, seed as u8, 0x01]).unwrap(),
        signature: signature_alg.clone(),
        issuer: Name::from_str(ISSUER).unwrap(),
        validity: Validity {
            not_before: Time::UtcTime(not_before),
            not_after: Time::UtcTime(not_after),
        },
        subject: Name::from_str(&format!("CN=test subject {seed}")).unwrap(),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions,
    };

    Certificate {
        tbs_certificate,
        signature_algorithm: signature_alg,
        signature: BitString::from_bytes(&[0u8; 16]).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// Index of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found")
}
