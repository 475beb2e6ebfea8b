//! Public and private keys for the supported algorithm families.

use alloc::{vec, vec::Vec};
use const_oid::ObjectIdentifier;
use pkcs1::DecodeRsaPrivateKey;
use rand_core::CryptoRngCore;
use rsa::{
    traits::PublicKeyParts, BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey,
};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use spki::SubjectPublicKeyInfoOwned;
use zeroize::Zeroizing;

use crate::algorithms::{DigestAlgorithm, SignatureAlgorithm};
use crate::errors::{Error, Result};
use crate::oid;

/// A recipient or signer public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA public key
    Rsa(RsaPublicKey),
    /// NIST P-256 public key
    P256(p256::PublicKey),
    /// NIST P-384 public key
    P384(p384::PublicKey),
}

impl PublicKey {
    /// Decode a `SubjectPublicKeyInfo`, accepting RSA moduli of up to
    /// `max_rsa_bits` bits.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned, max_rsa_bits: usize) -> Result<Self> {
        let bits = spki.subject_public_key.raw_bytes();
        match spki.algorithm.oid {
            oid::RSA_ENCRYPTION => Ok(PublicKey::Rsa(rsa_public_key(bits, max_rsa_bits)?)),
            oid::ID_EC_PUBLIC_KEY => match curve_oid(spki)? {
                oid::SECP256R1 => Ok(PublicKey::P256(p256::PublicKey::from_sec1_bytes(bits)?)),
                oid::SECP384R1 => Ok(PublicKey::P384(p384::PublicKey::from_sec1_bytes(bits)?)),
                _ => Err(Error::UnsupportedAlgorithm),
            },
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// Algorithm OID of the key: `rsaEncryption` or `id-ecPublicKey`.
    pub fn algorithm_oid(&self) -> ObjectIdentifier {
        match self {
            PublicKey::Rsa(_) => oid::RSA_ENCRYPTION,
            PublicKey::P256(_) | PublicKey::P384(_) => oid::ID_EC_PUBLIC_KEY,
        }
    }

    /// Returns `true` for the elliptic curve variants.
    pub fn is_ec(&self) -> bool {
        !matches!(self, PublicKey::Rsa(_))
    }

    /// The signature algorithm this key produces with `digest`.
    pub fn signature_algorithm(&self, digest: DigestAlgorithm) -> SignatureAlgorithm {
        match self {
            PublicKey::Rsa(_) => SignatureAlgorithm::Rsa(digest),
            PublicKey::P256(_) | PublicKey::P384(_) => SignatureAlgorithm::Ecdsa(digest),
        }
    }

    /// Verify `signature` over the precomputed digest `hashed`.
    ///
    /// RSA signatures are checked as a `DigestInfo` first, then as a bare digest.
    pub(crate) fn verify(
        &self,
        alg: SignatureAlgorithm,
        hashed: &[u8],
        signature: &[u8],
        max_rsa_bits: usize,
    ) -> Result<()> {
        match (self, alg) {
            (PublicKey::Rsa(key), SignatureAlgorithm::Rsa(digest)) => {
                check_rsa_size(key, max_rsa_bits)?;
                if key.verify(digest.pkcs1v15_sign(), hashed, signature).is_ok() {
                    return Ok(());
                }
                tracing::warn!("DigestInfo signature check failed, trying raw digest");
                key.verify(Pkcs1v15Sign::new_unprefixed(), hashed, signature)
                    .map_err(|_| Error::SignatureVerification)
            }
            (PublicKey::P256(key), SignatureAlgorithm::Ecdsa(_)) => {
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| Error::SignatureVerification)?;
                let prehash = field_prehash(hashed, p256::FieldBytes::default().len());
                Ok(p256::ecdsa::VerifyingKey::from(key).verify_prehash(&prehash, &sig)?)
            }
            (PublicKey::P384(key), SignatureAlgorithm::Ecdsa(_)) => {
                let sig = p384::ecdsa::Signature::from_der(signature)
                    .map_err(|_| Error::SignatureVerification)?;
                let prehash = field_prehash(hashed, p384::FieldBytes::default().len());
                Ok(p384::ecdsa::VerifyingKey::from(key).verify_prehash(&prehash, &sig)?)
            }
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// RSA PKCS#1 v1.5 encryption of a content-encryption key.
    pub(crate) fn encrypt_key<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        key: &[u8],
        max_rsa_bits: usize,
    ) -> Result<Vec<u8>> {
        match self {
            PublicKey::Rsa(pk) => {
                check_rsa_size(pk, max_rsa_bits)?;
                Ok(pk.encrypt(rng, Pkcs1v15Encrypt, key)?)
            }
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }
}

/// Decode a PKCS#1 `RSAPublicKey` with an explicit modulus ceiling.
fn rsa_public_key(bits: &[u8], max_rsa_bits: usize) -> Result<RsaPublicKey> {
    let key = pkcs1::RsaPublicKey::try_from(bits).map_err(|_| Error::KeyDecode)?;
    let n = BigUint::from_bytes_be(key.modulus.as_bytes());
    let e = BigUint::from_bytes_be(key.public_exponent.as_bytes());
    Ok(RsaPublicKey::new_with_max_size(n, e, max_rsa_bits)?)
}

/// Left-pad a digest shorter than the curve's field to the field size.
///
/// `bits2field` rejects digests under half the field length (SHA-1 on
/// P-384); the padded digest is the same integer under SEC1 `bits2int`.
fn field_prehash(hashed: &[u8], field_len: usize) -> Vec<u8> {
    let mut prehash = vec![0u8; field_len.saturating_sub(hashed.len())];
    prehash.extend_from_slice(hashed);
    prehash
}

fn curve_oid(spki: &SubjectPublicKeyInfoOwned) -> Result<ObjectIdentifier> {
    let params = spki.algorithm.parameters.as_ref().ok_or(Error::KeyDecode)?;
    params
        .decode_as::<ObjectIdentifier>()
        .map_err(|_| Error::KeyDecode)
}

fn check_rsa_size(key: &RsaPublicKey, max_rsa_bits: usize) -> Result<()> {
    if key.size() * 8 > max_rsa_bits {
        return Err(Error::InvalidArgument("RSA modulus exceeds max_rsa_bits"));
    }
    Ok(())
}

/// A signer's or recipient's private key.
///
/// The EC variants wipe their scalar on drop; the RSA variant zeroizes its
/// components on drop as well.
#[derive(Clone)]
pub enum PrivateKey {
    /// RSA private key
    Rsa(RsaPrivateKey),
    /// NIST P-256 secret scalar
    P256(p256::SecretKey),
    /// NIST P-384 secret scalar
    P384(p384::SecretKey),
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            PrivateKey::Rsa(_) => "Rsa",
            PrivateKey::P256(_) => "P256",
            PrivateKey::P384(_) => "P384",
        };
        f.debug_tuple("PrivateKey").field(&name).finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Decode a PKCS#8 `PrivateKeyInfo`, a PKCS#1 `RSAPrivateKey` or a SEC1
    /// `ECPrivateKey` document.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if let Ok(info) = pkcs8::PrivateKeyInfo::try_from(der) {
            return Self::from_pkcs8(info);
        }
        if let Ok(key) = RsaPrivateKey::from_pkcs1_der(der) {
            return Ok(PrivateKey::Rsa(key));
        }
        if let Ok(key) = p256::SecretKey::from_sec1_der(der) {
            return Ok(PrivateKey::P256(key));
        }
        if let Ok(key) = p384::SecretKey::from_sec1_der(der) {
            return Ok(PrivateKey::P384(key));
        }
        Err(Error::KeyDecode)
    }

    fn from_pkcs8(info: pkcs8::PrivateKeyInfo<'_>) -> Result<Self> {
        match info.algorithm.oid {
            oid::RSA_ENCRYPTION => Ok(PrivateKey::Rsa(RsaPrivateKey::try_from(info)?)),
            oid::ID_EC_PUBLIC_KEY => match info.algorithm.parameters_oid()? {
                oid::SECP256R1 => Ok(PrivateKey::P256(p256::SecretKey::try_from(info)?)),
                oid::SECP384R1 => Ok(PrivateKey::P384(p384::SecretKey::try_from(info)?)),
                _ => Err(Error::UnsupportedAlgorithm),
            },
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
            PrivateKey::P256(key) => PublicKey::P256(key.public_key()),
            PrivateKey::P384(key) => PublicKey::P384(key.public_key()),
        }
    }

    /// Sign the precomputed digest `hashed`.
    ///
    /// RSA wraps the digest in a `DigestInfo`; ECDSA signs the raw digest and
    /// returns a DER `Ecdsa-Sig-Value`.
    pub(crate) fn sign<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        alg: SignatureAlgorithm,
        hashed: &[u8],
        max_rsa_bits: usize,
    ) -> Result<Vec<u8>> {
        match (self, alg) {
            (PrivateKey::Rsa(key), SignatureAlgorithm::Rsa(digest)) => {
                check_rsa_size(key.as_ref(), max_rsa_bits)?;
                Ok(key.sign_with_rng(rng, digest.pkcs1v15_sign(), hashed)?)
            }
            (PrivateKey::P256(key), SignatureAlgorithm::Ecdsa(_)) => {
                let prehash = field_prehash(hashed, p256::FieldBytes::default().len());
                let sig: p256::ecdsa::Signature = p256::ecdsa::SigningKey::from(key)
                    .sign_prehash(&prehash)
                    .map_err(|_| Error::InvalidArgument("ECDSA prehash"))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            (PrivateKey::P384(key), SignatureAlgorithm::Ecdsa(_)) => {
                let prehash = field_prehash(hashed, p384::FieldBytes::default().len());
                let sig: p384::ecdsa::Signature = p384::ecdsa::SigningKey::from(key)
                    .sign_prehash(&prehash)
                    .map_err(|_| Error::InvalidArgument("ECDSA prehash"))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// RSA PKCS#1 v1.5 decryption of a transported content-encryption key.
    pub(crate) fn decrypt_key(&self, encrypted: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            PrivateKey::Rsa(key) => Ok(Zeroizing::new(key.decrypt(Pkcs1v15Encrypt, encrypted)?)),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// DER `SubjectPublicKeyInfo` of the matching public key.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        use pkcs8::EncodePublicKey;

        let doc = match self {
            PrivateKey::Rsa(key) => key.to_public_key().to_public_key_der()?,
            PrivateKey::P256(key) => key.public_key().to_public_key_der()?,
            PrivateKey::P384(key) => key.public_key().to_public_key_der()?,
        };
        Ok(doc.into_vec())
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(key: RsaPrivateKey) -> Self {
        PrivateKey::Rsa(key)
    }
}

impl From<p256::SecretKey> for PrivateKey {
    fn from(key: p256::SecretKey) -> Self {
        PrivateKey::P256(key)
    }
}

impl From<p384::SecretKey> for PrivateKey {
    fn from(key: p384::SecretKey) -> Self {
        PrivateKey::P384(key)
    }
}
