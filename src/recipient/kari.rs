//! Key agreement: ephemeral-static ECDH, X9.63 KDF over ECC-CMS-SharedInfo,
//! then AES key wrap of the CEK (RFC 5753).

use aes::cipher::generic_array::GenericArray;
use aes_kw::{KekAes128, KekAes192, KekAes256};
use alloc::vec;
use alloc::vec::Vec;
use der::asn1::{BitString, OctetString};
use der::Encode;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::WrapParams;
use crate::algorithms::{KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::asn1::{
    self, CmsVersion, EccCmsSharedInfo, KeyAgreeRecipientIdentifier, KeyAgreeRecipientInfo,
    OriginatorIdentifierOrKey, OriginatorPublicKey, RecipientEncryptedKey, RecipientKeyIdentifier,
    SubjectKeyIdentifier,
};
use crate::cert::CertificateInfo;
use crate::context::RecipientIdentifierKind;
use crate::errors::{Error, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::oid;

pub(crate) fn encode<R: CryptoRngCore>(
    rng: &mut R,
    recipient: &CertificateInfo,
    cek: &[u8],
    params: &WrapParams<'_>,
) -> Result<KeyAgreeRecipientInfo> {
    let (ephemeral, curve) = match recipient.public_key() {
        PublicKey::P256(_) => (PrivateKey::P256(p256::SecretKey::random(rng)), oid::SECP256R1),
        PublicKey::P384(_) => (PrivateKey::P384(p384::SecretKey::random(rng)), oid::SECP384R1),
        PublicKey::Rsa(_) => return Err(Error::UnsupportedAlgorithm),
    };

    let peer = recipient
        .subject_public_key_info()
        .subject_public_key
        .raw_bytes();
    let secret = shared_secret(&ephemeral, peer)?;

    let key_info = params.key_wrap.algorithm_identifier();
    let kek = derive_kek(
        params.key_agreement,
        &key_info,
        params.key_wrap.key_size(),
        &secret,
        params.ukm,
    )?;
    let enc_key = wrap(params.key_wrap, &kek, cek)?;

    let rid = match params.id_kind {
        RecipientIdentifierKind::IssuerAndSerial => {
            KeyAgreeRecipientIdentifier::IssuerAndSerialNumber(recipient.issuer_and_serial())
        }
        RecipientIdentifierKind::SubjectKeyId => {
            KeyAgreeRecipientIdentifier::RKeyId(RecipientKeyIdentifier {
                subject_key_identifier: SubjectKeyIdentifier(OctetString::new(
                    recipient.subject_key_id(),
                )?),
                date: None,
                other: None,
            })
        }
    };

    Ok(KeyAgreeRecipientInfo {
        version: CmsVersion::V3,
        originator: OriginatorIdentifierOrKey::OriginatorKey(OriginatorPublicKey {
            algorithm: AlgorithmIdentifierOwned {
                oid: oid::ID_EC_PUBLIC_KEY,
                parameters: Some(asn1::to_any(&curve)?),
            },
            public_key: BitString::from_bytes(&ec_point(&ephemeral.public_key())?)?,
        }),
        ukm: params.ukm.map(OctetString::new).transpose()?,
        key_enc_alg: AlgorithmIdentifierOwned {
            oid: params.key_agreement.oid(),
            parameters: Some(asn1::to_any(&key_info)?),
        },
        recipient_enc_keys: vec![RecipientEncryptedKey {
            rid,
            enc_key: OctetString::new(enc_key)?,
        }],
    })
}

/// Find the encrypted key addressed to `cert`, if any.
pub(crate) fn find<'k>(
    kari: &'k KeyAgreeRecipientInfo,
    cert: &CertificateInfo,
) -> Result<Option<&'k [u8]>> {
    for rek in &kari.recipient_enc_keys {
        let hit = match &rek.rid {
            KeyAgreeRecipientIdentifier::IssuerAndSerialNumber(ias) => {
                cert.matches_issuer_and_serial(ias)?
            }
            KeyAgreeRecipientIdentifier::RKeyId(rkey) => {
                cert.matches_subject_key_id(rkey.subject_key_identifier.0.as_bytes())
            }
        };
        if hit {
            return Ok(Some(rek.enc_key.as_bytes()));
        }
    }
    Ok(None)
}

/// Recover the CEK from `enc_key` using the recipient's static private key.
pub(crate) fn decrypt(
    kari: &KeyAgreeRecipientInfo,
    enc_key: &[u8],
    key: &PrivateKey,
) -> Result<Zeroizing<Vec<u8>>> {
    if kari.version != CmsVersion::V3 {
        return Err(Error::Version);
    }

    let key_agreement = KeyAgreementAlgorithm::from_oid(kari.key_enc_alg.oid)?;
    let key_info = kari
        .key_enc_alg
        .parameters
        .as_ref()
        .ok_or(Error::UnsupportedAlgorithm)?
        .decode_as::<AlgorithmIdentifierOwned>()?;
    let key_wrap = KeyWrapAlgorithm::from_oid(key_info.oid)?;

    let originator = match &kari.originator {
        OriginatorIdentifierOrKey::OriginatorKey(originator) => originator,
        _ => return Err(Error::UnsupportedAlgorithm),
    };
    let secret = shared_secret(key, originator.public_key.raw_bytes())?;

    let ukm = kari.ukm.as_ref().map(|ukm| ukm.as_bytes());
    let kek = derive_kek(key_agreement, &key_info, key_wrap.key_size(), &secret, ukm)?;
    unwrap(key_wrap, &kek, enc_key)
}

/// Raw ECDH shared secret between `key` and the SEC1-encoded point `peer`.
pub(crate) fn shared_secret(key: &PrivateKey, peer: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    match key {
        PrivateKey::P256(sk) => {
            let pk = p256::PublicKey::from_sec1_bytes(peer)?;
            let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        PrivateKey::P384(sk) => {
            let pk = p384::PublicKey::from_sec1_bytes(peer)?;
            let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        PrivateKey::Rsa(_) => Err(Error::UnsupportedAlgorithm),
    }
}

fn ec_point(key: &PublicKey) -> Result<Vec<u8>> {
    match key {
        PublicKey::P256(pk) => Ok(pk.to_encoded_point(false).as_bytes().to_vec()),
        PublicKey::P384(pk) => Ok(pk.to_encoded_point(false).as_bytes().to_vec()),
        PublicKey::Rsa(_) => Err(Error::UnsupportedAlgorithm),
    }
}

/// KEK = X9.63-KDF(Z, DER(ECC-CMS-SharedInfo)).
fn derive_kek(
    key_agreement: KeyAgreementAlgorithm,
    key_info: &AlgorithmIdentifierOwned,
    kek_len: usize,
    secret: &[u8],
    ukm: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>> {
    let bits = u32::try_from(kek_len * 8).map_err(|_| Error::InvalidArgument("KEK length"))?;
    let shared_info = EccCmsSharedInfo {
        key_info: key_info.clone(),
        entity_u_info: ukm.map(OctetString::new).transpose()?,
        supp_pub_info: OctetString::new(bits.to_be_bytes().to_vec())?,
    }
    .to_der()?;

    let mut kek = Zeroizing::new(vec![0u8; kek_len]);
    key_agreement
        .kdf_digest()
        .x963_kdf(secret, &shared_info, &mut kek)?;
    Ok(kek)
}

fn wrap(alg: KeyWrapAlgorithm, kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    if kek.len() != alg.key_size() {
        return Err(Error::InvalidArgument("KEK length"));
    }
    // RFC 3394 wraps at least two 64-bit blocks
    if cek.len() < 16 || cek.len() % 8 != 0 {
        return Err(Error::InvalidArgument("key wrap input length"));
    }

    let mut out = vec![0u8; cek.len() + 8];
    match alg {
        KeyWrapAlgorithm::Aes128Wrap => {
            KekAes128::new(GenericArray::from_slice(kek)).wrap(cek, &mut out)?
        }
        KeyWrapAlgorithm::Aes192Wrap => {
            KekAes192::new(GenericArray::from_slice(kek)).wrap(cek, &mut out)?
        }
        KeyWrapAlgorithm::Aes256Wrap => {
            KekAes256::new(GenericArray::from_slice(kek)).wrap(cek, &mut out)?
        }
    }
    Ok(out)
}

fn unwrap(alg: KeyWrapAlgorithm, kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if kek.len() != alg.key_size() {
        return Err(Error::InvalidArgument("KEK length"));
    }
    if wrapped.len() < 16 || wrapped.len() % 8 != 0 {
        return Err(Error::Decryption);
    }

    let mut out = Zeroizing::new(vec![0u8; wrapped.len() - 8]);
    match alg {
        KeyWrapAlgorithm::Aes128Wrap => {
            KekAes128::new(GenericArray::from_slice(kek)).unwrap(wrapped, &mut out)?
        }
        KeyWrapAlgorithm::Aes192Wrap => {
            KekAes192::new(GenericArray::from_slice(kek)).unwrap(wrapped, &mut out)?
        }
        KeyWrapAlgorithm::Aes256Wrap => {
            KekAes256::new(GenericArray::from_slice(kek)).unwrap(wrapped, &mut out)?
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_shared_secret_agrees_p256() {
        let mut rng = ChaCha8Rng::from_seed([1; 32]);
        let alice = PrivateKey::P256(p256::SecretKey::random(&mut rng));
        let bob = PrivateKey::P256(p256::SecretKey::random(&mut rng));

        let a = shared_secret(&alice, &ec_point(&bob.public_key()).unwrap()).unwrap();
        let b = shared_secret(&bob, &ec_point(&alice.public_key()).unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_shared_secret_agrees_p384() {
        let mut rng = ChaCha8Rng::from_seed([2; 32]);
        let alice = PrivateKey::P384(p384::SecretKey::random(&mut rng));
        let bob = PrivateKey::P384(p384::SecretKey::random(&mut rng));

        let a = shared_secret(&alice, &ec_point(&bob.public_key()).unwrap()).unwrap();
        let b = shared_secret(&bob, &ec_point(&alice.public_key()).unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 48);
    }

    #[test]
    fn test_curve_mismatch() {
        let mut rng = ChaCha8Rng::from_seed([3; 32]);
        let p256_key = PrivateKey::P256(p256::SecretKey::random(&mut rng));
        let p384_key = PrivateKey::P384(p384::SecretKey::random(&mut rng));

        let point = ec_point(&p384_key.public_key()).unwrap();
        assert_eq!(shared_secret(&p256_key, &point).unwrap_err(), Error::KeyDecode);
    }

    #[test]
    fn test_key_wrap_rfc3394() {
        let kek = hex!("000102030405060708090A0B0C0D0E0F");
        let key = hex!("00112233445566778899AABBCCDDEEFF");
        let wrapped = wrap(KeyWrapAlgorithm::Aes128Wrap, &kek, &key).unwrap();
        assert_eq!(
            wrapped,
            hex!("1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5")
        );

        let unwrapped = unwrap(KeyWrapAlgorithm::Aes128Wrap, &kek, &wrapped).unwrap();
        assert_eq!(unwrapped.as_slice(), key);

        let mut tampered = wrapped.clone();
        tampered[5] ^= 1;
        assert_eq!(
            unwrap(KeyWrapAlgorithm::Aes128Wrap, &kek, &tampered).unwrap_err(),
            Error::Decryption
        );
    }

    #[test]
    fn test_kek_depends_on_ukm() {
        let secret = [0x5au8; 32];
        let key_info = KeyWrapAlgorithm::Aes256Wrap.algorithm_identifier();
        let ka = KeyAgreementAlgorithm::StdDhSha256Kdf;

        let plain = derive_kek(ka, &key_info, 32, &secret, None).unwrap();
        let again = derive_kek(ka, &key_info, 32, &secret, None).unwrap();
        let with_ukm = derive_kek(ka, &key_info, 32, &secret, Some(b"ukm")).unwrap();

        assert_eq!(plain, again);
        assert_ne!(plain, with_ukm);
        assert_eq!(plain.len(), 32);
    }
}
