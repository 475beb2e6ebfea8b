//! Key transport: the CEK is RSA-encrypted under the recipient's public key.

use alloc::vec::Vec;
use der::asn1::{Null, OctetString};
use der::Any;
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::WrapParams;
use crate::asn1::{CmsVersion, KeyTransRecipientInfo, RecipientIdentifier, SubjectKeyIdentifier};
use crate::cert::CertificateInfo;
use crate::context::RecipientIdentifierKind;
use crate::errors::{Error, Result};
use crate::keys::PrivateKey;
use crate::oid;

pub(crate) fn encode<R: CryptoRngCore>(
    rng: &mut R,
    recipient: &CertificateInfo,
    cek: &[u8],
    params: &WrapParams<'_>,
) -> Result<KeyTransRecipientInfo> {
    let (version, rid) = match params.id_kind {
        RecipientIdentifierKind::IssuerAndSerial => (
            CmsVersion::V0,
            RecipientIdentifier::IssuerAndSerialNumber(recipient.issuer_and_serial()),
        ),
        RecipientIdentifierKind::SubjectKeyId => (
            CmsVersion::V2,
            RecipientIdentifier::SubjectKeyIdentifier(SubjectKeyIdentifier(OctetString::new(
                recipient.subject_key_id(),
            )?)),
        ),
    };

    let enc_key = recipient
        .public_key()
        .encrypt_key(rng, cek, params.max_rsa_bits)?;

    Ok(KeyTransRecipientInfo {
        version,
        rid,
        key_enc_alg: AlgorithmIdentifierOwned {
            oid: oid::RSA_ENCRYPTION,
            parameters: Some(Any::from(Null)),
        },
        enc_key: OctetString::new(enc_key)?,
    })
}

/// Does this KTRI name `cert`?
pub(crate) fn matches(ktri: &KeyTransRecipientInfo, cert: &CertificateInfo) -> Result<bool> {
    match &ktri.rid {
        RecipientIdentifier::IssuerAndSerialNumber(ias) => cert.matches_issuer_and_serial(ias),
        RecipientIdentifier::SubjectKeyIdentifier(ski) => {
            Ok(cert.matches_subject_key_id(ski.0.as_bytes()))
        }
    }
}

pub(crate) fn decrypt(ktri: &KeyTransRecipientInfo, key: &PrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    if !matches!(ktri.version, CmsVersion::V0 | CmsVersion::V2) {
        return Err(Error::Version);
    }
    if ktri.key_enc_alg.oid != oid::RSA_ENCRYPTION {
        return Err(Error::UnsupportedAlgorithm);
    }
    key.decrypt_key(ktri.enc_key.as_bytes())
}
