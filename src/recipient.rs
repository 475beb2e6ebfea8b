//! Recipient-key strategies: how the content-encryption key reaches each
//! recipient of an EnvelopedData.

pub(crate) mod kari;
pub(crate) mod ktri;

use alloc::vec::Vec;
use der::{Any, Tag, Tagged};
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::algorithms::{KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::asn1::{self, KeyAgreeRecipientInfo, KeyTransRecipientInfo, KARI_TAG};
use crate::cert::CertificateInfo;
use crate::context::RecipientIdentifierKind;
use crate::errors::Result;
use crate::keys::{PrivateKey, PublicKey};

/// Encode-side parameters shared by every recipient of one message.
pub(crate) struct WrapParams<'p> {
    pub id_kind: RecipientIdentifierKind,
    pub key_agreement: KeyAgreementAlgorithm,
    pub key_wrap: KeyWrapAlgorithm,
    pub ukm: Option<&'p [u8]>,
    pub max_rsa_bits: usize,
}

/// A RecipientInfo ready for the SET, and whether it forces EnvelopedData v2.
pub(crate) struct EncodedRecipient {
    pub info: Any,
    pub version: u8,
}

/// Wrap `cek` for `recipient`, choosing key transport for RSA keys and key
/// agreement for EC keys.
pub(crate) fn wrap_for<R: CryptoRngCore>(
    rng: &mut R,
    recipient: &CertificateInfo,
    cek: &[u8],
    params: &WrapParams<'_>,
) -> Result<EncodedRecipient> {
    match recipient.public_key() {
        PublicKey::Rsa(_) => {
            let ktri = ktri::encode(rng, recipient, cek, params)?;
            tracing::trace!(version = ?ktri.version, "built KeyTransRecipientInfo");
            Ok(EncodedRecipient {
                version: ktri.version as u8,
                info: asn1::to_any(&ktri)?,
            })
        }
        PublicKey::P256(_) | PublicKey::P384(_) => {
            let kari = kari::encode(rng, recipient, cek, params)?;
            tracing::trace!("built KeyAgreeRecipientInfo");
            Ok(EncodedRecipient {
                version: kari.version as u8,
                info: asn1::retag(&kari, KARI_TAG)?,
            })
        }
    }
}

/// Walk the RecipientInfo SET and recover the CEK from the first entry that
/// names `cert`. Entries that do not match are never unwrapped.
pub(crate) fn unwrap_for(
    infos: &[Any],
    cert: &CertificateInfo,
    key: &PrivateKey,
) -> Result<Option<Zeroizing<Vec<u8>>>> {
    for (index, info) in infos.iter().enumerate() {
        match info.tag() {
            Tag::Sequence => {
                let ktri: KeyTransRecipientInfo = info.decode_as()?;
                if ktri::matches(&ktri, cert)? {
                    tracing::trace!(index, "KeyTransRecipientInfo matches");
                    return ktri::decrypt(&ktri, key).map(Some);
                }
                tracing::trace!(index, "KeyTransRecipientInfo skipped");
            }
            KARI_TAG => {
                let kari: KeyAgreeRecipientInfo = asn1::untag(info)?;
                if let Some(enc_key) = kari::find(&kari, cert)? {
                    tracing::trace!(index, "KeyAgreeRecipientInfo matches");
                    return kari::decrypt(&kari, enc_key, key).map(Some);
                }
                tracing::trace!(index, "KeyAgreeRecipientInfo skipped");
            }
            tag => {
                tracing::trace!(index, %tag, "unsupported RecipientInfo variant skipped");
            }
        }
    }
    Ok(None)
}
