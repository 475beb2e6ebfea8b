//! EnvelopedData: content encrypted under a fresh CEK, the CEK wrapped once
//! per recipient.

use alloc::{vec, vec::Vec};
use der::{
    asn1::{OctetString, SetOfVec},
    Any, Decode, Encode, Tag,
};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::asn1::{ContentInfo, EncryptedContentInfo, EnvelopedData};
use crate::cipher;
use crate::context::{write_out, MessageContext};
use crate::errors::{Error, Result};
use crate::oid;
use crate::recipient::{self, WrapParams};

/// Decoder states. Each state owns what the next one needs.
enum DecodeState {
    ParseHeader,
    ParseRecipients(EnvelopedData),
    ParseContentInfo {
        enveloped: EnvelopedData,
        cek: Zeroizing<Vec<u8>>,
    },
    Decrypt {
        alg: ContentEncryptionAlgorithm,
        cek: Zeroizing<Vec<u8>>,
        iv: Vec<u8>,
        ciphertext: Vec<u8>,
    },
    StripPadding {
        alg: ContentEncryptionAlgorithm,
        padded: Zeroizing<Vec<u8>>,
    },
    Done(Zeroizing<Vec<u8>>),
}

impl DecodeState {
    fn name(&self) -> &'static str {
        match self {
            DecodeState::ParseHeader => "ParseHeader",
            DecodeState::ParseRecipients(_) => "ParseRecipients",
            DecodeState::ParseContentInfo { .. } => "ParseContentInfo",
            DecodeState::Decrypt { .. } => "Decrypt",
            DecodeState::StripPadding { .. } => "StripPadding",
            DecodeState::Done(_) => "Done",
        }
    }
}

impl<'a> MessageContext<'a> {
    /// Encrypt the content under a fresh CEK and wrap the CEK for every
    /// recipient (the primary certificate when none were added).
    pub fn encode_enveloped_data<R: CryptoRngCore>(&self, rng: &mut R) -> Result<Vec<u8>> {
        let content = self.require_content()?;
        let recipients = if self.recipients.is_empty() {
            core::slice::from_ref(self.require_certificate()?)
        } else {
            &self.recipients[..]
        };

        let alg = self.content_cipher;
        tracing::debug!(
            content_len = content.len(),
            ?alg,
            recipients = recipients.len(),
            "encoding EnvelopedData"
        );

        let mut cek = Zeroizing::new(vec![0u8; alg.key_size()]);
        rng.fill_bytes(&mut cek);

        let params = WrapParams {
            id_kind: self.recipient_id,
            key_agreement: self.key_agreement,
            key_wrap: self.key_wrap,
            ukm: self.ukm.as_deref(),
            max_rsa_bits: self.config.max_rsa_bits,
        };

        let mut version = 0;
        let mut infos = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let encoded = recipient::wrap_for(rng, recipient, &cek, &params)?;
            if encoded.version != 0 {
                version = 2;
            }
            infos.push(encoded.info);
        }

        let mut iv = vec![0u8; alg.block_size()];
        rng.fill_bytes(&mut iv);
        let ciphertext = cipher::encrypt(alg, &cek, &iv, content)?;
        drop(cek);

        let enveloped = EnvelopedData {
            version,
            originator_info: None,
            recip_infos: SetOfVec::try_from(infos)?,
            encrypted_content: EncryptedContentInfo {
                content_type: self.content_type,
                content_enc_alg: AlgorithmIdentifierOwned {
                    oid: alg.oid(),
                    parameters: Some(Any::new(Tag::OctetString, iv)?),
                },
                encrypted_content: Some(OctetString::new(ciphertext)?),
            },
            unprotected_attrs: None,
        };

        let encoded = ContentInfo {
            content_type: oid::ID_ENVELOPED_DATA,
            content: Any::from_der(&enveloped.to_der()?)?,
        }
        .to_der()?;
        self.check_size(encoded.len())?;

        tracing::debug!(len = encoded.len(), version, "encoded EnvelopedData");
        Ok(encoded)
    }

    /// Like [`encode_enveloped_data`](Self::encode_enveloped_data), writing
    /// into `out`.
    pub fn encode_enveloped_data_into<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        out: &mut [u8],
    ) -> Result<usize> {
        write_out(&self.encode_enveloped_data(rng)?, out)
    }

    /// Decrypt an EnvelopedData addressed to the primary certificate using
    /// the configured private key.
    pub fn decode_enveloped_data(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self.run_enveloped_decoder(msg)?;
        Ok(plaintext.to_vec())
    }

    /// Like [`decode_enveloped_data`](Self::decode_enveloped_data), writing
    /// the plaintext into `out`.
    pub fn decode_enveloped_data_into(&mut self, msg: &[u8], out: &mut [u8]) -> Result<usize> {
        let plaintext = self.run_enveloped_decoder(msg)?;
        write_out(&plaintext, out)
    }

    fn run_enveloped_decoder(&mut self, msg: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.check_size(msg.len())?;
        tracing::debug!(len = msg.len(), "decoding EnvelopedData");

        let mut state = DecodeState::ParseHeader;
        loop {
            tracing::trace!(state = state.name(), "EnvelopedData decoder");
            state = match state {
                DecodeState::ParseHeader => {
                    let content_info = ContentInfo::from_der(msg)?;
                    if content_info.content_type != oid::ID_ENVELOPED_DATA {
                        return Err(Error::ContentTypeMismatch);
                    }
                    let enveloped = content_info.content.decode_as::<EnvelopedData>()?;
                    if enveloped.version != 0 && enveloped.version != 2 {
                        return Err(Error::Version);
                    }
                    DecodeState::ParseRecipients(enveloped)
                }
                DecodeState::ParseRecipients(enveloped) => {
                    let cert = self.require_certificate()?;
                    let key = self.require_private_key()?;
                    let cek = recipient::unwrap_for(enveloped.recip_infos.as_slice(), cert, key)?
                        .ok_or(Error::NoMatchingRecipient)?;
                    DecodeState::ParseContentInfo { enveloped, cek }
                }
                DecodeState::ParseContentInfo { enveloped, cek } => {
                    let eci = enveloped.encrypted_content;
                    let alg = ContentEncryptionAlgorithm::from_oid(eci.content_enc_alg.oid)?;
                    let iv = eci
                        .content_enc_alg
                        .parameters
                        .as_ref()
                        .ok_or_else(|| Error::from(Tag::OctetString.value_error()))?
                        .decode_as::<OctetString>()?;
                    if iv.as_bytes().len() != alg.block_size() {
                        return Err(Tag::OctetString.length_error().into());
                    }
                    let ciphertext = eci
                        .encrypted_content
                        .ok_or(Error::InvalidArgument("encrypted content absent"))?;
                    DecodeState::Decrypt {
                        alg,
                        cek,
                        iv: Vec::from(iv.into_bytes()),
                        ciphertext: Vec::from(ciphertext.into_bytes()),
                    }
                }
                DecodeState::Decrypt {
                    alg,
                    cek,
                    iv,
                    ciphertext,
                } => {
                    if cek.len() != alg.key_size() {
                        return Err(Error::Decryption);
                    }
                    let padded = cipher::decrypt_blocks(alg, &cek, &iv, &ciphertext)?;
                    DecodeState::StripPadding { alg, padded }
                }
                DecodeState::StripPadding { alg, mut padded } => {
                    let len = cipher::unpad(&padded, alg.block_size())?;
                    padded.truncate(len);
                    DecodeState::Done(padded)
                }
                DecodeState::Done(plaintext) => {
                    tracing::debug!(len = plaintext.len(), "decoded EnvelopedData");
                    return Ok(plaintext);
                }
            };
        }
    }
}
