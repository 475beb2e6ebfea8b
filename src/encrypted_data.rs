//! EncryptedData: content encrypted under a caller-supplied key, with an
//! optional SET of unprotected attributes.

use alloc::{vec, vec::Vec};
use der::{asn1::OctetString, Any, Decode, Encode, Tag};
use rand_core::CryptoRngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::asn1::{CmsVersion, ContentInfo, EncryptedContentInfo, EncryptedData};
use crate::cipher;
use crate::context::{decode_attributes, encode_attributes, write_out, MessageContext};
use crate::errors::{Error, Result};
use crate::oid;

const VERSION_PLAIN: CmsVersion = CmsVersion::V0;
const VERSION_WITH_ATTRIBUTES: CmsVersion = CmsVersion::V2;

impl<'a> MessageContext<'a> {
    /// Encrypt the content under the key set with
    /// [`set_encryption_key`](Self::set_encryption_key).
    pub fn encode_encrypted_data<R: CryptoRngCore>(&self, rng: &mut R) -> Result<Vec<u8>> {
        let content = self.require_content()?;
        let key = self.require_encryption_key()?;
        let alg = self.content_cipher;
        if key.len() != alg.key_size() {
            return Err(Error::InvalidArgument("content-encryption key length"));
        }
        tracing::debug!(
            content_len = content.len(),
            ?alg,
            attributes = self.unprotected_attributes.len(),
            "encoding EncryptedData"
        );

        let mut iv = vec![0u8; alg.block_size()];
        rng.fill_bytes(&mut iv);
        let ciphertext = cipher::encrypt(alg, key, &iv, content)?;

        let (version, unprotected_attrs) = if self.unprotected_attributes.is_empty() {
            (VERSION_PLAIN, None)
        } else {
            (
                VERSION_WITH_ATTRIBUTES,
                Some(encode_attributes(&self.unprotected_attributes)?),
            )
        };

        let encrypted = EncryptedData {
            version,
            enc_content_info: EncryptedContentInfo {
                content_type: self.content_type,
                content_enc_alg: AlgorithmIdentifierOwned {
                    oid: alg.oid(),
                    parameters: Some(Any::new(Tag::OctetString, iv)?),
                },
                encrypted_content: Some(OctetString::new(ciphertext)?),
            },
            unprotected_attrs,
        };

        let encoded = ContentInfo {
            content_type: oid::ID_ENCRYPTED_DATA,
            content: Any::from_der(&encrypted.to_der()?)?,
        }
        .to_der()?;
        self.check_size(encoded.len())?;

        tracing::debug!(len = encoded.len(), ?version, "encoded EncryptedData");
        Ok(encoded)
    }

    /// Like [`encode_encrypted_data`](Self::encode_encrypted_data), writing
    /// into `out`.
    pub fn encode_encrypted_data_into<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        out: &mut [u8],
    ) -> Result<usize> {
        write_out(&self.encode_encrypted_data(rng)?, out)
    }

    /// Decrypt an EncryptedData with the configured key. Unprotected
    /// attributes are exposed through
    /// [`decoded_attributes`](Self::decoded_attributes).
    pub fn decode_encrypted_data(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self.run_encrypted_decoder(msg)?;
        Ok(plaintext.to_vec())
    }

    /// Like [`decode_encrypted_data`](Self::decode_encrypted_data), writing
    /// the plaintext into `out`.
    pub fn decode_encrypted_data_into(&mut self, msg: &[u8], out: &mut [u8]) -> Result<usize> {
        let plaintext = self.run_encrypted_decoder(msg)?;
        write_out(&plaintext, out)
    }

    fn run_encrypted_decoder(&mut self, msg: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.check_size(msg.len())?;
        tracing::debug!(len = msg.len(), "decoding EncryptedData");

        let content_info = ContentInfo::from_der(msg)?;
        if content_info.content_type != oid::ID_ENCRYPTED_DATA {
            return Err(Error::ContentTypeMismatch);
        }
        let encrypted = content_info.content.decode_as::<EncryptedData>()?;

        // the version is fixed by whether attributes follow the content
        let expected = match encrypted.unprotected_attrs {
            Some(_) => VERSION_WITH_ATTRIBUTES,
            None => VERSION_PLAIN,
        };
        if encrypted.version != expected {
            tracing::debug!(
                version = ?encrypted.version,
                ?expected,
                "EncryptedData version mismatch"
            );
            return Err(Error::Version);
        }

        let eci = &encrypted.enc_content_info;
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
            .as_ref()
            .ok_or(Error::InvalidArgument("encrypted content absent"))?;

        let key = self.require_encryption_key()?;
        let plaintext = cipher::decrypt(alg, key, iv.as_bytes(), ciphertext.as_bytes())?;

        let decoded = match &encrypted.unprotected_attrs {
            Some(attrs) => decode_attributes(attrs)?,
            None => Vec::new(),
        };

        tracing::debug!(
            len = plaintext.len(),
            attributes = decoded.len(),
            "decoded EncryptedData"
        );
        self.decoded_attributes = decoded;
        Ok(plaintext)
    }

    fn require_encryption_key(&self) -> Result<&[u8]> {
        match &self.encryption_key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::InvalidArgument("encryption key")),
        }
    }
}
