//! SignedData: a single SignerInfo over encapsulated or detached content.

use alloc::{borrow::Cow, vec, vec::Vec};
use der::{
    asn1::{ObjectIdentifier, OctetString, SetOfVec},
    Any, Decode, Encode, Tag,
};
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x509_cert::attr::Attributes;

use crate::algorithms::{DigestAlgorithm, SignatureAlgorithm};
use crate::asn1::{
    ContentInfo, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo,
};
use crate::cert::CertificateInfo;
use crate::context::{
    content_type_attribute, decode_attributes, encode_attributes, message_digest_attribute,
    write_out, MessageContext,
};
use crate::errors::{Error, Result};
use crate::oid;

const SIGNED_DATA_VERSION: u8 = 1;
const SIGNER_INFO_VERSION: u8 = 1;

impl<'a> MessageContext<'a> {
    /// Sign the content with the private key and primary certificate,
    /// producing a DER `ContentInfo` holding a SignedData.
    pub fn encode_signed_data<R: CryptoRngCore>(&self, rng: &mut R) -> Result<Vec<u8>> {
        let content = self.require_content()?;
        let cert = self.require_certificate()?;
        let key = self.require_private_key()?;

        let digest = self.digest;
        let sig_alg = cert.public_key().signature_algorithm(digest);
        tracing::debug!(
            content_len = content.len(),
            ?sig_alg,
            detached = self.detached,
            "encoding SignedData"
        );

        let content_digest = digest.digest(content);
        let (signed_attrs, hashed) = if self.signed_attributes_enabled {
            let attrs =
                SignedAttributes::from_attributes(&self.build_signed_attributes(&content_digest)?)?;
            let hashed = digest.digest(&attrs.to_der()?);
            (Some(attrs), hashed)
        } else {
            (None, content_digest)
        };

        let signature = key.sign(rng, sig_alg, &hashed, self.config.max_rsa_bits)?;

        let signer_info = SignerInfo {
            version: SIGNER_INFO_VERSION,
            sid: SignerIdentifier::IssuerAndSerialNumber(cert.issuer_and_serial()),
            digest_alg: digest.algorithm_identifier(),
            signed_attrs,
            signature_algorithm: sig_alg.algorithm_identifier(),
            signature: OctetString::new(signature)?,
            unsigned_attrs: None,
        };

        let mut certificates = Vec::with_capacity(self.certificates.len());
        for cert in &self.certificates {
            certificates.push(Any::from_der(cert.as_der())?);
        }

        let econtent = if self.detached {
            None
        } else {
            Some(Any::new(Tag::OctetString, content.to_vec())?)
        };

        let signed_data = SignedData {
            version: SIGNED_DATA_VERSION,
            digest_algorithms: SetOfVec::try_from(vec![digest.algorithm_identifier()])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: self.content_type,
                econtent,
            },
            certificates: Some(SetOfVec::try_from(certificates)?),
            crls: None,
            signer_infos: SetOfVec::try_from(vec![signer_info])?,
        };

        let encoded = ContentInfo {
            content_type: oid::ID_SIGNED_DATA,
            content: Any::from_der(&signed_data.to_der()?)?,
        }
        .to_der()?;
        self.check_size(encoded.len())?;

        tracing::debug!(len = encoded.len(), "encoded SignedData");
        Ok(encoded)
    }

    /// Like [`encode_signed_data`](Self::encode_signed_data), writing into
    /// `out` and returning the number of bytes written.
    pub fn encode_signed_data_into<R: CryptoRngCore>(
        &self,
        rng: &mut R,
        out: &mut [u8],
    ) -> Result<usize> {
        write_out(&self.encode_signed_data(rng)?, out)
    }

    /// Verify a DER SignedData and return the signed content.
    ///
    /// For detached signatures the content must already be set on the
    /// context. Signed attributes and embedded certificates are retained and
    /// exposed through [`decoded_attributes`](Self::decoded_attributes) and
    /// [`decoded_certificates`](Self::decoded_certificates).
    pub fn verify_signed_data(&mut self, msg: &[u8]) -> Result<&[u8]> {
        self.check_size(msg.len())?;
        tracing::debug!(len = msg.len(), "verifying SignedData");

        let content_info = ContentInfo::from_der(msg)?;
        if content_info.content_type != oid::ID_SIGNED_DATA {
            return Err(Error::ContentTypeMismatch);
        }

        let signed_data = content_info.content.decode_as::<SignedData>()?;
        if signed_data.version != SIGNED_DATA_VERSION {
            return Err(Error::Version);
        }

        let encap = &signed_data.encap_content_info;
        if encap.econtent_type != oid::ID_DATA {
            return Err(Error::ContentTypeMismatch);
        }

        let content: Cow<'a, [u8]> = match &encap.econtent {
            Some(econtent) => {
                Cow::Owned(Vec::from(econtent.decode_as::<OctetString>()?.into_bytes()))
            }
            None if !self.content.is_empty() => self.content.clone(),
            None => return Err(Error::InvalidArgument("detached content")),
        };

        let mut embedded = Vec::new();
        if let Some(certs) = &signed_data.certificates {
            for cert in certs.iter() {
                embedded.push(CertificateInfo::from_der_with_max_rsa_bits(
                    &cert.to_der()?,
                    self.config.max_rsa_bits,
                )?);
            }
        }

        let signer_info = signed_data
            .signer_infos
            .iter()
            .next()
            .ok_or_else(|| Error::from(Tag::Set.value_error()))?;
        if signer_info.version != SIGNER_INFO_VERSION {
            return Err(Error::Version);
        }

        let signer = find_signer(&signer_info.sid, embedded.iter().chain(&self.certificates))?
            .ok_or(Error::SignatureVerification)?
            .clone();

        let digest = DigestAlgorithm::from_oid(signer_info.digest_alg.oid)?;
        let sig_alg = SignatureAlgorithm::from_oid(signer_info.signature_algorithm.oid, digest)?;

        let content_digest = digest.digest(&content);
        let (hashed, decoded) = match &signer_info.signed_attrs {
            Some(received) => {
                // the signature covers the attributes as received, not re-sorted
                let attrs = received.attributes()?;
                check_signed_attributes(&attrs, &content_digest, encap.econtent_type)?;
                (digest.digest(&received.to_der()?), decode_attributes(&attrs)?)
            }
            None => (content_digest, Vec::new()),
        };

        signer.public_key().verify(
            sig_alg,
            &hashed,
            signer_info.signature.as_bytes(),
            self.config.max_rsa_bits,
        )?;
        tracing::debug!(content_len = content.len(), ?sig_alg, "SignedData verified");

        self.free();
        self.content = content;
        self.decoded_attributes = decoded;
        self.decoded_certificates = embedded;
        Ok(&self.content)
    }

    fn build_signed_attributes(&self, content_digest: &[u8]) -> Result<Attributes> {
        let mut attrs = vec![
            content_type_attribute(self.content_type)?,
            message_digest_attribute(content_digest)?,
        ];

        let extra = encode_attributes(&self.signed_attributes)?;
        for attr in extra.iter() {
            if attr.oid == oid::ID_CONTENT_TYPE || attr.oid == oid::ID_MESSAGE_DIGEST {
                return Err(Error::InvalidArgument("reserved signed attribute"));
            }
            attrs.push(attr.clone());
        }

        Ok(SetOfVec::try_from(attrs)?)
    }
}

fn find_signer<'c>(
    sid: &SignerIdentifier,
    mut candidates: impl Iterator<Item = &'c CertificateInfo>,
) -> Result<Option<&'c CertificateInfo>> {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(ias) => {
            for cert in candidates {
                if cert.matches_issuer_and_serial(ias)? {
                    return Ok(Some(cert));
                }
            }
            Ok(None)
        }
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            Ok(candidates.find(|cert| cert.matches_subject_key_id(ski.0.as_bytes())))
        }
    }
}

/// `messageDigest` must equal the recomputed digest and `contentType` the
/// encapsulated content type.
fn check_signed_attributes(
    attrs: &Attributes,
    content_digest: &[u8],
    content_type: ObjectIdentifier,
) -> Result<()> {
    let mut digest_ok = false;
    let mut type_ok = false;

    for attr in attrs.iter() {
        let value = match attr.values.iter().next() {
            Some(value) if attr.values.len() == 1 => value,
            _ => continue,
        };
        if attr.oid == oid::ID_MESSAGE_DIGEST {
            let found = value
                .decode_as::<OctetString>()
                .map_err(|_| Error::SignatureVerification)?;
            digest_ok = found.as_bytes().ct_eq(content_digest).into();
        } else if attr.oid == oid::ID_CONTENT_TYPE {
            let found = value
                .decode_as::<ObjectIdentifier>()
                .map_err(|_| Error::SignatureVerification)?;
            type_ok = found == content_type;
        }
    }

    if !(digest_ok && type_ok) {
        tracing::debug!(digest_ok, type_ok, "signed attribute check failed");
        return Err(Error::SignatureVerification);
    }
    Ok(())
}
