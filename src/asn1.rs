//! DER structures from RFC 5652 (CMS) and RFC 5753 (ECC in CMS).
//!
//! Most types come from the `cms` crate. SignedData, SignerInfo and
//! EnvelopedData are declared here: their versions stay plain integers so
//! that unsupported values surface as [`Error::Version`](crate::Error::Version),
//! signed attributes keep their received encoding, and RecipientInfo entries
//! stay undecoded until their tag is known.

use alloc::vec::Vec;
use core::cmp::Ordering;
use der::{
    asn1::{OctetString, SetOfVec},
    Any, Decode, DecodeOwned, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader,
    Sequence, Tag, TagNumber, ValueOrd, Writer,
};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;

use crate::errors::Result;

pub(crate) use cms::{
    cert::IssuerAndSerialNumber,
    content_info::{CmsVersion, ContentInfo},
    encrypted_data::EncryptedData,
    enveloped_data::{
        EncryptedContentInfo, KeyAgreeRecipientIdentifier, KeyAgreeRecipientInfo,
        KeyTransRecipientInfo, OriginatorIdentifierOrKey, OriginatorInfo, OriginatorPublicKey,
        RecipientEncryptedKey, RecipientIdentifier, RecipientKeyIdentifier,
    },
    signed_data::{EncapsulatedContentInfo, SignerIdentifier},
};
pub(crate) use x509_cert::ext::pkix::SubjectKeyIdentifier;

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SignedData {
    pub version: u8,
    pub digest_algorithms: SetOfVec<AlgorithmIdentifierOwned>,
    pub encap_content_info: EncapsulatedContentInfo,
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub certificates: Option<SetOfVec<Any>>,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub crls: Option<SetOfVec<Any>>,
    pub signer_infos: SetOfVec<SignerInfo>,
}

/// ```text
/// SignerInfo ::= SEQUENCE {
///   version CMSVersion,
///   sid SignerIdentifier,
///   digestAlgorithm DigestAlgorithmIdentifier,
///   signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///   signatureAlgorithm SignatureAlgorithmIdentifier,
///   signature SignatureValue,
///   unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SignerInfo {
    pub version: u8,
    pub sid: SignerIdentifier,
    pub digest_alg: AlgorithmIdentifierOwned,
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub signed_attrs: Option<SignedAttributes>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: OctetString,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unsigned_attrs: Option<Attributes>,
}

/// `SignedAttributes` exactly as encoded.
///
/// The signature covers the received bytes, so decoding must not go through
/// `SetOfVec`, which sorts its elements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SignedAttributes {
    value: Vec<u8>,
}

impl SignedAttributes {
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        let encoded = Any::from_der(&attrs.to_der()?)?;
        Ok(Self {
            value: encoded.value().to_vec(),
        })
    }

    /// Parsed attributes, in DER order.
    pub fn attributes(&self) -> Result<Attributes> {
        Ok(Attributes::from_der(&self.to_der()?)?)
    }
}

impl FixedTag for SignedAttributes {
    const TAG: Tag = Tag::Set;
}

impl<'a> DecodeValue<'a> for SignedAttributes {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        Ok(Self {
            value: reader.read_vec(header.length)?,
        })
    }
}

impl EncodeValue for SignedAttributes {
    fn value_len(&self) -> der::Result<Length> {
        Length::try_from(self.value.len())
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        writer.write(&self.value)
    }
}

// SET OF ordering is the ordering of the DER encodings
impl ValueOrd for SignerInfo {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        Ok(self.to_der()?.cmp(&other.to_der()?))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct EnvelopedData {
    pub version: u8,
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub originator_info: Option<OriginatorInfo>,
    /// Kept undecoded: entries are dispatched on their tag.
    pub recip_infos: SetOfVec<Any>,
    pub encrypted_content: EncryptedContentInfo,
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unprotected_attrs: Option<Attributes>,
}

/// ```text
/// ECC-CMS-SharedInfo ::= SEQUENCE {
///   keyInfo         AlgorithmIdentifier,
///   entityUInfo [0] EXPLICIT OCTET STRING OPTIONAL,
///   suppPubInfo [2] EXPLICIT OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct EccCmsSharedInfo {
    pub key_info: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub entity_u_info: Option<OctetString>,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT")]
    pub supp_pub_info: OctetString,
}

/// Tag of a `[1] IMPLICIT KeyAgreeRecipientInfo` entry.
pub(crate) const KARI_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N1,
};

/// Re-encode any DER value as an [`Any`].
pub(crate) fn to_any(value: &impl Encode) -> Result<Any> {
    Ok(Any::from_der(&value.to_der()?)?)
}

/// Wrap a SEQUENCE value under an implicit context-specific tag.
pub(crate) fn retag(value: &impl Encode, tag: Tag) -> Result<Any> {
    let seq = to_any(value)?;
    Ok(Any::new(tag, seq.value().to_vec())?)
}

/// Decode an implicitly tagged SEQUENCE value.
pub(crate) fn untag<T: DecodeOwned>(any: &Any) -> Result<T> {
    let seq = Any::new(Tag::Sequence, any.value().to_vec())?;
    Ok(T::from_der(&seq.to_der()?)?)
}
