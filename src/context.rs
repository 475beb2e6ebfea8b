//! Per-message state shared by the SignedData, EnvelopedData and
//! EncryptedData engines.

use alloc::{borrow::Cow, vec::Vec};
use const_oid::ObjectIdentifier;
use der::{
    asn1::{OctetString, SetOfVec},
    Any, Decode, Encode,
};
use x509_cert::attr::{Attribute as X509Attribute, Attributes};
use zeroize::{Zeroize, Zeroizing};

use crate::algorithms::{
    ContentEncryptionAlgorithm, DigestAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm,
};
use crate::cert::CertificateInfo;
use crate::errors::{Error, Result};
use crate::keys::PrivateKey;
use crate::oid;

/// Default ceiling on message and output sizes: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default upper bound on RSA modulus size in bits.
pub const DEFAULT_MAX_RSA_BITS: usize = 8192;

/// Resource limits applied to every operation on a [`MessageContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextConfig {
    /// Largest accepted input message and largest produced encoding, in bytes.
    pub max_message_size: usize,
    /// Largest RSA modulus accepted for signing, verification and key transport.
    pub max_rsa_bits: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_rsa_bits: DEFAULT_MAX_RSA_BITS,
        }
    }
}

impl ContextConfig {
    /// Set the message size ceiling.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Set the RSA modulus size ceiling.
    pub fn with_max_rsa_bits(mut self, bits: usize) -> Self {
        self.max_rsa_bits = bits;
        self
    }
}

/// How a recipient is identified inside a RecipientInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipientIdentifierKind {
    /// `issuerAndSerialNumber`
    #[default]
    IssuerAndSerial,
    /// `subjectKeyIdentifier` (`rKeyId` for key agreement)
    SubjectKeyId,
}

/// A caller-supplied attribute. `value` is one DER-encoded attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute type.
    pub oid: ObjectIdentifier,
    /// DER encoding of the value, e.g. a complete OCTET STRING TLV.
    pub value: &'a [u8],
}

impl<'a> Attribute<'a> {
    /// Create a new attribute.
    pub fn new(oid: ObjectIdentifier, value: &'a [u8]) -> Self {
        Self { oid, value }
    }
}

/// An attribute parsed out of a message, one per attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttribute {
    /// Attribute type.
    pub oid: ObjectIdentifier,
    /// DER encoding of the value.
    pub value: Vec<u8>,
}

/// State for one CMS message.
///
/// A context is configured with setters, then drives exactly one encode or
/// decode operation. It is `Send` but not meant to be shared between
/// threads while an operation runs.
pub struct MessageContext<'a> {
    pub(crate) config: ContextConfig,
    pub(crate) content: Cow<'a, [u8]>,
    pub(crate) content_type: ObjectIdentifier,
    pub(crate) digest: DigestAlgorithm,
    pub(crate) content_cipher: ContentEncryptionAlgorithm,
    pub(crate) key_agreement: KeyAgreementAlgorithm,
    pub(crate) key_wrap: KeyWrapAlgorithm,
    /// Primary certificate first.
    pub(crate) certificates: Vec<CertificateInfo>,
    pub(crate) recipients: Vec<CertificateInfo>,
    pub(crate) private_key: Option<PrivateKey>,
    pub(crate) encryption_key: Option<Zeroizing<Vec<u8>>>,
    pub(crate) ukm: Option<Vec<u8>>,
    pub(crate) recipient_id: RecipientIdentifierKind,
    pub(crate) signed_attributes: Vec<Attribute<'a>>,
    pub(crate) unprotected_attributes: Vec<Attribute<'a>>,
    pub(crate) signed_attributes_enabled: bool,
    pub(crate) detached: bool,
    pub(crate) decoded_attributes: Vec<DecodedAttribute>,
    pub(crate) decoded_certificates: Vec<CertificateInfo>,
}

impl<'a> Default for MessageContext<'a> {
    fn default() -> Self {
        Self::with_config(ContextConfig::default())
    }
}

impl<'a> core::fmt::Debug for MessageContext<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MessageContext")
            .field("config", &self.config)
            .field("content_len", &self.content.len())
            .field("content_type", &self.content_type)
            .field("digest", &self.digest)
            .field("content_cipher", &self.content_cipher)
            .field("key_agreement", &self.key_agreement)
            .field("key_wrap", &self.key_wrap)
            .field("certificates", &self.certificates.len())
            .field("recipients", &self.recipients.len())
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

impl<'a> MessageContext<'a> {
    /// Create an empty context with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context.
    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            config,
            content: Cow::Borrowed(&[]),
            content_type: oid::ID_DATA,
            digest: DigestAlgorithm::default(),
            content_cipher: ContentEncryptionAlgorithm::default(),
            key_agreement: KeyAgreementAlgorithm::default(),
            key_wrap: KeyWrapAlgorithm::default(),
            certificates: Vec::new(),
            recipients: Vec::new(),
            private_key: None,
            encryption_key: None,
            ukm: None,
            recipient_id: RecipientIdentifierKind::default(),
            signed_attributes: Vec::new(),
            unprotected_attributes: Vec::new(),
            signed_attributes_enabled: true,
            detached: false,
            decoded_attributes: Vec::new(),
            decoded_certificates: Vec::new(),
        }
    }

    /// Create a context bound to the DER certificate `cert`.
    pub fn from_cert(cert: &[u8]) -> Result<Self> {
        let mut ctx = Self::new();
        ctx.init_with_cert(cert)?;
        Ok(ctx)
    }

    /// Parse `cert` and make it the primary certificate, resetting every
    /// other field except the configuration.
    pub fn init_with_cert(&mut self, cert: &[u8]) -> Result<()> {
        let info = CertificateInfo::from_der_with_max_rsa_bits(cert, self.config.max_rsa_bits)?;
        tracing::debug!(cert_len = cert.len(), "context bound to certificate");

        let config = self.config;
        self.free();
        *self = Self::with_config(config);
        self.certificates.push(info);
        Ok(())
    }

    /// Release decoded attributes and certificates and wipe owned content.
    pub fn free(&mut self) {
        self.decoded_attributes = Vec::new();
        self.decoded_certificates = Vec::new();
        if let Cow::Owned(content) = &mut self.content {
            content.zeroize();
        }
        self.content = Cow::Borrowed(&[]);
    }

    /// The active configuration.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Content to sign or encrypt.
    pub fn set_content(&mut self, content: &'a [u8]) {
        self.content = Cow::Borrowed(content);
    }

    /// Content type of the payload; defaults to `id-data`.
    pub fn set_content_type(&mut self, oid: ObjectIdentifier) {
        self.content_type = oid;
    }

    /// Digest for SignedData; defaults to SHA-256.
    pub fn set_digest_algorithm(&mut self, alg: DigestAlgorithm) {
        self.digest = alg;
    }

    /// Content cipher for EnvelopedData and EncryptedData; defaults to AES-256-CBC.
    pub fn set_content_encryption_algorithm(&mut self, alg: ContentEncryptionAlgorithm) {
        self.content_cipher = alg;
    }

    /// Key agreement scheme for EC recipients.
    pub fn set_key_agreement_algorithm(&mut self, alg: KeyAgreementAlgorithm) {
        self.key_agreement = alg;
    }

    /// Key wrap algorithm for EC recipients.
    pub fn set_key_wrap_algorithm(&mut self, alg: KeyWrapAlgorithm) {
        self.key_wrap = alg;
    }

    /// Private key used for signing or for recovering the CEK.
    pub fn set_private_key(&mut self, key: PrivateKey) {
        self.private_key = Some(key);
    }

    /// Decode and set a PKCS#8, PKCS#1 or SEC1 private key.
    pub fn set_private_key_der(&mut self, der: &[u8]) -> Result<()> {
        self.private_key = Some(PrivateKey::from_der(der)?);
        Ok(())
    }

    /// Symmetric key for EncryptedData.
    pub fn set_encryption_key(&mut self, key: &[u8]) {
        self.encryption_key = Some(Zeroizing::new(key.to_vec()));
    }

    /// User keying material fed into the KARI shared info.
    pub fn set_user_keying_material(&mut self, ukm: &[u8]) {
        self.ukm = Some(ukm.to_vec());
    }

    /// How recipients are named in produced RecipientInfos.
    pub fn set_recipient_identifier(&mut self, kind: RecipientIdentifierKind) {
        self.recipient_id = kind;
    }

    /// Add a certificate to the SignedData `certificates` set. The first
    /// certificate added to an empty context becomes the primary one.
    pub fn add_certificate(&mut self, cert: &[u8]) -> Result<()> {
        let info = CertificateInfo::from_der_with_max_rsa_bits(cert, self.config.max_rsa_bits)?;
        self.certificates.push(info);
        Ok(())
    }

    /// Add an EnvelopedData recipient. Without explicit recipients the
    /// primary certificate is used.
    pub fn add_recipient(&mut self, cert: &[u8]) -> Result<()> {
        let info = CertificateInfo::from_der_with_max_rsa_bits(cert, self.config.max_rsa_bits)?;
        self.recipients.push(info);
        Ok(())
    }

    /// Extra signed attribute, included after `contentType` and `messageDigest`.
    pub fn add_signed_attribute(&mut self, attr: Attribute<'a>) {
        self.signed_attributes.push(attr);
    }

    /// Unprotected attribute for EncryptedData.
    pub fn add_unprotected_attribute(&mut self, attr: Attribute<'a>) {
        self.unprotected_attributes.push(attr);
    }

    /// When disabled, SignerInfos carry no signed attributes and the
    /// signature covers the content digest directly.
    pub fn set_signed_attributes_enabled(&mut self, enabled: bool) {
        self.signed_attributes_enabled = enabled;
    }

    /// Omit `eContent` from produced SignedData.
    pub fn set_detached(&mut self, detached: bool) {
        self.detached = detached;
    }

    /// Content set on the context, or recovered by the last verify.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Attributes parsed by the last decode or verify.
    pub fn decoded_attributes(&self) -> &[DecodedAttribute] {
        &self.decoded_attributes
    }

    /// Configured certificates, primary first.
    pub fn certificates(&self) -> &[CertificateInfo] {
        &self.certificates
    }

    /// The primary certificate.
    pub fn certificate(&self) -> Option<&CertificateInfo> {
        self.certificates.first()
    }

    /// Certificates embedded in the last verified SignedData.
    pub fn decoded_certificates(&self) -> &[CertificateInfo] {
        &self.decoded_certificates
    }

    pub(crate) fn check_size(&self, len: usize) -> Result<()> {
        if len > self.config.max_message_size {
            return Err(Error::Allocation);
        }
        Ok(())
    }

    pub(crate) fn require_content(&self) -> Result<&[u8]> {
        if self.content.is_empty() {
            return Err(Error::InvalidArgument("content"));
        }
        self.check_size(self.content.len())?;
        Ok(&self.content)
    }

    pub(crate) fn require_private_key(&self) -> Result<&PrivateKey> {
        self.private_key
            .as_ref()
            .ok_or(Error::InvalidArgument("private key"))
    }

    pub(crate) fn require_certificate(&self) -> Result<&CertificateInfo> {
        self.certificates
            .first()
            .ok_or(Error::InvalidArgument("certificate"))
    }
}

/// Build a DER SET OF Attribute from caller attributes.
pub(crate) fn encode_attributes(attrs: &[Attribute<'_>]) -> Result<Attributes> {
    let mut out = Vec::with_capacity(attrs.len());
    for attr in attrs {
        out.push(X509Attribute {
            oid: attr.oid,
            values: SetOfVec::try_from(alloc::vec![Any::from_der(attr.value)?])?,
        });
    }
    Ok(SetOfVec::try_from(out)?)
}

/// Flatten a parsed attribute set, one entry per value.
pub(crate) fn decode_attributes(attrs: &Attributes) -> Result<Vec<DecodedAttribute>> {
    let mut out = Vec::new();
    for attr in attrs.iter() {
        for value in attr.values.iter() {
            out.push(DecodedAttribute {
                oid: attr.oid,
                value: value.to_der()?,
            });
        }
    }
    Ok(out)
}

/// `contentType` attribute.
pub(crate) fn content_type_attribute(content_type: ObjectIdentifier) -> Result<X509Attribute> {
    Ok(X509Attribute {
        oid: oid::ID_CONTENT_TYPE,
        values: SetOfVec::try_from(alloc::vec![Any::from_der(&content_type.to_der()?)?])?,
    })
}

/// `messageDigest` attribute.
pub(crate) fn message_digest_attribute(digest: &[u8]) -> Result<X509Attribute> {
    let value = OctetString::new(digest)?;
    Ok(X509Attribute {
        oid: oid::ID_MESSAGE_DIGEST,
        values: SetOfVec::try_from(alloc::vec![Any::from_der(&value.to_der()?)?])?,
    })
}

/// Copy `encoded` into `out`.
pub(crate) fn write_out(encoded: &[u8], out: &mut [u8]) -> Result<usize> {
    if out.len() < encoded.len() {
        return Err(Error::BufferTooSmall {
            needed: encoded.len(),
        });
    }
    out[..encoded.len()].copy_from_slice(encoded);
    Ok(encoded.len())
}
