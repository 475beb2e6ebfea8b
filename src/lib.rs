#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! # Supported content types
//!
//! Every message is a DER `ContentInfo` carrying one of:
//!
//! - [SignedData](#signeddata): one signer, RSA PKCS#1 v1.5 or ECDSA, with
//!   optional signed attributes and detached content.
//! - [EnvelopedData](#envelopeddata): AES or DES content encryption with the
//!   content-encryption key delivered by RSA key transport or ECDH key
//!   agreement (RFC 5753).
//! - [EncryptedData](#encrypteddata): content encrypted under a key the
//!   parties already share, with optional unprotected attributes.
//!
//! All state for one message lives in a [`MessageContext`]. Configure it with
//! setters, then call exactly one encode or decode operation.
//!
//! # Usage
//!
//! ## EncryptedData
//! ```
//! use cms_codec::{ContentEncryptionAlgorithm, MessageContext};
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! // use `cms_codec::OsRng` (feature `getrandom`) outside of examples
//! let mut rng = ChaCha8Rng::from_seed([0u8; 32]);
//! let key = [0x42u8; 16];
//!
//! let mut sender = MessageContext::new();
//! sender.set_content_encryption_algorithm(ContentEncryptionAlgorithm::Aes128Cbc);
//! sender.set_encryption_key(&key);
//! sender.set_content(b"attack at dawn");
//! let msg = sender.encode_encrypted_data(&mut rng)?;
//!
//! assert_eq!(cms_codec::content_type_of(&msg)?, cms_codec::oid::ID_ENCRYPTED_DATA);
//!
//! let mut receiver = MessageContext::new();
//! receiver.set_encryption_key(&key);
//! assert_eq!(receiver.decode_encrypted_data(&msg)?, b"attack at dawn");
//! # Ok::<(), cms_codec::Error>(())
//! ```
//!
//! ## SignedData
//!
//! The signer's certificate binds the context; the matching private key
//! signs. The verifier only needs the message, since the signer's
//! certificate travels inside it.
//!
//! ```ignore
//! let mut signer = MessageContext::from_cert(&cert_der)?;
//! signer.set_private_key_der(&key_der)?;
//! signer.set_digest_algorithm(DigestAlgorithm::Sha384);
//! signer.set_content(b"signed payload");
//! let msg = signer.encode_signed_data(&mut rng)?;
//!
//! let mut verifier = MessageContext::new();
//! assert_eq!(verifier.verify_signed_data(&msg)?, b"signed payload");
//! ```
//!
//! ## EnvelopedData
//!
//! RSA recipients receive a `KeyTransRecipientInfo`, P-256 and P-384
//! recipients a `KeyAgreeRecipientInfo`. A recipient decodes with its own
//! certificate and private key.
//!
//! ```ignore
//! let mut sender = MessageContext::new();
//! sender.add_recipient(&rsa_cert_der)?;
//! sender.add_recipient(&p256_cert_der)?;
//! sender.set_content(b"for both of you");
//! let msg = sender.encode_enveloped_data(&mut rng)?;
//!
//! let mut recipient = MessageContext::from_cert(&p256_cert_der)?;
//! recipient.set_private_key_der(&p256_key_der)?;
//! assert_eq!(recipient.decode_enveloped_data(&msg)?, b"for both of you");
//! ```

#[cfg(doctest)]
pub struct ReadmeDoctests;

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use der;
pub use p256;
pub use p384;
pub use rand_core;
pub use rsa;
pub use spki;
pub use x509_cert;

#[cfg(feature = "getrandom")]
pub use rand_core::OsRng;

mod algorithms;
mod asn1;
mod cert;
mod cipher;
mod context;
mod encrypted_data;
mod enveloped_data;
pub mod errors;
mod keys;
pub mod oid;
mod recipient;
mod signed_data;

pub use crate::{
    algorithms::{
        ContentEncryptionAlgorithm, DigestAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm,
        SignatureAlgorithm,
    },
    cert::CertificateInfo,
    context::{
        Attribute, ContextConfig, DecodedAttribute, MessageContext, RecipientIdentifierKind,
        DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_RSA_BITS,
    },
    errors::{Error, Result},
    keys::{PrivateKey, PublicKey},
};

use der::{asn1::ObjectIdentifier, Decode};

/// Content type of the outer `ContentInfo` of `msg`, for routing a message
/// to the matching decoder.
pub fn content_type_of(msg: &[u8]) -> Result<ObjectIdentifier> {
    let content_info = asn1::ContentInfo::from_der(msg)?;
    tracing::trace!(content_type = %content_info.content_type, "peeked ContentInfo");
    Ok(content_info.content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_content_type_of() {
        // ContentInfo { id-data, [0] OCTET STRING "hi" }
        let msg = hex!("3011 0609 2a864886f70d010701 a004 0402 6869");
        assert_eq!(content_type_of(&msg), Ok(oid::ID_DATA));

        assert_eq!(content_type_of(&msg[..8]), Err(Error::Truncated));
    }
}
