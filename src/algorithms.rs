//! Algorithm tables: every OID the codec understands maps to one enum variant.

use alloc::vec::Vec;
use const_oid::ObjectIdentifier;
use der::{asn1::Null, Any};
use digest::{Digest, FixedOutputReset};
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::errors::{Error, Result};
use crate::oid;

/// Message digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DigestAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Sha256
    }
}

impl DigestAlgorithm {
    /// Look up a digest algorithm by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::ID_SHA1 => Ok(DigestAlgorithm::Sha1),
            oid::ID_SHA224 => Ok(DigestAlgorithm::Sha224),
            oid::ID_SHA256 => Ok(DigestAlgorithm::Sha256),
            oid::ID_SHA384 => Ok(DigestAlgorithm::Sha384),
            oid::ID_SHA512 => Ok(DigestAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The algorithm's OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => oid::ID_SHA1,
            DigestAlgorithm::Sha224 => oid::ID_SHA224,
            DigestAlgorithm::Sha256 => oid::ID_SHA256,
            DigestAlgorithm::Sha384 => oid::ID_SHA384,
            DigestAlgorithm::Sha512 => oid::ID_SHA512,
        }
    }

    /// Digest output length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// `AlgorithmIdentifier` with absent parameters (RFC 5754 §2).
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }

    /// Hash `msg` in one shot.
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(msg).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(msg).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(msg).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(msg).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(msg).to_vec(),
        }
    }

    /// PKCS#1 v1.5 signature scheme that wraps the digest in a `DigestInfo`.
    pub(crate) fn pkcs1v15_sign(self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }

    /// ANSI X9.63 KDF keyed on this hash, filling `key`.
    pub(crate) fn x963_kdf(self, secret: &[u8], shared_info: &[u8], key: &mut [u8]) -> Result<()> {
        match self {
            DigestAlgorithm::Sha1 => x963::<Sha1>(secret, shared_info, key),
            DigestAlgorithm::Sha224 => x963::<Sha224>(secret, shared_info, key),
            DigestAlgorithm::Sha256 => x963::<Sha256>(secret, shared_info, key),
            DigestAlgorithm::Sha384 => x963::<Sha384>(secret, shared_info, key),
            DigestAlgorithm::Sha512 => x963::<Sha512>(secret, shared_info, key),
        }
    }
}

fn x963<D>(secret: &[u8], shared_info: &[u8], key: &mut [u8]) -> Result<()>
where
    D: Digest + FixedOutputReset,
{
    ansi_x963_kdf::derive_key_into::<D>(secret, shared_info, key)
        .map_err(|_| Error::InvalidArgument("x9.63 kdf input"))
}

/// Symmetric content-encryption algorithms, all in CBC mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-CBC
    Aes128Cbc,
    /// AES-192-CBC
    Aes192Cbc,
    /// AES-256-CBC
    Aes256Cbc,
    /// Single DES in CBC mode. Legacy interop only.
    DesCbc,
    /// Triple DES (EDE3) in CBC mode.
    DesEde3Cbc,
}

impl Default for ContentEncryptionAlgorithm {
    fn default() -> Self {
        ContentEncryptionAlgorithm::Aes256Cbc
    }
}

impl ContentEncryptionAlgorithm {
    /// Look up a content-encryption algorithm by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::AES128_CBC => Ok(ContentEncryptionAlgorithm::Aes128Cbc),
            oid::AES192_CBC => Ok(ContentEncryptionAlgorithm::Aes192Cbc),
            oid::AES256_CBC => Ok(ContentEncryptionAlgorithm::Aes256Cbc),
            oid::DES_CBC => Ok(ContentEncryptionAlgorithm::DesCbc),
            oid::DES_EDE3_CBC => Ok(ContentEncryptionAlgorithm::DesEde3Cbc),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The algorithm's OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc => oid::AES128_CBC,
            ContentEncryptionAlgorithm::Aes192Cbc => oid::AES192_CBC,
            ContentEncryptionAlgorithm::Aes256Cbc => oid::AES256_CBC,
            ContentEncryptionAlgorithm::DesCbc => oid::DES_CBC,
            ContentEncryptionAlgorithm::DesEde3Cbc => oid::DES_EDE3_CBC,
        }
    }

    /// Key length in bytes.
    pub fn key_size(self) -> usize {
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc => 16,
            ContentEncryptionAlgorithm::Aes192Cbc => 24,
            ContentEncryptionAlgorithm::Aes256Cbc => 32,
            ContentEncryptionAlgorithm::DesCbc => 8,
            ContentEncryptionAlgorithm::DesEde3Cbc => 24,
        }
    }

    /// Block length in bytes, which is also the IV length.
    pub fn block_size(self) -> usize {
        match self {
            ContentEncryptionAlgorithm::Aes128Cbc
            | ContentEncryptionAlgorithm::Aes192Cbc
            | ContentEncryptionAlgorithm::Aes256Cbc => 16,
            ContentEncryptionAlgorithm::DesCbc | ContentEncryptionAlgorithm::DesEde3Cbc => 8,
        }
    }
}

/// AES key wrap (RFC 3394) algorithms used to protect the CEK in a KARI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyWrapAlgorithm {
    /// id-aes128-wrap
    Aes128Wrap,
    /// id-aes192-wrap
    Aes192Wrap,
    /// id-aes256-wrap
    Aes256Wrap,
}

impl Default for KeyWrapAlgorithm {
    fn default() -> Self {
        KeyWrapAlgorithm::Aes256Wrap
    }
}

impl KeyWrapAlgorithm {
    /// Look up a key-wrap algorithm by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::AES128_WRAP => Ok(KeyWrapAlgorithm::Aes128Wrap),
            oid::AES192_WRAP => Ok(KeyWrapAlgorithm::Aes192Wrap),
            oid::AES256_WRAP => Ok(KeyWrapAlgorithm::Aes256Wrap),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The algorithm's OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            KeyWrapAlgorithm::Aes128Wrap => oid::AES128_WRAP,
            KeyWrapAlgorithm::Aes192Wrap => oid::AES192_WRAP,
            KeyWrapAlgorithm::Aes256Wrap => oid::AES256_WRAP,
        }
    }

    /// KEK length in bytes.
    pub fn key_size(self) -> usize {
        match self {
            KeyWrapAlgorithm::Aes128Wrap => 16,
            KeyWrapAlgorithm::Aes192Wrap => 24,
            KeyWrapAlgorithm::Aes256Wrap => 32,
        }
    }

    /// `AlgorithmIdentifier` with absent parameters (RFC 3565 §2.3.2).
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }
}

/// Ephemeral-static ECDH key agreement schemes (RFC 5753).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyAgreementAlgorithm {
    /// dhSinglePass-stdDH-sha1kdf-scheme
    StdDhSha1Kdf,
    /// dhSinglePass-stdDH-sha224kdf-scheme
    StdDhSha224Kdf,
    /// dhSinglePass-stdDH-sha256kdf-scheme
    StdDhSha256Kdf,
    /// dhSinglePass-stdDH-sha384kdf-scheme
    StdDhSha384Kdf,
    /// dhSinglePass-stdDH-sha512kdf-scheme
    StdDhSha512Kdf,
}

impl Default for KeyAgreementAlgorithm {
    fn default() -> Self {
        KeyAgreementAlgorithm::StdDhSha256Kdf
    }
}

impl KeyAgreementAlgorithm {
    /// Look up a key-agreement scheme by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            oid::DH_SINGLE_PASS_STD_DH_SHA1KDF => Ok(KeyAgreementAlgorithm::StdDhSha1Kdf),
            oid::DH_SINGLE_PASS_STD_DH_SHA224KDF => Ok(KeyAgreementAlgorithm::StdDhSha224Kdf),
            oid::DH_SINGLE_PASS_STD_DH_SHA256KDF => Ok(KeyAgreementAlgorithm::StdDhSha256Kdf),
            oid::DH_SINGLE_PASS_STD_DH_SHA384KDF => Ok(KeyAgreementAlgorithm::StdDhSha384Kdf),
            oid::DH_SINGLE_PASS_STD_DH_SHA512KDF => Ok(KeyAgreementAlgorithm::StdDhSha512Kdf),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The scheme's OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            KeyAgreementAlgorithm::StdDhSha1Kdf => oid::DH_SINGLE_PASS_STD_DH_SHA1KDF,
            KeyAgreementAlgorithm::StdDhSha224Kdf => oid::DH_SINGLE_PASS_STD_DH_SHA224KDF,
            KeyAgreementAlgorithm::StdDhSha256Kdf => oid::DH_SINGLE_PASS_STD_DH_SHA256KDF,
            KeyAgreementAlgorithm::StdDhSha384Kdf => oid::DH_SINGLE_PASS_STD_DH_SHA384KDF,
            KeyAgreementAlgorithm::StdDhSha512Kdf => oid::DH_SINGLE_PASS_STD_DH_SHA512KDF,
        }
    }

    /// Hash used by the X9.63 KDF.
    pub fn kdf_digest(self) -> DigestAlgorithm {
        match self {
            KeyAgreementAlgorithm::StdDhSha1Kdf => DigestAlgorithm::Sha1,
            KeyAgreementAlgorithm::StdDhSha224Kdf => DigestAlgorithm::Sha224,
            KeyAgreementAlgorithm::StdDhSha256Kdf => DigestAlgorithm::Sha256,
            KeyAgreementAlgorithm::StdDhSha384Kdf => DigestAlgorithm::Sha384,
            KeyAgreementAlgorithm::StdDhSha512Kdf => DigestAlgorithm::Sha512,
        }
    }
}

/// Signature algorithm: public-key family combined with a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5
    Rsa(DigestAlgorithm),
    /// ECDSA over a NIST prime curve
    Ecdsa(DigestAlgorithm),
}

impl SignatureAlgorithm {
    /// The combined signature OID, e.g. `sha256WithRSAEncryption`.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Rsa(digest) => match digest {
                DigestAlgorithm::Sha1 => oid::SHA1_WITH_RSA,
                DigestAlgorithm::Sha224 => oid::SHA224_WITH_RSA,
                DigestAlgorithm::Sha256 => oid::SHA256_WITH_RSA,
                DigestAlgorithm::Sha384 => oid::SHA384_WITH_RSA,
                DigestAlgorithm::Sha512 => oid::SHA512_WITH_RSA,
            },
            SignatureAlgorithm::Ecdsa(digest) => match digest {
                DigestAlgorithm::Sha1 => oid::ECDSA_WITH_SHA1,
                DigestAlgorithm::Sha224 => oid::ECDSA_WITH_SHA224,
                DigestAlgorithm::Sha256 => oid::ECDSA_WITH_SHA256,
                DigestAlgorithm::Sha384 => oid::ECDSA_WITH_SHA384,
                DigestAlgorithm::Sha512 => oid::ECDSA_WITH_SHA512,
            },
        }
    }

    /// Digest component.
    pub fn digest(self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::Rsa(digest) | SignatureAlgorithm::Ecdsa(digest) => digest,
        }
    }

    /// RSA identifiers carry NULL parameters, ECDSA identifiers carry none.
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        let parameters = match self {
            SignatureAlgorithm::Rsa(_) => Some(Any::from(Null)),
            SignatureAlgorithm::Ecdsa(_) => None,
        };
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters,
        }
    }

    /// Interpret a SignerInfo `signatureAlgorithm`.
    ///
    /// Bare `rsaEncryption` and `id-ecPublicKey` are accepted too, in which case the
    /// SignerInfo's `digestAlgorithm` supplies the hash.
    pub fn from_oid(oid: ObjectIdentifier, digest: DigestAlgorithm) -> Result<Self> {
        let alg = match oid {
            oid::RSA_ENCRYPTION => SignatureAlgorithm::Rsa(digest),
            oid::SHA1_WITH_RSA => SignatureAlgorithm::Rsa(DigestAlgorithm::Sha1),
            oid::SHA224_WITH_RSA => SignatureAlgorithm::Rsa(DigestAlgorithm::Sha224),
            oid::SHA256_WITH_RSA => SignatureAlgorithm::Rsa(DigestAlgorithm::Sha256),
            oid::SHA384_WITH_RSA => SignatureAlgorithm::Rsa(DigestAlgorithm::Sha384),
            oid::SHA512_WITH_RSA => SignatureAlgorithm::Rsa(DigestAlgorithm::Sha512),
            oid::ID_EC_PUBLIC_KEY => SignatureAlgorithm::Ecdsa(digest),
            oid::ECDSA_WITH_SHA1 => SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha1),
            oid::ECDSA_WITH_SHA224 => SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha224),
            oid::ECDSA_WITH_SHA256 => SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha256),
            oid::ECDSA_WITH_SHA384 => SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha384),
            oid::ECDSA_WITH_SHA512 => SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha512),
            _ => return Err(Error::UnsupportedAlgorithm),
        };

        if alg.digest() != digest {
            return Err(Error::UnsupportedAlgorithm);
        }
        Ok(alg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_digest_table() {
        for alg in [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha224,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(DigestAlgorithm::from_oid(alg.oid()), Ok(alg));
            assert_eq!(alg.digest(b"abc").len(), alg.output_size());
        }

        assert_eq!(
            DigestAlgorithm::Sha256.digest(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(
            DigestAlgorithm::from_oid(oid::AES128_CBC),
            Err(Error::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_cipher_sizes() {
        let table = [
            (ContentEncryptionAlgorithm::Aes128Cbc, 16, 16),
            (ContentEncryptionAlgorithm::Aes192Cbc, 24, 16),
            (ContentEncryptionAlgorithm::Aes256Cbc, 32, 16),
            (ContentEncryptionAlgorithm::DesCbc, 8, 8),
            (ContentEncryptionAlgorithm::DesEde3Cbc, 24, 8),
        ];
        for (alg, key, block) in table {
            assert_eq!(alg.key_size(), key);
            assert_eq!(alg.block_size(), block);
            assert_eq!(ContentEncryptionAlgorithm::from_oid(alg.oid()), Ok(alg));
        }
    }

    #[test]
    fn test_signature_oids() {
        let alg = SignatureAlgorithm::from_oid(oid::SHA384_WITH_RSA, DigestAlgorithm::Sha384);
        assert_eq!(alg, Ok(SignatureAlgorithm::Rsa(DigestAlgorithm::Sha384)));

        let alg = SignatureAlgorithm::from_oid(oid::RSA_ENCRYPTION, DigestAlgorithm::Sha1);
        assert_eq!(alg, Ok(SignatureAlgorithm::Rsa(DigestAlgorithm::Sha1)));

        // digestAlgorithm and signatureAlgorithm disagree
        let alg = SignatureAlgorithm::from_oid(oid::ECDSA_WITH_SHA256, DigestAlgorithm::Sha512);
        assert_eq!(alg, Err(Error::UnsupportedAlgorithm));

        let id = SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha256).algorithm_identifier();
        assert!(id.parameters.is_none());
        let id = SignatureAlgorithm::Rsa(DigestAlgorithm::Sha256).algorithm_identifier();
        assert!(id.parameters.is_some());
    }

    #[test]
    fn test_kdf_digest() {
        for (ka, digest) in [
            (KeyAgreementAlgorithm::StdDhSha1Kdf, DigestAlgorithm::Sha1),
            (KeyAgreementAlgorithm::StdDhSha256Kdf, DigestAlgorithm::Sha256),
            (KeyAgreementAlgorithm::StdDhSha512Kdf, DigestAlgorithm::Sha512),
        ] {
            assert_eq!(ka.kdf_digest(), digest);
            assert_eq!(KeyAgreementAlgorithm::from_oid(ka.oid()), Ok(ka));
        }
    }
}
