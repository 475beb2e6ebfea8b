//! The handful of certificate fields the codec needs.

use alloc::vec::Vec;
use der::{Decode, Encode};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoOwned;
use subtle::ConstantTimeEq;
use x509_cert::{ext::pkix::SubjectKeyIdentifier, name::Name, serial_number::SerialNumber, Certificate};

use crate::asn1::IssuerAndSerialNumber;
use crate::context::DEFAULT_MAX_RSA_BITS;
use crate::errors::Result;
use crate::keys::PublicKey;

/// A decoded X.509 certificate, reduced to what signing and recipient
/// matching use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateInfo {
    der: Vec<u8>,
    issuer: Name,
    issuer_hash: [u8; 32],
    serial: SerialNumber,
    subject_key_id: Vec<u8>,
    spki: SubjectPublicKeyInfoOwned,
    public_key: PublicKey,
}

impl CertificateInfo {
    /// Parse a DER certificate, accepting RSA keys of up to
    /// [`DEFAULT_MAX_RSA_BITS`].
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_der_with_max_rsa_bits(der, DEFAULT_MAX_RSA_BITS)
    }

    /// Parse a DER certificate whose RSA key, if any, is at most
    /// `max_rsa_bits` bits.
    pub fn from_der_with_max_rsa_bits(der: &[u8], max_rsa_bits: usize) -> Result<Self> {
        let cert = Certificate::from_der(der)?;
        let tbs = &cert.tbs_certificate;

        let issuer_hash = Sha256::digest(tbs.issuer.to_der()?).into();
        let spki = tbs.subject_public_key_info.clone();
        let public_key = PublicKey::from_spki(&spki, max_rsa_bits)?;

        // RFC 5280 4.2.1.2 method (1) when the extension is absent
        let subject_key_id = match tbs.get::<SubjectKeyIdentifier>()? {
            Some((_, ski)) => ski.0.as_bytes().to_vec(),
            None => Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec(),
        };

        Ok(Self {
            der: der.to_vec(),
            issuer: tbs.issuer.clone(),
            issuer_hash,
            serial: tbs.serial_number.clone(),
            subject_key_id,
            spki,
            public_key,
        })
    }

    /// The certificate as it was supplied.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// SHA-256 of the DER issuer name.
    pub fn issuer_hash(&self) -> &[u8; 32] {
        &self.issuer_hash
    }

    /// Certificate serial number.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial
    }

    /// Subject key identifier: the extension value, or the SHA-1 of the public key bits.
    pub fn subject_key_id(&self) -> &[u8] {
        &self.subject_key_id
    }

    /// Subject public key info as encoded in the certificate.
    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.spki
    }

    /// Decoded subject public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub(crate) fn issuer_and_serial(&self) -> IssuerAndSerialNumber {
        IssuerAndSerialNumber {
            issuer: self.issuer.clone(),
            serial_number: self.serial.clone(),
        }
    }

    /// Compare an `IssuerAndSerialNumber` from a message against this
    /// certificate by issuer-name hash and serial.
    pub(crate) fn matches_issuer_and_serial(&self, ias: &IssuerAndSerialNumber) -> Result<bool> {
        let hash: [u8; 32] = Sha256::digest(ias.issuer.to_der()?).into();
        let same = hash[..].ct_eq(&self.issuer_hash[..])
            & ias
                .serial_number
                .as_bytes()
                .ct_eq(self.serial.as_bytes());
        Ok(same.into())
    }

    pub(crate) fn matches_subject_key_id(&self, ski: &[u8]) -> bool {
        ski.ct_eq(&self.subject_key_id).into()
    }
}
