//! Error types.

/// Alias for [`core::result::Result`] with the `cms-codec` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A required input was missing or empty.
    InvalidArgument(&'static str),

    /// Malformed DER or an unexpected tag.
    Parse(der::Error),

    /// A length field runs past the end of the supplied message.
    Truncated,

    /// Unsupported CMS version for the content type.
    Version,

    /// The outer content type does not match the one the operation expects.
    ContentTypeMismatch,

    /// Digest, cipher, key-wrap, key-agreement or signature algorithm not recognized.
    UnsupportedAlgorithm,

    /// Public or private key bytes are malformed.
    KeyDecode,

    /// Signature verification failed.
    SignatureVerification,

    /// No RecipientInfo entry matches the configured certificate.
    NoMatchingRecipient,

    /// Decryption failed: bad padding, key unwrap integrity failure or RSA decryption error.
    Decryption,

    /// Output buffer too small.
    BufferTooSmall {
        /// Number of bytes the output needs.
        needed: usize,
    },

    /// The configured allocation ceiling would be exceeded.
    Allocation,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            Error::Parse(err) => write!(f, "parse error: {}", err),
            Error::Truncated => write!(f, "message truncated"),
            Error::Version => write!(f, "unsupported CMS version"),
            Error::ContentTypeMismatch => write!(f, "content type mismatch"),
            Error::UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
            Error::KeyDecode => write!(f, "key decode error"),
            Error::SignatureVerification => write!(f, "signature verification error"),
            Error::NoMatchingRecipient => write!(f, "no matching recipient"),
            Error::Decryption => write!(f, "decryption error"),
            Error::BufferTooSmall { needed } => {
                write!(f, "output buffer too small: {} bytes needed", needed)
            }
            Error::Allocation => write!(f, "allocation limit exceeded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        match err.kind() {
            der::ErrorKind::Incomplete { .. } => Error::Truncated,
            _ => Error::Parse(err),
        }
    }
}

impl From<spki::Error> for Error {
    fn from(err: spki::Error) -> Error {
        match err {
            spki::Error::Asn1(err) => err.into(),
            spki::Error::OidUnknown { .. } => Error::UnsupportedAlgorithm,
            _ => Error::KeyDecode,
        }
    }
}

impl From<pkcs8::Error> for Error {
    fn from(_err: pkcs8::Error) -> Error {
        Error::KeyDecode
    }
}

impl From<pkcs1::Error> for Error {
    fn from(_err: pkcs1::Error) -> Error {
        Error::KeyDecode
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Error {
        match err {
            rsa::Error::Verification => Error::SignatureVerification,
            rsa::Error::Decryption => Error::Decryption,
            rsa::Error::ModulusTooLarge => {
                Error::InvalidArgument("RSA modulus exceeds max_rsa_bits")
            }
            rsa::Error::MessageTooLong => Error::InvalidArgument("message too long for RSA modulus"),
            rsa::Error::InputNotHashed | rsa::Error::InvalidPadLen => {
                Error::InvalidArgument("digest length")
            }
            rsa::Error::InvalidPaddingScheme
            | rsa::Error::LabelTooLong
            | rsa::Error::InvalidArguments
            | rsa::Error::Internal => Error::InvalidArgument("RSA operation"),
            _ => Error::KeyDecode,
        }
    }
}

// Signing maps its own failures; this conversion serves verification.
impl From<signature::Error> for Error {
    fn from(_err: signature::Error) -> Error {
        Error::SignatureVerification
    }
}

impl From<p256::elliptic_curve::Error> for Error {
    fn from(_err: p256::elliptic_curve::Error) -> Error {
        Error::KeyDecode
    }
}

impl From<aes_kw::Error> for Error {
    fn from(err: aes_kw::Error) -> Error {
        match err {
            aes_kw::Error::IntegrityCheckFailed => Error::Decryption,
            _ => Error::InvalidArgument("key wrap length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_maps_to_truncated() {
        let err = der::Error::incomplete(der::Length::new(4));
        assert_eq!(Error::from(err), Error::Truncated);

        let err = der::Error::from(der::ErrorKind::Overflow);
        assert_eq!(Error::from(err), Error::Parse(der::ErrorKind::Overflow.into()));
    }

    #[test]
    fn test_rsa_errors() {
        assert_eq!(
            Error::from(rsa::Error::MessageTooLong),
            Error::InvalidArgument("message too long for RSA modulus")
        );
        assert_eq!(
            Error::from(rsa::Error::ModulusTooLarge),
            Error::InvalidArgument("RSA modulus exceeds max_rsa_bits")
        );
        assert_eq!(Error::from(rsa::Error::InvalidModulus), Error::KeyDecode);
        assert_eq!(Error::from(rsa::Error::Decryption), Error::Decryption);
    }

    #[test]
    fn test_display() {
        let err = Error::BufferTooSmall { needed: 42 };
        assert_eq!(err.to_string(), "output buffer too small: 42 bytes needed");
    }
}
