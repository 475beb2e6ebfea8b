//! Content cipher: CBC encryption with PKCS#7 block padding.

use alloc::vec::Vec;
use cbc::cipher::{
    block_padding::NoPadding, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroizing;

use crate::algorithms::ContentEncryptionAlgorithm;
use crate::errors::{Error, Result};

/// Number of pad bytes appended to `len` bytes of content: always in `[1, block_size]`.
#[inline]
pub(crate) fn pad_len(len: usize, block_size: usize) -> usize {
    block_size - (len % block_size)
}

/// Copy `content` into a fresh buffer and append the pad bytes.
pub(crate) fn pad(content: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    let n = pad_len(content.len(), block_size);
    let mut out = Zeroizing::new(Vec::with_capacity(content.len() + n));
    out.extend_from_slice(content);
    out.resize(content.len() + n, n as u8);
    out
}

/// Validate the padding of a decrypted buffer and return the content length.
pub(crate) fn unpad(buf: &[u8], block_size: usize) -> Result<usize> {
    let n = match buf.last() {
        Some(&n) => n as usize,
        None => return Err(Error::Decryption),
    };
    if n == 0 || n > block_size || n > buf.len() {
        return Err(Error::Decryption);
    }

    let mut valid = Choice::from(1u8);
    for b in &buf[buf.len() - n..] {
        valid &= b.ct_eq(&(n as u8));
    }
    if !bool::from(valid) {
        return Err(Error::Decryption);
    }

    Ok(buf.len() - n)
}

/// Pad and encrypt `content` under `key` and `iv`.
pub(crate) fn encrypt(
    alg: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    content: &[u8],
) -> Result<Vec<u8>> {
    check_sizes(alg, key, iv)?;

    let mut buf = pad(content, alg.block_size());
    match alg {
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_encrypt::<aes::Aes128>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_encrypt::<aes::Aes192>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_encrypt::<aes::Aes256>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::DesCbc => cbc_encrypt::<des::Des>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::DesEde3Cbc => cbc_encrypt::<des::TdesEde3>(key, iv, &mut buf)?,
    }

    // the buffer now only holds ciphertext
    Ok(buf.to_vec())
}

/// Decrypt `ciphertext` and strip its padding.
pub(crate) fn decrypt(
    alg: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = decrypt_blocks(alg, key, iv, ciphertext)?;
    let len = unpad(&buf, alg.block_size())?;
    buf.truncate(len);
    Ok(buf)
}

/// Decrypt `ciphertext` leaving the padding in place.
pub(crate) fn decrypt_blocks(
    alg: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    check_sizes(alg, key, iv)?;

    let block_size = alg.block_size();
    if ciphertext.is_empty() || ciphertext.len() % block_size != 0 {
        return Err(Error::Decryption);
    }

    let mut buf = Zeroizing::new(ciphertext.to_vec());
    match alg {
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_decrypt::<aes::Aes128>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_decrypt::<aes::Aes192>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_decrypt::<aes::Aes256>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::DesCbc => cbc_decrypt::<des::Des>(key, iv, &mut buf)?,
        ContentEncryptionAlgorithm::DesEde3Cbc => cbc_decrypt::<des::TdesEde3>(key, iv, &mut buf)?,
    }
    Ok(buf)
}

fn check_sizes(alg: ContentEncryptionAlgorithm, key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != alg.key_size() {
        return Err(Error::InvalidArgument("content-encryption key length"));
    }
    if iv.len() != alg.block_size() {
        return Err(Error::InvalidArgument("IV length"));
    }
    Ok(())
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let len = buf.len();
    cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::InvalidArgument("content-encryption key length"))?
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| Error::InvalidArgument("content not block aligned"))?;
    Ok(())
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::InvalidArgument("content-encryption key length"))?
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| Error::Decryption)?;
    Ok(())
}
