//! EnvelopedData encode/decode tests.

mod common;

use cms_codec::{
    oid, ContentEncryptionAlgorithm, ContextConfig, Error, KeyAgreementAlgorithm,
    KeyWrapAlgorithm, MessageContext, RecipientIdentifierKind,
};
use common::{find, identity, identity_without_ski, rng, rsa_certificate, Identity, KeyKind};

const HELLO: &[u8] = b"Hello, World!";

fn recipient(id: &Identity) -> MessageContext<'static> {
    let mut ctx = MessageContext::from_cert(&id.cert).unwrap();
    ctx.set_private_key_der(&id.key).unwrap();
    ctx
}

fn envelope(to: &[&Identity], content: &[u8], seed: u64) -> Vec<u8> {
    let mut ctx = MessageContext::new();
    for id in to {
        ctx.add_recipient(&id.cert).unwrap();
    }
    ctx.set_content(content);
    ctx.encode_enveloped_data(&mut rng(seed)).unwrap()
}

#[test]
fn hello_world_aes128_rsa() {
    let id = identity(KeyKind::Rsa, 20);

    // primary certificate doubles as the recipient
    let mut ctx = MessageContext::from_cert(&id.cert).unwrap();
    ctx.set_content_encryption_algorithm(ContentEncryptionAlgorithm::Aes128Cbc);
    ctx.set_content(HELLO);
    let msg = ctx.encode_enveloped_data(&mut rng(20)).unwrap();
    assert_eq!(cms_codec::content_type_of(&msg), Ok(oid::ID_ENVELOPED_DATA));

    // "Hello, World!" pads to a single 16-byte block
    let iv_and_ct = &msg[msg.len() - 16 - 2..];
    assert_eq!(iv_and_ct[..2], [0x80, 0x10]);

    assert_eq!(recipient(&id).decode_enveloped_data(&msg).unwrap(), HELLO);
}

#[test]
fn kari_round_trip() {
    for kind in [KeyKind::P256, KeyKind::P384] {
        let id = identity(kind, 21);
        let msg = envelope(&[&id], HELLO, 21);
        assert_eq!(recipient(&id).decode_enveloped_data(&msg).unwrap(), HELLO);
    }
}

#[test]
fn kari_algorithm_choices() {
    let id = identity(KeyKind::P384, 22);
    for (ka, wrap) in [
        (KeyAgreementAlgorithm::StdDhSha1Kdf, KeyWrapAlgorithm::Aes128Wrap),
        (KeyAgreementAlgorithm::StdDhSha224Kdf, KeyWrapAlgorithm::Aes192Wrap),
        (KeyAgreementAlgorithm::StdDhSha384Kdf, KeyWrapAlgorithm::Aes256Wrap),
        (KeyAgreementAlgorithm::StdDhSha512Kdf, KeyWrapAlgorithm::Aes128Wrap),
    ] {
        let mut ctx = MessageContext::new();
        ctx.add_recipient(&id.cert).unwrap();
        ctx.set_key_agreement_algorithm(ka);
        ctx.set_key_wrap_algorithm(wrap);
        ctx.set_content(HELLO);
        let msg = ctx.encode_enveloped_data(&mut rng(22)).unwrap();

        assert_eq!(recipient(&id).decode_enveloped_data(&msg).unwrap(), HELLO);
    }
}

#[test]
fn kari_with_user_keying_material() {
    let id = identity(KeyKind::P256, 23);

    let mut ctx = MessageContext::new();
    ctx.add_recipient(&id.cert).unwrap();
    ctx.set_user_keying_material(b"per-message ukm");
    ctx.set_content(HELLO);
    let msg = ctx.encode_enveloped_data(&mut rng(23)).unwrap();
    find(&msg, b"per-message ukm");

    assert_eq!(recipient(&id).decode_enveloped_data(&msg).unwrap(), HELLO);
}

#[test]
fn corrupted_kari_wrapped_key() {
    let id = identity(KeyKind::P256, 24);
    let msg = envelope(&[&id], HELLO, 24);

    // The wrapped key closes the RecipientInfo SET, directly before the
    // two-byte EncryptedContentInfo header and its id-data OID.
    let data_oid = [0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];
    let at = find(&msg, &data_oid);
    assert_eq!(msg[at - 2], 0x30);

    let mut tampered = msg.clone();
    tampered[at - 3] ^= 0x01;
    assert_eq!(
        recipient(&id).decode_enveloped_data(&tampered),
        Err(Error::Decryption)
    );
}

#[test]
fn multiple_recipients() {
    let rsa = identity(KeyKind::Rsa, 25);
    let p256 = identity(KeyKind::P256, 26);
    let p384 = identity(KeyKind::P384, 27);
    let content = b"one message, three readers";

    let msg = envelope(&[&rsa, &p256, &p384], content, 25);
    for id in [&rsa, &p256, &p384] {
        assert_eq!(recipient(id).decode_enveloped_data(&msg).unwrap(), content);
    }
}

#[test]
fn subject_key_identifier_recipients() {
    let rsa = identity(KeyKind::Rsa, 28);
    // no extension: the identifier is the SHA-1 of the public key
    let p256 = identity_without_ski(KeyKind::P256, 29);

    let mut ctx = MessageContext::new();
    ctx.add_recipient(&rsa.cert).unwrap();
    ctx.add_recipient(&p256.cert).unwrap();
    ctx.set_recipient_identifier(RecipientIdentifierKind::SubjectKeyId);
    ctx.set_content(HELLO);
    let msg = ctx.encode_enveloped_data(&mut rng(28)).unwrap();

    assert_eq!(recipient(&rsa).decode_enveloped_data(&msg).unwrap(), HELLO);
    assert_eq!(recipient(&p256).decode_enveloped_data(&msg).unwrap(), HELLO);
}

#[test]
fn all_content_ciphers() {
    let rsa = identity(KeyKind::Rsa, 30);
    let p256 = identity(KeyKind::P256, 31);
    let content = b"block ciphers of both widths";

    for alg in [
        ContentEncryptionAlgorithm::Aes128Cbc,
        ContentEncryptionAlgorithm::Aes192Cbc,
        ContentEncryptionAlgorithm::Aes256Cbc,
        ContentEncryptionAlgorithm::DesCbc,
        ContentEncryptionAlgorithm::DesEde3Cbc,
    ] {
        let mut ctx = MessageContext::new();
        ctx.add_recipient(&rsa.cert).unwrap();
        ctx.set_content_encryption_algorithm(alg);
        ctx.set_content(content);
        let msg = ctx.encode_enveloped_data(&mut rng(30)).unwrap();
        assert_eq!(recipient(&rsa).decode_enveloped_data(&msg).unwrap(), content);

        // a single-DES key is too short for AES key wrap
        let mut ctx = MessageContext::new();
        ctx.add_recipient(&p256.cert).unwrap();
        ctx.set_content_encryption_algorithm(alg);
        ctx.set_content(content);
        let encoded = ctx.encode_enveloped_data(&mut rng(31));
        if alg == ContentEncryptionAlgorithm::DesCbc {
            assert_eq!(
                encoded,
                Err(Error::InvalidArgument("key wrap input length"))
            );
        } else {
            let msg = encoded.unwrap();
            assert_eq!(recipient(&p256).decode_enveloped_data(&msg).unwrap(), content);
        }
    }
}

#[test]
fn unknown_recipient_info_choices_are_skipped() {
    let alice = identity(KeyKind::Rsa, 44);
    let carol = identity(KeyKind::P256, 45);
    let mut msg = envelope(&[&alice, &carol], b"hi", 44);

    // retag Carol's [1] KeyAgreeRecipientInfo as [2], a KEKRecipientInfo
    let kari_body = [0x02, 0x01, 0x03, 0xa0];
    let at = find(&msg, &kari_body);
    let tag = if msg[at - 3] == 0xa1 { at - 3 } else { at - 4 };
    assert_eq!(msg[tag], 0xa1);
    msg[tag] = 0xa2;

    assert_eq!(recipient(&alice).decode_enveloped_data(&msg).unwrap(), b"hi");
    assert_eq!(
        recipient(&carol).decode_enveloped_data(&msg),
        Err(Error::NoMatchingRecipient)
    );
}

#[test]
fn rsa_recipient_above_4096_bits() {
    // public half only: an odd 6144-bit modulus is enough to transport a key
    let mut modulus = vec![0xd3u8; 768];
    modulus[767] |= 0x01;
    let cert = rsa_certificate(&modulus, 46);

    let mut ctx = MessageContext::new();
    ctx.add_recipient(&cert).unwrap();
    ctx.set_content(HELLO);
    let msg = ctx.encode_enveloped_data(&mut rng(46)).unwrap();
    // encryptedKey is one modulus long
    find(&msg, &[0x04, 0x82, 0x03, 0x00]);

    let mut ctx = MessageContext::with_config(ContextConfig::default().with_max_rsa_bits(4096));
    assert_eq!(
        ctx.add_recipient(&cert),
        Err(Error::InvalidArgument("RSA modulus exceeds max_rsa_bits"))
    );
}

#[test]
fn no_matching_recipient() {
    let alice = identity(KeyKind::Rsa, 32);
    let bob = identity(KeyKind::Rsa, 33);
    let carol = identity(KeyKind::P256, 34);

    let msg = envelope(&[&alice, &carol], HELLO, 32);
    assert_eq!(
        recipient(&bob).decode_enveloped_data(&msg),
        Err(Error::NoMatchingRecipient)
    );
}

#[test]
fn wrong_private_key_for_matching_recipient() {
    let alice = identity(KeyKind::P256, 35);
    let mallory = identity(KeyKind::P256, 36);
    let msg = envelope(&[&alice], HELLO, 35);

    // Alice's certificate with Mallory's key: the KEK differs and the
    // key-wrap integrity check fails
    let mut ctx = MessageContext::from_cert(&alice.cert).unwrap();
    ctx.set_private_key_der(&mallory.key).unwrap();
    assert_eq!(ctx.decode_enveloped_data(&msg), Err(Error::Decryption));
}

#[test]
fn signed_data_is_not_enveloped_data() {
    let id = identity(KeyKind::P256, 37);
    let mut signer = MessageContext::from_cert(&id.cert).unwrap();
    signer.set_private_key_der(&id.key).unwrap();
    signer.set_content(HELLO);
    let signed = signer.encode_signed_data(&mut rng(37)).unwrap();

    assert_eq!(
        recipient(&id).decode_enveloped_data(&signed),
        Err(Error::ContentTypeMismatch)
    );
}

#[test]
fn missing_inputs() {
    let id = identity(KeyKind::P256, 38);

    let mut ctx = MessageContext::new();
    ctx.set_content(HELLO);
    assert_eq!(
        ctx.encode_enveloped_data(&mut rng(38)),
        Err(Error::InvalidArgument("certificate"))
    );

    let msg = envelope(&[&id], HELLO, 38);
    let mut ctx = MessageContext::from_cert(&id.cert).unwrap();
    assert_eq!(
        ctx.decode_enveloped_data(&msg),
        Err(Error::InvalidArgument("private key"))
    );
}

#[test]
fn truncated_message() {
    let id = identity(KeyKind::Rsa, 39);
    let msg = envelope(&[&id], HELLO, 39);

    assert_eq!(
        recipient(&id).decode_enveloped_data(&msg[..msg.len() - 1]),
        Err(Error::Truncated)
    );
}

#[test]
fn decode_into_buffer() {
    let id = identity(KeyKind::P256, 40);
    let msg = envelope(&[&id], HELLO, 40);

    let mut ctx = recipient(&id);
    let mut out = [0u8; 12];
    assert_eq!(
        ctx.decode_enveloped_data_into(&msg, &mut out),
        Err(Error::BufferTooSmall { needed: HELLO.len() })
    );

    let mut out = [0u8; 64];
    let n = ctx.decode_enveloped_data_into(&msg, &mut out).unwrap();
    assert_eq!(&out[..n], HELLO);
}

#[test]
fn encode_into_buffer() {
    let id = identity(KeyKind::P256, 41);
    let mut ctx = MessageContext::from_cert(&id.cert).unwrap();
    ctx.set_content(HELLO);
    let len = ctx.encode_enveloped_data(&mut rng(41)).unwrap().len();

    let mut out = vec![0u8; len - 1];
    assert_eq!(
        ctx.encode_enveloped_data_into(&mut rng(41), &mut out),
        Err(Error::BufferTooSmall { needed: len })
    );

    let mut out = vec![0u8; len];
    assert_eq!(ctx.encode_enveloped_data_into(&mut rng(41), &mut out), Ok(len));
}

#[test]
fn message_size_limit() {
    let id = identity(KeyKind::P256, 42);
    let msg = envelope(&[&id], HELLO, 42);

    let config = ContextConfig::default().with_max_message_size(64);
    let mut ctx = MessageContext::with_config(config);
    ctx.init_with_cert(&id.cert).unwrap();
    ctx.set_private_key_der(&id.key).unwrap();
    assert_eq!(ctx.decode_enveloped_data(&msg), Err(Error::Allocation));

    ctx.set_content(HELLO);
    assert_eq!(ctx.encode_enveloped_data(&mut rng(42)), Err(Error::Allocation));
}
