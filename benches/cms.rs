#![feature(test)]

extern crate test;

use cms_codec::{ContentEncryptionAlgorithm, MessageContext};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use test::Bencher;

const KEY: [u8; 32] = [0x42; 32];

fn content() -> Vec<u8> {
    vec![0x5a; 4096]
}

#[bench]
fn bench_encrypted_data_encode(b: &mut Bencher) {
    let content = content();
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let mut ctx = MessageContext::new();
    ctx.set_encryption_key(&KEY);
    ctx.set_content(&content);

    b.iter(|| {
        let msg = ctx.encode_encrypted_data(&mut rng).unwrap();
        test::black_box(msg);
    });
}

#[bench]
fn bench_encrypted_data_decode(b: &mut Bencher) {
    let content = content();
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let mut ctx = MessageContext::new();
    ctx.set_encryption_key(&KEY);
    ctx.set_content(&content);
    let msg = ctx.encode_encrypted_data(&mut rng).unwrap();

    let mut decoder = MessageContext::new();
    decoder.set_encryption_key(&KEY);
    b.iter(|| {
        let plaintext = decoder.decode_encrypted_data(&msg).unwrap();
        test::black_box(plaintext);
    });
}

#[bench]
fn bench_encrypted_data_des_ede3(b: &mut Bencher) {
    let content = content();
    let mut rng = ChaCha8Rng::from_seed([42; 32]);
    let mut ctx = MessageContext::new();
    ctx.set_content_encryption_algorithm(ContentEncryptionAlgorithm::DesEde3Cbc);
    ctx.set_encryption_key(&KEY[..24]);
    ctx.set_content(&content);

    b.iter(|| {
        let msg = ctx.encode_encrypted_data(&mut rng).unwrap();
        test::black_box(msg);
    });
}
