//! TLS 1.2 PRF per RFC 5246 §5.
//!
//! PRF(secret, label, seed) = P_hash(secret, label || seed)
//! P_hash(secret, seed) = HMAC(secret, A(1) || seed) || HMAC(secret, A(2) || seed) || ...
//! where A(0) = seed, A(i) = HMAC(secret, A(i-1)).

use crate::hmac::{HmacSha256, HmacSha384};
use tls12::ciphersuite::PrfHash;

fn p_hash_sha256(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(out_len);
    let mut a = seed.to_vec();
    while out.len() < out_len {
        let mut mac = HmacSha256::new(secret);
        mac.update(&a);
        a = mac.finalize().to_vec();

        let mut mac = HmacSha256::new(secret);
        mac.update(&a);
        mac.update(seed);
        out.extend_from_slice(&mac.finalize());
    }
    out.truncate(out_len);
    out
}

fn p_hash_sha384(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(out_len);
    let mut a = seed.to_vec();
    while out.len() < out_len {
        let mut mac = HmacSha384::new(secret);
        mac.update(&a);
        a = mac.finalize().to_vec();

        let mut mac = HmacSha384::new(secret);
        mac.update(&a);
        mac.update(seed);
        out.extend_from_slice(&mac.finalize());
    }
    out.truncate(out_len);
    out
}

pub fn prf(which: PrfHash, secret: &[u8], label: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    let mut full_seed = Vec::with_capacity(label.len() + seed.len());
    full_seed.extend_from_slice(label);
    full_seed.extend_from_slice(seed);
    match which {
        PrfHash::Sha256 => p_hash_sha256(secret, &full_seed, out_len),
        PrfHash::Sha384 => p_hash_sha384(secret, &full_seed, out_len),
    }
}
