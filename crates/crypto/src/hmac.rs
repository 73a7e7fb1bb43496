//! HMAC implementation per RFC 2104, generic over the two hashes the TLS 1.2
//! PRF needs (SHA-256, SHA-384 — RFC 5246 §5, RFC 5289).
//!
//! HMAC(K, m) = H((K' ⊕ opad) || H((K' ⊕ ipad) || m))
//! where K' is the key padded/hashed to the underlying hash's block size.

use crate::sha256::{self, Sha256};
use crate::sha384::{self, Sha384};

/// One of the two hash functions HMAC is built over in this crate.
pub trait HashAlgo {
    const BLOCK_LEN: usize;
    const OUT_LEN: usize;
    type Output: AsRef<[u8]>;
    fn new() -> Self;
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Self::Output;
    fn oneshot(data: &[u8]) -> Self::Output;
}

impl HashAlgo for Sha256 {
    const BLOCK_LEN: usize = sha256::BLOCK_LEN;
    const OUT_LEN: usize = sha256::OUT_LEN;
    type Output = [u8; sha256::OUT_LEN];
    fn new() -> Self {
        Sha256::new()
    }
    fn update(&mut self, data: &[u8]) {
        Sha256::update(self, data)
    }
    fn finalize(self) -> Self::Output {
        Sha256::finalize(self)
    }
    fn oneshot(data: &[u8]) -> Self::Output {
        sha256::sha256(data)
    }
}

impl HashAlgo for Sha384 {
    const BLOCK_LEN: usize = sha384::BLOCK_LEN;
    const OUT_LEN: usize = sha384::OUT_LEN;
    type Output = [u8; sha384::OUT_LEN];
    fn new() -> Self {
        Sha384::new()
    }
    fn update(&mut self, data: &[u8]) {
        Sha384::update(self, data)
    }
    fn finalize(self) -> Self::Output {
        Sha384::finalize(self)
    }
    fn oneshot(data: &[u8]) -> Self::Output {
        sha384::sha384(data)
    }
}

/// Streaming HMAC over any [`HashAlgo`].
pub struct Hmac<H: HashAlgo> {
    inner: H,
    outer_key_pad: Vec<u8>,
}

impl<H: HashAlgo> Hmac<H> {
    pub fn new(key: &[u8]) -> Self {
        let mut k_prime = vec![0u8; H::BLOCK_LEN];
        if key.len() > H::BLOCK_LEN {
            let hashed = H::oneshot(key);
            k_prime[..H::OUT_LEN].copy_from_slice(hashed.as_ref());
        } else {
            k_prime[..key.len()].copy_from_slice(key);
        }

        let mut ipad = vec![0u8; H::BLOCK_LEN];
        let mut opad = vec![0u8; H::BLOCK_LEN];
        for i in 0..H::BLOCK_LEN {
            ipad[i] = k_prime[i] ^ 0x36;
            opad[i] = k_prime[i] ^ 0x5c;
        }

        let mut inner = H::new();
        inner.update(&ipad);

        Self { inner, outer_key_pad: opad }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> H::Output {
        let inner_hash = self.inner.finalize();
        let mut outer = H::new();
        outer.update(&self.outer_key_pad);
        outer.update(inner_hash.as_ref());
        outer.finalize()
    }
}

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha384 = Hmac<Sha384>;

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; sha256::OUT_LEN] {
    let mut mac = HmacSha256::new(key);
    mac.update(data);
    mac.finalize()
}

pub fn hmac_sha384(key: &[u8], data: &[u8]) -> [u8; sha384::OUT_LEN] {
    let mut mac = HmacSha384::new(key);
    mac.update(data);
    mac.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    // RFC 4231 test case 2.
    #[test]
    fn rfc4231_case2_sha256() {
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex(&tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn rfc4231_case2_sha384() {
        let tag = hmac_sha384(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex(&tag),
            "af45d2e376484031617f78d2b58a6b1b9c7ef464f5a01b47e42ec3736322445e8e2240ca5e69e2c78b3239ecfab21649"
        );
    }

    #[test]
    fn key_longer_than_block_is_hashed_first() {
        let key = vec![0xaau8; 200];
        let tag = hmac_sha256(&key, b"data");
        assert_eq!(tag.len(), 32);
    }
}
