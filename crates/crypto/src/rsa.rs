//! RSA PKCS#1 v1.5 encryption and signing per RFC 8017 §7.2, §8.2, built on
//! [`crate::bignum`]'s modular exponentiation.
//!
//! This backs the `Rsa`/`RsaPsk` key-exchange strategies (`rsa_encrypt`,
//! encrypting the premaster secret under the server's public key) and
//! `CertificateVerify`/`ServerKeyExchange` signature checks for RSA-signing
//! ciphersuites (`sign`/`verify`).

use crate::bignum::BigUint;
use crate::x509::RsaPublicKey;

/// DigestInfo DER prefixes for the hash algorithms this client negotiates in
/// `signature_algorithms` (RFC 8017 §9.2 Table, restricted to the hashes
/// RFC 5246 §7.4.1.4.1 enumerates as `HashAlgorithm`).
fn digest_info_prefix(hash_id: u8) -> Option<&'static [u8]> {
    match hash_id {
        // sha256
        4 => Some(&[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ]),
        // sha384
        5 => Some(&[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ]),
        // sha1, kept for servers that still sign with it (RFC 5246 default hash)
        2 => Some(&[0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14]),
        _ => None,
    }
}

fn hash_len(hash_id: u8) -> usize {
    match hash_id {
        2 => 20,
        5 => 48,
        _ => 32,
    }
}

/// `RSAES-PKCS1-V1_5-ENCRYPT`: pad `message` and encrypt under `pk`.
/// `rng` supplies the non-zero random padding bytes (RFC 8017 §7.2.1 step 1).
pub fn encrypt(pk: &RsaPublicKey, message: &[u8], rng: &dyn Fn(&mut [u8])) -> Result<Vec<u8>, &'static str> {
    let k = pk.modulus_len();
    if message.len() > k.saturating_sub(11) {
        return Err("message too long for RSA modulus");
    }
    let mut em = vec![0u8; k];
    em[0] = 0x00;
    em[1] = 0x02;
    let ps_len = k - message.len() - 3;
    let mut ps = vec![0u8; ps_len];
    loop {
        rng(&mut ps);
        if ps.iter().all(|&b| b != 0) {
            break;
        }
    }
    em[2..2 + ps_len].copy_from_slice(&ps);
    em[2 + ps_len] = 0x00;
    em[3 + ps_len..].copy_from_slice(message);

    let m = BigUint::from_be_bytes(&em);
    let c = m.mod_pow(&pk.exponent, &pk.modulus);
    Ok(c.to_be_bytes(k))
}

/// `RSASSA-PKCS1-V1_5-VERIFY`: check `signature` over `digest` (already
/// hashed with the algorithm named by `hash_id`) against `pk`.
pub fn verify(pk: &RsaPublicKey, hash_id: u8, digest: &[u8], signature: &[u8]) -> Result<(), &'static str> {
    let k = pk.modulus_len();
    if signature.len() != k {
        return Err("signature length does not match modulus size");
    }
    let prefix = digest_info_prefix(hash_id).ok_or("unsupported signature hash")?;
    if digest.len() != hash_len(hash_id) {
        return Err("digest length does not match declared hash algorithm");
    }

    let s = BigUint::from_be_bytes(signature);
    let m = s.mod_pow(&pk.exponent, &pk.modulus);
    let em = m.to_be_bytes(k);

    let t_len = prefix.len() + digest.len();
    if em[0] != 0x00 || em[1] != 0x01 {
        return Err("invalid PKCS#1 v1.5 signature padding");
    }
    let ps_len = k - t_len - 3;
    if em[2..2 + ps_len].iter().any(|&b| b != 0xff) {
        return Err("invalid PKCS#1 v1.5 padding bytes");
    }
    if em[2 + ps_len] != 0x00 {
        return Err("invalid PKCS#1 v1.5 padding terminator");
    }
    let t = &em[3 + ps_len..];
    if &t[..prefix.len()] != prefix || &t[prefix.len()..] != digest {
        return Err("digest mismatch");
    }
    Ok(())
}

/// `RSASSA-PKCS1-V1_5-SIGN`: sign `digest` (already hashed) with the client's
/// own private key.
pub fn sign(private_key: &RsaPrivateKey, hash_id: u8, digest: &[u8]) -> Result<Vec<u8>, &'static str> {
    let k = private_key.modulus_len();
    let prefix = digest_info_prefix(hash_id).ok_or("unsupported signature hash")?;
    let t_len = prefix.len() + digest.len();
    if t_len + 11 > k {
        return Err("modulus too small for this digest's DigestInfo");
    }
    let ps_len = k - t_len - 3;
    let mut em = vec![0u8; k];
    em[0] = 0x00;
    em[1] = 0x01;
    for b in &mut em[2..2 + ps_len] {
        *b = 0xff;
    }
    em[2 + ps_len] = 0x00;
    em[3 + ps_len..3 + ps_len + prefix.len()].copy_from_slice(prefix);
    em[3 + ps_len + prefix.len()..].copy_from_slice(digest);

    let m = BigUint::from_be_bytes(&em);
    let s = m.mod_pow(&private_key.exponent, &private_key.modulus);
    Ok(s.to_be_bytes(k))
}

/// An RSA private key: `(d, n)`. The client only ever uses this for
/// `CertificateVerify` on a mutual-TLS handshake.
pub struct RsaPrivateKey {
    pub exponent: BigUint,
    pub modulus: BigUint,
    modulus_byte_len: usize,
}

impl RsaPrivateKey {
    pub fn new(exponent: BigUint, modulus: BigUint, modulus_byte_len: usize) -> Self {
        Self { exponent, modulus, modulus_byte_len }
    }

    fn modulus_len(&self) -> usize {
        self.modulus_byte_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair() -> (RsaPublicKey, RsaPrivateKey) {
        // A toy 64-bit "RSA" keypair, large enough to exercise the PKCS#1
        // framing logic without a real-sized modulus; not a security claim.
        let n = BigUint::from_be_bytes(&3233u32.to_be_bytes());
        let e = BigUint::from_be_bytes(&17u32.to_be_bytes());
        let d = BigUint::from_be_bytes(&2753u32.to_be_bytes());
        let pk = RsaPublicKey::new(e, n.clone(), 2);
        let sk = RsaPrivateKey::new(d, n, 2);
        (pk, sk)
    }

    #[test]
    fn encrypt_then_decrypt_roundtrip() {
        let (pk, _sk) = test_keypair();
        // message must fit k - 11 bytes; with k=2 this keypair can't carry a
        // real payload, so this test instead checks the padding rejects an
        // oversized message deterministically.
        let msg = [0xAAu8; 10];
        assert!(encrypt(&pk, &msg, &|buf| buf.fill(0x01)).is_err());
    }

    #[test]
    fn sign_then_verify_roundtrip_with_real_size_keys() {
        // Exercise sign/verify framing against a key size that actually
        // leaves room for a SHA-256 DigestInfo (32-byte hash + prefix).
        let modulus_bytes = [0x01u8; 64]; // not a real prime product, framing-only check
        let n = BigUint::from_be_bytes(&modulus_bytes);
        let e = BigUint::from_be_bytes(&[1, 0, 1]);
        let d = BigUint::from_be_bytes(&[1, 0, 1]);
        let pk = RsaPublicKey::new(e, n.clone(), 64);
        let sk = RsaPrivateKey::new(d, n, 64);
        let digest = [0x42u8; 32];
        let sig = sign(&sk, 4, &digest).unwrap();
        assert_eq!(sig.len(), 64);
        // With exponent == d == e == 1 mod-pow is the identity, so signing
        // then "verifying" with the same exponent round-trips the EM block.
        let recovered = verify(&pk, 4, &digest, &sig);
        assert!(recovered.is_ok());
    }
}
