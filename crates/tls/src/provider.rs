//! Collaborator traits the driver depends on instead of owning implementations.
//!
//! The driver never allocates a socket, never picks a cryptography library,
//! and never decides how a certificate is trusted — each of those concerns is
//! a trait, implemented once by the embedding application (or, for tests and
//! doctests, by `tls12-refcrypto`).

use crate::ciphersuite::{AeadCipher, PrfHash};
use crate::error::Error;

/// Framed record I/O. The driver calls `read` to pull the next handshake
/// record and `write` to flush buffered output; both may return
/// `Error::WouldBlock` to signal "try again once more data is available"
/// without losing any driver state.
pub trait RecordLayer {
    /// Read the next record's plaintext payload and its content type byte.
    fn read(&mut self) -> Result<(u8, Vec<u8>), Error>;
    /// Write a record of the given content type.
    fn write(&mut self, content_type: u8, payload: &[u8]) -> Result<(), Error>;
}

/// A Diffie-Hellman-shaped key exchange: the client generates an ephemeral
/// keypair, sends its public part, and combines the server's public part with
/// its own private part to get a shared secret.
pub trait KeyExchange {
    /// Client's public key share to send in `ClientKeyExchange`.
    fn public_key(&self) -> Vec<u8>;
    /// Combine the server's public key with this exchange's private part.
    fn shared_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Every cryptographic primitive the handshake and record layers call out to.
///
/// Implementations are expected to be stateless or cheaply cloneable; the
/// driver calls these methods interleaved with network I/O, so they must not
/// block.
pub trait CryptoProvider {
    /// Hash `data` with the given PRF hash.
    fn hash(&self, which: PrfHash, data: &[u8]) -> Vec<u8>;

    /// TLS 1.2 PRF: `PRF(secret, label, seed)` truncated to `out_len` bytes.
    fn prf(&self, which: PrfHash, secret: &[u8], label: &[u8], seed: &[u8], out_len: usize) -> Vec<u8>;

    /// Generate an ephemeral DHE keypair over the given (prime, generator).
    fn dhe_keypair(&self, prime: &[u8], generator: &[u8]) -> Result<Box<dyn KeyExchange>, Error>;

    /// Generate an ephemeral ECDHE keypair over the named curve (RFC 4492 §5.4 curve id).
    fn ecdhe_keypair(&self, curve: u16) -> Result<Box<dyn KeyExchange>, Error>;

    /// RSA PKCS#1 v1.5 encrypt `data` under the server's RSA public key (for
    /// the `Rsa`/`RsaPsk` key-exchange strategies).
    fn rsa_encrypt(&self, spki: &[u8], data: &[u8]) -> Result<Vec<u8>, Error>;

    /// Verify an RSA or ECDSA signature over `message` against `spki`, using
    /// the given signature hash.
    fn verify_signature(
        &self,
        spki: &[u8],
        is_ecdsa: bool,
        hash: u8,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error>;

    /// Sign `message` with the client's own configured certificate key, for
    /// `CertificateVerify` when the server sent a `CertificateRequest` the
    /// client has a matching identity for. Returns `Err(NoSecretKey)` if this
    /// provider was not configured with a client key.
    fn client_sign(&self, is_ecdsa: bool, hash: u8, message: &[u8]) -> Result<Vec<u8>, Error>;

    /// Seal a record: AEAD-encrypt `plaintext` under `key`, authenticating
    /// `aad`. `salt` is the implicit part of the nonce from the key block
    /// (RFC 5246 §6.2.3.3); `sequence_number` is this direction's current
    /// record sequence number, which the provider combines with `salt` into
    /// the full nonce per the cipher's own nonce construction (RFC 5288 §3
    /// for GCM).
    fn aead_seal(&self, cipher: AeadCipher, key: &[u8], salt: &[u8], sequence_number: u64, aad: &[u8], plaintext: &[u8]) -> Vec<u8>;

    /// Open a sealed record, or `Err` if the tag does not verify.
    fn aead_open(
        &self,
        cipher: AeadCipher,
        key: &[u8],
        salt: &[u8],
        sequence_number: u64,
        aad: &[u8],
        sealed: &[u8],
    ) -> Result<Vec<u8>, Error>;
}

/// Certificate-chain trust decisions, kept external per this crate's scope
/// (it never embeds a root store).
pub trait CertificateStore {
    /// Validate `chain` (leaf-first, DER-encoded) against `hostname`. Returns
    /// the leaf's raw SubjectPublicKeyInfo DER on success.
    fn verify_chain(&self, chain: &[Vec<u8>], hostname: &str) -> Result<Vec<u8>, Error>;
}

/// A source of cryptographically secure randomness for `ClientHello.random`,
/// DH/ECDHE ephemeral keys, and padding.
pub trait RngSource {
    fn fill(&self, out: &mut [u8]);
}
