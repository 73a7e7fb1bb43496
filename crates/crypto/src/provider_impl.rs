//! Wires this crate's primitives up to `tls12-client`'s collaborator traits.
//!
//! `RefCryptoProvider` and `RefCertificateStore` are the backend the crate's
//! own doctests/integration tests drive the handshake driver against; an
//! embedding application is expected to supply its own, backed by whatever
//! cryptography and trust-store libraries it already uses.

use std::sync::Arc;

use tls12::builder::ClientIdentity;
use tls12::ciphersuite::{AeadCipher, PrfHash};
use tls12::error::Error;
use tls12::provider::{CertificateStore, CryptoProvider, KeyExchange, RngSource};

use crate::dh::DhKeyExchange;
use crate::gcm::AesGcm;
use crate::prf;
use crate::rsa;
use crate::sha256;
use crate::sha384;
use crate::x25519::X25519KeyExchange;
use crate::x509;

/// Curve id for x25519 (RFC 8422 §5.1.1).
const CURVE_X25519: u16 = 0x001d;

/// `ClientIdentity` carries a certificate chain and PSK table but no private
/// key slot (see `tls12::builder::ClientIdentity`), so this reference backend
/// has no key material to sign `CertificateVerify` with; `client_sign` always
/// reports `NoSecretKey`. An embedding application doing mutual-TLS client
/// auth needs its own `CryptoProvider` with a private key attached.
pub struct RefCryptoProvider {
    rng: Arc<dyn RngSource>,
    identity: ClientIdentity,
}

impl RefCryptoProvider {
    pub fn new(rng: Arc<dyn RngSource>, identity: ClientIdentity) -> Self {
        Self { rng, identity }
    }
}

impl CryptoProvider for RefCryptoProvider {
    fn hash(&self, which: PrfHash, data: &[u8]) -> Vec<u8> {
        match which {
            PrfHash::Sha256 => sha256::sha256(data).to_vec(),
            PrfHash::Sha384 => sha384::sha384(data).to_vec(),
        }
    }

    fn prf(&self, which: PrfHash, secret: &[u8], label: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
        prf::prf(which, secret, label, seed, out_len)
    }

    fn dhe_keypair(&self, prime: &[u8], generator: &[u8]) -> Result<Box<dyn KeyExchange>, Error> {
        let mut private_bytes = vec![0u8; prime.len()];
        self.rng.fill(&mut private_bytes);
        let kex = DhKeyExchange::generate(prime, generator, &private_bytes)?;
        Ok(Box::new(kex))
    }

    fn ecdhe_keypair(&self, curve: u16) -> Result<Box<dyn KeyExchange>, Error> {
        if curve != CURVE_X25519 {
            return Err(Error::UnsupportedCurve(curve));
        }
        let mut private_bytes = [0u8; 32];
        self.rng.fill(&mut private_bytes);
        Ok(Box::new(X25519KeyExchange::generate(private_bytes)))
    }

    fn rsa_encrypt(&self, spki: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        let pk = x509::parse_rsa_spki(spki).map_err(|_| Error::WrongPubkeyAlgo)?;
        let rng = &self.rng;
        rsa::encrypt(&pk, data, &|buf| rng.fill(buf)).map_err(|_| Error::BadHandshake("RSA encryption failed"))
    }

    fn verify_signature(
        &self,
        spki: &[u8],
        is_ecdsa: bool,
        hash: u8,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        if is_ecdsa {
            // This reference backend supports RSA-signed ciphersuites only;
            // an embedding application that negotiates ECDSA suites must
            // supply its own CryptoProvider with EC signature support.
            return Err(Error::UnsupportedSigAlg { hash, sig: 3 });
        }
        let pk = x509::parse_rsa_spki(spki).map_err(|_| Error::WrongPubkeyAlgo)?;
        let digest = self.hash(hash_id_to_prf(hash)?, message);
        rsa::verify(&pk, hash, &digest, signature)
            .map_err(|_| Error::BadHandshake("RSA signature verification failed"))
    }

    fn client_sign(&self, _is_ecdsa: bool, _hash: u8, _message: &[u8]) -> Result<Vec<u8>, Error> {
        let _ = &self.identity;
        Err(Error::NoSecretKey)
    }

    fn aead_seal(&self, cipher: AeadCipher, key: &[u8], salt: &[u8], sequence_number: u64, aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let _ = cipher;
        let gcm = AesGcm::new(key);
        let (mut ciphertext, tag) = gcm.seal_record(salt, sequence_number, aad, plaintext);
        ciphertext.extend_from_slice(&tag);
        ciphertext
    }

    fn aead_open(
        &self,
        cipher: AeadCipher,
        key: &[u8],
        salt: &[u8],
        sequence_number: u64,
        aad: &[u8],
        sealed: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let _ = cipher;
        if sealed.len() < 16 {
            return Err(Error::BadHandshake("sealed record shorter than the AEAD tag"));
        }
        let (ciphertext, tag_bytes) = sealed.split_at(sealed.len() - 16);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(tag_bytes);
        let gcm = AesGcm::new(key);
        gcm.open_record(salt, sequence_number, aad, ciphertext, &tag)
            .map_err(|_| Error::BadHandshake("AEAD tag did not verify"))
    }
}

/// Map an RFC 5246 §7.4.1.4.1 `HashAlgorithm` id to the two hashes this
/// crate actually implements (sha1 is accepted for signature verification
/// via [`rsa::verify`] but isn't one of the PRF hashes, so it has no
/// `PrfHash` mapping).
fn hash_id_to_prf(hash_id: u8) -> Result<PrfHash, Error> {
    match hash_id {
        4 => Ok(PrfHash::Sha256),
        5 => Ok(PrfHash::Sha384),
        _ => Err(Error::UnsupportedSigAlg { hash: hash_id, sig: 1 }),
    }
}

/// Trusts whatever chain is handed to it after the structural checks in
/// [`x509::verify_chain_structure`] pass; this is test/demo scaffolding, not
/// a certificate-validation policy suitable for a real deployment (no CA
/// root store, no signature-chain verification, no revocation checking).
pub struct RefCertificateStore;

impl CertificateStore for RefCertificateStore {
    fn verify_chain(&self, chain: &[Vec<u8>], hostname: &str) -> Result<Vec<u8>, Error> {
        if chain.is_empty() {
            return Err(Error::BadCertificate("empty certificate chain"));
        }
        let parsed: Vec<x509::X509Certificate> = chain
            .iter()
            .map(|der| x509::parse_certificate(der))
            .collect::<Result<_, _>>()
            .map_err(Error::BadCertificate)?;
        x509::verify_chain_structure(&parsed, hostname).map_err(|_| Error::BadCertificate("chain structure invalid"))?;
        Ok(parsed[0].spki.clone())
    }
}
