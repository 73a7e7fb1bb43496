//! The key-exchange engine (RFC 5246 §7.4.3, §7.4.7; RFC 4492; RFC 4279).
//!
//! Each [`KexStrategy`](crate::ciphersuite::KexStrategy) resolves to one
//! variant of [`ServerKeyExchangeParams`] (or none, for the static-key
//! strategies) and one [`ClientKeyExchangeMsg`] shape. The premaster secret
//! itself is always computed by [`PendingKex::premaster_secret`], which calls
//! out to [`CryptoProvider`] for the actual DH/RSA/ECDHE math.

use wire::Cursor;
use zeroize::Zeroizing;

use crate::ciphersuite::KexStrategy;
use crate::error::Error;
use crate::provider::{CryptoProvider, KeyExchange};

/// Minimum/maximum DH prime length this client accepts (RFC 5246 doesn't fix
/// a bound; this matches the conservative range common clients enforce
/// against degenerate or oversized server-chosen groups).
pub const DH_PRIME_MIN_BYTES: usize = 64;
pub const DH_PRIME_MAX_BYTES: usize = 512;

/// Parsed `ServerKeyExchange.params`, before signature verification.
#[derive(Debug, Clone)]
pub enum ServerKeyExchangeParams {
    Dh { prime: Vec<u8>, generator: Vec<u8>, server_public: Vec<u8> },
    Ecdhe { curve: u16, server_public: Vec<u8> },
    PskHint { identity_hint: Vec<u8> },
}

/// The exact bytes that were signed, for signature verification: the two
/// client/server randoms followed by the raw encoded params.
pub fn signed_params_blob(client_random: &[u8; 32], server_random: &[u8; 32], raw_params: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(64 + raw_params.len());
    blob.extend_from_slice(client_random);
    blob.extend_from_slice(server_random);
    blob.extend_from_slice(raw_params);
    blob
}

/// Parse the `params` body of `ServerKeyExchange` for a DHE/DHE_PSK strategy.
pub fn parse_dh_params(data: &[u8]) -> Result<(ServerKeyExchangeParams, usize), Error> {
    let mut c = Cursor::new_be(data);
    let start = c.position();
    let prime = c.vec_u16(1, DH_PRIME_MAX_BYTES)?;
    if prime.len() < DH_PRIME_MIN_BYTES {
        return Err(Error::BadHandshake("DHE prime shorter than the accepted minimum"));
    }
    let generator = c.vec_u16(1, DH_PRIME_MAX_BYTES)?;
    let server_public = c.vec_u16(1, DH_PRIME_MAX_BYTES)?;
    let consumed = c.position() - start;
    Ok((
        ServerKeyExchangeParams::Dh {
            prime: prime.to_vec(),
            generator: generator.to_vec(),
            server_public: server_public.to_vec(),
        },
        consumed,
    ))
}

/// Parse the `params` body of `ServerKeyExchange` for an ECDHE strategy
/// (RFC 4492 §5.4, `named_curve` ECParameters only).
pub fn parse_ecdhe_params(data: &[u8]) -> Result<(ServerKeyExchangeParams, usize), Error> {
    let mut c = Cursor::new_be(data);
    let start = c.position();
    let curve_type = c.u8()?;
    if curve_type != 3 {
        return Err(Error::BadHandshake("only named_curve ECParameters is supported"));
    }
    let curve = c.u16()?;
    let server_public = c.vec_u8(1, 255)?;
    let consumed = c.position() - start;
    Ok((ServerKeyExchangeParams::Ecdhe { curve, server_public: server_public.to_vec() }, consumed))
}

/// Parse a PSK identity hint (the only field RSA_PSK/DHE_PSK/ECDHE_PSK
/// `ServerKeyExchange` carries beyond their non-PSK counterpart's params).
pub fn parse_psk_hint(data: &[u8]) -> Result<(Vec<u8>, usize), Error> {
    let mut c = Cursor::new_be(data);
    let start = c.position();
    let hint = c.vec_u16(0, 65535)?;
    Ok((hint.to_vec(), c.position() - start))
}

/// State carried from `ServerKeyExchange`/`Certificate` through to
/// `ClientKeyExchange`: the client's own ephemeral keypair (if any) plus
/// whatever the premaster-secret computation for this strategy needs.
pub enum PendingKex {
    Rsa { server_spki: Vec<u8> },
    RsaPsk { server_spki: Vec<u8>, psk_identity: Vec<u8>, psk: Vec<u8> },
    Dh { exchange: Box<dyn KeyExchange>, server_public: Vec<u8> },
    DhePsk { exchange: Box<dyn KeyExchange>, server_public: Vec<u8>, psk_identity: Vec<u8>, psk: Vec<u8> },
    Ecdhe { exchange: Box<dyn KeyExchange>, server_public: Vec<u8> },
    StaticEcdh { server_spki: Vec<u8> },
    Psk { identity: Vec<u8>, psk: Vec<u8> },
}

impl PendingKex {
    /// The bytes to send as `ClientKeyExchange.exchange_keys`.
    pub fn client_key_exchange_body(&self, crypto: &dyn CryptoProvider, client_random: &[u8; 32]) -> Result<Vec<u8>, Error> {
        let _ = (crypto, client_random);
        match self {
            PendingKex::Rsa { .. } => Ok(Vec::new()), // filled in by caller with the RSA-encrypted PMS
            PendingKex::RsaPsk { psk_identity, .. } => Ok(encode_opaque16(psk_identity)),
            PendingKex::Dh { exchange, .. } | PendingKex::Ecdhe { exchange, .. } => {
                Ok(encode_opaque8(&exchange.public_key()))
            }
            PendingKex::DhePsk { exchange, psk_identity, .. } => {
                let mut out = encode_opaque16(psk_identity);
                out.extend(encode_opaque8(&exchange.public_key()));
                Ok(out)
            }
            PendingKex::StaticEcdh { .. } => Ok(Vec::new()),
            PendingKex::Psk { identity, .. } => Ok(encode_opaque16(identity)),
        }
    }

    /// Compute the premaster secret for this strategy (RFC 5246 §8.1.1, RFC 4279 §2).
    pub fn premaster_secret(&self, _crypto: &dyn CryptoProvider) -> Result<Zeroizing<Vec<u8>>, Error> {
        match self {
            PendingKex::Rsa { .. } | PendingKex::StaticEcdh { .. } => {
                Err(Error::InternalError("premaster secret for this strategy must be supplied by the caller"))
            }
            PendingKex::Dh { exchange, server_public } => {
                Ok(Zeroizing::new(exchange.shared_secret(server_public)?))
            }
            PendingKex::Ecdhe { exchange, server_public } => {
                Ok(Zeroizing::new(exchange.shared_secret(server_public)?))
            }
            PendingKex::RsaPsk { psk, .. } | PendingKex::Psk { psk, .. } => Ok(psk_only_premaster(psk)),
            PendingKex::DhePsk { exchange, server_public, psk, .. } => {
                let other_secret = exchange.shared_secret(server_public)?;
                Ok(psk_premaster(&other_secret, psk))
            }
        }
    }

    pub fn strategy(&self) -> KexStrategy {
        match self {
            PendingKex::Rsa { .. } => KexStrategy::Rsa,
            PendingKex::RsaPsk { .. } => KexStrategy::RsaPsk,
            PendingKex::Dh { .. } => KexStrategy::DheRsa,
            PendingKex::DhePsk { .. } => KexStrategy::DhePsk,
            PendingKex::Ecdhe { .. } => KexStrategy::EcdheRsa,
            PendingKex::StaticEcdh { .. } => KexStrategy::EcdhRsa,
            PendingKex::Psk { .. } => KexStrategy::Psk,
        }
    }
}

/// `PSK-only premaster secret = 0x00 0x00 || (len_psk) || psk` (RFC 4279 §2).
fn psk_only_premaster(psk: &[u8]) -> Zeroizing<Vec<u8>> {
    psk_premaster(&vec![0u8; psk.len()], psk)
}

/// `PSK premaster secret = uint16(len(other)) || other || uint16(len(psk)) || psk` (RFC 4279 §2, RFC 4492 §5.3).
fn psk_premaster(other_secret: &[u8], psk: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + other_secret.len() + psk.len());
    out.extend_from_slice(&(other_secret.len() as u16).to_be_bytes());
    out.extend_from_slice(other_secret);
    out.extend_from_slice(&(psk.len() as u16).to_be_bytes());
    out.extend_from_slice(psk);
    Zeroizing::new(out)
}

fn encode_opaque8(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(body.len() as u8);
    out.extend_from_slice(body);
    out
}

fn encode_opaque16(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + body.len());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psk_only_premaster_has_zero_other_secret() {
        let pms = psk_only_premaster(&[1, 2, 3, 4]);
        assert_eq!(&pms[0..2], &[0, 4]);
        assert_eq!(&pms[2..6], &[0, 0, 0, 0]);
        assert_eq!(&pms[6..8], &[0, 4]);
        assert_eq!(&pms[8..], &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_dh_prime_below_minimum() {
        let mut data = Vec::new();
        data.extend_from_slice(&8u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&1u16.to_be_bytes());
        data.push(2);
        data.extend_from_slice(&1u16.to_be_bytes());
        data.push(5);
        assert!(parse_dh_params(&data).is_err());
    }

    #[test]
    fn parses_ecdhe_named_curve() {
        let mut data = vec![3u8, 0x00, 0x1d]; // named_curve, x25519
        data.push(32);
        data.extend_from_slice(&[0xAA; 32]);
        let (params, consumed) = parse_ecdhe_params(&data).unwrap();
        assert_eq!(consumed, data.len());
        match params {
            ServerKeyExchangeParams::Ecdhe { curve, server_public } => {
                assert_eq!(curve, 0x001d);
                assert_eq!(server_public.len(), 32);
            }
            _ => panic!("wrong variant"),
        }
    }
}
