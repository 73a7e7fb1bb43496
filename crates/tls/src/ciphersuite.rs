//! The ciphersuite capability table.
//!
//! Earlier TLS client code (this crate's own ancestor included) dispatches on
//! the raw 16-bit ciphersuite id with a `match` at every site that needs to
//! know "is this PSK", "what hash does this use", "what cipher". That spreads
//! the ciphersuite's semantics across the whole handshake driver. Instead,
//! each supported id resolves once, via [`CipherSuite::by_id`], to a single
//! capability record that every other module reads fields from.

use crate::error::Error;

/// How the premaster/shared secret is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KexStrategy {
    Rsa,
    DheRsa,
    DhePsk,
    EcdheRsa,
    EcdheEcdsa,
    EcdhRsa,
    EcdhEcdsa,
    Psk,
    RsaPsk,
}

impl KexStrategy {
    /// Whether this strategy mixes in a PSK (RFC 4279/5489), and therefore
    /// requires `ClientKeyExchange` to be built from a PSK identity rather
    /// than (or in addition to) a Diffie-Hellman/RSA exchange.
    pub fn uses_psk(self) -> bool {
        matches!(self, Self::DhePsk | Self::Psk | Self::RsaPsk)
    }

    /// Whether the server sends a `ServerKeyExchange` message for this
    /// strategy (everything except the static-key strategies).
    pub fn has_server_key_exchange(self) -> bool {
        !matches!(self, Self::Rsa | Self::EcdhRsa | Self::EcdhEcdsa)
    }

    /// Whether `ServerKeyExchange`'s params are signed (and therefore must be
    /// verified against the certificate's public key).
    pub fn has_signed_params(self) -> bool {
        matches!(self, Self::DheRsa | Self::EcdheRsa | Self::EcdheEcdsa)
    }
}

/// Which certificate public-key algorithm the server's leaf certificate must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigStrategy {
    /// No certificate signature check (PSK without a certificate, or a
    /// static ECDH suite whose authentication is implicit in the key itself).
    None,
    Rsa,
    Ecdsa,
}

/// The PRF/transcript hash (RFC 5246 §5 defaults to SHA-256; SHA-384 suites
/// were added by RFC 5289).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfHash {
    Sha256,
    Sha384,
}

impl PrfHash {
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

/// The record-protection AEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadCipher {
    Aes128Gcm,
    Aes256Gcm,
}

impl AeadCipher {
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }

    pub const SALT_LEN: usize = 4;
    pub const RECORD_IV_LEN: usize = 8;
    pub const TAG_LEN: usize = 16;
}

/// A fully-resolved ciphersuite: everything every other module needs to know
/// about `id`, looked up once at negotiation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite {
    pub id: u16,
    pub kex: KexStrategy,
    pub sig: SigStrategy,
    pub prf_hash: PrfHash,
    pub cipher: AeadCipher,
}

macro_rules! suite {
    ($id:expr, $kex:expr, $sig:expr, $hash:expr, $cipher:expr) => {
        CipherSuite { id: $id, kex: $kex, sig: $sig, prf_hash: $hash, cipher: $cipher }
    };
}

/// The static table of ciphersuites this client can negotiate, in descending
/// preference order.
pub const SUPPORTED: &[CipherSuite] = &[
    suite!(0xC02C, KexStrategy::EcdheEcdsa, SigStrategy::Ecdsa, PrfHash::Sha384, AeadCipher::Aes256Gcm),
    suite!(0xC02B, KexStrategy::EcdheEcdsa, SigStrategy::Ecdsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0xC030, KexStrategy::EcdheRsa, SigStrategy::Rsa, PrfHash::Sha384, AeadCipher::Aes256Gcm),
    suite!(0xC02F, KexStrategy::EcdheRsa, SigStrategy::Rsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0xC031, KexStrategy::EcdhRsa, SigStrategy::Rsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0xC02D, KexStrategy::EcdhEcdsa, SigStrategy::Ecdsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0x009F, KexStrategy::DheRsa, SigStrategy::Rsa, PrfHash::Sha384, AeadCipher::Aes256Gcm),
    suite!(0x009E, KexStrategy::DheRsa, SigStrategy::Rsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0x009D, KexStrategy::Rsa, SigStrategy::Rsa, PrfHash::Sha384, AeadCipher::Aes256Gcm),
    suite!(0x009C, KexStrategy::Rsa, SigStrategy::Rsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0x00AA, KexStrategy::DhePsk, SigStrategy::None, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0x00AC, KexStrategy::RsaPsk, SigStrategy::Rsa, PrfHash::Sha256, AeadCipher::Aes128Gcm),
    suite!(0x00A8, KexStrategy::Psk, SigStrategy::None, PrfHash::Sha256, AeadCipher::Aes128Gcm),
];

impl CipherSuite {
    pub fn by_id(id: u16) -> Option<&'static CipherSuite> {
        SUPPORTED.iter().find(|s| s.id == id)
    }

    /// Pick the first entry in `offered` (client preference order) the server
    /// also listed in `server_supported`, or `None` if nothing overlaps.
    pub fn negotiate(offered: &[u16], selected_by_server: u16) -> Result<&'static CipherSuite, Error> {
        if !offered.contains(&selected_by_server) {
            return Err(Error::UnsupportedCiphersuite(selected_by_server));
        }
        Self::by_id(selected_by_server).ok_or(Error::NoSharedCipher)
    }

    /// All supported ids, in the table's preference order — the default offer list.
    pub fn all_ids() -> Vec<u16> {
        SUPPORTED.iter().map(|s| s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_suite() {
        let s = CipherSuite::by_id(0xC02F).unwrap();
        assert_eq!(s.kex, KexStrategy::EcdheRsa);
        assert_eq!(s.prf_hash, PrfHash::Sha256);
    }

    #[test]
    fn rejects_unoffered_selection() {
        let offered = [0xC02F];
        assert!(CipherSuite::negotiate(&offered, 0xC030).is_err());
    }

    #[test]
    fn rejects_unknown_id() {
        assert!(CipherSuite::by_id(0xFFFF).is_none());
    }

    #[test]
    fn psk_strategies_flagged() {
        assert!(KexStrategy::Psk.uses_psk());
        assert!(KexStrategy::DhePsk.uses_psk());
        assert!(!KexStrategy::EcdheRsa.uses_psk());
    }

    #[test]
    fn static_strategies_have_no_server_key_exchange() {
        assert!(!KexStrategy::Rsa.has_server_key_exchange());
        assert!(!KexStrategy::EcdhRsa.has_server_key_exchange());
        assert!(KexStrategy::DheRsa.has_server_key_exchange());
    }
}
