//! The `Negotiation` record: everything agreed on during the handshake,
//! carried forward into the frozen [`crate::session::Session`].

use crate::ciphersuite::CipherSuite;
use crate::version::ProtocolVersion;

/// Parameters the client and server agreed on, accumulated as the handshake progresses.
#[derive(Debug, Clone)]
pub struct Negotiation {
    pub version: ProtocolVersion,
    pub cipher_suite: &'static CipherSuite,
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
    pub session_id: Vec<u8>,
    /// The leading 4 bytes of `ServerHello.random`, interpreted as
    /// `gmt_unix_time`. Diagnostic only — never compared or fed into key
    /// derivation; the full 32-byte `server_random` is what the PRF uses.
    pub server_gmt_unix_time: u32,
    /// The compression method the server echoed (`0x00` is the only value
    /// this client ever offers; the record layer never does anything else
    /// with the field beyond carrying it for inspection).
    pub compression: u8,
    /// Whether the server accepted the `truncated_hmac` extension (RFC 6066
    /// §7). The AEAD ciphersuites this client negotiates carry no MAC at
    /// all, so this flag has no effect on record processing; it is carried
    /// through purely because it is part of the negotiated context.
    pub truncated_hmac: bool,
    pub alpn_protocol: Option<String>,
    pub resumed: bool,
    pub secure_renegotiation: bool,
}

impl Negotiation {
    pub fn server_gmt_unix_time_from_random(server_random: &[u8; 32]) -> u32 {
        u32::from_be_bytes([server_random[0], server_random[1], server_random[2], server_random[3]])
    }
}
