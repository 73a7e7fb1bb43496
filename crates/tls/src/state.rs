//! The handshake state list (RFC 5246 §7.3 full and abbreviated handshakes).

/// Every state the client-side state machine can be in.
///
/// `GotServerHelloDone` is reached either directly from `GotCertificate`
/// (static-key strategies skip `ServerKeyExchange`/`CertificateRequest`) or
/// after consuming whichever of those two optional messages the one-message
/// lookahead in [`crate::driver::HandshakeContext`] found buffered.
///
/// The abbreviated handshake (RFC 5246 §7.3, session resumption) reverses
/// the `ChangeCipherSpec`/`Finished` order of the full handshake: the server
/// sends its `ChangeCipherSpec`/`Finished` right after `ServerHello`, and
/// only then does the client send its own. `recv_server_hello` jumps
/// straight from `SentClientHello` to `ResumedAwaitFinished` when it matches
/// the server's echoed session id (or ticket) against cached resumption
/// material, skipping `Certificate`/`ServerKeyExchange`/`ClientKeyExchange`
/// entirely; `ResumedGotFinished` then rejoins the full handshake's
/// `SentChangeCipherSpec`/`SentFinished` states to send the client's half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    SentClientHello,
    GotServerHello,
    GotCertificate,
    GotServerKeyExchange,
    GotCertificateRequest,
    GotServerHelloDone,
    SentClientKeyExchange,
    SentCertificateVerify,
    SentChangeCipherSpec,
    SentFinished,
    GotSessionTicket,
    GotChangeCipherSpec,
    GotFinished,
    /// Abbreviated handshake: waiting for the server's `NewSessionTicket`
    /// (optional) or `ChangeCipherSpec`, having derived keys from the
    /// cached master secret without a key exchange.
    ResumedAwaitFinished,
    ResumedGotSessionTicket,
    ResumedGotChangeCipherSpec,
    /// Abbreviated handshake: the server's `Finished` has verified; the
    /// client must now send its own `ChangeCipherSpec`/`Finished`.
    ResumedGotFinished,
    HandshakeWrapup,
    Established,
    Renegotiating,
}

impl State {
    /// Whether application data may flow in this state.
    pub fn is_established(self) -> bool {
        matches!(self, Self::Established)
    }
}
