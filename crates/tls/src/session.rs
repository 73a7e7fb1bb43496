//! The frozen `Session` (RFC 5246 §7.1, handed to the caller once
//! `HandshakeWrapup` completes) and resumption material.

use zeroize::Zeroizing;

use crate::negotiation::Negotiation;

/// What a client needs to attempt resumption on a later connection: either
/// the server-assigned session id (RFC 5246 §7.4.1.2) or an opaque session
/// ticket (RFC 5077), plus the master secret both require to skip the full
/// key exchange.
#[derive(Debug, Clone)]
pub enum ResumptionHandle {
    SessionId(Vec<u8>),
    Ticket(Vec<u8>),
}

/// Everything needed to resume this connection later.
#[derive(Clone)]
pub struct ResumptionState {
    pub handle: ResumptionHandle,
    pub master_secret: Zeroizing<Vec<u8>>,
    pub cipher_suite_id: u16,
}

/// A completed handshake: the negotiated parameters plus what's needed to
/// resume later. Frozen once at `HandshakeWrapup` and never mutated again.
pub struct Session {
    pub negotiation: Negotiation,
    pub resumption: Option<ResumptionState>,
}

impl Session {
    pub fn cipher_suite_id(&self) -> u16 {
        self.negotiation.cipher_suite.id
    }
}
