//! `ClientConfig`/`ClientBuilder`: the in-memory policy object a caller
//! configures before starting a handshake. Loading configuration from a file
//! or environment is out of scope — this is only the typed policy struct.

use std::sync::Arc;

use crate::ciphersuite::CipherSuite;
use crate::driver::HandshakeContext;
use crate::extension::ClientExtensions;
use crate::provider::{CertificateStore, CryptoProvider, RecordLayer, RngSource};
use crate::session::ResumptionState;

/// Client identity material for mutual-TLS and PSK strategies.
#[derive(Clone, Default)]
pub struct ClientIdentity {
    /// DER-encoded client certificate chain, leaf first.
    pub certificate_chain: Vec<Vec<u8>>,
    /// `true` if the owned private key is ECDSA rather than RSA — drives
    /// `sig_from_pk` (spec'd as `rsa = 1, ecdsa = 3`) for `CertificateVerify`.
    pub key_is_ecdsa: bool,
    /// Pre-shared key material, keyed by identity, for the PSK-family strategies.
    pub psks: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Policy for one handshake: offered ciphersuites, extensions, and client identity.
#[derive(Clone)]
pub struct ClientConfig {
    pub hostname: String,
    pub offered_ciphersuites: Vec<u16>,
    pub extensions: ClientExtensions,
    pub identity: ClientIdentity,
    /// Enable RFC 5746 secure renegotiation. When `false`, a server that
    /// lacks the extension is refused per the spec's legacy-compatibility
    /// policy rather than silently allowed.
    pub allow_legacy_renegotiation: bool,
    /// A prior session's resumption material (RFC 5246 §7.4.1.2 session id,
    /// or an RFC 5077 session ticket), offered in `ClientHello` so the
    /// server can skip straight to the abbreviated handshake.
    pub resumption: Option<ResumptionState>,
}

impl ClientConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            offered_ciphersuites: CipherSuite::all_ids(),
            extensions: ClientExtensions::default(),
            identity: ClientIdentity::default(),
            allow_legacy_renegotiation: false,
            resumption: None,
        }
    }
}

/// Builder for a [`HandshakeContext`], mirroring the `with_*` style the rest
/// of this crate's collaborator configuration uses.
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self { config: ClientConfig::new(hostname) }
    }

    pub fn with_ciphersuites(mut self, ids: Vec<u16>) -> Self {
        self.config.offered_ciphersuites = ids;
        self
    }

    pub fn with_alpn(mut self, protocols: Vec<String>) -> Self {
        self.config.extensions.alpn_protocols = protocols;
        self
    }

    pub fn with_session_ticket(mut self, ticket: Vec<u8>) -> Self {
        self.config.extensions.session_ticket = Some(ticket);
        self
    }

    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.config.identity = identity;
        self
    }

    pub fn allow_legacy_renegotiation(mut self, allow: bool) -> Self {
        self.config.allow_legacy_renegotiation = allow;
        self
    }

    /// Attempt to resume a prior session (RFC 5246 §7.4.1.2 / RFC 5077)
    /// instead of a full handshake. `prior` is the [`ResumptionState`] a
    /// completed [`crate::session::Session`] handed back; its `handle`
    /// decides whether `ClientHello` carries a cached session id or a
    /// session ticket.
    pub fn resume_session(mut self, prior: ResumptionState) -> Self {
        self.config.resumption = Some(prior);
        self
    }

    pub fn build(
        self,
        record_layer: Box<dyn RecordLayer>,
        crypto: Arc<dyn CryptoProvider>,
        cert_store: Arc<dyn CertificateStore>,
        rng: Arc<dyn RngSource>,
    ) -> HandshakeContext {
        HandshakeContext::new(self.config, record_layer, crypto, cert_store, rng)
    }
}
