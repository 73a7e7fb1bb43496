//! The handshake state machine (RFC 5246 §7.3, §7.4).
//!
//! [`HandshakeContext::step`] advances the handshake by exactly one message
//! (or, for the fixed `NewSessionTicket`-then-`ChangeCipherSpec`-then-`Finished`
//! group on an abbreviated handshake, that whole group) per call. Every call
//! flushes any already-buffered output first, so a `WouldBlock` from the
//! transport never loses work. One-message lookahead is modeled as
//! `pending: Option<PendingRecord>` rather than a raw boolean flag — whichever
//! of `ServerKeyExchange`/`CertificateRequest` the client read past its
//! expected slot is held there until the state that actually needs it asks
//! for it.

use std::sync::Arc;

use log::{debug, trace, warn};
use wire::{BufWriter, Cursor};
use zeroize::Zeroizing;

use crate::alert::alert_for;
use crate::builder::ClientConfig;
use crate::ciphersuite::{AeadCipher, CipherSuite, KexStrategy, SigStrategy};
use crate::error::Error;
use crate::extension;
use crate::kex::{self, PendingKex, ServerKeyExchangeParams};
use crate::negotiation::Negotiation;
use crate::provider::{CertificateStore, CryptoProvider, RecordLayer, RngSource};
use crate::session::{ResumptionHandle, ResumptionState, Session};
use crate::state::State;
use crate::transcript::{self, KeyMaterial, Transcript};
use crate::version::{ProtocolVersion, VersionRange};

const CONTENT_CHANGE_CIPHER_SPEC: u8 = 20;
const CONTENT_ALERT: u8 = 21;
const CONTENT_HANDSHAKE: u8 = 22;
const CONTENT_APPLICATION_DATA: u8 = 23;

const HS_CLIENT_HELLO: u8 = 1;
const HS_SERVER_HELLO: u8 = 2;
const HS_NEW_SESSION_TICKET: u8 = 4;
const HS_CERTIFICATE: u8 = 11;
const HS_SERVER_KEY_EXCHANGE: u8 = 12;
const HS_CERTIFICATE_REQUEST: u8 = 13;
const HS_SERVER_HELLO_DONE: u8 = 14;
const HS_CERTIFICATE_VERIFY: u8 = 15;
const HS_CLIENT_KEY_EXCHANGE: u8 = 16;
const HS_FINISHED: u8 = 20;

/// One parsed handshake message: its type, body, and the raw bytes (header
/// included) that feed the transcript.
struct HandshakeMsg {
    typ: u8,
    body: Vec<u8>,
    raw: Vec<u8>,
}

fn frame_handshake(typ: u8, body: &[u8]) -> Vec<u8> {
    let mut w = BufWriter::new_be();
    w.u8(typ);
    w.length_prefixed(3, |w| w.bytes(body));
    w.finish()
}

fn parse_handshake_header(raw: &[u8]) -> Result<(u8, &[u8]), Error> {
    let mut c = Cursor::new_be(raw);
    let typ = c.u8()?;
    let body = c.vec_u24(0, (1 << 24) - 1)?;
    Ok((typ, body))
}

/// Result of one [`HandshakeContext::step`] call.
#[derive(Debug)]
pub enum StepResult {
    /// The handshake advanced; call `step()` again.
    Progressed,
    /// The transport has no more data right now; driver state is unchanged.
    WouldBlock,
    /// The handshake finished; the session is available via `into_session`.
    HandshakeComplete,
}

enum PendingRecord {
    ServerKeyExchange(HandshakeMsg),
    CertificateRequest(HandshakeMsg),
    ServerHelloDone(HandshakeMsg),
}

struct PartialNegotiation {
    version: ProtocolVersion,
    server_random: [u8; 32],
    session_id: Vec<u8>,
    cipher_suite: &'static CipherSuite,
    compression: u8,
    resumed: bool,
    server_extensions: extension::ServerExtensions,
}

/// The client-side TLS 1.2 handshake driver.
pub struct HandshakeContext {
    config: ClientConfig,
    record_layer: Box<dyn RecordLayer>,
    crypto: Arc<dyn CryptoProvider>,
    cert_store: Arc<dyn CertificateStore>,
    rng: Arc<dyn RngSource>,

    state: State,
    transcript: Transcript,
    outbound: Vec<(u8, Vec<u8>)>,
    pending: Option<PendingRecord>,

    client_random: [u8; 32],
    partial: Option<PartialNegotiation>,
    server_cert_chain: Vec<Vec<u8>>,
    /// Raw DER `SubjectPublicKeyInfo` of the server's leaf certificate.
    server_spki: Vec<u8>,
    pending_kex: Option<PendingKex>,
    pending_ticket: Option<Vec<u8>>,
    key_material: Option<KeyMaterial>,
    client_verify_data: Zeroizing<Vec<u8>>,
    peer_renegotiation_info: Zeroizing<Vec<u8>>,
    client_write_seq: u64,
    server_read_seq: u64,
    session: Option<Session>,
    client_cert_requested: bool,
    /// Set once `recv_server_hello` matches the server's reply against cached
    /// resumption material, so `SentFinished` knows whether the abbreviated
    /// handshake (RFC 5246 §7.3) is already complete or whether the client
    /// still has a full post-`Finished` group to receive.
    resuming: bool,
}

impl HandshakeContext {
    pub(crate) fn new(
        config: ClientConfig,
        record_layer: Box<dyn RecordLayer>,
        crypto: Arc<dyn CryptoProvider>,
        cert_store: Arc<dyn CertificateStore>,
        rng: Arc<dyn RngSource>,
    ) -> Self {
        let mut client_random = [0u8; 32];
        rng.fill(&mut client_random);
        Self {
            config,
            record_layer,
            crypto,
            cert_store,
            rng,
            state: State::Start,
            transcript: Transcript::new(),
            outbound: Vec::new(),
            pending: None,
            client_random,
            partial: None,
            server_cert_chain: Vec::new(),
            server_spki: Vec::new(),
            pending_kex: None,
            pending_ticket: None,
            key_material: None,
            client_verify_data: Zeroizing::new(Vec::new()),
            peer_renegotiation_info: Zeroizing::new(Vec::new()),
            client_write_seq: 0,
            server_read_seq: 0,
            session: None,
            client_cert_requested: false,
            resuming: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Consume a completed handshake and return the frozen session.
    pub fn into_session(self) -> Option<Session> {
        self.session
    }

    /// Advance the handshake by one message. Buffered output is flushed
    /// first; if the transport isn't ready, `WouldBlock` is returned and no
    /// driver state has changed.
    pub fn step(&mut self) -> Result<StepResult, Error> {
        if !self.outbound.is_empty() {
            match self.flush() {
                Ok(()) => {}
                Err(Error::WouldBlock) => return Ok(StepResult::WouldBlock),
                Err(e) => return Err(e),
            }
        }

        match self.advance() {
            Ok(r) => Ok(r),
            Err(Error::WouldBlock) => Ok(StepResult::WouldBlock),
            Err(e) => {
                let (level, desc) = alert_for(&e);
                warn!("handshake failed in state {:?}: {} (sending alert {:?})", self.state, e, desc);
                let _ = self.record_layer.write(CONTENT_ALERT, &[level as u8, desc as u8]);
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> Result<(), Error> {
        while let Some((ct, payload)) = self.outbound.first().cloned() {
            self.record_layer.write(ct, &payload)?;
            self.outbound.remove(0);
        }
        Ok(())
    }

    fn queue(&mut self, content_type: u8, payload: Vec<u8>) {
        self.outbound.push((content_type, payload));
    }

    fn queue_handshake(&mut self, typ: u8, body: &[u8]) {
        let framed = frame_handshake(typ, body);
        self.transcript.absorb(&framed);
        self.queue(CONTENT_HANDSHAKE, framed);
    }

    /// Read the next handshake message, either from the one-message lookahead
    /// buffer or from the transport.
    fn next_handshake_message(&mut self) -> Result<HandshakeMsg, Error> {
        if let Some(pending) = self.pending.take() {
            return Ok(match pending {
                PendingRecord::ServerKeyExchange(m) => m,
                PendingRecord::CertificateRequest(m) => m,
                PendingRecord::ServerHelloDone(m) => m,
            });
        }
        let (content_type, payload) = self.record_layer.read()?;
        if content_type != CONTENT_HANDSHAKE {
            return Err(Error::UnexpectedMessage { expected: "handshake", got: "other content type" });
        }
        let (typ, body) = parse_handshake_header(&payload)?;
        let msg = HandshakeMsg { typ, body: body.to_vec(), raw: payload };
        self.transcript.absorb(&msg.raw);
        Ok(msg)
    }

    fn advance(&mut self) -> Result<StepResult, Error> {
        let before = self.state;
        trace!("advancing from {:?}", before);
        let result = match self.state {
            State::Start => self.send_client_hello(),
            State::SentClientHello => self.recv_server_hello(),
            State::GotServerHello => self.recv_certificate_or_lookahead(),
            State::GotCertificate => self.recv_server_key_exchange_or_lookahead(),
            State::GotServerKeyExchange => self.recv_certificate_request_or_done(),
            State::GotCertificateRequest => self.recv_server_hello_done(),
            State::GotServerHelloDone => self.send_client_key_exchange_flight(),
            State::SentClientKeyExchange | State::SentCertificateVerify => self.send_change_cipher_spec(),
            State::SentChangeCipherSpec => self.send_finished(),
            State::SentFinished => {
                if self.resuming {
                    self.wrap_up()
                } else {
                    self.recv_ticket_or_ccs(State::GotSessionTicket, State::GotChangeCipherSpec)
                }
            }
            State::GotSessionTicket => self.recv_ccs(State::GotChangeCipherSpec),
            State::GotChangeCipherSpec => self.recv_finished(State::GotFinished),
            State::GotFinished => self.wrap_up(),
            State::ResumedAwaitFinished => {
                self.recv_ticket_or_ccs(State::ResumedGotSessionTicket, State::ResumedGotChangeCipherSpec)
            }
            State::ResumedGotSessionTicket => self.recv_ccs(State::ResumedGotChangeCipherSpec),
            State::ResumedGotChangeCipherSpec => self.recv_finished(State::ResumedGotFinished),
            State::ResumedGotFinished => self.send_change_cipher_spec(),
            State::HandshakeWrapup => Ok(StepResult::HandshakeComplete),
            State::Established => Ok(StepResult::HandshakeComplete),
            State::Renegotiating => self.send_client_hello(),
        };
        if result.is_ok() && self.state != before {
            debug!("transitioned {:?} -> {:?}", before, self.state);
        }
        result
    }

    // ── ClientHello ──

    fn send_client_hello(&mut self) -> Result<StepResult, Error> {
        let mut extensions = self.config.extensions.clone();
        extensions.server_name = Some(self.config.hostname.clone());
        if extensions.renegotiation_info.is_empty() {
            extensions.renegotiation_info = self.peer_renegotiation_info.to_vec();
        }

        // RFC 5246 §7.4.1.2 / RFC 5077: offer whichever resumption handle a
        // prior session left behind, so the server can pick the abbreviated
        // handshake. A ticket has no session id of its own, so it rides along
        // in the session_ticket extension instead of this field.
        let session_id = match self.config.resumption.as_ref().map(|r| &r.handle) {
            Some(ResumptionHandle::SessionId(id)) => id.clone(),
            _ => Vec::new(),
        };
        if let Some(ResumptionHandle::Ticket(ticket)) = self.config.resumption.as_ref().map(|r| &r.handle) {
            if extensions.session_ticket.is_none() {
                extensions.session_ticket = Some(ticket.clone());
            }
        }

        let mut body = BufWriter::new_be();
        body.bytes(&ProtocolVersion::TLS1_2.to_bytes());
        body.bytes(&self.client_random);
        body.vec_u8(&session_id);
        body.length_prefixed(2, |w| {
            for id in &self.config.offered_ciphersuites {
                w.u16(*id);
            }
        });
        body.vec_u8(&[0x00]); // compression: null only
        body.length_prefixed(2, |w| extensions.encode(w));

        let body = body.finish();
        self.queue_handshake(HS_CLIENT_HELLO, &body);
        self.state = State::SentClientHello;
        Ok(StepResult::Progressed)
    }

    // ── ServerHello ──

    fn recv_server_hello(&mut self) -> Result<StepResult, Error> {
        let msg = self.next_handshake_message()?;
        if msg.typ != HS_SERVER_HELLO {
            return Err(Error::UnexpectedMessage { expected: "ServerHello", got: "other" });
        }
        let mut c = Cursor::new_be(&msg.body);
        let version = ProtocolVersion::from_bytes([c.u8()?, c.u8()?]);
        VersionRange::tls12_only().accept(version)?;

        let mut server_random = [0u8; 32];
        server_random.copy_from_slice(c.bytes(32)?);

        let session_id = c.vec_u8(0, 32)?.to_vec();
        let suite_id = c.u16()?;
        let compression = c.u8()?;
        if compression != 0x00 {
            return Err(Error::BadHandshake("server selected a non-null compression method"));
        }

        let raw_ext = if c.is_empty() {
            Vec::new()
        } else {
            let ext_block = c.vec_u16(0, u16::MAX as usize)?;
            extension::parse_raw_extensions(ext_block)?
        };
        let server_extensions = extension::parse_server_extensions(&raw_ext, &self.config.extensions)?;

        if let Some(info) = &server_extensions.renegotiation_info {
            if self.peer_renegotiation_info.is_empty() && !info.is_empty() {
                return Err(Error::BadHandshake("server sent non-empty renegotiation_info on initial handshake"));
            }
        } else if !self.config.allow_legacy_renegotiation {
            return Err(Error::BadHandshake("server did not offer secure renegotiation"));
        }

        let cipher_suite = CipherSuite::negotiate(&self.config.offered_ciphersuites, suite_id)?;
        self.transcript.start(cipher_suite.prf_hash);
        debug!("negotiated ciphersuite 0x{:04x}", suite_id);

        // Resumption (RFC 5246 §7.4.1.2 / RFC 5077): the server accepted
        // resumption if it echoed back the cached session id, or (for a
        // ticket, which carries no session id of its own) sent back an empty
        // session id alongside an accepted session_ticket extension — in
        // either case only for the same ciphersuite the prior session used.
        let resumed = self.config.resumption.as_ref().is_some_and(|prior| {
            prior.cipher_suite_id == suite_id
                && match &prior.handle {
                    ResumptionHandle::SessionId(id) => !session_id.is_empty() && id == &session_id,
                    ResumptionHandle::Ticket(_) => session_id.is_empty() && server_extensions.session_ticket_accepted,
                }
        });

        self.partial = Some(PartialNegotiation {
            version,
            server_random,
            session_id,
            cipher_suite,
            compression,
            resumed,
            server_extensions,
        });

        if resumed {
            debug!("server accepted resumption, skipping full key exchange");
            let master_secret = self.config.resumption.as_ref().unwrap().master_secret.clone();
            self.key_material = Some(transcript::expand_key_block(
                self.crypto.as_ref(),
                cipher_suite.prf_hash,
                &master_secret,
                &self.client_random,
                &server_random,
                cipher_suite.cipher.key_len(),
                AeadCipher::SALT_LEN,
            ));
            self.resuming = true;
            self.state = State::ResumedAwaitFinished;
        } else {
            self.state = State::GotServerHello;
        }
        Ok(StepResult::Progressed)
    }

    // ── Certificate (one-message lookahead starts here) ──

    fn recv_certificate_or_lookahead(&mut self) -> Result<StepResult, Error> {
        let partial = self.partial.as_ref().expect("set in recv_server_hello");
        if partial.cipher_suite.sig == SigStrategy::None {
            // PSK without a certificate: go straight to whatever comes next.
            self.state = State::GotCertificate;
            return self.recv_server_key_exchange_or_lookahead();
        }

        let msg = self.next_handshake_message()?;
        if msg.typ != HS_CERTIFICATE {
            return Err(Error::UnexpectedMessage { expected: "Certificate", got: "other" });
        }
        let chain = parse_certificate_list(&msg.body)?;
        if chain.is_empty() {
            return Err(Error::BadCertificate("empty certificate chain"));
        }
        let spki = self.cert_store.verify_chain(&chain, &self.config.hostname)?;
        self.server_cert_chain = chain;
        self.server_spki = spki;
        self.state = State::GotCertificate;
        Ok(StepResult::Progressed)
    }

    // ── ServerKeyExchange (optional) ──

    fn recv_server_key_exchange_or_lookahead(&mut self) -> Result<StepResult, Error> {
        let kex_strategy = self.partial.as_ref().unwrap().cipher_suite.kex;
        if !kex_strategy.has_server_key_exchange() {
            self.pending_kex = Some(self.build_static_kex(kex_strategy)?);
            self.state = State::GotServerKeyExchange;
            return self.recv_certificate_request_or_done();
        }

        let msg = self.next_handshake_message()?;
        if msg.typ != HS_SERVER_KEY_EXCHANGE {
            // The message belongs to a later step; stash it for the lookahead.
            self.pending = Some(match msg.typ {
                HS_CERTIFICATE_REQUEST => PendingRecord::CertificateRequest(msg),
                HS_SERVER_HELLO_DONE => PendingRecord::ServerHelloDone(msg),
                _ => return Err(Error::UnexpectedMessage { expected: "ServerKeyExchange", got: "other" }),
            });
            return Err(Error::BadHandshake("server key exchange is required for this ciphersuite"));
        }

        self.pending_kex = Some(self.parse_dynamic_kex(kex_strategy, &msg.body)?);
        self.state = State::GotServerKeyExchange;
        Ok(StepResult::Progressed)
    }

    fn build_static_kex(&self, strategy: KexStrategy) -> Result<PendingKex, Error> {
        match strategy {
            KexStrategy::Rsa => Ok(PendingKex::Rsa { server_spki: self.server_spki.clone() }),
            KexStrategy::EcdhRsa | KexStrategy::EcdhEcdsa => {
                Ok(PendingKex::StaticEcdh { server_spki: self.server_spki.clone() })
            }
            _ => Err(Error::InternalError("strategy unexpectedly has no ServerKeyExchange")),
        }
    }

    fn parse_dynamic_kex(&self, strategy: KexStrategy, body: &[u8]) -> Result<PendingKex, Error> {
        let partial = self.partial.as_ref().unwrap();
        let (psk_identity_hint, after_hint) = if strategy.uses_psk() {
            let (hint, consumed) = kex::parse_psk_hint(body)?;
            (Some(hint), consumed)
        } else {
            (None, 0)
        };
        let rest = &body[after_hint..];

        // Pure-PSK and RSA_PSK ServerKeyExchange carries the identity hint
        // and nothing else (RFC 4279 §4.3/§4.4) — no DH/ECDHE params follow.
        if matches!(strategy, KexStrategy::Psk | KexStrategy::RsaPsk) {
            let (identity, psk) = self.lookup_psk(psk_identity_hint.as_deref().unwrap_or_default())?;
            return Ok(match strategy {
                KexStrategy::Psk => PendingKex::Psk { identity, psk },
                KexStrategy::RsaPsk => PendingKex::RsaPsk { server_spki: self.server_spki.clone(), psk_identity: identity, psk },
                _ => unreachable!(),
            });
        }

        let (params, params_len) = match strategy {
            KexStrategy::DheRsa | KexStrategy::DhePsk => kex::parse_dh_params(rest)?,
            KexStrategy::EcdheRsa | KexStrategy::EcdheEcdsa => kex::parse_ecdhe_params(rest)?,
            _ => return Err(Error::InternalError("unexpected dynamic kex strategy")),
        };

        if strategy.has_signed_params() {
            let raw_params = &rest[..params_len];
            let signed = kex::signed_params_blob(&self.client_random, &partial.server_random, raw_params);
            let sig_body = &rest[params_len..];
            let mut c = Cursor::new_be(sig_body);
            let hash_alg = c.u8()?;
            let sig_alg = c.u8()?;
            let is_ecdsa = match (strategy, sig_alg) {
                (KexStrategy::EcdheEcdsa, 3) => true,
                (_, 1) => false,
                _ => return Err(Error::UnsupportedSigAlg { hash: hash_alg, sig: sig_alg }),
            };
            if !self.config.extensions.signature_algorithms.iter().any(|&(h, _)| h == hash_alg) {
                return Err(Error::UnsupportedSigAlg { hash: hash_alg, sig: sig_alg });
            }
            let signature = c.vec_u16(0, u16::MAX as usize)?;
            self.crypto.verify_signature(&self.server_spki, is_ecdsa, hash_alg, &signed, signature)?;
        }

        match (strategy, params) {
            (KexStrategy::DheRsa, ServerKeyExchangeParams::Dh { prime, generator, server_public }) => {
                let exchange = self.crypto.dhe_keypair(&prime, &generator)?;
                Ok(PendingKex::Dh { exchange, server_public })
            }
            (KexStrategy::DhePsk, ServerKeyExchangeParams::Dh { prime, generator, server_public }) => {
                let exchange = self.crypto.dhe_keypair(&prime, &generator)?;
                let (identity, psk) = self.lookup_psk(psk_identity_hint.as_deref().unwrap_or_default())?;
                Ok(PendingKex::DhePsk { exchange, server_public, psk_identity: identity, psk })
            }
            (KexStrategy::EcdheRsa | KexStrategy::EcdheEcdsa, ServerKeyExchangeParams::Ecdhe { curve, server_public }) => {
                if !self.config.extensions.elliptic_curves.contains(&curve) {
                    return Err(Error::UnsupportedCurve(curve));
                }
                let exchange = self.crypto.ecdhe_keypair(curve)?;
                Ok(PendingKex::Ecdhe { exchange, server_public })
            }
            _ => Err(Error::InternalError("kex strategy/params mismatch")),
        }
    }

    fn lookup_psk(&self, hint: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        self.config
            .identity
            .psks
            .iter()
            .find(|(id, _)| hint.is_empty() || id == hint)
            .map(|(id, psk)| (id.clone(), psk.clone()))
            .ok_or(Error::NoSecretKey)
    }

    // ── CertificateRequest (optional) ──

    fn recv_certificate_request_or_done(&mut self) -> Result<StepResult, Error> {
        let msg = self.next_handshake_message()?;
        match msg.typ {
            HS_CERTIFICATE_REQUEST => {
                self.client_cert_requested = true;
                // certificate_authorities constraint intentionally unchecked
                // (spec'd as a future improvement, not this client's scope).
                self.state = State::GotCertificateRequest;
                Ok(StepResult::Progressed)
            }
            HS_SERVER_HELLO_DONE => {
                self.pending = Some(PendingRecord::ServerHelloDone(msg));
                self.state = State::GotCertificateRequest;
                self.recv_server_hello_done()
            }
            _ => Err(Error::UnexpectedMessage { expected: "CertificateRequest or ServerHelloDone", got: "other" }),
        }
    }

    fn recv_server_hello_done(&mut self) -> Result<StepResult, Error> {
        let msg = self.next_handshake_message()?;
        if msg.typ != HS_SERVER_HELLO_DONE {
            return Err(Error::UnexpectedMessage { expected: "ServerHelloDone", got: "other" });
        }
        self.state = State::GotServerHelloDone;
        Ok(StepResult::Progressed)
    }

    // ── ClientKeyExchange / CertificateVerify / ChangeCipherSpec / Finished ──

    fn send_client_key_exchange_flight(&mut self) -> Result<StepResult, Error> {
        if self.client_cert_requested {
            self.send_client_certificate();
        }

        let pending_kex = self.pending_kex.take().expect("set by recv_server_key_exchange");
        let (body, pms) = self.build_client_key_exchange(&pending_kex)?;
        self.queue_handshake(HS_CLIENT_KEY_EXCHANGE, &body);

        let partial = self.partial.as_ref().unwrap();
        let master_secret = transcript::derive_master_secret(
            self.crypto.as_ref(),
            partial.cipher_suite.prf_hash,
            &pms,
            &self.client_random,
            &partial.server_random,
        );
        let cipher = partial.cipher_suite.cipher;
        self.key_material = Some(transcript::expand_key_block(
            self.crypto.as_ref(),
            partial.cipher_suite.prf_hash,
            &master_secret,
            &self.client_random,
            &partial.server_random,
            cipher.key_len(),
            AeadCipher::SALT_LEN,
        ));

        if self.client_cert_requested && !self.config.identity.certificate_chain.is_empty() {
            self.send_certificate_verify()?;
            self.state = State::SentCertificateVerify;
        } else {
            self.state = State::SentClientKeyExchange;
        }
        Ok(StepResult::Progressed)
    }

    fn send_client_certificate(&mut self) {
        let mut w = BufWriter::new_be();
        w.length_prefixed(3, |w| {
            for cert in &self.config.identity.certificate_chain {
                w.length_prefixed(3, |w| w.bytes(cert));
            }
        });
        let body = w.finish();
        self.queue_handshake(HS_CERTIFICATE, &body);
    }

    fn build_client_key_exchange(&mut self, pending_kex: &PendingKex) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), Error> {
        match pending_kex {
            PendingKex::Rsa { server_spki } => {
                let mut pms = vec![0u8; 48];
                pms[0] = ProtocolVersion::TLS1_2.major;
                pms[1] = ProtocolVersion::TLS1_2.minor;
                self.rng.fill(&mut pms[2..]);
                let pms = Zeroizing::new(pms);
                let encrypted = self.crypto.rsa_encrypt(server_spki, &pms)?;
                let mut body = BufWriter::new_be();
                body.vec_u16(&encrypted);
                Ok((body.finish(), pms))
            }
            PendingKex::StaticEcdh { .. } => Err(Error::InternalError("static ECDH premaster derivation not supported by this client")),
            other => {
                let pms = other.premaster_secret(self.crypto.as_ref())?;
                let body = other.client_key_exchange_body(self.crypto.as_ref(), &self.client_random)?;
                Ok((body, pms))
            }
        }
    }

    fn sig_from_pk(&self) -> u8 {
        if self.config.identity.key_is_ecdsa { 3 } else { 1 }
    }

    fn send_certificate_verify(&mut self) -> Result<(), Error> {
        let hash_alg = self
            .config
            .extensions
            .signature_algorithms
            .first()
            .map(|&(h, _)| h)
            .unwrap_or(4); // SHA-256
        let transcript_hash = self.transcript.current_hash(self.crypto.as_ref());
        let signature = self.crypto.client_sign(self.config.identity.key_is_ecdsa, hash_alg, &transcript_hash)?;

        let mut body = BufWriter::new_be();
        body.u8(hash_alg);
        body.u8(self.sig_from_pk());
        body.vec_u16(&signature);
        self.queue_handshake(HS_CERTIFICATE_VERIFY, &body.finish());
        Ok(())
    }

    fn send_change_cipher_spec(&mut self) -> Result<StepResult, Error> {
        self.queue(CONTENT_CHANGE_CIPHER_SPEC, vec![1]);
        self.client_write_seq = 0;
        self.state = State::SentChangeCipherSpec;
        Ok(StepResult::Progressed)
    }

    fn send_finished(&mut self) -> Result<StepResult, Error> {
        let partial = self.partial.as_ref().unwrap();
        let master_secret = &self.key_material.as_ref().unwrap().master_secret;
        let transcript_hash = self.transcript.current_hash(self.crypto.as_ref());
        let verify_data = transcript::compute_verify_data(
            self.crypto.as_ref(),
            partial.cipher_suite.prf_hash,
            master_secret,
            transcript::LABEL_CLIENT_FINISHED,
            &transcript_hash,
        );
        self.client_verify_data = Zeroizing::new(verify_data.clone());
        self.queue_handshake(HS_FINISHED, &verify_data);
        self.state = State::SentFinished;
        Ok(StepResult::Progressed)
    }

    /// Receive the optional `NewSessionTicket` or the `ChangeCipherSpec` that
    /// follows it, transitioning to `ticket_next`/`ccs_next` respectively.
    /// Shared between the full handshake (`SentFinished` waiting on the
    /// server's post-`Finished` group) and the abbreviated handshake
    /// (`ResumedAwaitFinished` waiting on the server's pre-`Finished` group).
    fn recv_ticket_or_ccs(&mut self, ticket_next: State, ccs_next: State) -> Result<StepResult, Error> {
        let (content_type, payload) = self.record_layer.read()?;
        if content_type == CONTENT_HANDSHAKE {
            let (typ, body) = parse_handshake_header(&payload)?;
            if typ != HS_NEW_SESSION_TICKET {
                return Err(Error::UnexpectedMessage { expected: "NewSessionTicket", got: "other" });
            }
            self.transcript.absorb(&payload);
            let mut c = Cursor::new_be(body);
            let _lifetime_hint = c.u32()?;
            let ticket = c.vec_u16(0, u16::MAX as usize)?.to_vec();
            self.pending_ticket = Some(ticket);
            self.state = ticket_next;
            Ok(StepResult::Progressed)
        } else if content_type == CONTENT_CHANGE_CIPHER_SPEC {
            self.on_change_cipher_spec(&payload)?;
            self.state = ccs_next;
            Ok(StepResult::Progressed)
        } else {
            Err(Error::UnexpectedMessage { expected: "NewSessionTicket or ChangeCipherSpec", got: "other" })
        }
    }

    fn recv_ccs(&mut self, next: State) -> Result<StepResult, Error> {
        let (content_type, payload) = self.record_layer.read()?;
        if content_type != CONTENT_CHANGE_CIPHER_SPEC {
            return Err(Error::UnexpectedMessage { expected: "ChangeCipherSpec", got: "other" });
        }
        self.on_change_cipher_spec(&payload)?;
        self.state = next;
        Ok(StepResult::Progressed)
    }

    fn on_change_cipher_spec(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload != [1] {
            return Err(Error::BadHandshake("malformed ChangeCipherSpec"));
        }
        self.server_read_seq = 0;
        Ok(())
    }

    fn recv_finished(&mut self, next: State) -> Result<StepResult, Error> {
        // The server's Finished verify_data covers every handshake message up
        // to but not including Finished itself, so the hash must be taken
        // before `next_handshake_message` absorbs `msg.raw`.
        let transcript_hash_before = self.transcript.current_hash(self.crypto.as_ref());

        let msg = self.next_handshake_message()?;
        if msg.typ != HS_FINISHED {
            return Err(Error::UnexpectedMessage { expected: "Finished", got: "other" });
        }
        let partial = self.partial.as_ref().unwrap();
        let master_secret = &self.key_material.as_ref().unwrap().master_secret;
        let expected = transcript::compute_verify_data(
            self.crypto.as_ref(),
            partial.cipher_suite.prf_hash,
            master_secret,
            transcript::LABEL_SERVER_FINISHED,
            &transcript_hash_before,
        );
        if !ct_eq(&expected, &msg.body) {
            return Err(Error::BadFinished);
        }
        self.state = next;
        Ok(StepResult::Progressed)
    }

    fn wrap_up(&mut self) -> Result<StepResult, Error> {
        let partial = self.partial.take().expect("set throughout negotiation");
        let master_secret = self.key_material.take().unwrap().master_secret;

        let resumption = if let Some(ticket) = self.pending_ticket.take() {
            Some(ResumptionState {
                handle: ResumptionHandle::Ticket(ticket),
                master_secret: master_secret.clone(),
                cipher_suite_id: partial.cipher_suite.id,
            })
        } else if !partial.session_id.is_empty() {
            Some(ResumptionState {
                handle: ResumptionHandle::SessionId(partial.session_id.clone()),
                master_secret: master_secret.clone(),
                cipher_suite_id: partial.cipher_suite.id,
            })
        } else {
            None
        };

        let negotiation = Negotiation {
            version: partial.version,
            cipher_suite: partial.cipher_suite,
            client_random: self.client_random,
            server_random: partial.server_random,
            session_id: partial.session_id,
            server_gmt_unix_time: Negotiation::server_gmt_unix_time_from_random(&partial.server_random),
            compression: partial.compression,
            truncated_hmac: partial.server_extensions.truncated_hmac,
            alpn_protocol: partial.server_extensions.alpn_protocol,
            resumed: partial.resumed,
            secure_renegotiation: !self.peer_renegotiation_info.is_empty() || self.config.allow_legacy_renegotiation,
        };

        debug!("handshake established, resumed={}", negotiation.resumed);
        self.resuming = false;
        self.session = Some(Session { negotiation, resumption });
        self.state = State::Established;
        Ok(StepResult::HandshakeComplete)
    }

    // ── Application data ──

    pub fn send_application_data(&mut self, data: &[u8]) -> Result<(), Error> {
        if !self.state.is_established() {
            return Err(Error::BadHandshake("cannot send application data before the handshake completes"));
        }
        let km = self.key_material.as_ref().ok_or(Error::NoSecretKey)?;
        let cipher = self.session.as_ref().unwrap().negotiation.cipher_suite.cipher;
        let aad = record_aad(self.client_write_seq, CONTENT_APPLICATION_DATA, data.len());
        let sealed = self.crypto.aead_seal(cipher, &km.client_write_key, &km.client_write_iv, self.client_write_seq, &aad, data);
        self.client_write_seq += 1;
        self.record_layer.write(CONTENT_APPLICATION_DATA, &sealed)
    }

    pub fn recv_application_data(&mut self) -> Result<Vec<u8>, Error> {
        let (content_type, payload) = self.record_layer.read()?;
        if content_type != CONTENT_APPLICATION_DATA {
            return Err(Error::UnexpectedMessage { expected: "application_data", got: "other" });
        }
        let km = self.key_material.as_ref().ok_or(Error::NoSecretKey)?;
        let cipher = self.session.as_ref().unwrap().negotiation.cipher_suite.cipher;
        let aad = record_aad(self.server_read_seq, CONTENT_APPLICATION_DATA, payload.len().saturating_sub(AeadCipher::TAG_LEN));
        let opened = self.crypto.aead_open(cipher, &km.server_write_key, &km.server_write_iv, self.server_read_seq, &aad, &payload)?;
        self.server_read_seq += 1;
        Ok(opened)
    }

    // ── Renegotiation (RFC 5746) ──

    /// Begin a secure renegotiation. Refused unless the previous handshake
    /// carried secure_renegotiation (the three-way legacy policy: off by
    /// default, allowed only when the peer or the caller's config opted in).
    pub fn renegotiate(&mut self) -> Result<(), Error> {
        let session = self.session.as_ref().ok_or(Error::BadHandshake("no established session to renegotiate"))?;
        if !session.negotiation.secure_renegotiation {
            return Err(Error::BadHandshake("secure renegotiation was not established on the initial handshake"));
        }
        self.peer_renegotiation_info = self.client_verify_data.clone();
        self.transcript = Transcript::new();
        self.state = State::Renegotiating;
        Ok(())
    }
}

fn record_aad(seq: u64, content_type: u8, len: usize) -> Vec<u8> {
    let mut aad = Vec::with_capacity(13);
    aad.extend_from_slice(&seq.to_be_bytes());
    aad.push(content_type);
    aad.extend_from_slice(&ProtocolVersion::TLS1_2.to_bytes());
    aad.extend_from_slice(&(len as u16).to_be_bytes());
    aad
}

/// Constant-time byte-slice comparison, kept local so the core driver never
/// depends on a specific crypto crate for something this cheap to do in pure logic.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn parse_certificate_list(data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let mut c = Cursor::new_be(data);
    let list = c.vec_u24(0, (1 << 24) - 1)?;
    let mut inner = Cursor::new_be(list);
    let mut certs = Vec::new();
    while !inner.is_empty() {
        let cert = inner.vec_u24(0, (1 << 24) - 1)?;
        certs.push(cert.to_vec());
    }
    Ok(certs)
}
