//! End-to-end handshake scenarios driven against `tls12-refcrypto`'s
//! reference `CryptoProvider`/`CertificateStore`, with a scripted
//! [`ScriptedRecordLayer`] standing in for the server side of the
//! connection. These exercise the PSK ciphersuites (`SigStrategy::None`)
//! so no certificate chain needs to be fabricated; everything else —
//! ServerHello, ServerKeyExchange, ChangeCipherSpec, Finished — is built
//! by hand from the wire codec, the same way the driver itself builds
//! outgoing messages.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use refcrypto::prf::prf;
use refcrypto::sha256::sha256;
use refcrypto::{OsRng, RefCertificateStore, RefCryptoProvider};
use tls12::builder::{ClientBuilder, ClientIdentity};
use tls12::ciphersuite::PrfHash;
use tls12::error::Error;
use tls12::extension::EXT_RENEGOTIATION_INFO;
use tls12::provider::RecordLayer;
use tls12::session::ResumptionHandle;
use tls12::{State, StepResult};
use wire::BufWriter;

const CONTENT_CHANGE_CIPHER_SPEC: u8 = 20;
const CONTENT_HANDSHAKE: u8 = 22;

const HS_SERVER_HELLO: u8 = 2;
const HS_SERVER_KEY_EXCHANGE: u8 = 12;
const HS_SERVER_HELLO_DONE: u8 = 14;
const HS_FINISHED: u8 = 20;

const PSK_SUITE: u16 = 0x00A8; // TLS_PSK_WITH_AES_128_GCM_SHA256

fn frame_handshake(typ: u8, body: &[u8]) -> Vec<u8> {
    let mut w = BufWriter::new_be();
    w.u8(typ);
    w.length_prefixed(3, |w| w.bytes(body));
    w.finish()
}

fn build_server_hello(server_random: &[u8; 32], session_id: &[u8], suite_id: u16, renegotiation_info: &[u8]) -> Vec<u8> {
    let mut body = BufWriter::new_be();
    body.bytes(&[3, 3]);
    body.bytes(server_random);
    body.vec_u8(session_id);
    body.u16(suite_id);
    body.u8(0x00); // compression: null
    body.length_prefixed(2, |w| {
        w.u16(EXT_RENEGOTIATION_INFO);
        w.length_prefixed(2, |w| w.vec_u8(renegotiation_info));
    });
    frame_handshake(HS_SERVER_HELLO, &body.finish())
}

/// A `ServerKeyExchange` carrying only a PSK identity hint (RFC 4279 §4.3);
/// an empty hint matches whatever single PSK the client has configured.
fn build_psk_server_key_exchange(hint: &[u8]) -> Vec<u8> {
    let mut body = BufWriter::new_be();
    body.vec_u16(hint);
    frame_handshake(HS_SERVER_KEY_EXCHANGE, &body.finish())
}

fn build_server_hello_done() -> Vec<u8> {
    frame_handshake(HS_SERVER_HELLO_DONE, &[])
}

/// The client_random a `ClientHello` carries at a fixed offset: 1-byte
/// type + 3-byte length + 2-byte legacy_version precede it.
fn extract_client_random(client_hello: &[u8]) -> [u8; 32] {
    let mut random = [0u8; 32];
    random.copy_from_slice(&client_hello[6..38]);
    random
}

/// `PSK-only premaster secret = uint16(len(psk)) || zeros(len(psk)) || uint16(len(psk)) || psk` (RFC 4279 §2).
fn psk_master_secret(psk: &[u8], client_random: &[u8; 32], server_random: &[u8; 32]) -> Vec<u8> {
    let other = vec![0u8; psk.len()];
    let mut pms = Vec::with_capacity(4 + 2 * psk.len());
    pms.extend_from_slice(&(other.len() as u16).to_be_bytes());
    pms.extend_from_slice(&other);
    pms.extend_from_slice(&(psk.len() as u16).to_be_bytes());
    pms.extend_from_slice(psk);

    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    prf(PrfHash::Sha256, &pms, b"master secret", &seed, 48)
}

fn server_finished_verify_data(master_secret: &[u8], transcript_messages: &[&[u8]]) -> Vec<u8> {
    let mut transcript = Vec::new();
    for m in transcript_messages {
        transcript.extend_from_slice(m);
    }
    let hash = sha256(&transcript);
    prf(PrfHash::Sha256, master_secret, b"server finished", &hash, 12)
}

/// A `RecordLayer` driven entirely by a pre-queued script of inbound
/// records; every outbound write is appended to a shared buffer the test
/// reads back from, so crafting the next scripted response can depend on
/// whatever the client actually sent.
struct ScriptedRecordLayer {
    inbound: Rc<RefCell<VecDeque<(u8, Vec<u8>)>>>,
    captured: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
}

impl RecordLayer for ScriptedRecordLayer {
    fn read(&mut self) -> Result<(u8, Vec<u8>), Error> {
        self.inbound.borrow_mut().pop_front().ok_or(Error::WouldBlock)
    }

    fn write(&mut self, content_type: u8, payload: &[u8]) -> Result<(), Error> {
        self.captured.borrow_mut().push((content_type, payload.to_vec()));
        Ok(())
    }
}

fn new_crypto_stack() -> (Arc<RefCryptoProvider>, Arc<RefCertificateStore>) {
    (
        Arc::new(RefCryptoProvider::new(Arc::new(OsRng), ClientIdentity::default())),
        Arc::new(RefCertificateStore),
    )
}

#[test]
fn full_psk_handshake_reaches_established() {
    let psk_identity = b"client-psk-id".to_vec();
    let psk = b"a shared secret only the two peers know".to_vec();
    let server_random = [0x77u8; 32];

    let inbound = Rc::new(RefCell::new(VecDeque::new()));
    let captured = Rc::new(RefCell::new(Vec::new()));
    let (crypto, cert_store) = new_crypto_stack();

    let identity = ClientIdentity { psks: vec![(psk_identity, psk.clone())], ..Default::default() };
    let mut ctx = ClientBuilder::new("example.com")
        .with_ciphersuites(vec![PSK_SUITE])
        .with_client_identity(identity)
        .build(
            Box::new(ScriptedRecordLayer { inbound: inbound.clone(), captured: captured.clone() }),
            crypto,
            cert_store,
            Arc::new(OsRng),
        );

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed));
    assert_eq!(ctx.state(), State::SentClientHello);

    let server_hello = build_server_hello(&server_random, &[], PSK_SUITE, &[]);
    let server_key_exchange = build_psk_server_key_exchange(&[]);
    let server_hello_done = build_server_hello_done();
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_hello.clone()));
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_key_exchange.clone()));
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_hello_done.clone()));
    inbound.borrow_mut().push_back((CONTENT_CHANGE_CIPHER_SPEC, vec![1]));

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // consumes ServerHello
    assert_eq!(ctx.state(), State::GotServerHello);
    let client_hello = captured.borrow()[0].1.clone();
    let client_random = extract_client_random(&client_hello);

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // consumes ServerKeyExchange (no Certificate for PSK)
    assert_eq!(ctx.state(), State::GotServerKeyExchange);

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // consumes ServerHelloDone
    assert_eq!(ctx.state(), State::GotServerHelloDone);

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // builds ClientKeyExchange
    assert_eq!(ctx.state(), State::SentClientKeyExchange);

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // flushes ClientKeyExchange, sends ChangeCipherSpec
    assert_eq!(ctx.state(), State::SentChangeCipherSpec);
    let client_key_exchange = captured.borrow()[1].1.clone();

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // flushes ChangeCipherSpec, sends Finished
    assert_eq!(ctx.state(), State::SentFinished);

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // flushes Finished, consumes server's ChangeCipherSpec
    assert_eq!(ctx.state(), State::GotChangeCipherSpec);
    let client_finished = captured.borrow()[2].1.clone();

    let master_secret = psk_master_secret(&psk, &client_random, &server_random);
    let verify_data = server_finished_verify_data(
        &master_secret,
        &[&client_hello, &server_hello, &server_key_exchange, &server_hello_done, &client_key_exchange, &client_finished],
    );
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, frame_handshake(HS_FINISHED, &verify_data)));

    assert!(matches!(ctx.step().unwrap(), StepResult::Progressed)); // verifies server's Finished
    assert_eq!(ctx.state(), State::GotFinished);

    assert!(matches!(ctx.step().unwrap(), StepResult::HandshakeComplete));
    assert_eq!(ctx.state(), State::Established);

    let session = ctx.into_session().expect("handshake completed");
    assert_eq!(session.cipher_suite_id(), PSK_SUITE);
    assert!(!session.negotiation.resumed);
    assert!(session.resumption.is_none(), "no session id or ticket was offered, so nothing to resume later");
}

#[test]
fn session_id_resumption_skips_key_exchange_and_reuses_master_secret() {
    let psk_identity = b"client-psk-id".to_vec();
    let psk = b"a shared secret only the two peers know".to_vec();
    let first_server_random = [0x11u8; 32];
    let cached_session_id = vec![0xAB; 16];

    // First handshake: full, with a session id the server offers to cache.
    let inbound = Rc::new(RefCell::new(VecDeque::new()));
    let captured = Rc::new(RefCell::new(Vec::new()));
    let (crypto, cert_store) = new_crypto_stack();
    let identity = ClientIdentity { psks: vec![(psk_identity, psk.clone())], ..Default::default() };
    let mut ctx = ClientBuilder::new("example.com")
        .with_ciphersuites(vec![PSK_SUITE])
        .with_client_identity(identity.clone())
        .build(
            Box::new(ScriptedRecordLayer { inbound: inbound.clone(), captured: captured.clone() }),
            crypto.clone(),
            cert_store.clone(),
            Arc::new(OsRng),
        );

    ctx.step().unwrap();
    let server_hello = build_server_hello(&first_server_random, &cached_session_id, PSK_SUITE, &[]);
    let server_key_exchange = build_psk_server_key_exchange(&[]);
    let server_hello_done = build_server_hello_done();
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_hello.clone()));
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_key_exchange.clone()));
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_hello_done.clone()));
    inbound.borrow_mut().push_back((CONTENT_CHANGE_CIPHER_SPEC, vec![1]));

    ctx.step().unwrap();
    let client_hello = captured.borrow()[0].1.clone();
    let client_random = extract_client_random(&client_hello);
    ctx.step().unwrap();
    ctx.step().unwrap();
    ctx.step().unwrap();
    ctx.step().unwrap();
    let client_key_exchange = captured.borrow()[1].1.clone();
    ctx.step().unwrap();
    ctx.step().unwrap();
    let client_finished = captured.borrow()[2].1.clone();

    let master_secret = psk_master_secret(&psk, &client_random, &first_server_random);
    let verify_data = server_finished_verify_data(
        &master_secret,
        &[&client_hello, &server_hello, &server_key_exchange, &server_hello_done, &client_key_exchange, &client_finished],
    );
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, frame_handshake(HS_FINISHED, &verify_data)));
    ctx.step().unwrap();
    assert!(matches!(ctx.step().unwrap(), StepResult::HandshakeComplete));

    let session = ctx.into_session().unwrap();
    let resumption = session.resumption.expect("server offered a session id, so resumption material must be kept");
    match &resumption.handle {
        ResumptionHandle::SessionId(id) => assert_eq!(id, &cached_session_id),
        ResumptionHandle::Ticket(_) => panic!("expected session-id resumption, not a ticket"),
    }

    // Second connection: resume. The abbreviated handshake (RFC 5246 §7.3)
    // never sends ServerKeyExchange/ClientKeyExchange at all — only
    // ServerHello, then the server's ChangeCipherSpec/Finished, then the
    // client's.
    let second_server_random = [0x22u8; 32];
    let inbound2 = Rc::new(RefCell::new(VecDeque::new()));
    let captured2 = Rc::new(RefCell::new(Vec::new()));
    let mut resumed_ctx = ClientBuilder::new("example.com")
        .with_ciphersuites(vec![PSK_SUITE])
        .with_client_identity(identity)
        .resume_session(resumption)
        .build(
            Box::new(ScriptedRecordLayer { inbound: inbound2.clone(), captured: captured2.clone() }),
            crypto,
            cert_store,
            Arc::new(OsRng),
        );

    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed)); // queues ClientHello
    assert_eq!(resumed_ctx.state(), State::SentClientHello);

    // Nothing is scripted for the server's reply yet, so this step only
    // flushes the queued ClientHello and then blocks waiting to read.
    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::WouldBlock));
    let second_client_hello = captured2.borrow()[0].1.clone();
    // The client must have offered the cached session id verbatim.
    assert_eq!(&second_client_hello[39..39 + cached_session_id.len()], &cached_session_id[..]);

    let second_server_hello = build_server_hello(&second_server_random, &cached_session_id, PSK_SUITE, &[]);
    inbound2.borrow_mut().push_back((CONTENT_HANDSHAKE, second_server_hello.clone()));

    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed));
    assert_eq!(resumed_ctx.state(), State::ResumedAwaitFinished);

    inbound2.borrow_mut().push_back((CONTENT_CHANGE_CIPHER_SPEC, vec![1]));
    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed));
    assert_eq!(resumed_ctx.state(), State::ResumedGotChangeCipherSpec);

    // The abbreviated handshake's server Finished covers only ClientHello/ServerHello.
    let abbreviated_verify_data =
        server_finished_verify_data(&master_secret, &[&second_client_hello, &second_server_hello]);
    inbound2
        .borrow_mut()
        .push_back((CONTENT_HANDSHAKE, frame_handshake(HS_FINISHED, &abbreviated_verify_data)));
    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed));
    assert_eq!(resumed_ctx.state(), State::ResumedGotFinished);

    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed)); // client's ChangeCipherSpec
    assert_eq!(resumed_ctx.state(), State::SentChangeCipherSpec);
    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::Progressed)); // client's Finished
    assert_eq!(resumed_ctx.state(), State::SentFinished);
    // Nothing more comes from the server in the abbreviated handshake; this
    // step only flushes the client's Finished and wraps up.
    assert!(matches!(resumed_ctx.step().unwrap(), StepResult::HandshakeComplete));
    assert_eq!(resumed_ctx.state(), State::Established);

    let resumed_session = resumed_ctx.into_session().unwrap();
    assert!(resumed_session.negotiation.resumed);
    assert_eq!(resumed_session.cipher_suite_id(), PSK_SUITE);
}

#[test]
fn server_sending_nonempty_renegotiation_info_on_initial_handshake_is_rejected() {
    let (crypto, cert_store) = new_crypto_stack();
    let inbound = Rc::new(RefCell::new(VecDeque::new()));
    let captured = Rc::new(RefCell::new(Vec::new()));
    let identity = ClientIdentity {
        psks: vec![(b"client-psk-id".to_vec(), b"a shared secret only the two peers know".to_vec())],
        ..Default::default()
    };

    let mut ctx = ClientBuilder::new("example.com")
        .with_ciphersuites(vec![PSK_SUITE])
        .with_client_identity(identity)
        .build(
            Box::new(ScriptedRecordLayer { inbound: inbound.clone(), captured: captured.clone() }),
            crypto,
            cert_store,
            Arc::new(OsRng),
        );

    ctx.step().unwrap();

    // RFC 5746: a server that has never seen a renegotiation from this
    // client must echo an *empty* renegotiation_info. One that doesn't is
    // either confused about which connection this is, or an attacker
    // trying to splice in a prior handshake.
    let server_hello = build_server_hello(&[0x33u8; 32], &[], PSK_SUITE, &[0xAA]);
    inbound.borrow_mut().push_back((CONTENT_HANDSHAKE, server_hello));

    let err = ctx.step().unwrap_err();
    assert_eq!(err, Error::BadHandshake("server sent non-empty renegotiation_info on initial handshake"));
}
