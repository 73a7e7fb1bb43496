//! # TLS 1.2 Client (RFC 5246)
//!
//! A client-side TLS 1.2 handshake state machine. This crate owns the
//! handshake logic, wire framing, and key schedule; it never picks a
//! cryptography library, a certificate trust policy, or a transport —
//! those are the [`provider`] traits, implemented by whatever the
//! embedding application (or, for tests, `tls12-refcrypto`) provides.

pub mod alert;
pub mod builder;
pub mod ciphersuite;
pub mod driver;
pub mod error;
pub mod extension;
pub mod kex;
pub mod negotiation;
pub mod provider;
pub mod session;
pub mod state;
pub mod transcript;
pub mod version;

pub use builder::{ClientBuilder, ClientConfig, ClientIdentity};
pub use driver::{HandshakeContext, StepResult};
pub use error::{Error, Result};
pub use session::Session;
pub use state::State;
