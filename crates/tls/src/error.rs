//! Error taxonomy for the handshake driver.

use wire::DecodeError;

/// Everything that can make the handshake driver fail.
///
/// `Decode` wraps a wire-codec failure; every other variant names a specific
/// handshake-level condition so a caller (or [`crate::alert::alert_for`]) can
/// react to it directly instead of pattern-matching on a message string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed handshake message: {0}")]
    Decode(#[from] DecodeError),

    #[error("received a handshake message out of order: expected {expected}, got {got}")]
    UnexpectedMessage { expected: &'static str, got: &'static str },

    #[error("handshake violated a protocol invariant: {0}")]
    BadHandshake(&'static str),

    #[error("server's Finished verify_data did not match the locally computed value")]
    BadFinished,

    #[error("server sent extension 0x{0:04x}, which the client did not offer")]
    UnexpectedExtension(u16),

    #[error("server offered protocol version {major}.{minor}, which this client does not support")]
    UnsupportedProtocol { major: u8, minor: u8 },

    #[error("server selected ciphersuite 0x{0:04x}, which was not offered")]
    UnsupportedCiphersuite(u16),

    #[error("server selected elliptic curve {0}, which was not offered")]
    UnsupportedCurve(u16),

    #[error("server used signature algorithm ({hash}, {sig}), which was not offered")]
    UnsupportedSigAlg { hash: u8, sig: u8 },

    #[error("certificate chain is malformed or fails validation: {0}")]
    BadCertificate(&'static str),

    #[error("certificate's public key algorithm does not match the negotiated ciphersuite")]
    WrongPubkeyAlgo,

    #[error("session ticket is malformed or cannot be decrypted")]
    BadTicket,

    #[error("no private key available for the key-exchange strategy in use")]
    NoSecretKey,

    #[error("server did not select any ciphersuite the client offered")]
    NoSharedCipher,

    #[error("internal driver error: {0}")]
    InternalError(&'static str),

    #[error("transport I/O error")]
    Io,

    #[error("the underlying transport would block; call step() again once more data is available")]
    WouldBlock,
}

pub type Result<T> = core::result::Result<T, Error>;
