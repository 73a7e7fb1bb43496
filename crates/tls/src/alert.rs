//! Mapping from internal [`Error`](crate::error::Error) values to outgoing TLS alerts.
//!
//! RFC 5246 §7.2 defines the alert description space; this table picks the
//! specific description a conforming client should send for each internal
//! failure instead of collapsing everything to a single generic alert.

use crate::error::Error;

/// TLS alert levels (RFC 5246 §7.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// TLS alert descriptions relevant to a client-side TLS 1.2 handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    DecryptError = 51,
    ProtocolVersion = 70,
    IllegalParameter = 47,
    DecodeError = 50,
    HandshakeFailure = 40,
    BadCertificate = 42,
    CertificateUnknown = 46,
    UnsupportedExtension = 110,
    InternalError = 80,
}

/// Resolve the `(level, description)` pair a client should send upon `err`.
pub fn alert_for(err: &Error) -> (AlertLevel, AlertDescription) {
    use AlertDescription::*;
    use AlertLevel::Fatal;

    let description = match err {
        Error::Decode(_) => DecodeError,
        Error::UnexpectedMessage { .. } => UnexpectedMessage,
        Error::BadHandshake(_) => HandshakeFailure,
        Error::BadFinished => DecryptError,
        Error::UnexpectedExtension(_) => UnsupportedExtension,
        Error::UnsupportedProtocol { .. } => ProtocolVersion,
        Error::UnsupportedCiphersuite(_) => HandshakeFailure,
        Error::UnsupportedCurve(_) => HandshakeFailure,
        Error::UnsupportedSigAlg { .. } => IllegalParameter,
        Error::BadCertificate(_) => BadCertificate,
        Error::WrongPubkeyAlgo => CertificateUnknown,
        Error::BadTicket => DecryptError,
        Error::NoSecretKey => InternalError,
        Error::NoSharedCipher => HandshakeFailure,
        Error::InternalError(_) => InternalError,
        Error::Io | Error::WouldBlock => return (Fatal, InternalError),
    };
    (Fatal, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_bad_ticket_to_decrypt_error() {
        let (level, desc) = alert_for(&Error::BadTicket);
        assert_eq!(level, AlertLevel::Fatal);
        assert_eq!(desc, AlertDescription::DecryptError);
    }

    #[test]
    fn maps_unsupported_protocol() {
        let (_, desc) = alert_for(&Error::UnsupportedProtocol { major: 3, minor: 1 });
        assert_eq!(desc, AlertDescription::ProtocolVersion);
    }

    #[test]
    fn maps_bad_finished_to_decrypt_error() {
        let (level, desc) = alert_for(&Error::BadFinished);
        assert_eq!(level, AlertLevel::Fatal);
        assert_eq!(desc, AlertDescription::DecryptError);
    }

    #[test]
    fn maps_unexpected_extension() {
        let (_, desc) = alert_for(&Error::UnexpectedExtension(0x0010));
        assert_eq!(desc, AlertDescription::UnsupportedExtension);
    }
}
