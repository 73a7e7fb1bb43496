//! Protocol version negotiation (RFC 5246 §4.1 legacy_version / ServerHello.server_version).

use crate::error::Error;

/// A two-byte `ProtocolVersion` as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const TLS1_0: Self = Self { major: 3, minor: 1 };
    pub const TLS1_1: Self = Self { major: 3, minor: 2 };
    pub const TLS1_2: Self = Self { major: 3, minor: 3 };

    pub const fn to_bytes(self) -> [u8; 2] {
        [self.major, self.minor]
    }

    pub const fn from_bytes(b: [u8; 2]) -> Self {
        Self { major: b[0], minor: b[1] }
    }
}

/// The inclusive range of versions a client is willing to negotiate.
///
/// This driver only speaks TLS 1.2, so both ends are fixed to `TLS1_2` by
/// [`VersionRange::tls12_only`]; the type still carries a range so a future
/// client could widen it without touching the negotiation logic below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: ProtocolVersion,
    pub max: ProtocolVersion,
}

impl VersionRange {
    pub const fn tls12_only() -> Self {
        Self { min: ProtocolVersion::TLS1_2, max: ProtocolVersion::TLS1_2 }
    }

    /// Accept the server's chosen version, or fail with `UnsupportedProtocol`.
    pub fn accept(&self, offered: ProtocolVersion) -> Result<ProtocolVersion, Error> {
        if offered >= self.min && offered <= self.max {
            Ok(offered)
        } else {
            Err(Error::UnsupportedProtocol { major: offered.major, minor: offered.minor })
        }
    }
}
