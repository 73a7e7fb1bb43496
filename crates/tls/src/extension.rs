//! The extension registry (RFC 5246 §7.4.1.4, plus RFC 6066/4492/5077/5746/7301).
//!
//! Each entry the client might offer is represented once, in [`ClientExtensions`];
//! encoding happens only for the fields the caller actually set. Parsing the
//! server's response goes through [`parse_server_extensions`], which rejects
//! any extension type the client did not offer (`UnexpectedExtension`) and
//! silently ignores extension types it doesn't recognize at all, per RFC 5246
//! §7.4.1.4's compatibility rule for unsolicited-but-unknown extensions sent
//! by a buggy peer — recognized-but-unsolicited is still a hard error.

use wire::{BufWriter, Cursor, DecodeError};

use crate::error::Error;

pub const EXT_SERVER_NAME: u16 = 0x0000;
pub const EXT_MAX_FRAGMENT_LENGTH: u16 = 0x0001;
pub const EXT_TRUNCATED_HMAC: u16 = 0x0004;
pub const EXT_SUPPORTED_ELLIPTIC_CURVES: u16 = 0x000a;
pub const EXT_EC_POINT_FORMATS: u16 = 0x000b;
pub const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
pub const EXT_ALPN: u16 = 0x0010;
pub const EXT_SESSION_TICKET: u16 = 0x0023;
pub const EXT_RENEGOTIATION_INFO: u16 = 0xff01;

/// One extension as it appears on the wire: a type and an opaque body.
#[derive(Debug, Clone)]
pub struct RawExtension {
    pub typ: u16,
    pub data: Vec<u8>,
}

/// The extensions a client may offer in `ClientHello`, and what the server
/// accepted in `ServerHello`.
#[derive(Debug, Clone, Default)]
pub struct ClientExtensions {
    pub server_name: Option<String>,
    pub max_fragment_length: Option<u8>,
    pub truncated_hmac: bool,
    pub elliptic_curves: Vec<u16>,
    pub ec_point_formats: Vec<u8>,
    pub signature_algorithms: Vec<(u8, u8)>,
    pub alpn_protocols: Vec<String>,
    pub session_ticket: Option<Vec<u8>>,
    pub renegotiation_info: Vec<u8>,
}

/// What the server actually accepted, parsed back out of its extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerExtensions {
    pub max_fragment_length: Option<u8>,
    pub truncated_hmac: bool,
    pub ec_point_formats: Vec<u8>,
    pub alpn_protocol: Option<String>,
    pub session_ticket_accepted: bool,
    pub renegotiation_info: Option<Vec<u8>>,
}

impl ClientExtensions {
    /// Encode every extension the caller populated into a `ClientHello`
    /// extensions block (the part after the 2-byte outer length, which the
    /// caller's `BufWriter::length_prefixed` wraps this in).
    pub fn encode(&self, out: &mut BufWriter) {
        if let Some(name) = &self.server_name {
            encode_ext(out, EXT_SERVER_NAME, |w| {
                w.length_prefixed(2, |w| {
                    w.u8(0x00); // host_name
                    w.vec_u16(name.as_bytes());
                });
            });
        }
        if let Some(max) = self.max_fragment_length {
            encode_ext(out, EXT_MAX_FRAGMENT_LENGTH, |w| w.u8(max));
        }
        if self.truncated_hmac {
            encode_ext(out, EXT_TRUNCATED_HMAC, |_| {});
        }
        if !self.elliptic_curves.is_empty() {
            encode_ext(out, EXT_SUPPORTED_ELLIPTIC_CURVES, |w| {
                w.length_prefixed(2, |w| {
                    for &c in &self.elliptic_curves {
                        w.u16(c);
                    }
                });
            });
        }
        if !self.ec_point_formats.is_empty() {
            encode_ext(out, EXT_EC_POINT_FORMATS, |w| {
                w.vec_u8(&self.ec_point_formats);
            });
        }
        if !self.signature_algorithms.is_empty() {
            encode_ext(out, EXT_SIGNATURE_ALGORITHMS, |w| {
                w.length_prefixed(2, |w| {
                    for &(hash, sig) in &self.signature_algorithms {
                        w.u8(hash);
                        w.u8(sig);
                    }
                });
            });
        }
        if !self.alpn_protocols.is_empty() {
            encode_ext(out, EXT_ALPN, |w| {
                w.length_prefixed(2, |w| {
                    for proto in &self.alpn_protocols {
                        w.vec_u8(proto.as_bytes());
                    }
                });
            });
        }
        if let Some(ticket) = &self.session_ticket {
            encode_ext(out, EXT_SESSION_TICKET, |w| w.bytes(ticket));
        }
        encode_ext(out, EXT_RENEGOTIATION_INFO, |w| w.vec_u8(&self.renegotiation_info));
    }

    /// The set of extension type ids this client offered, for
    /// `UnexpectedExtension` checking against the server's reply.
    fn offered_types(&self) -> Vec<u16> {
        let mut types = vec![EXT_RENEGOTIATION_INFO];
        if self.server_name.is_some() {
            types.push(EXT_SERVER_NAME);
        }
        if self.max_fragment_length.is_some() {
            types.push(EXT_MAX_FRAGMENT_LENGTH);
        }
        if self.truncated_hmac {
            types.push(EXT_TRUNCATED_HMAC);
        }
        if !self.ec_point_formats.is_empty() {
            types.push(EXT_EC_POINT_FORMATS);
        }
        if !self.alpn_protocols.is_empty() {
            types.push(EXT_ALPN);
        }
        if self.session_ticket.is_some() {
            types.push(EXT_SESSION_TICKET);
        }
        types
    }
}

fn encode_ext(out: &mut BufWriter, typ: u16, body: impl FnOnce(&mut BufWriter)) {
    out.u16(typ);
    out.length_prefixed(2, body);
}

/// Split a raw extensions block into individual `(type, data)` entries.
pub fn parse_raw_extensions(data: &[u8]) -> Result<Vec<RawExtension>, Error> {
    let mut cursor = Cursor::new_be(data);
    let mut out = Vec::new();
    while !cursor.is_empty() {
        let typ = cursor.u16()?;
        let body = cursor.vec_u16(0, u16::MAX as usize)?;
        out.push(RawExtension { typ, data: body.to_vec() });
    }
    Ok(out)
}

/// Validate and decode the server's `ServerHello` extensions against what the
/// client offered.
pub fn parse_server_extensions(
    raw: &[RawExtension],
    offered: &ClientExtensions,
) -> Result<ServerExtensions, Error> {
    let offered_types = offered.offered_types();
    let mut out = ServerExtensions::default();

    for ext in raw {
        if !offered_types.contains(&ext.typ) && is_known(ext.typ) {
            return Err(Error::UnexpectedExtension(ext.typ));
        }
        match ext.typ {
            EXT_MAX_FRAGMENT_LENGTH => {
                let &[code] = ext.data.as_slice() else {
                    return Err(DecodeError::LengthMismatch.into());
                };
                out.max_fragment_length = Some(code);
            }
            EXT_TRUNCATED_HMAC => out.truncated_hmac = true,
            EXT_EC_POINT_FORMATS => {
                let mut c = Cursor::new_be(&ext.data);
                out.ec_point_formats = c.vec_u8(0, 255)?.to_vec();
            }
            EXT_ALPN => {
                let mut c = Cursor::new_be(&ext.data);
                let list = c.vec_u16(0, u16::MAX as usize)?;
                let mut inner = Cursor::new_be(list);
                let proto = inner.vec_u8(1, 255)?;
                out.alpn_protocol =
                    Some(String::from_utf8(proto.to_vec()).map_err(|_| DecodeError::LengthMismatch)?);
            }
            EXT_SESSION_TICKET => out.session_ticket_accepted = true,
            EXT_RENEGOTIATION_INFO => {
                let mut c = Cursor::new_be(&ext.data);
                out.renegotiation_info = Some(c.vec_u8(0, 255)?.to_vec());
            }
            _ => {} // unknown: ignored
        }
    }
    Ok(out)
}

fn is_known(typ: u16) -> bool {
    matches!(
        typ,
        EXT_SERVER_NAME
            | EXT_MAX_FRAGMENT_LENGTH
            | EXT_TRUNCATED_HMAC
            | EXT_SUPPORTED_ELLIPTIC_CURVES
            | EXT_EC_POINT_FORMATS
            | EXT_SIGNATURE_ALGORITHMS
            | EXT_ALPN
            | EXT_SESSION_TICKET
            | EXT_RENEGOTIATION_INFO
    )
}
