//! X.509 certificate parsing (RFC 5280, subset) for TLS 1.2 server and
//! client-certificate chains.
//!
//! A minimal ASN.1 DER reader plus enough certificate structure to check a
//! hostname, walk a chain's issuer/subject links, and pull the key fields
//! (RSA modulus/exponent) out of a leaf's SubjectPublicKeyInfo for
//! `rsa_encrypt`/`verify_signature`. No external crate dependencies — this
//! is the one place in `tls12-refcrypto` where hand-rolling beats pulling in
//! a DER library, since the the subset of ASN.1 this client needs is small
//! and fixed.

use crate::bignum::BigUint;

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_UTF8_STRING: u8 = 0x0C;
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
pub const TAG_IA5_STRING: u8 = 0x16;
pub const TAG_UTC_TIME: u8 = 0x17;
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

pub const TAG_CTX_0: u8 = 0xA0;
pub const TAG_CTX_3: u8 = 0xA3;

/// A zero-copy ASN.1 DER reader.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

/// A parsed DER TLV (tag-length-value).
#[derive(Debug, Clone)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
    pub header_start: usize,
    pub total_len: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, &'static str> {
        if self.pos >= self.data.len() {
            return Err("unexpected end of DER data");
        }
        let header_start = self.pos;
        let tag = self.data[self.pos];
        self.pos += 1;

        let length = self.read_length()?;
        if self.pos + length > self.data.len() {
            return Err("DER value extends past end of data");
        }
        let value = &self.data[self.pos..self.pos + length];
        self.pos += length;

        Ok(Tlv { tag, value, header_start, total_len: self.pos - header_start })
    }

    pub fn peek_tag(&self) -> Option<u8> {
        if self.pos < self.data.len() {
            Some(self.data[self.pos])
        } else {
            None
        }
    }

    fn read_length(&mut self) -> Result<usize, &'static str> {
        if self.pos >= self.data.len() {
            return Err("unexpected end reading DER length");
        }
        let first = self.data[self.pos];
        self.pos += 1;

        if first < 0x80 {
            return Ok(first as usize);
        }
        if first == 0x80 {
            return Err("indefinite length not supported");
        }
        let num_bytes = (first & 0x7F) as usize;
        if num_bytes > 4 {
            return Err("DER length too large");
        }
        if self.pos + num_bytes > self.data.len() {
            return Err("unexpected end reading DER length bytes");
        }
        let mut length: usize = 0;
        for i in 0..num_bytes {
            length = (length << 8) | (self.data[self.pos + i] as usize);
        }
        self.pos += num_bytes;
        Ok(length)
    }
}

/// Decode an OID from DER bytes into a dotted-decimal string.
pub fn decode_oid(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let mut parts = Vec::new();
    let first = bytes[0];
    parts.push((first / 40) as u32);
    parts.push((first % 40) as u32);

    let mut accum: u32 = 0;
    for &b in &bytes[1..] {
        accum = (accum << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            parts.push(accum);
            accum = 0;
        }
    }
    parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".")
}

pub const OID_COMMON_NAME: &str = "2.5.4.3";
pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

/// A parsed X.509 certificate (the subset of fields TLS 1.2 chain validation needs).
#[derive(Debug, Clone)]
pub struct X509Certificate {
    pub tbs_der: Vec<u8>,
    pub issuer: String,
    pub subject: String,
    /// Raw DER of the whole `SubjectPublicKeyInfo` structure.
    pub spki: Vec<u8>,
    pub san_dns: Vec<String>,
    pub not_before: String,
    pub not_after: String,
    pub is_ca: bool,
    pub signature_algorithm: String,
    pub signature: Vec<u8>,
}

/// Parse a single DER-encoded X.509 certificate.
pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate, &'static str> {
    let mut reader = DerReader::new(der);

    let cert_seq = reader.read_tlv()?;
    if cert_seq.tag != TAG_SEQUENCE {
        return Err("certificate is not a SEQUENCE");
    }
    let mut inner = DerReader::new(cert_seq.value);

    let tbs_tlv = inner.read_tlv()?;
    if tbs_tlv.tag != TAG_SEQUENCE {
        return Err("TBSCertificate is not a SEQUENCE");
    }
    let tbs_der = cert_seq.value[0..tbs_tlv.total_len].to_vec();

    let mut tbs = DerReader::new(tbs_tlv.value);

    if tbs.peek_tag() == Some(TAG_CTX_0) {
        let _version = tbs.read_tlv()?;
    }
    let _serial = tbs.read_tlv()?;
    let _sig_alg = tbs.read_tlv()?;

    let issuer_tlv = tbs.read_tlv()?;
    let issuer = extract_common_name(issuer_tlv.value).unwrap_or_default();

    let validity_tlv = tbs.read_tlv()?;
    let (not_before, not_after) = parse_validity(validity_tlv.value)?;

    let subject_tlv = tbs.read_tlv()?;
    let subject = extract_common_name(subject_tlv.value).unwrap_or_default();

    let spki_tlv = tbs.read_tlv()?;
    let spki = tbs_tlv.value[spki_tlv.header_start..spki_tlv.header_start + spki_tlv.total_len].to_vec();

    let mut san_dns = Vec::new();
    let mut is_ca = false;

    while !tbs.is_empty() {
        let ext_container = tbs.read_tlv()?;
        if ext_container.tag == TAG_CTX_3 {
            let mut ext_seq_reader = DerReader::new(ext_container.value);
            if let Ok(ext_seq) = ext_seq_reader.read_tlv() {
                if ext_seq.tag == TAG_SEQUENCE {
                    let mut exts = DerReader::new(ext_seq.value);
                    while !exts.is_empty() {
                        if let Ok(ext) = exts.read_tlv() {
                            parse_extension(ext.value, &mut san_dns, &mut is_ca);
                        }
                    }
                }
            }
        }
    }

    let sig_alg_tlv = inner.read_tlv()?;
    let signature_algorithm = extract_algorithm_oid(sig_alg_tlv.value).unwrap_or_default();

    let sig_tlv = inner.read_tlv()?;
    let signature = if sig_tlv.tag == TAG_BIT_STRING && !sig_tlv.value.is_empty() {
        sig_tlv.value[1..].to_vec()
    } else {
        sig_tlv.value.to_vec()
    };

    Ok(X509Certificate {
        tbs_der,
        issuer,
        subject,
        spki,
        san_dns,
        not_before,
        not_after,
        is_ca,
        signature_algorithm,
        signature,
    })
}

fn extract_common_name(name_bytes: &[u8]) -> Option<String> {
    let mut reader = DerReader::new(name_bytes);
    while !reader.is_empty() {
        if let Ok(set_tlv) = reader.read_tlv() {
            if set_tlv.tag == TAG_SET {
                let mut set_reader = DerReader::new(set_tlv.value);
                while !set_reader.is_empty() {
                    if let Ok(atv_tlv) = set_reader.read_tlv() {
                        if atv_tlv.tag == TAG_SEQUENCE {
                            let mut atv = DerReader::new(atv_tlv.value);
                            if let Ok(oid_tlv) = atv.read_tlv() {
                                let oid = decode_oid(oid_tlv.value);
                                if oid == OID_COMMON_NAME {
                                    if let Ok(val_tlv) = atv.read_tlv() {
                                        return std::str::from_utf8(val_tlv.value).ok().map(|s| s.to_string());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    None
}

fn parse_validity(data: &[u8]) -> Result<(String, String), &'static str> {
    let mut reader = DerReader::new(data);
    let not_before_tlv = reader.read_tlv()?;
    let not_after_tlv = reader.read_tlv()?;
    let not_before = std::str::from_utf8(not_before_tlv.value).map_err(|_| "invalid not_before time")?.to_string();
    let not_after = std::str::from_utf8(not_after_tlv.value).map_err(|_| "invalid not_after time")?.to_string();
    Ok((not_before, not_after))
}

fn extract_algorithm_oid(data: &[u8]) -> Option<String> {
    let mut reader = DerReader::new(data);
    if let Ok(oid_tlv) = reader.read_tlv() {
        if oid_tlv.tag == TAG_OID {
            return Some(decode_oid(oid_tlv.value));
        }
    }
    None
}

fn parse_extension(ext_data: &[u8], san_dns: &mut Vec<String>, is_ca: &mut bool) {
    let mut reader = DerReader::new(ext_data);
    let oid_tlv = match reader.read_tlv() {
        Ok(t) => t,
        Err(_) => return,
    };
    if oid_tlv.tag != TAG_OID {
        return;
    }
    let oid = decode_oid(oid_tlv.value);

    if reader.peek_tag() == Some(TAG_BOOLEAN) {
        let _ = reader.read_tlv();
    }

    let value_tlv = match reader.read_tlv() {
        Ok(t) => t,
        Err(_) => return,
    };
    if value_tlv.tag != TAG_OCTET_STRING {
        return;
    }

    if oid == OID_SUBJECT_ALT_NAME {
        parse_san(value_tlv.value, san_dns);
    } else if oid == OID_BASIC_CONSTRAINTS {
        parse_basic_constraints(value_tlv.value, is_ca);
    }
}

fn parse_san(data: &[u8], san_dns: &mut Vec<String>) {
    let mut reader = DerReader::new(data);
    if let Ok(seq_tlv) = reader.read_tlv() {
        if seq_tlv.tag == TAG_SEQUENCE {
            let mut names = DerReader::new(seq_tlv.value);
            while !names.is_empty() {
                if let Ok(name_tlv) = names.read_tlv() {
                    if name_tlv.tag == 0x82 {
                        if let Ok(s) = std::str::from_utf8(name_tlv.value) {
                            san_dns.push(s.to_string());
                        }
                    }
                }
            }
        }
    }
}

fn parse_basic_constraints(data: &[u8], is_ca: &mut bool) {
    let mut reader = DerReader::new(data);
    if let Ok(seq_tlv) = reader.read_tlv() {
        if seq_tlv.tag == TAG_SEQUENCE && !seq_tlv.value.is_empty() {
            let mut inner = DerReader::new(seq_tlv.value);
            if let Ok(bool_tlv) = inner.read_tlv() {
                if bool_tlv.tag == TAG_BOOLEAN && !bool_tlv.value.is_empty() {
                    *is_ca = bool_tlv.value[0] != 0;
                }
            }
        }
    }
}

/// A parsed RSA `SubjectPublicKeyInfo`: `n` (modulus) and `e` (exponent).
pub struct RsaPublicKey {
    pub exponent: BigUint,
    pub modulus: BigUint,
    modulus_byte_len: usize,
}

impl RsaPublicKey {
    pub fn new(exponent: BigUint, modulus: BigUint, modulus_byte_len: usize) -> Self {
        Self { exponent, modulus, modulus_byte_len }
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus_byte_len
    }
}

/// Extract the RSA modulus/exponent from a `SubjectPublicKeyInfo` whose
/// algorithm is `rsaEncryption` (RFC 8017 Appendix A.1.1).
pub fn parse_rsa_spki(spki_der: &[u8]) -> Result<RsaPublicKey, &'static str> {
    let mut reader = DerReader::new(spki_der);
    let spki_seq = reader.read_tlv()?;
    if spki_seq.tag != TAG_SEQUENCE {
        return Err("SubjectPublicKeyInfo is not a SEQUENCE");
    }
    let mut inner = DerReader::new(spki_seq.value);

    let alg_id = inner.read_tlv()?;
    let mut alg_reader = DerReader::new(alg_id.value);
    let oid_tlv = alg_reader.read_tlv()?;
    if oid_tlv.tag != TAG_OID || decode_oid(oid_tlv.value) != OID_RSA_ENCRYPTION {
        return Err("SubjectPublicKeyInfo algorithm is not rsaEncryption");
    }

    let bit_string = inner.read_tlv()?;
    if bit_string.tag != TAG_BIT_STRING || bit_string.value.is_empty() {
        return Err("malformed RSA public key BIT STRING");
    }
    let key_bytes = &bit_string.value[1..]; // skip "unused bits" byte

    let mut key_reader = DerReader::new(key_bytes);
    let key_seq = key_reader.read_tlv()?;
    if key_seq.tag != TAG_SEQUENCE {
        return Err("RSAPublicKey is not a SEQUENCE");
    }
    let mut fields = DerReader::new(key_seq.value);
    let modulus_tlv = fields.read_tlv()?;
    let exponent_tlv = fields.read_tlv()?;
    if modulus_tlv.tag != TAG_INTEGER || exponent_tlv.tag != TAG_INTEGER {
        return Err("RSAPublicKey fields are not INTEGERs");
    }

    let modulus_bytes = strip_der_integer_sign_byte(modulus_tlv.value);
    let modulus_byte_len = modulus_bytes.len();
    let modulus = BigUint::from_be_bytes(modulus_bytes);
    let exponent = BigUint::from_be_bytes(strip_der_integer_sign_byte(exponent_tlv.value));

    Ok(RsaPublicKey::new(exponent, modulus, modulus_byte_len))
}

/// DER INTEGER encodes a leading `0x00` when the high bit of the first
/// "real" byte would otherwise be read as a sign bit. Strip it before
/// treating the value as an unsigned magnitude.
fn strip_der_integer_sign_byte(bytes: &[u8]) -> &[u8] {
    if bytes.len() > 1 && bytes[0] == 0x00 && bytes[1] & 0x80 != 0 {
        &bytes[1..]
    } else {
        bytes
    }
}

/// Extract the uncompressed EC point from a `SubjectPublicKeyInfo` whose
/// algorithm is `id-ecPublicKey` (RFC 5480 §2.2). Only used for the SPKI
/// consistency check on static-ECDH suites; this client does not implement
/// the elliptic-curve point arithmetic needed to actually use the key.
pub fn parse_ec_spki_point(spki_der: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut reader = DerReader::new(spki_der);
    let spki_seq = reader.read_tlv()?;
    if spki_seq.tag != TAG_SEQUENCE {
        return Err("SubjectPublicKeyInfo is not a SEQUENCE");
    }
    let mut inner = DerReader::new(spki_seq.value);
    let alg_id = inner.read_tlv()?;
    let mut alg_reader = DerReader::new(alg_id.value);
    let oid_tlv = alg_reader.read_tlv()?;
    if oid_tlv.tag != TAG_OID || decode_oid(oid_tlv.value) != OID_EC_PUBLIC_KEY {
        return Err("SubjectPublicKeyInfo algorithm is not id-ecPublicKey");
    }
    let bit_string = inner.read_tlv()?;
    if bit_string.tag != TAG_BIT_STRING || bit_string.value.is_empty() {
        return Err("malformed EC public key BIT STRING");
    }
    Ok(bit_string.value[1..].to_vec())
}

/// Structural chain validation: hostname match on the leaf, then
/// issuer/subject linkage down the chain. Does not verify any cryptographic
/// signature between links — that is `verify_signature`'s job, called
/// separately per link by the embedding `CertificateStore`.
pub fn verify_chain_structure(chain: &[X509Certificate], hostname: &str) -> Result<(), String> {
    if chain.is_empty() {
        return Err("empty certificate chain".to_string());
    }
    let leaf = &chain[0];
    if !verify_hostname(leaf, hostname) {
        return Err(format!(
            "hostname '{hostname}' does not match certificate (subject='{}', SANs={:?})",
            leaf.subject, leaf.san_dns
        ));
    }
    for i in 0..chain.len().saturating_sub(1) {
        if chain[i].issuer != chain[i + 1].subject {
            return Err(format!(
                "chain link {i}: issuer '{}' does not match next subject '{}'",
                chain[i].issuer, chain[i + 1].subject
            ));
        }
    }
    Ok(())
}

/// Check if a certificate matches the given hostname: SAN dNSName entries
/// first, falling back to the subject CN. Supports a leftmost-label wildcard
/// (`*.example.com`).
pub fn verify_hostname(cert: &X509Certificate, hostname: &str) -> bool {
    let hostname_lower = hostname.to_ascii_lowercase();
    if !cert.san_dns.is_empty() {
        return cert.san_dns.iter().any(|san| matches_hostname(&san.to_ascii_lowercase(), &hostname_lower));
    }
    matches_hostname(&cert.subject.to_ascii_lowercase(), &hostname_lower)
}

fn matches_hostname(pattern: &str, hostname: &str) -> bool {
    if pattern == hostname {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        if let Some(rest) = hostname.strip_suffix(suffix) {
            if rest.ends_with('.') && !rest[..rest.len() - 1].contains('.') {
                return true;
            }
        }
    }
    false
}
