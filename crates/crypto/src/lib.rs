/// Cryptographic primitives backing the `tls12-refcrypto` reference
/// `CryptoProvider`/`CertificateStore` implementation.
///
/// All implementations are from scratch with zero external cryptography
/// dependencies — only `rand` (entropy) and the workspace's `tls12`
/// (the collaborator traits being implemented) are pulled in.
///
/// # Modules
///
/// - [`sha256`] / [`sha384`] — SHA-256/384 hash functions (FIPS 180-4)
/// - [`hmac`] — generic HMAC (RFC 2104) over either hash
/// - [`prf`] — the TLS 1.2 PRF / P_hash construction (RFC 5246 §5)
/// - [`bignum`] — minimal big-endian modexp for DH and RSA
/// - [`rsa`] — RSA PKCS#1 v1.5 encrypt/sign/verify (RFC 8017)
/// - [`dh`] — finite-field Diffie-Hellman key exchange
/// - [`x25519`] — Curve25519 Diffie-Hellman (RFC 7748) for ECDHE
/// - [`x509`] — DER/X.509 certificate parsing and SPKI extraction
/// - [`aes`] / [`gcm`] — AES and AES-GCM (FIPS 197 / SP 800-38D)
/// - [`rng`] — `RngSource` backed by the `rand` crate
/// - [`constant_time`] — constant-time comparison utilities
/// - [`provider_impl`] — wires the above into `tls12`'s collaborator traits
pub mod sha256;
pub mod sha384;
pub mod hmac;
pub mod prf;
pub mod bignum;
pub mod rsa;
pub mod dh;
pub mod x25519;
pub mod x509;
pub mod aes;
pub mod gcm;
pub mod rng;
pub mod constant_time;
pub mod provider_impl;

pub use aes::{AesKeySchedule, aes_decrypt_block, aes_encrypt_block};
pub use constant_time::ct_eq;
pub use gcm::AesGcm;
pub use hmac::{HmacSha256, HmacSha384, hmac_sha256, hmac_sha384};
pub use provider_impl::{RefCertificateStore, RefCryptoProvider};
pub use rng::OsRng;
pub use sha256::{Sha256, sha256};
pub use sha384::{Sha384, sha384};
