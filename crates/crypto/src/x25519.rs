//! X25519 (RFC 7748) Curve25519 Diffie-Hellman, for the ECDHE key-exchange
//! strategies (RFC 4492/8422 curve id `0x001d`).
//!
//! Field arithmetic over GF(2^255-19) follows the classic 16-limb
//! radix-2^16 representation (the same shape as the reference
//! implementations this algorithm is usually ported from), kept to exactly
//! the operations the Montgomery ladder needs.

use tls12::error::Error;
use tls12::provider::KeyExchange;

type Gf = [i64; 16];

const GF0: Gf = [0; 16];
const CONST_121665: Gf = {
    let mut g = [0i64; 16];
    g[0] = 0xDB41;
    g[1] = 1;
    g
};

fn car25519(o: &mut Gf) {
    for i in 0..16 {
        o[i] += 1i64 << 16;
        let c = o[i] >> 16;
        let idx = if i < 15 { i + 1 } else { 0 };
        let factor = if i == 15 { 38 } else { 1 };
        o[idx] += (c - 1) * factor;
        o[i] -= c << 16;
    }
}

fn add(a: &Gf, b: &Gf) -> Gf {
    let mut o = GF0;
    for i in 0..16 {
        o[i] = a[i] + b[i];
    }
    o
}

fn sub(a: &Gf, b: &Gf) -> Gf {
    let mut o = GF0;
    for i in 0..16 {
        o[i] = a[i] - b[i];
    }
    o
}

fn mul(a: &Gf, b: &Gf) -> Gf {
    let mut t = [0i64; 31];
    for i in 0..16 {
        for j in 0..16 {
            t[i + j] += a[i] * b[j];
        }
    }
    for i in 0..15 {
        t[i] += 38 * t[i + 16];
    }
    let mut o = GF0;
    o[..16].copy_from_slice(&t[..16]);
    car25519(&mut o);
    car25519(&mut o);
    o
}

fn sq(a: &Gf) -> Gf {
    mul(a, a)
}

fn inv25519(i: &Gf) -> Gf {
    let mut c = *i;
    for a in (0..=253).rev() {
        c = sq(&c);
        if a != 2 && a != 4 {
            c = mul(&c, i);
        }
    }
    c
}

fn cswap(p: &mut Gf, q: &mut Gf, b: i64) {
    let c = !(b.wrapping_sub(1));
    for i in 0..16 {
        let t = c & (p[i] ^ q[i]);
        p[i] ^= t;
        q[i] ^= t;
    }
}

fn unpack25519(n: &[u8; 32]) -> Gf {
    let mut o = GF0;
    for i in 0..16 {
        o[i] = n[2 * i] as i64 + ((n[2 * i + 1] as i64) << 8);
    }
    o[15] &= 0x7fff;
    o
}

fn pack25519(n: &Gf) -> [u8; 32] {
    let mut t = *n;
    car25519(&mut t);
    car25519(&mut t);
    car25519(&mut t);
    for _ in 0..2 {
        let mut m = GF0;
        m[0] = t[0] - 0xffed;
        for i in 1..15 {
            m[i] = t[i] - 0xffff - ((m[i - 1] >> 16) & 1);
            m[i - 1] &= 0xffff;
        }
        m[15] = t[15] - 0x7fff - ((m[14] >> 16) & 1);
        let b = (m[15] >> 16) & 1;
        m[14] &= 0xffff;
        cswap(&mut t, &mut m, 1 - b);
    }
    let mut o = [0u8; 32];
    for i in 0..16 {
        o[2 * i] = (t[i] & 0xff) as u8;
        o[2 * i + 1] = (t[i] >> 8) as u8;
    }
    o
}

fn clamp(scalar: &[u8; 32]) -> [u8; 32] {
    let mut z = *scalar;
    z[0] &= 248;
    z[31] = (z[31] & 127) | 64;
    z
}

/// The Montgomery ladder (RFC 7748 §5). `point` is the little-endian
/// u-coordinate; returns the little-endian u-coordinate of `scalar * point`.
fn scalarmult(scalar: &[u8; 32], point: &[u8; 32]) -> [u8; 32] {
    let z = clamp(scalar);
    let p_gf = unpack25519(point);

    let mut a = { let mut g = GF0; g[0] = 1; g };
    let mut b = p_gf;
    let mut c = GF0;
    let mut d = { let mut g = GF0; g[0] = 1; g };

    for i in (0..=254).rev() {
        let r = ((z[i >> 3] >> (i & 7)) & 1) as i64;
        cswap(&mut a, &mut b, r);
        cswap(&mut c, &mut d, r);

        let mut e = add(&a, &c);
        a = sub(&a, &c);
        c = add(&b, &d);
        b = sub(&b, &d);
        d = sq(&e);
        let f = sq(&a);
        a = mul(&c, &a);
        c = mul(&b, &e);
        e = add(&a, &c);
        a = sub(&a, &c);
        b = sq(&a);
        c = sub(&d, &f);
        a = mul(&c, &CONST_121665);
        a = add(&a, &d);
        c = mul(&c, &a);
        a = mul(&d, &f);
        d = mul(&b, &p_gf);
        b = sq(&e);

        cswap(&mut a, &mut b, r);
        cswap(&mut c, &mut d, r);
    }

    let inv = inv25519(&c);
    let x = mul(&a, &inv);
    pack25519(&x)
}

fn scalarmult_base(scalar: &[u8; 32]) -> [u8; 32] {
    let mut basepoint = [0u8; 32];
    basepoint[0] = 9;
    scalarmult(scalar, &basepoint)
}

pub struct X25519KeyExchange {
    private: [u8; 32],
    public: [u8; 32],
}

impl X25519KeyExchange {
    pub fn generate(private_bytes: [u8; 32]) -> Self {
        let public = scalarmult_base(&private_bytes);
        Self { private: private_bytes, public }
    }
}

impl KeyExchange for X25519KeyExchange {
    fn public_key(&self) -> Vec<u8> {
        self.public.to_vec()
    }

    fn shared_secret(&self, peer_public: &[u8]) -> Result<Vec<u8>, Error> {
        if peer_public.len() != 32 {
            return Err(Error::BadHandshake("X25519 public value is not 32 bytes"));
        }
        let mut peer = [0u8; 32];
        peer.copy_from_slice(peer_public);
        let shared = scalarmult(&self.private, &peer);
        // RFC 7748 §6.1: reject the all-zero output (a non-contributory
        // low-order point was supplied).
        if shared.iter().all(|&b| b == 0) {
            return Err(Error::BadHandshake("X25519 shared secret is the all-zero output"));
        }
        Ok(shared.to_vec())
    }
}
