//! Minimal big-endian-byte-string modular arithmetic for DHE and RSA.
//!
//! This is not a general-purpose bignum library: it implements exactly the
//! one operation both DHE key exchange (RFC 5246 §7.4.3) and RSA PKCS#1 v1.5
//! (RFC 8017 §5) actually need, modular exponentiation, using a fixed base
//! of `u32` limbs, little-endian limb order internally.

use std::cmp::Ordering;

/// An arbitrary-precision non-negative integer, little-endian `u32` limbs,
/// no leading (high) zero limbs except for the value zero itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BigUint {
    limbs: Vec<u32>,
}

impl BigUint {
    pub fn zero() -> Self {
        Self { limbs: vec![0] }
    }

    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let mut limbs = vec![0u32; bytes.len().div_ceil(4)];
        for (i, &b) in bytes.iter().rev().enumerate() {
            limbs[i / 4] |= (b as u32) << ((i % 4) * 8);
        }
        let mut v = Self { limbs };
        v.trim();
        v
    }

    /// Big-endian encoding, left-padded with zeros to at least `min_len`
    /// bytes (and no shorter than the value's own minimal encoding).
    pub fn to_be_bytes(&self, min_len: usize) -> Vec<u8> {
        let mut minimal = Vec::with_capacity(self.limbs.len() * 4);
        for limb in self.limbs.iter().rev() {
            minimal.extend_from_slice(&limb.to_be_bytes());
        }
        let first_nonzero = minimal.iter().position(|&b| b != 0);
        let minimal = match first_nonzero {
            Some(i) => minimal[i..].to_vec(),
            None => vec![0u8],
        };
        if minimal.len() >= min_len {
            minimal
        } else {
            let mut out = vec![0u8; min_len - minimal.len()];
            out.extend_from_slice(&minimal);
            out
        }
    }

    fn trim(&mut self) {
        while self.limbs.len() > 1 && *self.limbs.last().unwrap() == 0 {
            self.limbs.pop();
        }
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&l| l == 0)
    }

    fn cmp_mag(&self, other: &Self) -> Ordering {
        if self.limbs.len() != other.limbs.len() {
            return self.limbs.len().cmp(&other.limbs.len());
        }
        for i in (0..self.limbs.len()).rev() {
            if self.limbs[i] != other.limbs[i] {
                return self.limbs[i].cmp(&other.limbs[i]);
            }
        }
        Ordering::Equal
    }

    fn sub(&self, other: &Self) -> Self {
        let mut result = vec![0u32; self.limbs.len()];
        let mut borrow: i64 = 0;
        for i in 0..self.limbs.len() {
            let a = self.limbs[i] as i64;
            let b = *other.limbs.get(i).unwrap_or(&0) as i64;
            let mut diff = a - b - borrow;
            if diff < 0 {
                diff += 1 << 32;
                borrow = 1;
            } else {
                borrow = 0;
            }
            result[i] = diff as u32;
        }
        let mut v = Self { limbs: result };
        v.trim();
        v
    }

    fn mul(&self, other: &Self) -> Self {
        let mut result = vec![0u64; self.limbs.len() + other.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let mut carry = 0u64;
            for (j, &b) in other.limbs.iter().enumerate() {
                let prod = a as u64 * b as u64 + result[i + j] + carry;
                result[i + j] = prod & 0xFFFF_FFFF;
                carry = prod >> 32;
            }
            let mut k = i + other.limbs.len();
            while carry > 0 {
                let sum = result[k] + carry;
                result[k] = sum & 0xFFFF_FFFF;
                carry = sum >> 32;
                k += 1;
            }
        }
        let mut v = Self { limbs: result.into_iter().map(|x| x as u32).collect() };
        v.trim();
        v
    }

    /// Shift left by one bit.
    fn shl1(&self) -> Self {
        let mut result = vec![0u32; self.limbs.len() + 1];
        let mut carry = 0u32;
        for (i, &limb) in self.limbs.iter().enumerate() {
            result[i] = (limb << 1) | carry;
            carry = limb >> 31;
        }
        result[self.limbs.len()] = carry;
        let mut v = Self { limbs: result };
        v.trim();
        v
    }

    fn bit_len(&self) -> usize {
        if self.is_zero() {
            return 0;
        }
        let top = *self.limbs.last().unwrap();
        self.limbs.len() * 32 - top.leading_zeros() as usize
    }

    fn bit(&self, i: usize) -> bool {
        let limb = i / 32;
        let bit = i % 32;
        limb < self.limbs.len() && (self.limbs[limb] >> bit) & 1 == 1
    }

    /// Long division remainder via repeated shift-and-subtract. Adequate for
    /// the occasional DH/RSA modexp this client performs per handshake; not
    /// tuned for high-throughput use.
    fn rem(&self, modulus: &Self) -> Self {
        if modulus.is_zero() {
            return self.clone();
        }
        let mut remainder = BigUint::zero();
        for i in (0..self.bit_len()).rev() {
            remainder = remainder.shl1();
            if self.bit(i) {
                remainder.limbs[0] |= 1;
            }
            if remainder.cmp_mag(modulus) != Ordering::Less {
                remainder = remainder.sub(modulus);
            }
        }
        remainder
    }

    /// `self^exp mod modulus`, square-and-multiply, most-significant-bit first.
    pub fn mod_pow(&self, exp: &Self, modulus: &Self) -> Self {
        if modulus.is_zero() || (modulus.limbs.len() == 1 && modulus.limbs[0] == 1) {
            return BigUint::zero();
        }
        let mut result = BigUint { limbs: vec![1] };
        let base = self.rem(modulus);
        for i in (0..exp.bit_len()).rev() {
            result = result.mul(&result).rem(modulus);
            if exp.bit(i) {
                result = result.mul(&base).rem(modulus);
            }
        }
        result
    }
}
