//! Numeric hashing, ported from the teacher's `rustpython-common::hash`
//! but trimmed to what the CORE's `hash` slot needs: `int`, `float` and
//! `str`. No `HashSecret`/`siphash` randomization — a single interpreter
//! process has no adversary to defend against, so a fixed seed is used.

use malachite_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use std::hash::{Hash, Hasher};

pub type PyHash = i64;

/// Numeric hashes are reduced modulo the Mersenne prime `2**61 - 1`,
/// exactly as CPython's `pyhash.c` does.
pub const BITS: u32 = 61;
pub const MODULUS: u64 = (1u64 << BITS) - 1;
pub const INF: PyHash = 314_159;
pub const NAN: PyHash = 0;

/// CPython reserves `-1` to signal "hash failed"; any hash function that
/// would produce it is nudged to `-2`.
pub fn fix_sentinel(x: PyHash) -> PyHash {
    if x == -1 { -2 } else { x }
}

/// Hash an arbitrary-precision integer the way CPython's `long_hash` does:
/// reduce the magnitude modulo `2**61-1`, then restore the sign.
pub fn hash_bigint(value: &BigInt) -> PyHash {
    if value.is_zero() {
        return 0;
    }
    let modulus = BigInt::from(MODULUS);
    let rem = value.abs().mod_floor(&modulus);
    let mut h = rem.to_i64().unwrap_or(0);
    if value.is_negative() {
        h = -h;
    }
    fix_sentinel(h)
}

/// `frexp`: decompose `x` into `m * 2**e` with `m` in `[0.5, 1.0)`.
/// `std` does not expose this, so it is ported from its libm definition.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || x.is_nan() || x.is_infinite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let sign = bits & 0x8000_0000_0000_0000;
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    if exponent == 0 {
        // subnormal: normalize by hand
        let mut m = x.abs();
        let mut e = 0i32;
        while m < 0.5 {
            m *= 2.0;
            e -= 1;
        }
        return (if sign != 0 { -m } else { m }, e);
    }
    let e = exponent - 1022;
    let m = f64::from_bits(sign | (1022u64 << 52) | mantissa);
    (m, e)
}

/// Hash a float the way CPython's `_Py_HashDouble` does, so that a float
/// equal to an integer (`3.0 == 3`) hashes the same as that integer.
pub fn hash_f64(v: f64) -> PyHash {
    if v.is_nan() {
        return NAN;
    }
    if v.is_infinite() {
        return if v > 0.0 { INF } else { -INF };
    }
    let (mut m, mut e) = frexp(v);
    let sign: i64 = if m < 0.0 {
        m = -m;
        -1
    } else {
        1
    };
    let mut x: u64 = 0;
    while m != 0.0 {
        x = ((x << 28) & MODULUS) | (x >> (BITS - 28));
        m *= 268_435_456.0; // 2**28
        e -= 28;
        let y = m as u64;
        m -= y as f64;
        x += y;
        if x >= MODULUS {
            x -= MODULUS;
        }
    }
    let e = if e >= 0 {
        e.rem_euclid(BITS as i32)
    } else {
        BITS as i32 - 1 - (-1 - e).rem_euclid(BITS as i32)
    };
    let x = ((x << e) & MODULUS) | (x >> (BITS as i32 - e) as u32);
    fix_sentinel((x as i64) * sign)
}

/// Hash a string with a process-fixed seed. Equal strings always hash
/// equal; no cross-process stability is promised or needed.
pub fn hash_str(s: &str) -> PyHash {
    if s.is_empty() {
        return 0;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    0xf00d_babe_u64.hash(&mut hasher);
    s.hash(&mut hasher);
    fix_sentinel(hasher.finish() as i64)
}

/// Hash a byte string the same way as `hash_str`, minus the UTF-8 framing.
pub fn hash_bytes(b: &[u8]) -> PyHash {
    if b.is_empty() {
        return 0;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    0xf00d_babe_u64.hash(&mut hasher);
    b.hash(&mut hasher);
    fix_sentinel(hasher.finish() as i64)
}

/// Combine hashes of sequence elements, order-sensitive, the way `tuple`
/// hashing requires.
pub fn hash_iter<E>(
    items: impl Iterator<Item = Result<PyHash, E>>,
) -> Result<PyHash, E> {
    // xxprime-derived mixing, the shape CPython's tuplehash uses since 3.8.
    const XXPRIME_1: u64 = 11_400_714_785_074_694_791;
    const XXPRIME_2: u64 = 14_029_467_366_897_019_727;
    const XXPRIME_5: u64 = 2_870_177_450_012_600_261;
    let mut acc: u64 = XXPRIME_5;
    for item in items {
        let lane = item? as u64;
        acc = acc.wrapping_add(lane.wrapping_mul(XXPRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(XXPRIME_1);
    }
    Ok(fix_sentinel(acc as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_agree_when_integral() {
        let n = BigInt::from(3);
        assert_eq!(hash_bigint(&n), hash_f64(3.0));
    }

    #[test]
    fn negative_int_and_float_agree() {
        let n = BigInt::from(-7);
        assert_eq!(hash_bigint(&n), hash_f64(-7.0));
    }

    #[test]
    fn never_returns_reserved_sentinel() {
        // -1 is CPython's "error" sentinel; no successful hash may equal it.
        for v in [-1i64, 0, 1, 42, i64::MIN, i64::MAX] {
            assert_ne!(hash_bigint(&BigInt::from(v)), -1);
        }
    }

    #[test]
    fn nan_and_inf_have_fixed_hashes() {
        assert_eq!(hash_f64(f64::NAN), NAN);
        assert_eq!(hash_f64(f64::INFINITY), INF);
        assert_eq!(hash_f64(f64::NEG_INFINITY), -INF);
    }
}
