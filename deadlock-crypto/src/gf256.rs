//! Arithmetic over GF(2^8) with the AES reduction polynomial `x^8 + x^4 + x^3 + x + 1` (0x11B).
//!
//! Elements are plain bytes. Addition is XOR; multiplication is carry-less
//! with reduction. Every multiply runs exactly eight rounds regardless of its
//! operands.

use crate::error::{CryptoError, CryptoResult};

/// Low byte of the reduction polynomial (the `x^8` term is implied).
const REDUCTION: u8 = 0x1B;

/// Order of the multiplicative group; `a^(ORDER - 1) == a^-1` for nonzero `a`.
const GROUP_ORDER: u32 = 255;

/// Field addition (and subtraction).
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication (Russian-peasant, reduced by 0x11B).
pub fn mul(a: u8, b: u8) -> u8 {
    let mut a = a;
    let mut b = b;
    let mut product = 0u8;

    for _ in 0..8 {
        // Masks instead of branches on operand bits.
        product ^= a & 0u8.wrapping_sub(b & 1);
        let carry = a >> 7;
        a <<= 1;
        a ^= REDUCTION & 0u8.wrapping_sub(carry);
        b >>= 1;
    }

    product
}

/// Raises `base` to `exp` by square-and-multiply.
pub fn pow(base: u8, exp: u32) -> u8 {
    let mut result = 1u8;
    let mut square = base;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            result = mul(result, square);
        }
        square = mul(square, square);
        exp >>= 1;
    }

    result
}

/// Multiplicative inverse. Zero has none.
pub fn inv(a: u8) -> CryptoResult<u8> {
    if a == 0 {
        return Err(CryptoError::Domain(
            "zero has no multiplicative inverse".to_string(),
        ));
    }
    Ok(pow(a, GROUP_ORDER - 1))
}

/// Field division, `a / b`.
pub fn div(a: u8, b: u8) -> CryptoResult<u8> {
    Ok(mul(a, inv(b)?))
}
