//! GF(2^8) arithmetic
//!
//! Log/antilog tables are built once per field from its primitive
//! polynomial. Every nonzero element is a power of the generator `α = x`.

use super::{BackendResult, CodecError};

/// x^8 + x^7 + x^2 + x + 1
pub const DEFAULT_PRIMITIVE_POLYNOMIAL: u16 = 0x187;

/// Order of the multiplicative group
pub const FIELD_ORDER: usize = 255;

/// GF(2^8) defined by a primitive polynomial
#[derive(Clone)]
pub struct GaloisField {
    polynomial: u16,
    // Doubled so `exp[log a + log b]` never needs a modulo
    exp: [u8; FIELD_ORDER * 2],
    log: [u8; 256],
}

impl GaloisField {
    /// Build the field tables
    ///
    /// Fails if `polynomial` is not a primitive degree-8 polynomial, i.e. if
    /// powers of `x` do not cycle through all 255 nonzero elements.
    pub fn new(polynomial: u16) -> BackendResult<Self> {
        if polynomial & !0x1FF != 0 || polynomial & 0x100 == 0 {
            return Err(CodecError::InvalidConfig(format!(
                "{polynomial:#x} is not a degree-8 polynomial"
            )));
        }

        let mut exp = [0u8; FIELD_ORDER * 2];
        let mut log = [0u8; 256];
        let mut seen = [false; 256];
        let mut x: u16 = 1;

        for (power, slot) in exp.iter_mut().take(FIELD_ORDER).enumerate() {
            if seen[x as usize] {
                return Err(CodecError::InvalidConfig(format!(
                    "{polynomial:#x} is not primitive (cycle length {power})"
                )));
            }
            seen[x as usize] = true;
            *slot = x as u8;
            log[x as usize] = power as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= polynomial;
            }
        }
        if x != 1 {
            return Err(CodecError::InvalidConfig(format!(
                "{polynomial:#x} is not primitive"
            )));
        }
        exp.copy_within(0..FIELD_ORDER, FIELD_ORDER);

        Ok(Self {
            polynomial,
            exp,
            log,
        })
    }

    /// The field's primitive polynomial
    #[must_use]
    pub const fn polynomial(&self) -> u16 {
        self.polynomial
    }

    /// α^power, for any power (reduced mod 255)
    #[inline]
    #[must_use]
    pub fn alpha_pow(&self, power: usize) -> u8 {
        self.exp[power % FIELD_ORDER]
    }

    /// Discrete log of a nonzero element
    ///
    /// # Panics
    /// Panics in debug builds if `a` is zero.
    #[inline]
    #[must_use]
    pub fn log(&self, a: u8) -> usize {
        debug_assert!(a != 0, "log of zero");
        self.log[a as usize] as usize
    }

    #[inline]
    #[must_use]
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// `a / b`; `b` must be nonzero
    #[inline]
    #[must_use]
    pub fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "division by zero");
        if a == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + FIELD_ORDER - self.log[b as usize] as usize]
    }

    /// Multiplicative inverse of a nonzero element
    #[inline]
    #[must_use]
    pub fn inv(&self, a: u8) -> u8 {
        self.div(1, a)
    }

    /// Evaluate a polynomial stored highest degree first
    #[must_use]
    pub fn eval_high_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }

    /// Evaluate a polynomial stored lowest degree first
    #[must_use]
    pub fn eval_low_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GaloisField({:#x})", self.polynomial)
    }
}
