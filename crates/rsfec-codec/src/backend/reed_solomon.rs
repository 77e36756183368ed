//! Systematic Reed-Solomon backend over GF(2^8)
//!
//! Codewords are `data || check`. Symbol `j` of an `n`-symbol codeword is the
//! coefficient of `x^(n-1-j)`, so shortened codes (`n < 255`) need no special
//! casing: the missing leading symbols are implicit zeros.
//!
//! The generator polynomial has `check_length` consecutive roots
//! `α^fcr … α^(fcr+check_length-1)`. Decoding runs syndromes,
//! Berlekamp-Massey, Chien search and Forney, then re-checks the syndromes of
//! the repaired word so a miscorrection is reported instead of returned.

use super::galois::{FIELD_ORDER, GaloisField};
use super::{BackendCapabilities, BackendConfig, BackendResult, BlockCodec, CodecError};
use rsfec_common::CodeParameters;

/// Error-correcting Reed-Solomon backend
#[derive(Clone, Debug)]
pub struct ReedSolomonBackend {
    field: GaloisField,
    parameters: CodeParameters,
    first_root_index: usize,
    /// Monic, highest degree first, `check_length + 1` coefficients
    generator: Vec<u8>,
}

impl ReedSolomonBackend {
    /// Create a new backend
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let parameters = config.parameters;
        if parameters.codeword_length() > FIELD_ORDER {
            return Err(CodecError::InvalidConfig(format!(
                "codeword_length {} exceeds field order {FIELD_ORDER}",
                parameters.codeword_length()
            )));
        }
        if parameters.check_length() == 0 || parameters.data_length() == 0 {
            return Err(CodecError::InvalidConfig(format!(
                "unusable geometry {parameters}"
            )));
        }

        let field = GaloisField::new(config.primitive_polynomial)?;
        let first_root_index = config.first_root_index as usize % FIELD_ORDER;

        let mut generator = vec![1u8];
        for i in 0..parameters.check_length() {
            let root = field.alpha_pow(first_root_index + i);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &coef) in generator.iter().enumerate() {
                next[j] ^= coef;
                next[j + 1] ^= field.mul(coef, root);
            }
            generator = next;
        }

        Ok(Self {
            field,
            parameters,
            first_root_index,
            generator,
        })
    }

    /// Generator polynomial, highest degree first
    #[must_use]
    pub fn generator_polynomial(&self) -> &[u8] {
        &self.generator
    }

    /// The underlying field
    #[must_use]
    pub const fn field(&self) -> &GaloisField {
        &self.field
    }

    fn root(&self, i: usize) -> u8 {
        self.field.alpha_pow(self.first_root_index + i)
    }

    fn syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        (0..self.parameters.check_length())
            .map(|i| self.field.eval_high_first(codeword, self.root(i)))
            .collect()
    }

    /// Berlekamp-Massey. Returns the error locator (lowest degree first,
    /// constant term 1) and the linear complexity.
    fn error_locator(&self, syndromes: &[u8]) -> (Vec<u8>, usize) {
        let gf = &self.field;
        let mut locator = vec![1u8];
        let mut prev = vec![1u8];
        let mut complexity = 0usize;
        let mut shift = 1usize;
        let mut last_discrepancy = 1u8;

        for (n, &syndrome) in syndromes.iter().enumerate() {
            let mut discrepancy = syndrome;
            for i in 1..=complexity.min(locator.len() - 1) {
                discrepancy ^= gf.mul(locator[i], syndromes[n - i]);
            }
            if discrepancy == 0 {
                shift += 1;
                continue;
            }

            let coef = gf.div(discrepancy, last_discrepancy);
            let snapshot = (2 * complexity <= n).then(|| locator.clone());
            if locator.len() < prev.len() + shift {
                locator.resize(prev.len() + shift, 0);
            }
            for (i, &p) in prev.iter().enumerate() {
                locator[i + shift] ^= gf.mul(coef, p);
            }

            if let Some(previous) = snapshot {
                complexity = n + 1 - complexity;
                prev = previous;
                last_discrepancy = discrepancy;
                shift = 1;
            } else {
                shift += 1;
            }
        }

        while locator.len() > 1 && locator.last() == Some(&0) {
            locator.pop();
        }
        (locator, complexity)
    }

    /// Chien search over the codeword's own positions
    fn error_positions(&self, locator: &[u8]) -> Vec<usize> {
        let n = self.parameters.codeword_length();
        (0..n)
            .filter(|&j| {
                let power = n - 1 - j;
                let x_inv = self.field.alpha_pow(FIELD_ORDER - power);
                self.field.eval_low_first(locator, x_inv) == 0
            })
            .collect()
    }

    /// Forney. Returns one magnitude per position, or `None` if the
    /// locator is inconsistent with the syndromes.
    fn error_magnitudes(
        &self,
        syndromes: &[u8],
        locator: &[u8],
        positions: &[usize],
    ) -> Option<Vec<u8>> {
        let gf = &self.field;
        let n = self.parameters.codeword_length();
        let m = syndromes.len();

        // Ω(x) = S(x)Λ(x) mod x^m
        let omega: Vec<u8> = (0..m)
            .map(|k| {
                locator
                    .iter()
                    .take(k + 1)
                    .enumerate()
                    .fold(0u8, |acc, (i, &l)| acc ^ gf.mul(l, syndromes[k - i]))
            })
            .collect();

        // Formal derivative: odd-degree terms survive in characteristic 2
        let derivative: Vec<u8> = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &l)| if i % 2 == 1 { l } else { 0 })
            .collect();

        // X^(1 - fcr)
        let scale_exponent = (FIELD_ORDER + 1 - self.first_root_index) % FIELD_ORDER;

        positions
            .iter()
            .map(|&j| {
                let power = n - 1 - j;
                let x_inv = gf.alpha_pow(FIELD_ORDER - power);
                let numerator = gf.eval_low_first(&omega, x_inv);
                let denominator = gf.eval_low_first(&derivative, x_inv);
                if denominator == 0 {
                    return None;
                }
                let scale = gf.alpha_pow(power * scale_exponent);
                let magnitude = gf.mul(scale, gf.div(numerator, denominator));
                (magnitude != 0).then_some(magnitude)
            })
            .collect()
    }
}

impl BlockCodec for ReedSolomonBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "reed_solomon",
            corrects_errors: true,
            max_codeword_length: FIELD_ORDER,
        }
    }

    fn parameters(&self) -> CodeParameters {
        self.parameters
    }

    fn encode(&self, data: &[u8]) -> BackendResult<Vec<u8>> {
        let k = self.parameters.data_length();
        let m = self.parameters.check_length();

        if data.len() != k {
            return Err(CodecError::LengthMismatch {
                expected: k,
                actual: data.len(),
            });
        }

        // Long division of data(x)·x^m by the monic generator
        let mut work = vec![0u8; k + m];
        work[..k].copy_from_slice(data);
        for i in 0..k {
            let coef = work[i];
            if coef != 0 {
                for (j, &g) in self.generator.iter().enumerate().skip(1) {
                    work[i + j] ^= self.field.mul(g, coef);
                }
            }
        }

        Ok(work.split_off(k))
    }

    fn decode(&self, codeword: &mut [u8]) -> BackendResult<Vec<usize>> {
        let n = self.parameters.codeword_length();
        let m = self.parameters.check_length();

        if codeword.len() != n {
            return Err(CodecError::LengthMismatch {
                expected: n,
                actual: codeword.len(),
            });
        }

        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(Vec::new());
        }

        let (locator, errors) = self.error_locator(&syndromes);
        if 2 * errors > m || locator.len() != errors + 1 {
            return Err(CodecError::Uncorrectable(format!(
                "error locator of degree {} exceeds capacity {}",
                locator.len() - 1,
                m / 2
            )));
        }

        let positions = self.error_positions(&locator);
        if positions.len() != errors {
            return Err(CodecError::Uncorrectable(format!(
                "found {} error positions for {errors} errors",
                positions.len()
            )));
        }

        let magnitudes = self
            .error_magnitudes(&syndromes, &locator, &positions)
            .ok_or_else(|| CodecError::Uncorrectable("inconsistent error values".into()))?;

        let mut repaired = codeword.to_vec();
        for (&j, &magnitude) in positions.iter().zip(&magnitudes) {
            repaired[j] ^= magnitude;
        }
        if self.syndromes(&repaired).iter().any(|&s| s != 0) {
            return Err(CodecError::Uncorrectable(
                "repaired word is not a codeword".into(),
            ));
        }

        codeword.copy_from_slice(&repaired);
        Ok(positions)
    }
}
