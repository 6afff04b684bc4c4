//! Randomized verification of bounded-degree polynomial sequences.

use ark_ff::{One, Zero};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;

use super::curve::{ct_eq, marshal_g2, random_scalar, Fr, G2};
use super::VerificationKey;

/// Verifies whether a sequence of verification keys is a polynomial
/// sequence of bounded degree.
///
/// The verifier carries a random vector from the kernel of the evaluation
/// map for polynomials of degree at most `f`: the scalar product of the
/// vector with `[g2*p(1), ..., g2*p(n)]` vanishes deterministically when
/// `deg p <= f`, and only with negligible probability otherwise.
#[derive(Clone, Debug)]
pub struct PolyVerifier {
    vector: Vec<Fr>,
}

impl PolyVerifier {
    /// Returns a verifier of polynomial sequences of degree at most `f`
    /// and length `n`. Assumes `0 <= f <= n-1`.
    ///
    /// The vector is a random combination of the last `n-f-1` rows of the
    /// inverse of the Vandermonde matrix V(1,2,...,n). The inverse is
    /// computed through Newton symbols and elementary symmetric polynomials;
    /// all steps are ring operations, so the whole computation happens
    /// directly in the scalar field.
    pub fn new<R: RngCore + CryptoRng>(n: usize, f: usize, rng: &mut R) -> Self {
        // newton[i][j] is the Newton symbol (i choose j).
        let mut newton: Vec<Vec<Fr>> = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let mut row = vec![Fr::one(); i + 1];
            for j in 1..i {
                row[j] = newton[i - 1][j] + newton[i - 1][j - 1];
            }
            newton.push(row);
        }

        // sym[i][j] is the sum over |S|=j, S in {1,...,i} of prod(S).
        let mut sym: Vec<Vec<Fr>> = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let mut row = vec![Fr::zero(); i + 1];
            row[0] = Fr::one();
            for j in 1..=i {
                row[j] = Fr::from(i as u64) * sym[i - 1][j - 1];
                if j <= i - 1 {
                    row[j] += sym[i - 1][j];
                }
            }
            sym.push(row);
        }

        // coeff[i][j] is the sum over S in {1,...,n}\{i}, |S|=j of prod(S).
        let mut coeff: Vec<Vec<Fr>> = vec![Vec::new(); n + 1];
        for i in 1..=n {
            let mut row = vec![Fr::zero(); n];
            row[0] = Fr::one();
            for j in 1..=n - 1 {
                row[j] = sym[n][j] - Fr::from(i as u64) * row[j - 1];
            }
            coeff[i] = row;
        }

        // inv_v is the inverse of V(1,2,...,n) with signs ignored, scaled
        // by n!, and with rows in reverse order.
        let mut inv_v: Vec<Vec<Fr>> = Vec::with_capacity(n);
        for i in 0..n {
            let mut row = Vec::with_capacity(n);
            for j in 0..n {
                row.push(newton[n - 1][j] * coeff[j + 1][i]);
            }
            inv_v.push(row);
        }

        // The magic vector is a random combination of the last n-f-1 rows.
        let mut vector = vec![Fr::zero(); n];
        for row in inv_v.iter().take(n - f - 1) {
            let scalar = random_scalar(rng);
            for (j, entry) in row.iter().enumerate() {
                let term = *entry * scalar;
                if j % 2 == 1 {
                    // the inverse of V(1,2,...,n) has a checkerboard sign pattern
                    vector[j] -= term;
                } else {
                    vector[j] += term;
                }
            }
        }
        PolyVerifier { vector }
    }

    /// Checks if the given sequence of keys is a polynomial sequence of the
    /// verified degree bound.
    pub fn verify(&self, elems: &[VerificationKey]) -> bool {
        if elems.len() != self.vector.len() {
            return false;
        }
        let scalar_product: G2 = elems
            .par_iter()
            .zip(self.vector.par_iter())
            .map(|(vk, c)| *vk.point() * *c)
            .sum();
        ct_eq(&marshal_g2(&G2::zero()), &marshal_g2(&scalar_product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Field;
    use rand::rngs::OsRng;

    // Keys g2 * p(i) for i = 1..=n.
    fn evaluations(n: u64, p: impl Fn(Fr) -> Fr) -> Vec<VerificationKey> {
        (1..=n).map(|i| VerificationKey::new(p(Fr::from(i)))).collect()
    }

    #[test]
    fn accepts_monomials_within_bound() {
        let pv = PolyVerifier::new(10, 3, &mut OsRng);
        for k in 0u64..=3 {
            let keys = evaluations(10, |x| x.pow([k]));
            assert!(pv.verify(&keys), "degree {k} should be accepted");
        }
    }

    #[test]
    fn rejects_monomial_above_bound() {
        let pv = PolyVerifier::new(10, 3, &mut OsRng);
        let keys = evaluations(10, |x| x.pow([4]));
        assert!(!pv.verify(&keys));
    }

    #[test]
    fn accepts_mixed_polynomial_of_bound_degree() {
        let pv = PolyVerifier::new(10, 3, &mut OsRng);
        let keys = evaluations(10, |x| {
            Fr::from(7u64) * x.pow([3]) + Fr::from(11u64) * x + Fr::from(3u64)
        });
        assert!(pv.verify(&keys));
    }

    #[test]
    fn rejects_random_sequence_and_wrong_length() {
        let pv = PolyVerifier::new(10, 3, &mut OsRng);
        let keys: Vec<_> = (0..10)
            .map(|_| VerificationKey::new(random_scalar(&mut OsRng)))
            .collect();
        assert!(!pv.verify(&keys));
        assert!(!pv.verify(&keys[..9]));
    }
}
