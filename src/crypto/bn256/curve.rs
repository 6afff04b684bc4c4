//! Thin adapter over the arkworks BN-254 backend.
//!
//! Everything the rest of the crate needs from the pairing library goes
//! through here: group aliases, generators, uncompressed marshalling,
//! hash-to-G1, and constant-time byte comparison. No other module touches
//! arkworks types directly except through the aliases exported below.

use ark_bn254::{Bn254, Fq, G1Affine, G2Affine};
use ark_ec::{pairing::Pairing, short_weierstrass::SWCurveConfig, AffineRepr, CurveGroup};
use ark_ff::Field;
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;
use subtle::ConstantTimeEq;

/// The scalar field of the curve; integers modulo the group order `q`.
pub type Fr = ark_bn254::Fr;
/// The source group of the pairing, where signatures live.
pub type G1 = ark_bn254::G1Projective;
/// The destination group of the pairing, where verification keys live.
pub type G2 = ark_bn254::G2Projective;

/// Length of a marshalled G1 element, and therefore of every signature.
pub const SIGNATURE_LENGTH: usize = 64;
/// Length of a marshalled G2 element, and therefore of every verification key.
pub const VERIFICATION_KEY_LENGTH: usize = 128;
/// Length of a marshalled scalar.
pub const SCALAR_LENGTH: usize = 32;

/// Domain separation tag for message hashing.
const HASH_DOMAIN: &[u8] = b"az-sig";

pub(crate) fn g1_gen() -> G1 {
    G1Affine::generator().into()
}

pub(crate) fn g2_gen() -> G2 {
    G2Affine::generator().into()
}

/// Marshals any canonically serializable element into fresh bytes.
pub(crate) fn to_bytes<T: CanonicalSerialize>(elem: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(elem.uncompressed_size());
    elem.serialize_uncompressed(&mut out)
        .expect("serializing into a Vec is infallible");
    out
}

pub(crate) fn marshal_g1(point: &G1) -> Vec<u8> {
    to_bytes(&point.into_affine())
}

pub(crate) fn marshal_g2(point: &G2) -> Vec<u8> {
    to_bytes(&point.into_affine())
}

pub(crate) fn marshal_fr(scalar: &Fr) -> Vec<u8> {
    to_bytes(scalar)
}

/// Unmarshals a G1 element, rejecting off-curve and out-of-subgroup points.
pub(crate) fn unmarshal_g1(data: &[u8]) -> Option<G1> {
    G1Affine::deserialize_uncompressed(data).ok().map(Into::into)
}

/// Unmarshals a G2 element, rejecting off-curve and out-of-subgroup points.
pub(crate) fn unmarshal_g2(data: &[u8]) -> Option<G2> {
    G2Affine::deserialize_uncompressed(data).ok().map(Into::into)
}

pub(crate) fn unmarshal_fr(data: &[u8]) -> Option<Fr> {
    Fr::deserialize_uncompressed(data).ok()
}

/// Samples a scalar uniformly from the field.
pub(crate) fn random_scalar<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Fr {
    use ark_std::UniformRand;
    Fr::rand(rng)
}

/// The marshalled GT element of `e(g1, g2)`, for pairing-equation checks.
pub(crate) fn pairing_bytes(g1: &G1, g2: &G2) -> Vec<u8> {
    to_bytes(&Bn254::pairing(g1.into_affine(), g2.into_affine()))
}

/// Constant-time equality of byte strings.
///
/// Strings of different lengths compare unequal without leaking a position.
pub(crate) fn ct_eq(one: &[u8], two: &[u8]) -> bool {
    one.ct_eq(two).into()
}

/// Hashes an arbitrary message onto G1 by domain-separated try-and-increment.
///
/// A SHAKE-128 XOF seeded with the domain tag, a retry counter and the
/// message yields a candidate x-coordinate plus one sign bit; the counter is
/// bumped until `x^3 + 3` is a square. G1 has cofactor one, so the resulting
/// point is already in the right subgroup. Mapping a message to `msg * gen`
/// instead would NOT be secure.
pub(crate) fn hash_to_g1(msg: &[u8]) -> G1 {
    let mut counter: u64 = 0;
    loop {
        let mut hasher = Shake128::default();
        hasher.update(HASH_DOMAIN);
        hasher.update(&counter.to_le_bytes());
        hasher.update(msg);
        let mut xof = hasher.finalize_xof();
        let mut buf = [0u8; 33];
        xof.read(&mut buf);

        let x = Fq::from_be_bytes_mod_order(&buf[..32]);
        let greatest = buf[32] & 1 == 1;
        let rhs = x * x.square() + ark_bn254::g1::Config::COEFF_B;
        if let Some(y) = rhs.sqrt() {
            let y_neg = -y;
            let (small, large) = if y < y_neg { (y, y_neg) } else { (y_neg, y) };
            let y = if greatest { large } else { small };
            let point = G1Affine::new_unchecked(x, y);
            debug_assert!(point.is_on_curve());
            return point.into();
        }
        counter += 1;
    }
}
