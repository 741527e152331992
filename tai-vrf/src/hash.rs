use crate::{error::Error, extends::ScalarExtend};
use alloc::vec::Vec;
use libsecp256k1::curve::{Affine, Field, Scalar};
use tiny_keccak::{Hasher, Keccak};

/// Suite byte shared by every hash of the verifier
pub const SUITE: u8 = 0xFE;

/// Domain tag of hash to curve
pub const HASH_TO_CURVE_FLAG: u8 = 0x01;

/// Domain tag of the challenge hash
pub const HASH_POINTS_FLAG: u8 = 0x02;

/// Y squared, it was calculate by evaluate X
pub fn y_squared(x: &Field) -> Field {
    let mut t = *x;
    // y^2 = x^3 + 7
    t = t * t * t + Field::from_int(7);
    t.normalize();
    t
}

/// Check point is on curve or not
pub fn is_on_curve(point: &Affine) -> bool {
    y_squared(&point.x) == point.y * point.y
}

/// Interpret a digest as X and lift it to the even-Y point, if any
pub fn candidate_point(digest: &[u8; 32]) -> Option<Affine> {
    let mut x = Field::default();
    // Digest must be lower than the field size
    if !x.set_b32(digest) {
        return None;
    }
    let y2 = y_squared(&x);
    // p = 3 mod 4 so y = y2^((p+1)/4) whenever y2 is a square
    let (mut y, _) = y2.sqrt();
    y.normalize();
    if y * y != y2 {
        return None;
    }
    if y.is_odd() {
        y = y.neg(1);
        y.normalize();
    }
    Some(Affine::new(x, y))
}

/// Hash to curve with try-and-increment, also returns the accepted counter
/// keccak256(0xFE || 0x01 || pk.x || pk.y || message || ctr)
pub fn hash_to_curve_with_counter(pk: &Affine, message: &[u8]) -> Result<(Affine, u8), Error> {
    let mut tpk = *pk;
    tpk.x.normalize();
    tpk.y.normalize();

    let mut packed = Vec::with_capacity(2 + 64 + message.len() + 1);
    packed.push(SUITE);
    packed.push(HASH_TO_CURVE_FLAG);
    packed.extend_from_slice(&tpk.x.b32());
    packed.extend_from_slice(&tpk.y.b32());
    packed.extend_from_slice(message);
    packed.push(0);
    let last = packed.len() - 1;

    for ctr in 0..=u8::MAX {
        packed[last] = ctr;
        let mut digest = [0u8; 32];
        let mut hasher = Keccak::v256();
        hasher.update(&packed);
        hasher.finalize(&mut digest);
        if let Some(point) = candidate_point(&digest) {
            return Ok((point, ctr));
        }
    }
    Err(Error::HashToCurveExhausted)
}

/// Hash to curve with try-and-increment
pub fn hash_to_curve(pk: &Affine, message: &[u8]) -> Result<Affine, Error> {
    hash_to_curve_with_counter(pk, message).map(|(point, _)| point)
}

/// Challenge scalar
/// keccak256(0xFE || 0x02 || H || pk || gamma || u || v) mod n
pub fn hash_points(h: &Affine, pk: &Affine, gamma: &Affine, u: &Affine, v: &Affine) -> Scalar {
    let mut output = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(&[SUITE, HASH_POINTS_FLAG]);
    for point in [h, pk, gamma, u, v] {
        hasher.update(point.x.b32().as_ref());
        hasher.update(point.y.b32().as_ref());
    }
    hasher.finalize(&mut output);
    Scalar::from_bytes(&output)
}

#[cfg(test)]
mod tests {
    use super::{
        candidate_point, hash_points, hash_to_curve, hash_to_curve_with_counter, is_on_curve,
        HASH_POINTS_FLAG, HASH_TO_CURVE_FLAG, SUITE,
    };
    use crate::helper::{keccak256, public_key_to_affine};
    use libsecp256k1::{curve::AFFINE_G, PublicKey, SecretKey};

    fn test_public_key() -> libsecp256k1::curve::Affine {
        let secret_key = SecretKey::parse(&[0x42u8; 32]).unwrap();
        public_key_to_affine(&PublicKey::from_secret_key(&secret_key))
    }

    #[test]
    fn hash_to_curve_with_generator_key() {
        let (h, ctr) = hash_to_curve_with_counter(&AFFINE_G, &keccak256(b"test")).unwrap();
        assert_eq!(ctr, 0);
        assert_eq!(
            hex::encode(h.x.b32()),
            "370387faf4bad78f569447e440b27de570fc8dc59319e4aaa2163ac50d93f2ab"
        );
        assert_eq!(
            hex::encode(h.y.b32()),
            "e07016842a0ae7c2c2c4505e23d5c3935a7896ec371dc35d82497fbc7772b380"
        );
    }

    #[test]
    fn hash_to_curve_output_is_on_curve_with_even_y() {
        let pk = test_public_key();
        for i in 0u32..64 {
            let h = hash_to_curve(&pk, &i.to_be_bytes()).unwrap();
            assert!(is_on_curve(&h));
            assert!(h.is_valid_var());
            assert!(!h.y.is_odd(), "odd y for message {}", i);
        }
    }

    #[test]
    fn hash_to_curve_is_stable() {
        let pk = test_public_key();
        let message = b"same input, same point";
        assert_eq!(
            hash_to_curve(&pk, message).unwrap(),
            hash_to_curve(&pk, message).unwrap()
        );
    }

    #[test]
    fn digest_above_field_size_is_rejected() {
        assert!(candidate_point(&[0xffu8; 32]).is_none());
    }

    #[test]
    fn hash_families_are_domain_separated() {
        let body = [0u8; 64];
        let mut to_curve = vec![SUITE, HASH_TO_CURVE_FLAG];
        to_curve.extend_from_slice(&body);
        let mut points = vec![SUITE, HASH_POINTS_FLAG];
        points.extend_from_slice(&body);
        assert_ne!(keccak256(&to_curve), keccak256(&points));
        assert_eq!(
            hex::encode(keccak256(&to_curve)),
            "b5380f23ba91c19a3c2fd3d9a850245ad4d527484e880bc7939658c160d024c1"
        );
        assert_eq!(
            hex::encode(keccak256(&points)),
            "12c71aae58a19fcb79c6a6d9f51ab7717b5ddb6cd02c5746c552995584014188"
        );
    }

    #[test]
    fn challenge_depends_on_every_point() {
        let pk = test_public_key();
        let h = hash_to_curve(&pk, b"a").unwrap();
        let other = hash_to_curve(&pk, b"b").unwrap();
        let base = hash_points(&h, &pk, &h, &h, &h);
        assert_ne!(base, hash_points(&other, &pk, &h, &h, &h));
        assert_ne!(base, hash_points(&h, &other, &h, &h, &h));
        assert_ne!(base, hash_points(&h, &pk, &other, &h, &h));
        assert_ne!(base, hash_points(&h, &pk, &h, &other, &h));
        assert_ne!(base, hash_points(&h, &pk, &h, &h, &other));
    }
}
