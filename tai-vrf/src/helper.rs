use crate::{error::Error, extends::AffineExtend};
use ethnum::U256;
use libsecp256k1::{
    curve::{Affine, ECMultContext, ECMultGenContext, Jacobian, Scalar},
    PublicKey, ECMULT_CONTEXT, ECMULT_GEN_CONTEXT,
};
use tiny_keccak::{Hasher, Keccak};

/// Field size 2^256 - 0x1000003D1
/// [FIELD_SIZE](crate::helper::FIELD_SIZE) = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F;
pub const FIELD_SIZE: U256 = U256::from_words(
    0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F,
);

/// Group order
/// [GROUP_ORDER](crate::helper::GROUP_ORDER) = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
pub const GROUP_ORDER: U256 = U256::from_words(
    0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE,
    0xBAAEDCE6AF48A03BBFD25E8CD0364141,
);

/// Keccak256 digest of a byte slice
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Perform multiplication between a point and a scalar: a * P
pub fn ecmult(context: &ECMultContext, a: &Affine, na: &Scalar) -> Result<Affine, Error> {
    let mut rj = Jacobian::default();
    context.ecmult(&mut rj, &Jacobian::from_ge(a), na, &Scalar::from_int(0));
    jacobian_to_point(&rj)
}

/// Perform multiplication between a value and G: a * G
pub fn ecmult_gen(context: &ECMultGenContext, ng: &Scalar) -> Result<Affine, Error> {
    let mut rj = Jacobian::default();
    context.ecmult_gen(&mut rj, ng);
    jacobian_to_point(&rj)
}

/// a * P with the static multiplication context
pub fn mul_point(a: &Affine, na: &Scalar) -> Result<Affine, Error> {
    ecmult(&ECMULT_CONTEXT, a, na)
}

/// a * G with the static generator context
pub fn mul_gen(ng: &Scalar) -> Result<Affine, Error> {
    ecmult_gen(&ECMULT_GEN_CONTEXT, ng)
}

/// Point addition, both operands must be finite
pub fn add_points(a: &Affine, b: &Affine) -> Result<Affine, Error> {
    let r = Jacobian::from_ge(a).add_ge_var(b, None);
    jacobian_to_point(&r)
}

/// Convert a Jacobian into a normalized, finite affine point
pub fn jacobian_to_point(j: &Jacobian) -> Result<Affine, Error> {
    if j.is_infinity() {
        return Err(Error::InvalidPoint);
    }
    let point = Affine::from_jacobian(j);
    if !point.is_valid_var() {
        return Err(Error::InvalidPoint);
    }
    Ok(point)
}

/// Normalized affine point of a public key
pub fn public_key_to_affine(pub_key: &PublicKey) -> Affine {
    let mut affine_pub: Affine = (*pub_key).into();
    affine_pub.x.normalize();
    affine_pub.y.normalize();
    affine_pub
}

/// Calculate the Ethereum address of an affine point
pub fn calculate_address(point: &Affine) -> [u8; 20] {
    let mut result = [0u8; 20];
    result.copy_from_slice(&point.keccak256()[12..32]);
    result
}

/// Hash a Public Key and return an Ethereum address
pub fn get_address(pub_key: &PublicKey) -> [u8; 20] {
    calculate_address(&public_key_to_affine(pub_key))
}

/// Deterministic seed for one loop iteration, keccak256(address || uint256(loopID))
pub fn compute_seed(contract_address: &[u8; 20], loop_id: U256) -> [u8; 32] {
    let mut packed = [0u8; 52];
    packed[0..20].copy_from_slice(contract_address);
    packed[20..52].copy_from_slice(&loop_id.to_be_bytes());
    keccak256(&packed)
}

#[cfg(test)]
mod tests {
    use super::{compute_seed, get_address, keccak256, FIELD_SIZE, GROUP_ORDER};
    use ethnum::U256;
    use libsecp256k1::{PublicKey, SecretKey};
    use std::collections::HashSet;

    const CONTRACT: [u8; 20] = [
        0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64,
        0x2f, 0x64, 0x18, 0x0a, 0xa3,
    ];

    #[test]
    fn keccak256_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn curve_constants_match_secp256k1() {
        assert_eq!(
            FIELD_SIZE,
            U256::from_str_radix(
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
                16
            )
            .unwrap()
        );
        assert_eq!(
            GROUP_ORDER,
            U256::from_str_radix(
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
                16
            )
            .unwrap()
        );
    }

    #[test]
    fn seed_matches_packed_keccak() {
        assert_eq!(
            hex::encode(compute_seed(&CONTRACT, U256::ZERO)),
            "5104cbd15362576f8591d30ab8a9bf7cd46359da50888732394444660717f124"
        );
        assert_eq!(
            hex::encode(compute_seed(&CONTRACT, U256::ONE)),
            "5e8ebfa50e778e69264bdc847efd6c474992d0ba91772b41eb52d11737a9eafe"
        );
    }

    #[test]
    fn seed_never_collides_across_loop_ids() {
        let mut seen = HashSet::new();
        for loop_id in 0u64..10_000 {
            assert!(
                seen.insert(compute_seed(&CONTRACT, U256::from(loop_id))),
                "seed collision at loop {}",
                loop_id
            );
        }
    }

    #[test]
    fn address_of_secret_key_one() {
        let mut raw = [0u8; 32];
        raw[31] = 1;
        let secret_key = SecretKey::parse(&raw).unwrap();
        let public_key = PublicKey::from_secret_key(&secret_key);
        assert_eq!(
            hex::encode(get_address(&public_key)),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }
}
