use ethnum::U256;
use libsecp256k1::curve::{Affine, Jacobian, Scalar};
use tiny_keccak::{Hasher, Keccak};

/// Extend Affine
pub trait AffineExtend {
    /// Create normalized Affine from Jacobian
    fn from_jacobian(j: &Jacobian) -> Self;

    /// Keccak256 of the 64 bytes X || Y
    fn keccak256(&self) -> [u8; 32];

    /// Coordinates as 256 bits big-endian words
    fn to_words(&self) -> [U256; 2];
}

/// Extend Scalar
pub trait ScalarExtend {
    /// Create Scalar from big-endian bytes, reduced modulo the group order
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Scalar as a 256 bits word
    fn to_u256(&self) -> U256;
}

impl AffineExtend for Affine {
    fn from_jacobian(j: &Jacobian) -> Self {
        let mut ra = Affine::from_gej(j);
        ra.x.normalize();
        ra.y.normalize();
        ra
    }

    fn keccak256(&self) -> [u8; 32] {
        let mut output = [0u8; 32];
        let mut hasher = Keccak::v256();
        hasher.update(self.x.b32().as_ref());
        hasher.update(self.y.b32().as_ref());
        hasher.finalize(&mut output);
        output
    }

    fn to_words(&self) -> [U256; 2] {
        [
            U256::from_be_bytes(self.x.b32()),
            U256::from_be_bytes(self.y.b32()),
        ]
    }
}

impl ScalarExtend for Scalar {
    fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= 32, "Bytes length must be less than 32");
        let mut tmp_bytes = [0u8; 32];
        tmp_bytes[32 - bytes.len()..].copy_from_slice(bytes);
        let mut r = Scalar::default();
        // Overflow is reduced modulo the group order
        let _ = r.set_b32(&tmp_bytes);
        r
    }

    fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.b32())
    }
}
