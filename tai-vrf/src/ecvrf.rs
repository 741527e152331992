use crate::{
    error::Error,
    extends::{AffineExtend, ScalarExtend},
    hash::{hash_points, hash_to_curve},
    helper::{
        add_points, ecmult, ecmult_gen, get_address, jacobian_to_point, keccak256, mul_point,
        public_key_to_affine, GROUP_ORDER,
    },
};
use alloc::vec::Vec;
use ethnum::U256;
use libsecp256k1::{
    curve::{Affine, ECMultContext, ECMultGenContext, Jacobian, Scalar},
    util::SECRET_KEY_SIZE,
    PublicKey, SecretKey, ECMULT_CONTEXT, ECMULT_GEN_CONTEXT,
};

/// Key pair
pub struct KeyPair {
    /// Public key
    pub public_key: PublicKey,
    /// Secret key
    pub secret_key: SecretKey,
}

#[cfg(feature = "std")]
impl KeyPair {
    /// Generate a new random key pair
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        KeyPair::from(SecretKey::random(&mut rng))
    }
}

impl KeyPair {
    /// Parse a raw 32 bytes secret key
    pub fn from_bytes(value: &[u8; SECRET_KEY_SIZE]) -> Result<Self, Error> {
        SecretKey::parse(value)
            .map(KeyPair::from)
            .map_err(|_| Error::InvalidSecretKey)
    }

    /// Parse a hex secret key, with or without 0x prefix
    pub fn from_hex(value: &str) -> Result<Self, Error> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let mut secret_key = [0u8; SECRET_KEY_SIZE];
        hex::decode_to_slice(digits, &mut secret_key).map_err(|_| Error::InvalidSecretKey)?;
        let key_pair = Self::from_bytes(&secret_key);
        secret_key.fill(0);
        key_pair
    }

    /// Ethereum address of the public key
    pub fn address(&self) -> [u8; 20] {
        get_address(&self.public_key)
    }
}

impl From<SecretKey> for KeyPair {
    fn from(value: SecretKey) -> Self {
        KeyPair {
            public_key: PublicKey::from_secret_key(&value),
            secret_key: value,
        }
    }
}

/// Derive the public key point sk * G
pub fn derive_public_key(secret_key: &SecretKey) -> Affine {
    public_key_to_affine(&PublicKey::from_secret_key(secret_key))
}

/// EC-VRF proof
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ECVRFProof {
    /// gamma = sk * H
    pub gamma: Affine,
    /// Challenge c
    pub c: Scalar,
    /// Response s = k - c * sk
    pub s: Scalar,
    /// Public key of the prover
    pub pk: Affine,
}

impl ECVRFProof {
    /// VRF output, keccak256(gamma.x || gamma.y)
    pub fn randomness(&self) -> [u8; 32] {
        self.gamma.keccak256()
    }

    /// Proof words in verifier order, gamma.x, gamma.y, c, s
    pub fn to_words(&self) -> [U256; 4] {
        let [gamma_x, gamma_y] = self.gamma.to_words();
        [gamma_x, gamma_y, self.c.to_u256(), self.s.to_u256()]
    }
}

/// Precomputed points that let the verifier skip scalar multiplications
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FastVerifyParams {
    /// U reconstructed from public values, equal to k * G
    pub u_point: Affine,
    /// (s * H, c * gamma), their sum is V = k * H
    pub v_components: (Affine, Affine),
}

/// Deterministic nonce, k = (keccak256(sk || seed) mod (n - 1)) + 1
///
/// This is not RFC 6979. It never repeats only because the seed never
/// repeats for a given key, each seed is bound to a fresh loop ID.
pub fn derive_nonce(secret_key: &Scalar, seed: &[u8]) -> Scalar {
    let mut packed = Vec::with_capacity(32 + seed.len());
    packed.extend_from_slice(&secret_key.b32());
    packed.extend_from_slice(seed);
    let digest = U256::from_be_bytes(keccak256(&packed));
    packed.fill(0);
    let k = digest % (GROUP_ORDER - U256::ONE) + U256::ONE;
    Scalar::from_bytes(&k.to_be_bytes())
}

/// Compute the fast verification parameters of a proof.
/// The seed must be the one the proof was generated for.
pub fn compute_fast_verify_params(
    pk: &Affine,
    proof: &ECVRFProof,
    seed: &[u8],
) -> Result<FastVerifyParams, Error> {
    if !pk.is_valid_var() {
        return Err(Error::InvalidPublicKey);
    }
    if !proof.gamma.is_valid_var() {
        return Err(Error::InvalidPoint);
    }
    let h = hash_to_curve(pk, seed)?;

    // U = c * pk + s * G
    //   = c * sk * G + (k - c * sk) * G
    //   = k * G
    let mut u = Jacobian::default();
    ECMULT_CONTEXT.ecmult(&mut u, &Jacobian::from_ge(pk), &proof.c, &proof.s);
    let u_point = jacobian_to_point(&u)?;

    // Left unsummed, the verifier adds them itself
    let s_h = mul_point(&h, &proof.s)?;
    let c_gamma = mul_point(&proof.gamma, &proof.c)?;

    Ok(FastVerifyParams {
        u_point,
        v_components: (s_h, c_gamma),
    })
}

/// The check performed by the on-chain fast verifier
pub fn fast_verify(
    pk: &Affine,
    proof: &ECVRFProof,
    seed: &[u8],
    params: &FastVerifyParams,
) -> bool {
    let (s_h, c_gamma) = &params.v_components;
    let all_valid = [pk, &proof.gamma, &params.u_point, s_h, c_gamma]
        .iter()
        .all(|p| p.is_valid_var());
    if !all_valid {
        return false;
    }
    let h = match hash_to_curve(pk, seed) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let expected = match compute_fast_verify_params(pk, proof, seed) {
        Ok(expected) => expected,
        Err(_) => return false,
    };
    if expected != *params {
        return false;
    }
    // V = s * H + c * gamma
    //   = (k - c * sk) * H + c * sk * H
    //   = k * H
    let v = match add_points(s_h, c_gamma) {
        Ok(v) => v,
        Err(_) => return false,
    };
    hash_points(&h, pk, &proof.gamma, &params.u_point, &v) == proof.c
}

/// ECVRF
pub struct ECVRF<'a> {
    secret_key: SecretKey,
    public_key: PublicKey,
    ctx_mul: &'a ECMultContext,
    ctx_gen: &'a ECMultGenContext,
}

impl<'a> ECVRF<'a> {
    /// Create new instance of ECVRF from a secret key
    pub fn new(secret_key: SecretKey) -> Self {
        ECVRF {
            secret_key,
            public_key: PublicKey::from_secret_key(&secret_key),
            ctx_gen: &ECMULT_GEN_CONTEXT,
            ctx_mul: &ECMULT_CONTEXT,
        }
    }

    /// Public key of the prover
    pub fn public_key(&self) -> Affine {
        public_key_to_affine(&self.public_key)
    }

    /// Prove a seed, deterministic for a given key and seed
    pub fn prove(&self, seed: &[u8]) -> Result<ECVRFProof, Error> {
        if seed.is_empty() {
            return Err(Error::InvalidSeed);
        }
        let pub_affine = self.public_key();
        let mut secret_key: Scalar = self.secret_key.into();

        // H = ECVRF_hash_to_curve(pk, seed)
        let h = hash_to_curve(&pub_affine, seed)?;

        // gamma = H * secret_key
        let gamma = ecmult(self.ctx_mul, &h, &secret_key)?;

        let mut k = derive_nonce(&secret_key, seed);

        // Calculate k * G <=> u
        let kg = ecmult_gen(self.ctx_gen, &k)?;

        // Calculate k * H <=> v
        let kh = ecmult(self.ctx_mul, &h, &k)?;

        // c = ECVRF_hash_points(H, pk, gamma, k * G, k * H)
        let c = hash_points(&h, &pub_affine, &gamma, &kg, &kh);

        // s = (k - c * secret_key) mod n
        let mut neg_c = c;
        neg_c.cond_neg_assign(1.into());
        let s = k + neg_c * secret_key;
        secret_key.clear();
        k.clear();

        Ok(ECVRFProof {
            gamma,
            c,
            s,
            pk: pub_affine,
        })
    }

    /// Ordinary verifier
    pub fn verify(&self, seed: &[u8], vrf_proof: &ECVRFProof) -> bool {
        let pub_affine = self.public_key();
        if vrf_proof.pk != pub_affine {
            return false;
        }
        match compute_fast_verify_params(&pub_affine, vrf_proof, seed) {
            Ok(params) => fast_verify(&pub_affine, vrf_proof, seed, &params),
            Err(_) => false,
        }
    }
}
