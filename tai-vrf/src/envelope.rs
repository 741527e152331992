//! ABI layout of `(uint8, uint256[4], uint256[2], uint256[4], bytes)`, the
//! argument the on-chain loop decodes before it checks the proof.
//!
//! ```text
//! word 0       version
//! word 1..5    gamma.x, gamma.y, c, s
//! word 5..7    u.x, u.y
//! word 7..11   (s * H).x, (s * H).y, (c * gamma).x, (c * gamma).y
//! word 11      offset of payload = 0x180
//! word 12      payload length
//! word 13..    payload, right padded to 32 bytes
//! ```
use crate::{
    ecvrf::{ECVRFProof, FastVerifyParams},
    error::Error,
    extends::AffineExtend,
};
use alloc::vec::Vec;
use ethnum::U256;

/// Envelope version understood by the verifier
pub const ENVELOPE_VERSION: u8 = 1;

/// ABI word size
pub const WORD_SIZE: usize = 32;

/// Static head words, including the payload offset
pub const HEAD_WORDS: usize = 12;

/// VRF envelope submitted in place of the raw loop payload
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VRFEnvelope {
    /// Envelope version
    pub version: u8,
    /// gamma.x, gamma.y, c, s
    pub proof: [U256; 4],
    /// U point
    pub u_point: [U256; 2],
    /// s * H and c * gamma
    pub v_components: [U256; 4],
    /// Opaque data from the loop contract, echoed back
    pub payload: Vec<u8>,
}

impl VRFEnvelope {
    /// Wrap a proof and its fast verification parameters around a payload
    pub fn new(proof: &ECVRFProof, params: &FastVerifyParams, payload: &[u8]) -> Self {
        let [u_x, u_y] = params.u_point.to_words();
        let [sh_x, sh_y] = params.v_components.0.to_words();
        let [cg_x, cg_y] = params.v_components.1.to_words();
        VRFEnvelope {
            version: ENVELOPE_VERSION,
            proof: proof.to_words(),
            u_point: [u_x, u_y],
            v_components: [sh_x, sh_y, cg_x, cg_y],
            payload: payload.to_vec(),
        }
    }

    /// ABI encode the envelope
    pub fn encode(&self) -> Vec<u8> {
        let padded = padded_len(self.payload.len());
        let mut buf = Vec::with_capacity((HEAD_WORDS + 1) * WORD_SIZE + padded);
        buf.extend_from_slice(&U256::from(self.version).to_be_bytes());
        for word in self
            .proof
            .iter()
            .chain(self.u_point.iter())
            .chain(self.v_components.iter())
        {
            buf.extend_from_slice(&word.to_be_bytes());
        }
        buf.extend_from_slice(&U256::from((HEAD_WORDS * WORD_SIZE) as u64).to_be_bytes());
        buf.extend_from_slice(&U256::from(self.payload.len() as u64).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf.resize((HEAD_WORDS + 1) * WORD_SIZE + padded, 0);
        buf
    }

    /// Decode an ABI encoded envelope, strict about offsets and padding
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() < (HEAD_WORDS + 1) * WORD_SIZE || data.len() % WORD_SIZE != 0 {
            return Err(Error::EncodingMismatch);
        }
        let word = |i: usize| {
            let mut w = [0u8; WORD_SIZE];
            w.copy_from_slice(&data[i * WORD_SIZE..(i + 1) * WORD_SIZE]);
            U256::from_be_bytes(w)
        };

        let version = word(0);
        if version > U256::from(u8::MAX) {
            return Err(Error::EncodingMismatch);
        }
        if word(11) != U256::from((HEAD_WORDS * WORD_SIZE) as u64) {
            return Err(Error::EncodingMismatch);
        }
        let length = word(12);
        let available = (data.len() - (HEAD_WORDS + 1) * WORD_SIZE) as u64;
        if length > U256::from(available) {
            return Err(Error::EncodingMismatch);
        }
        let length = length.as_usize();
        if padded_len(length) as u64 != available {
            return Err(Error::EncodingMismatch);
        }
        let start = (HEAD_WORDS + 1) * WORD_SIZE;
        if data[start + length..].iter().any(|b| *b != 0) {
            return Err(Error::EncodingMismatch);
        }

        Ok(VRFEnvelope {
            version: version.as_u8(),
            proof: [word(1), word(2), word(3), word(4)],
            u_point: [word(5), word(6)],
            v_components: [word(7), word(8), word(9), word(10)],
            payload: data[start..start + length].to_vec(),
        })
    }
}

/// Encode proof, fast verification parameters and chain payload
pub fn encode_vrf_envelope(
    proof: &ECVRFProof,
    params: &FastVerifyParams,
    chain_payload: &[u8],
) -> Vec<u8> {
    VRFEnvelope::new(proof, params, chain_payload).encode()
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

#[cfg(test)]
mod tests {
    use super::{encode_vrf_envelope, VRFEnvelope, ENVELOPE_VERSION, WORD_SIZE};
    use crate::{
        compute_fast_verify_params, error::Error, extends::ScalarExtend, helper::keccak256,
        KeyPair, ECVRF,
    };

    fn words(data: &[u8]) -> Vec<&[u8]> {
        data.chunks(WORD_SIZE).collect()
    }

    #[test]
    fn envelope_layout_matches_abi() {
        let ecvrf = ECVRF::new(KeyPair::random().secret_key);
        let seed = keccak256(b"layout");
        let proof = ecvrf.prove(&seed).unwrap();
        let params = compute_fast_verify_params(&proof.pk, &proof, &seed).unwrap();
        let payload = vec![0xAB; 33];

        let encoded = encode_vrf_envelope(&proof, &params, &payload);
        assert_eq!(encoded.len(), 15 * WORD_SIZE);

        let w = words(&encoded);
        assert_eq!(w[0][31], ENVELOPE_VERSION);
        assert!(w[0][..31].iter().all(|b| *b == 0));
        assert_eq!(w[1], proof.gamma.x.b32());
        assert_eq!(w[2], proof.gamma.y.b32());
        assert_eq!(w[3], proof.c.b32());
        assert_eq!(w[4], proof.s.b32());
        assert_eq!(w[5], params.u_point.x.b32());
        assert_eq!(w[6], params.u_point.y.b32());
        assert_eq!(w[7], params.v_components.0.x.b32());
        assert_eq!(w[8], params.v_components.0.y.b32());
        assert_eq!(w[9], params.v_components.1.x.b32());
        assert_eq!(w[10], params.v_components.1.y.b32());
        assert_eq!(hex::encode(w[11]), format!("{:064x}", 0x180));
        assert_eq!(hex::encode(w[12]), format!("{:064x}", 33));
        assert!(w[13].iter().all(|b| *b == 0xAB));
        assert_eq!(w[14][0], 0xAB);
        assert!(w[14][1..].iter().all(|b| *b == 0));
        let decoded = VRFEnvelope::decode(&encoded).unwrap();
        assert_eq!(decoded.proof[2], proof.c.to_u256());
    }

    #[test]
    fn empty_payload_still_has_length_word() {
        let ecvrf = ECVRF::new(KeyPair::random().secret_key);
        let seed = keccak256(b"empty");
        let proof = ecvrf.prove(&seed).unwrap();
        let params = compute_fast_verify_params(&proof.pk, &proof, &seed).unwrap();
        let encoded = encode_vrf_envelope(&proof, &params, &[]);
        assert_eq!(encoded.len(), 13 * WORD_SIZE);
        assert!(words(&encoded)[12].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_restores_envelope() {
        let ecvrf = ECVRF::new(KeyPair::random().secret_key);
        let seed = keccak256(b"decode");
        let proof = ecvrf.prove(&seed).unwrap();
        let params = compute_fast_verify_params(&proof.pk, &proof, &seed).unwrap();
        let envelope = VRFEnvelope::new(&proof, &params, b"game data");
        assert_eq!(VRFEnvelope::decode(&envelope.encode()).unwrap(), envelope);
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let ecvrf = ECVRF::new(KeyPair::random().secret_key);
        let seed = keccak256(b"malformed");
        let proof = ecvrf.prove(&seed).unwrap();
        let params = compute_fast_verify_params(&proof.pk, &proof, &seed).unwrap();
        let encoded = encode_vrf_envelope(&proof, &params, b"abc");

        assert_eq!(
            VRFEnvelope::decode(&encoded[..encoded.len() - WORD_SIZE]),
            Err(Error::EncodingMismatch)
        );

        let mut bad_offset = encoded.clone();
        bad_offset[11 * WORD_SIZE + 31] = 0x20;
        assert_eq!(
            VRFEnvelope::decode(&bad_offset),
            Err(Error::EncodingMismatch)
        );

        let mut dirty_padding = encoded;
        let last = dirty_padding.len() - 1;
        dirty_padding[last] = 1;
        assert_eq!(
            VRFEnvelope::decode(&dirty_padding),
            Err(Error::EncodingMismatch)
        );
    }
}
