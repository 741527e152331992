//! This crate provides an ECVRF prover over secp256k1 that hashes with
//! keccak256 and maps to the curve with try-and-increment. Proofs, fast
//! verification parameters and the envelope layout are bit-compatible with
//! the EVM verifier that consumes them.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(
    unused,
    warnings,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_docs,
    unused_imports
)]
#![forbid(unsafe_code)]

extern crate alloc;

/// EC-VRF prover and verifier
mod ecvrf;
pub use ecvrf::*;

/// EC-VRF error handling
pub mod error;

/// Extended Affine, Scalar
pub mod extends;

/// Try-and-increment hash to curve and challenge hashing
pub mod hash;

/// Helper functions
pub mod helper;

/// ABI envelope consumed by the on-chain verifier
pub mod envelope;

/// Re-export libsecp256k1
pub mod secp256k1 {
    pub use libsecp256k1::*;
}

/// Re-export ethnum::U256
pub mod uint {
    pub use ethnum::U256;
}
