//! Automation worker for the Hexploration contracts. It fulfills mock
//! randomness, progresses game loops and, in VRF mode, submits ECVRF proofs
//! wrapped around the loop payload.
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

/// Solidity ABI encoding of the contract calls
pub mod abi;

/// Chain boundary
pub mod chain;

/// Configuration from arguments and environment
pub mod config;

/// Error handling
mod error;
pub use error::Error;

/// Addresses, RLP and transaction signing
pub mod ethereum;

/// Health endpoint
pub mod health;

/// Managed contracts and operating modes
pub mod process;

/// Retry with exponential backoff
pub mod retry;

/// JSON RPC
pub mod rpc;

/// Worker state and health snapshot
pub mod state;

mod worker;
pub use worker::*;
