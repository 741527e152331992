/// TAI-VRF error
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// None of the 256 hash-to-curve counters produced a curve point
    HashToCurveExhausted,
    /// Secret key is zero or not below the group order
    InvalidSecretKey,
    /// Public key is not a point on the curve
    InvalidPublicKey,
    /// Arithmetic produced the point at infinity or an off-curve point
    InvalidPoint,
    /// Seed must not be empty
    InvalidSeed,
    /// Bytes do not follow the envelope layout
    EncodingMismatch,
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::HashToCurveExhausted => write!(f, "Hash to curve exhausted all counters"),
            Error::InvalidSecretKey => write!(f, "Invalid secret key"),
            Error::InvalidPublicKey => write!(f, "Invalid public key"),
            Error::InvalidPoint => write!(f, "Invalid curve point"),
            Error::InvalidSeed => write!(f, "Invalid seed"),
            Error::EncodingMismatch => write!(f, "Envelope encoding mismatch"),
        }
    }
}
