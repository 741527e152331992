/// Worker error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Prover failure, deterministic for the same input
    Vrf(tai_vrf::error::Error),
    /// Network or transaction failure, worth another attempt
    Transient(String),
    /// JSON-RPC error object returned by the node
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },
    /// Transaction was broadcast but no receipt arrived in time, sending it
    /// again would duplicate it
    Pending(String),
    /// VRF public key of the worker is not registered on the loop contract
    MissingKeyRegistration,
    /// Data does not follow the expected ABI layout
    EncodingMismatch(&'static str),
    /// Invalid or missing configuration
    Config(String),
}

impl Error {
    /// Only network and transaction errors are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Rpc { .. })
    }
}

impl From<tai_vrf::error::Error> for Error {
    fn from(value: tai_vrf::error::Error) -> Self {
        Error::Vrf(value)
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Transient(value.to_string())
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Vrf(e) => write!(f, "VRF error: {}", e),
            Error::Transient(reason) => write!(f, "Transient error: {}", reason),
            Error::Rpc { code, message } => write!(f, "RPC error [{}]: {}", code, message),
            Error::Pending(hash) => write!(f, "Transaction {} is still pending", hash),
            Error::MissingKeyRegistration => {
                write!(f, "VRF public key is not registered for this worker")
            }
            Error::EncodingMismatch(what) => write!(f, "Encoding mismatch: {}", what),
            Error::Config(reason) => write!(f, "Configuration error: {}", reason),
        }
    }
}
