use crate::{
    error::Error,
    ethereum::{format_address, Address},
};
use ethnum::U256;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Serialize, Debug, Clone)]
/// JSON RPC request
pub struct JSONRPCRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug, Clone)]
/// JSON RPC error object
pub struct JSONRPCError {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug, Clone)]
/// JSON RPC response
pub struct JSONRPCResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JSONRPCError>,
}

impl JSONRPCResponse {
    /// Turn the response into its result or its error
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, Error> {
        if let Some(err) = self.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        serde_json::from_value(self.result.unwrap_or(Value::Null))
            .map_err(|e| Error::Transient(format!("unexpected RPC result: {}", e)))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Subset of `eth_getTransactionReceipt`
pub struct RawReceipt {
    /// Transaction hash
    pub transaction_hash: String,
    /// Block number, hex quantity
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` on revert
    pub status: Option<String>,
}

/// `0x` prefixed hex of raw bytes
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode `0x` prefixed hex data
pub fn from_hex(value: &str) -> Result<Vec<u8>, Error> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|_| Error::EncodingMismatch("invalid hex data"))
}

/// Parse a hex quantity such as `0x1a`
pub fn parse_quantity(value: &str) -> Result<U256, Error> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|_| Error::EncodingMismatch("invalid hex quantity"))
}

/// Parse a hex quantity that must fit into u64
pub fn parse_quantity_u64(value: &str) -> Result<u64, Error> {
    let quantity = parse_quantity(value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(Error::EncodingMismatch("quantity overflows u64"));
    }
    Ok(quantity.as_u64())
}

/// Ethereum JSON RPC client
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create new instance of RpcClient
    pub fn new(url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("unable to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a request and decode its result
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, Error> {
        let payload = JSONRPCRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response: JSONRPCResponse = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_result()
    }

    /// `eth_call` against the latest block
    pub async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, Error> {
        let result: String = self
            .request(
                "eth_call",
                json!([{ "to": format_address(to), "data": to_hex(data) }, "latest"]),
            )
            .await?;
        from_hex(&result)
    }

    /// `eth_chainId`
    pub async fn chain_id(&self) -> Result<u64, Error> {
        let result: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity_u64(&result)
    }

    /// Pending nonce of an account
    pub async fn transaction_count(&self, address: &Address) -> Result<u64, Error> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                json!([format_address(address), "pending"]),
            )
            .await?;
        parse_quantity_u64(&result)
    }

    /// `eth_gasPrice`
    pub async fn gas_price(&self) -> Result<U256, Error> {
        let result: String = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&result)
    }

    /// `eth_estimateGas`
    pub async fn estimate_gas(
        &self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> Result<u64, Error> {
        let result: String = self
            .request(
                "eth_estimateGas",
                json!([{
                    "from": format_address(from),
                    "to": format_address(to),
                    "data": to_hex(data)
                }]),
            )
            .await?;
        parse_quantity_u64(&result)
    }

    /// `eth_sendRawTransaction`, returns the transaction hash
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, Error> {
        self.request("eth_sendRawTransaction", json!([to_hex(raw)]))
            .await
    }

    /// `eth_getTransactionReceipt`, `None` while pending
    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<RawReceipt>, Error> {
        self.request("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{from_hex, parse_quantity, parse_quantity_u64, JSONRPCResponse, RawReceipt};
    use crate::error::Error;
    use ethnum::U256;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0x").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0x7a69").unwrap(), U256::from(31337u64));
        assert_eq!(parse_quantity_u64("0xaa36a7").unwrap(), 11155111);
        assert!(parse_quantity("0xzz").is_err());
        assert!(parse_quantity_u64(&format!("0x1{}", "0".repeat(16))).is_err());
        assert_eq!(from_hex("0x0102").unwrap(), vec![1, 2]);
    }

    #[test]
    fn response_result_and_error() {
        let ok: JSONRPCResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).unwrap();
        assert_eq!(ok.into_result::<String>().unwrap(), "0x1");

        let err: JSONRPCResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        assert_eq!(
            err.into_result::<String>(),
            Err(Error::Rpc {
                code: -32000,
                message: "nonce too low".to_string()
            })
        );

        let pending: JSONRPCResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert_eq!(pending.into_result::<Option<RawReceipt>>().unwrap(), None);
    }

    #[test]
    fn receipt_fields() {
        let receipt: RawReceipt = serde_json::from_str(
            r#"{"transactionHash":"0xab","blockNumber":"0x10","status":"0x1","gasUsed":"0x5208"}"#,
        )
        .unwrap();
        assert_eq!(receipt.block_number.as_deref(), Some("0x10"));
        assert_eq!(receipt.status.as_deref(), Some("0x1"));
    }
}
