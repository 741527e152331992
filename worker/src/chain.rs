use crate::{
    abi,
    error::Error,
    ethereum::{Address, LegacyTransaction},
    rpc::{parse_quantity_u64, RawReceipt, RpcClient},
};
use async_trait::async_trait;
use ethnum::U256;
use log::{debug, warn};
use std::time::Duration;
use tai_vrf::{helper::get_address, secp256k1::SecretKey, KeyPair};

/// Mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash, `0x` prefixed
    pub transaction_hash: String,
    /// Block the transaction was included in
    pub block_number: u64,
}

/// Read and write capabilities the worker needs from the game contracts
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address transactions are sent from
    fn sender(&self) -> Address;

    /// `getMockRequests()`, pending entries are non zero
    async fn pending_mock_requests(&self, target: &Address) -> Result<Vec<U256>, Error>;

    /// `fulfillMockRandomness()`
    async fn fulfill_mock_randomness(&self, target: &Address) -> Result<TxReceipt, Error>;

    /// `shouldProgressLoop()`, readiness flag and opaque payload
    async fn should_progress_loop(&self, target: &Address) -> Result<(bool, Vec<u8>), Error>;

    /// `_loopID()`
    async fn loop_id(&self, target: &Address) -> Result<U256, Error>;

    /// `progressLoop(bytes)`
    async fn progress_loop(&self, target: &Address, data: &[u8]) -> Result<TxReceipt, Error>;

    /// `useMockVRF()`
    async fn use_mock_vrf(&self, target: &Address) -> Result<bool, Error>;

    /// `controllerKeyRegistered(address)`
    async fn controller_key_registered(
        &self,
        target: &Address,
        controller: &Address,
    ) -> Result<bool, Error>;

    /// `registerControllerKey(address, uint256, uint256)`
    async fn register_controller_key(
        &self,
        target: &Address,
        controller: &Address,
        pk_x: U256,
        pk_y: U256,
    ) -> Result<TxReceipt, Error>;
}

/// EVM JSON RPC implementation of [ChainClient], signs legacy transactions locally
pub struct EvmChain {
    rpc: RpcClient,
    secret_key: SecretKey,
    sender: Address,
    chain_id: u64,
    receipt_interval: Duration,
    receipt_attempts: u32,
}

impl EvmChain {
    /// Connect to the node and make sure it serves the expected chain
    pub async fn connect(
        rpc_url: &str,
        key_pair: &KeyPair,
        expected_chain_id: u64,
    ) -> Result<Self, Error> {
        let rpc = RpcClient::new(rpc_url)?;
        let chain_id = rpc.chain_id().await?;
        if chain_id != expected_chain_id {
            return Err(Error::Config(format!(
                "RPC serves chain {} but {} was configured",
                chain_id, expected_chain_id
            )));
        }
        Ok(Self {
            rpc,
            secret_key: key_pair.secret_key,
            sender: get_address(&key_pair.public_key),
            chain_id,
            receipt_interval: Duration::from_secs(1),
            receipt_attempts: 120,
        })
    }

    /// Chain ID of the connected node
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// `useAutoLoopVRF()`
    pub async fn use_autoloop_vrf(&self, target: &Address) -> Result<bool, Error> {
        let data = self
            .rpc
            .call(target, &abi::encode_call(abi::USE_AUTOLOOP_VRF, &[]))
            .await?;
        abi::decode_bool(&data)
    }

    /// `setUseAutoLoopVRF(bool)`
    pub async fn set_use_autoloop_vrf(
        &self,
        target: &Address,
        enabled: bool,
    ) -> Result<TxReceipt, Error> {
        self.send_transaction(
            target,
            abi::encode_call(abi::SET_USE_AUTOLOOP_VRF, &[abi::bool_word(enabled)]),
        )
        .await
    }

    /// `setVRFSubscriptionID(uint64)`, zero puts the contract in mock VRF mode
    pub async fn set_vrf_subscription_id(
        &self,
        target: &Address,
        subscription_id: u64,
    ) -> Result<TxReceipt, Error> {
        let id = abi::uint_word(U256::from(subscription_id));
        self.send_transaction(target, abi::encode_call(abi::SET_VRF_SUBSCRIPTION_ID, &[id]))
            .await
    }

    async fn send_transaction(&self, to: &Address, data: Vec<u8>) -> Result<TxReceipt, Error> {
        let nonce = self.rpc.transaction_count(&self.sender).await?;
        let gas_price = self.rpc.gas_price().await?;
        let estimated = self.rpc.estimate_gas(&self.sender, to, &data).await?;
        let transaction = LegacyTransaction {
            nonce,
            gas_price,
            // 20% headroom over the estimate
            gas_limit: estimated + estimated / 5,
            to: *to,
            value: U256::ZERO,
            data,
            chain_id: self.chain_id,
        };
        let raw = transaction.sign(&self.secret_key);
        let hash = self.rpc.send_raw_transaction(&raw).await?;
        debug!("Sent transaction {} with nonce {}", hash, nonce);
        self.wait_for_receipt(&hash).await
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, Error> {
        for _ in 0..self.receipt_attempts {
            // Broadcast already, from here on only the receipt is polled
            let receipt = match self.rpc.transaction_receipt(hash).await {
                Ok(receipt) => receipt,
                Err(err) => {
                    warn!("Receipt of {} unavailable: {}", hash, err);
                    None
                }
            };
            // Some nodes return receipts of pending transactions without a block
            if let Some(RawReceipt {
                transaction_hash,
                block_number: Some(block),
                status,
            }) = receipt
            {
                let block_number = parse_quantity_u64(&block)?;
                return match status.as_deref() {
                    Some("0x1") => Ok(TxReceipt {
                        transaction_hash,
                        block_number,
                    }),
                    status => Err(Error::Transient(format!(
                        "transaction {} reverted with status {:?}",
                        hash, status
                    ))),
                };
            }
            tokio::time::sleep(self.receipt_interval).await;
        }
        Err(Error::Pending(hash.to_string()))
    }
}

#[async_trait]
impl ChainClient for EvmChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn pending_mock_requests(&self, target: &Address) -> Result<Vec<U256>, Error> {
        let data = self
            .rpc
            .call(target, &abi::encode_call(abi::GET_MOCK_REQUESTS, &[]))
            .await?;
        abi::decode_uint_array(&data)
    }

    async fn fulfill_mock_randomness(&self, target: &Address) -> Result<TxReceipt, Error> {
        self.send_transaction(target, abi::encode_call(abi::FULFILL_MOCK_RANDOMNESS, &[]))
            .await
    }

    async fn should_progress_loop(&self, target: &Address) -> Result<(bool, Vec<u8>), Error> {
        let data = self
            .rpc
            .call(target, &abi::encode_call(abi::SHOULD_PROGRESS_LOOP, &[]))
            .await?;
        abi::decode_bool_bytes(&data)
    }

    async fn loop_id(&self, target: &Address) -> Result<U256, Error> {
        let data = self
            .rpc
            .call(target, &abi::encode_call(abi::LOOP_ID, &[]))
            .await?;
        abi::decode_uint(&data)
    }

    async fn progress_loop(&self, target: &Address, data: &[u8]) -> Result<TxReceipt, Error> {
        self.send_transaction(target, abi::encode_bytes_call(abi::PROGRESS_LOOP, data))
            .await
    }

    async fn use_mock_vrf(&self, target: &Address) -> Result<bool, Error> {
        let data = self
            .rpc
            .call(target, &abi::encode_call(abi::USE_MOCK_VRF, &[]))
            .await?;
        abi::decode_bool(&data)
    }

    async fn controller_key_registered(
        &self,
        target: &Address,
        controller: &Address,
    ) -> Result<bool, Error> {
        let data = self
            .rpc
            .call(
                target,
                &abi::encode_call(
                    abi::CONTROLLER_KEY_REGISTERED,
                    &[abi::address_word(controller)],
                ),
            )
            .await?;
        abi::decode_bool(&data)
    }

    async fn register_controller_key(
        &self,
        target: &Address,
        controller: &Address,
        pk_x: U256,
        pk_y: U256,
    ) -> Result<TxReceipt, Error> {
        self.send_transaction(
            target,
            abi::encode_call(
                abi::REGISTER_CONTROLLER_KEY,
                &[
                    abi::address_word(controller),
                    abi::uint_word(pk_x),
                    abi::uint_word(pk_y),
                ],
            ),
        )
        .await
    }
}
