//! Typed access to the factory and pool contracts
//!
//! Handles are only created for addresses that parse and have deployed code.
//! Reads map every failure (revert, transport, decoding) to
//! `PoolError::ReadFailure` so loaders can apply their own fallback policy.
//! Writes submit, then block until the receipt is mined; reloading afterwards
//! is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use alloy_sol_types::{sol, sol_data, SolCall, SolType};

use crate::address::Address;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::provider::{encode_hex, Provider, TransactionReceipt, TransactionRequest};

sol! {
    /// Factory that deploys and enumerates fund pools
    interface IFundPoolFactory {
        function createFundPool(string name, uint256 goalAmount, uint256 durationInDays) external;
        function getAllPools() external view returns (address[] memory);
    }

    /// One crowdfunding pool
    interface IFundPool {
        function name() external view returns (string memory);
        function creator() external view returns (address);
        function goalAmount() external view returns (uint256);
        function deadline() external view returns (uint256);
        function isEnded() external view returns (bool);
        function goalReached() external view returns (bool);
        function hasWithdrawn() external view returns (bool);
        function getBalance() external view returns (uint256);
        function getMyContribution(address user) external view returns (uint256);
        function getCandidates() external view returns (address[] memory);
        function getCandidateVotes(address candidate) external view returns (uint256);
        function hasVoted(address voter) external view returns (bool);
        function addCandidate(address candidate) external;
        function vote(address candidate) external;
        function closePool() external;
        function withdrawToWinner() external;
        function claimRefund() external;
    }
}

/// `getAllPools()` return data taken as raw words, so entries with dirty
/// padding survive decoding and can be rejected one by one
type PoolWords = (sol_data::Array<sol_data::FixedBytes<32>>,);

/// Read/write gateway over a shared provider
#[derive(Clone)]
pub struct ContractGateway {
    provider: Arc<dyn Provider>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl ContractGateway {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_config(provider, &PoolConfig::default())
    }

    pub fn with_config(provider: Arc<dyn Provider>, config: &PoolConfig) -> Self {
        Self {
            provider,
            poll_interval: config.confirmation_poll_interval,
            max_attempts: config.confirmation_max_attempts.max(1),
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// True when bytecode is deployed at `address`
    pub async fn has_code(&self, address: &Address) -> Result<bool, PoolError> {
        Ok(!self.provider.get_code(address).await?.is_empty())
    }

    /// Validate format, then require deployed code
    pub async fn resolve_contract(&self, raw: &str) -> Result<Address, PoolError> {
        let address = crate::address::parse(raw)?;
        if !self.has_code(&address).await? {
            return Err(PoolError::not_a_contract(raw));
        }
        Ok(address)
    }

    /// Factory handle; the address comes pre-validated from configuration
    pub async fn factory(&self, address: &Address) -> Result<FactoryContract, PoolError> {
        if !self.has_code(address).await? {
            return Err(PoolError::not_a_contract(address.to_checksum(None)));
        }
        Ok(FactoryContract {
            gateway: self.clone(),
            address: *address,
        })
    }

    pub async fn pool(&self, raw: &str) -> Result<PoolContract, PoolError> {
        let address = self.resolve_contract(raw).await?;
        Ok(PoolContract {
            gateway: self.clone(),
            address,
        })
    }

    async fn call_raw<C: SolCall + Send>(
        &self,
        to: &Address,
        call: C,
    ) -> Result<Vec<u8>, PoolError> {
        self.provider
            .call(to, call.abi_encode())
            .await
            .map_err(|e| PoolError::read_failed(C::SIGNATURE, e))
    }

    /// `eth_call` plus typed decoding of the return data
    async fn read<C: SolCall + Send>(
        &self,
        to: &Address,
        call: C,
    ) -> Result<C::Return, PoolError> {
        let data = self.call_raw(to, call).await?;
        C::abi_decode_returns(&data, true).map_err(|e| PoolError::read_failed(C::SIGNATURE, e))
    }

    /// Submit a transaction and wait for it to be mined
    pub async fn submit(&self, tx: TransactionRequest) -> Result<TransactionReceipt, PoolError> {
        log::info!(
            "Submitting transaction from {} to {} (value={} wei, data={})",
            tx.from,
            tx.to,
            tx.value,
            if tx.data.len() >= 4 {
                encode_hex(&tx.data[..4])
            } else {
                "none".to_string()
            }
        );

        let tx_hash = self
            .provider
            .send_transaction(&tx)
            .await
            .map_err(|e| match e {
                PoolError::Rpc { .. } => e,
                other => PoolError::WriteFailure(other.to_string()),
            })?;

        log::info!("Transaction sent: {}", tx_hash);
        self.wait_for_confirmation(&tx_hash).await
    }

    /// Poll for the receipt until mined or attempts run out
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: &str,
    ) -> Result<TransactionReceipt, PoolError> {
        for attempt in 1..=self.max_attempts {
            match self.provider.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.success {
                        return Err(PoolError::WriteFailure(format!(
                            "transaction {} reverted",
                            tx_hash
                        )));
                    }
                    log::info!(
                        "✓ Transaction {} confirmed in block {:?}",
                        tx_hash,
                        receipt.block_number
                    );
                    return Ok(receipt);
                }
                Ok(None) => {
                    log::debug!("Transaction {} pending (attempt {})", tx_hash, attempt);
                }
                Err(e) => {
                    log::warn!("Receipt query for {} failed: {}", tx_hash, e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(PoolError::Unconfirmed {
            tx_hash: tx_hash.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Handle on the validated factory contract
#[derive(Clone)]
pub struct FactoryContract {
    gateway: ContractGateway,
    address: Address,
}

impl FactoryContract {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Every pool the factory has deployed, in creation order
    ///
    /// Entries are returned as strings exactly as reported: clean words in
    /// checksummed form, words with dirty padding as raw 32-byte hex. Callers
    /// validate each entry before using it.
    pub async fn all_pools(&self) -> Result<Vec<String>, PoolError> {
        let data = self
            .gateway
            .call_raw(&self.address, IFundPoolFactory::getAllPoolsCall {})
            .await?;
        let (words,) = <PoolWords as SolType>::abi_decode_params(&data, true)
            .map_err(|e| PoolError::read_failed(IFundPoolFactory::getAllPoolsCall::SIGNATURE, e))?;

        Ok(words
            .into_iter()
            .map(|word| {
                if word[..12].iter().all(|b| *b == 0) {
                    Address::from_word(word).to_checksum(None)
                } else {
                    encode_hex(word.as_slice())
                }
            })
            .collect())
    }

    pub async fn create_fund_pool(
        &self,
        from: &Address,
        name: &str,
        goal_amount_wei: U256,
        duration_days: u64,
    ) -> Result<TransactionReceipt, PoolError> {
        let call = IFundPoolFactory::createFundPoolCall {
            name: name.to_string(),
            goalAmount: goal_amount_wei,
            durationInDays: U256::from(duration_days),
        };
        self.gateway
            .submit(TransactionRequest {
                from: *from,
                to: self.address,
                value: U256::ZERO,
                data: call.abi_encode(),
            })
            .await
    }
}

/// Handle on one validated pool contract
#[derive(Clone)]
pub struct PoolContract {
    gateway: ContractGateway,
    address: Address,
}

impl PoolContract {
    pub fn address(&self) -> Address {
        self.address
    }

    async fn read<C: SolCall + Send>(&self, call: C) -> Result<C::Return, PoolError> {
        self.gateway.read(&self.address, call).await
    }

    pub async fn name(&self) -> Result<String, PoolError> {
        Ok(self.read(IFundPool::nameCall {}).await?._0)
    }

    pub async fn creator(&self) -> Result<Address, PoolError> {
        Ok(self.read(IFundPool::creatorCall {}).await?._0)
    }

    pub async fn goal_amount(&self) -> Result<U256, PoolError> {
        Ok(self.read(IFundPool::goalAmountCall {}).await?._0)
    }

    /// Deadline in unix seconds
    pub async fn deadline(&self) -> Result<u64, PoolError> {
        let raw = self.read(IFundPool::deadlineCall {}).await?._0;
        u64::try_from(raw).map_err(|_| {
            PoolError::read_failed(IFundPool::deadlineCall::SIGNATURE, "out of range")
        })
    }

    pub async fn balance(&self) -> Result<U256, PoolError> {
        Ok(self.read(IFundPool::getBalanceCall {}).await?._0)
    }

    pub async fn is_ended(&self) -> Result<bool, PoolError> {
        Ok(self.read(IFundPool::isEndedCall {}).await?._0)
    }

    pub async fn goal_reached(&self) -> Result<bool, PoolError> {
        Ok(self.read(IFundPool::goalReachedCall {}).await?._0)
    }

    pub async fn has_withdrawn(&self) -> Result<bool, PoolError> {
        Ok(self.read(IFundPool::hasWithdrawnCall {}).await?._0)
    }

    pub async fn my_contribution(&self, account: &Address) -> Result<U256, PoolError> {
        let call = IFundPool::getMyContributionCall { user: *account };
        Ok(self.read(call).await?._0)
    }

    pub async fn candidates(&self) -> Result<Vec<Address>, PoolError> {
        Ok(self.read(IFundPool::getCandidatesCall {}).await?._0)
    }

    pub async fn candidate_votes(&self, candidate: &Address) -> Result<U256, PoolError> {
        let call = IFundPool::getCandidateVotesCall {
            candidate: *candidate,
        };
        Ok(self.read(call).await?._0)
    }

    pub async fn has_voted(&self, account: &Address) -> Result<bool, PoolError> {
        Ok(self.read(IFundPool::hasVotedCall { voter: *account }).await?._0)
    }

    async fn transact(
        &self,
        from: &Address,
        value: U256,
        data: Vec<u8>,
    ) -> Result<TransactionReceipt, PoolError> {
        self.gateway
            .submit(TransactionRequest {
                from: *from,
                to: self.address,
                value,
                data,
            })
            .await
    }

    /// Plain value transfer into the pool
    pub async fn fund(
        &self,
        from: &Address,
        amount_wei: U256,
    ) -> Result<TransactionReceipt, PoolError> {
        self.transact(from, amount_wei, Vec::new()).await
    }

    pub async fn add_candidate(
        &self,
        from: &Address,
        candidate: &Address,
    ) -> Result<TransactionReceipt, PoolError> {
        let call = IFundPool::addCandidateCall {
            candidate: *candidate,
        };
        self.transact(from, U256::ZERO, call.abi_encode()).await
    }

    pub async fn vote(
        &self,
        from: &Address,
        candidate: &Address,
    ) -> Result<TransactionReceipt, PoolError> {
        let call = IFundPool::voteCall {
            candidate: *candidate,
        };
        self.transact(from, U256::ZERO, call.abi_encode()).await
    }

    pub async fn close_pool(&self, from: &Address) -> Result<TransactionReceipt, PoolError> {
        let data = IFundPool::closePoolCall {}.abi_encode();
        self.transact(from, U256::ZERO, data).await
    }

    pub async fn withdraw_to_winner(
        &self,
        from: &Address,
    ) -> Result<TransactionReceipt, PoolError> {
        let data = IFundPool::withdrawToWinnerCall {}.abi_encode();
        self.transact(from, U256::ZERO, data).await
    }

    pub async fn claim_refund(&self, from: &Address) -> Result<TransactionReceipt, PoolError> {
        let data = IFundPool::claimRefundCall {}.abi_encode();
        self.transact(from, U256::ZERO, data).await
    }
}
