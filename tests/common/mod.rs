//! Shared test infrastructure for pool sync integration tests
//!
//! `MockChain` is an in-memory provider holding one factory and any number
//! of pools. It decodes calls with the gateway's `sol!` interfaces and
//! records every call's selector so tests can assert what was (and was not)
//! read. Writes are applied to its own state so reloads observe them.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{B256, U256};
use alloy_sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use chrono::Utc;
use fundpool_sync::gateway::IFundPool::IFundPoolCalls;
use fundpool_sync::gateway::IFundPoolFactory::IFundPoolFactoryCalls;
use fundpool_sync::units::WEI_PER_ETHER;
use fundpool_sync::{
    Address, PoolConfig, PoolError, Provider, SessionHandle, TransactionReceipt,
    TransactionRequest,
};

pub const FACTORY: u8 = 0xfa;
pub const SECS_PER_DAY: i64 = 86_400;

pub type Selector = [u8; 4];

/// Initialize logging once per test binary
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Deterministic address filled with `n`
pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// `n` wei
pub fn wei(n: u64) -> U256 {
    U256::from(n)
}

/// `n` whole ether in wei
pub fn ether(n: u64) -> U256 {
    WEI_PER_ETHER * U256::from(n)
}

/// Unix seconds `secs` from now
pub fn deadline_in(secs: i64) -> u64 {
    (Utc::now().timestamp() + secs) as u64
}

/// Factory configured, receipts polled fast
pub fn test_config() -> PoolConfig {
    PoolConfig {
        confirmation_poll_interval: Duration::from_millis(1),
        confirmation_max_attempts: 3,
        ..PoolConfig::default()
    }
    .with_factory(addr(FACTORY).to_checksum(None))
}

pub fn session_for(chain: &Arc<MockChain>) -> SessionHandle {
    let provider: Arc<dyn Provider> = chain.clone();
    SessionHandle::new(Some(provider))
}

/// Session already connected as `account`
pub async fn connected_session(chain: &Arc<MockChain>, account: Address) -> SessionHandle {
    chain.set_wallet_accounts(&[account], true);
    let session = session_for(chain);
    session.probe().await.unwrap();
    session
}

#[derive(Clone, Debug)]
pub struct MockPool {
    pub name: String,
    pub creator: Address,
    pub goal_amount: U256,
    pub deadline: u64,
    pub balance: U256,
    pub is_ended: bool,
    pub goal_reached: bool,
    pub has_withdrawn: bool,
    pub candidates: Vec<Address>,
    pub votes: HashMap<Address, U256>,
    pub contributions: HashMap<Address, U256>,
    pub voted: HashSet<Address>,
}

impl MockPool {
    /// Open pool with a week left
    pub fn new(name: &str, creator: Address, goal_amount: U256) -> Self {
        Self {
            name: name.to_string(),
            creator,
            goal_amount,
            deadline: deadline_in(7 * SECS_PER_DAY),
            balance: U256::ZERO,
            is_ended: false,
            goal_reached: false,
            has_withdrawn: false,
            candidates: Vec::new(),
            votes: HashMap::new(),
            contributions: HashMap::new(),
            voted: HashSet::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }

    /// Closed on-chain with the given outcome
    pub fn ended(mut self, goal_reached: bool) -> Self {
        self.deadline = deadline_in(-SECS_PER_DAY);
        self.is_ended = true;
        self.goal_reached = goal_reached;
        self
    }

    pub fn with_contribution(mut self, backer: Address, amount: U256) -> Self {
        *self.contributions.entry(backer).or_default() += amount;
        self.balance += amount;
        self
    }

    pub fn with_candidate(mut self, candidate: Address, votes: U256) -> Self {
        self.candidates.push(candidate);
        self.votes.insert(candidate, votes);
        self
    }

    pub fn with_vote_from(mut self, backer: Address) -> Self {
        self.voted.insert(backer);
        self
    }
}

#[derive(Default)]
struct ChainState {
    chain_id: String,
    wallet_accounts: Vec<String>,
    authorized: bool,
    reject_connect: bool,
    code: HashSet<Address>,
    factory_list: Vec<B256>,
    pools: HashMap<Address, MockPool>,
    failing: HashSet<(Address, Selector)>,
    calls: Vec<(Address, Selector)>,
    code_lookups: Vec<Address>,
    call_delay: Option<Duration>,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<String, TransactionReceipt>,
    reject_next_send: Option<String>,
    revert_next: bool,
    withhold_receipts: bool,
    created: u8,
}

pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    /// Chain `0x1` with a deployed, empty factory
    pub fn new() -> Arc<Self> {
        let mut state = ChainState {
            chain_id: "0x1".to_string(),
            ..ChainState::default()
        };
        state.code.insert(addr(FACTORY));
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_wallet_accounts(&self, accounts: &[Address], authorized: bool) {
        self.with_state(|s| {
            s.wallet_accounts = accounts.iter().map(|a| a.to_checksum(None)).collect();
            s.authorized = authorized;
        });
    }

    pub fn reject_connect(&self) {
        self.with_state(|s| s.reject_connect = true);
    }

    pub fn set_chain_id(&self, chain_id: &str) {
        self.with_state(|s| s.chain_id = chain_id.to_string());
    }

    /// Deploy `pool` at `address` and list it in the factory
    pub fn add_pool(&self, address: Address, pool: MockPool) {
        self.with_state(|s| {
            s.code.insert(address);
            s.pools.insert(address, pool);
            s.factory_list.push(address.into_word());
        });
    }

    /// List an address in the factory without deploying anything there
    pub fn list_undeployed(&self, address: Address) {
        self.with_state(|s| s.factory_list.push(address.into_word()));
    }

    /// List a raw word, e.g. one with dirty padding
    pub fn list_raw_word(&self, word: B256) {
        self.with_state(|s| s.factory_list.push(word));
    }

    /// Deploy without listing in the factory
    pub fn deploy_unlisted(&self, address: Address, pool: MockPool) {
        self.with_state(|s| {
            s.code.insert(address);
            s.pools.insert(address, pool);
        });
    }

    /// Deploy bytecode that is not a pool
    pub fn deploy_foreign(&self, address: Address) {
        self.with_state(|s| {
            s.code.insert(address);
        });
    }

    pub fn remove_factory(&self) {
        self.with_state(|s| {
            s.code.remove(&addr(FACTORY));
        });
    }

    /// Make one contract function revert at one address
    pub fn fail_read(&self, address: Address, selector: Selector) {
        self.with_state(|s| {
            s.failing.insert((address, selector));
        });
    }

    pub fn set_call_delay(&self, delay: Duration) {
        self.with_state(|s| s.call_delay = Some(delay));
    }

    pub fn reject_next_send(&self, message: &str) {
        self.with_state(|s| s.reject_next_send = Some(message.to_string()));
    }

    pub fn revert_next(&self) {
        self.with_state(|s| s.revert_next = true);
    }

    pub fn withhold_receipts(&self) {
        self.with_state(|s| s.withhold_receipts = true);
    }

    /// Contract reads issued against `address`
    pub fn reads(&self, address: Address) -> usize {
        self.with_state(|s| s.calls.iter().filter(|(to, _)| *to == address).count())
    }

    pub fn reads_of(&self, address: Address, selector: Selector) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|(to, sel)| *to == address && *sel == selector)
                .count()
        })
    }

    pub fn total_reads(&self) -> usize {
        self.with_state(|s| s.calls.len())
    }

    pub fn code_lookups(&self, address: Address) -> usize {
        self.with_state(|s| s.code_lookups.iter().filter(|a| **a == address).count())
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn pool(&self, address: Address) -> Option<MockPool> {
        self.with_state(|s| s.pools.get(&address).cloned())
    }

    pub fn modify_pool(&self, address: Address, f: impl FnOnce(&mut MockPool)) {
        self.with_state(|s| {
            if let Some(pool) = s.pools.get_mut(&address) {
                f(pool);
            }
        });
    }

    /// Pools deployed through `createFundPool`, in creation order
    pub fn created_pool(&self, n: u8) -> Address {
        created_address(n)
    }
}

fn created_address(n: u8) -> Address {
    let mut bytes = [0x77; 20];
    bytes[19] = n;
    Address::from(bytes)
}

fn reverted() -> PoolError {
    PoolError::Rpc {
        code: -32000,
        message: "execution reverted".to_string(),
    }
}

/// ABI return data for a single value
fn returns<T: SolValue>(value: T) -> Vec<u8> {
    value.abi_encode()
}

impl ChainState {
    fn answer(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, PoolError> {
        if to == addr(FACTORY) {
            return match IFundPoolFactoryCalls::abi_decode(data, true) {
                Ok(IFundPoolFactoryCalls::getAllPools(_)) => {
                    Ok(returns(self.factory_list.clone()))
                }
                _ => Err(reverted()),
            };
        }

        let pool = self.pools.get(&to).ok_or_else(reverted)?;
        let call = IFundPoolCalls::abi_decode(data, true).map_err(|_| reverted())?;
        let encoded = match call {
            IFundPoolCalls::name(_) => returns(pool.name.clone()),
            IFundPoolCalls::creator(_) => returns(pool.creator),
            IFundPoolCalls::goalAmount(_) => returns(pool.goal_amount),
            IFundPoolCalls::deadline(_) => returns(U256::from(pool.deadline)),
            IFundPoolCalls::getBalance(_) => returns(pool.balance),
            IFundPoolCalls::isEnded(_) => returns(pool.is_ended),
            IFundPoolCalls::goalReached(_) => returns(pool.goal_reached),
            IFundPoolCalls::hasWithdrawn(_) => returns(pool.has_withdrawn),
            IFundPoolCalls::getMyContribution(call) => {
                returns(pool.contributions.get(&call.user).copied().unwrap_or_default())
            }
            IFundPoolCalls::getCandidates(_) => returns(pool.candidates.clone()),
            IFundPoolCalls::getCandidateVotes(call) => {
                returns(pool.votes.get(&call.candidate).copied().unwrap_or_default())
            }
            IFundPoolCalls::hasVoted(call) => returns(pool.voted.contains(&call.voter)),
            _ => return Err(reverted()),
        };
        Ok(encoded)
    }

    /// Apply a transaction; `false` means the contract reverted
    fn execute(&mut self, tx: &TransactionRequest) -> bool {
        if tx.to == addr(FACTORY) {
            let Ok(IFundPoolFactoryCalls::createFundPool(call)) =
                IFundPoolFactoryCalls::abi_decode(&tx.data, true)
            else {
                return false;
            };
            let Ok(days) = u64::try_from(call.durationInDays) else {
                return false;
            };
            self.created += 1;
            let address = created_address(self.created);
            let pool = MockPool::new(&call.name, tx.from, call.goalAmount)
                .with_deadline(deadline_in(days as i64 * SECS_PER_DAY));
            self.code.insert(address);
            self.pools.insert(address, pool);
            self.factory_list.push(address.into_word());
            return true;
        }

        let now = Utc::now().timestamp() as u64;
        let Some(pool) = self.pools.get_mut(&tx.to) else {
            return false;
        };

        if tx.data.is_empty() {
            if pool.is_ended || now >= pool.deadline {
                return false;
            }
            *pool.contributions.entry(tx.from).or_default() += tx.value;
            pool.balance += tx.value;
            return true;
        }

        let Ok(call) = IFundPoolCalls::abi_decode(&tx.data, true) else {
            return false;
        };
        match call {
            IFundPoolCalls::addCandidate(call) if tx.from == pool.creator && !pool.is_ended => {
                pool.candidates.push(call.candidate);
                true
            }
            IFundPoolCalls::vote(call)
                if pool.candidates.contains(&call.candidate) && !pool.voted.contains(&tx.from) =>
            {
                pool.voted.insert(tx.from);
                let weight = pool.contributions.get(&tx.from).copied().unwrap_or_default();
                *pool.votes.entry(call.candidate).or_default() += weight;
                true
            }
            IFundPoolCalls::closePool(_) if !pool.is_ended && now >= pool.deadline => {
                pool.is_ended = true;
                pool.goal_reached = pool.balance >= pool.goal_amount;
                true
            }
            IFundPoolCalls::withdrawToWinner(_)
                if pool.is_ended && pool.goal_reached && !pool.has_withdrawn =>
            {
                pool.has_withdrawn = true;
                pool.balance = U256::ZERO;
                true
            }
            IFundPoolCalls::claimRefund(_) if pool.is_ended && !pool.goal_reached => {
                match pool.contributions.remove(&tx.from) {
                    Some(amount) if !amount.is_zero() => {
                        pool.balance -= amount;
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Provider for MockChain {
    async fn accounts(&self) -> Result<Vec<String>, PoolError> {
        Ok(self.with_state(|s| {
            if s.authorized {
                s.wallet_accounts.clone()
            } else {
                Vec::new()
            }
        }))
    }

    async fn request_accounts(&self) -> Result<Vec<String>, PoolError> {
        self.with_state(|s| {
            if s.reject_connect {
                return Err(PoolError::Rpc {
                    code: 4001,
                    message: "User rejected the request.".to_string(),
                });
            }
            s.authorized = true;
            Ok(s.wallet_accounts.clone())
        })
    }

    async fn chain_id(&self) -> Result<String, PoolError> {
        Ok(self.with_state(|s| s.chain_id.clone()))
    }

    async fn get_code(&self, address: &Address) -> Result<Vec<u8>, PoolError> {
        Ok(self.with_state(|s| {
            s.code_lookups.push(*address);
            if s.code.contains(address) {
                vec![0x60, 0x80, 0x60, 0x40]
            } else {
                Vec::new()
            }
        }))
    }

    async fn call(&self, to: &Address, data: Vec<u8>) -> Result<Vec<u8>, PoolError> {
        if let Some(delay) = self.with_state(|s| s.call_delay) {
            tokio::time::sleep(delay).await;
        }

        self.with_state(|s| {
            let selector: Selector = data
                .get(..4)
                .and_then(|head| head.try_into().ok())
                .ok_or_else(reverted)?;
            s.calls.push((*to, selector));
            if s.failing.contains(&(*to, selector)) {
                return Err(reverted());
            }
            s.answer(*to, &data)
        })
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, PoolError> {
        self.with_state(|s| {
            if let Some(message) = s.reject_next_send.take() {
                return Err(PoolError::Rpc {
                    code: 4001,
                    message,
                });
            }

            s.sent.push(tx.clone());
            let tx_hash = format!("0x{:064x}", s.sent.len());

            let success = if std::mem::take(&mut s.revert_next) {
                false
            } else {
                s.execute(tx)
            };

            if !s.withhold_receipts {
                s.receipts.insert(
                    tx_hash.clone(),
                    TransactionReceipt {
                        transaction_hash: tx_hash.clone(),
                        block_number: Some(s.sent.len() as u64),
                        success,
                    },
                );
            }
            Ok(tx_hash)
        })
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, PoolError> {
        Ok(self.with_state(|s| s.receipts.get(tx_hash).cloned()))
    }
}
