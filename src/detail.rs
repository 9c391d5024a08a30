//! Pool detail loading
//!
//! Unlike the directory, a detail load degrades field by field: the user
//! asked for this address, so a partially readable pool is still shown.
//! The load only fails outright when the address is malformed, has no code,
//! or does not answer `name()`.

use std::future::Future;

use alloy_primitives::U256;
use futures::future::join_all;

use crate::address::Address;
use crate::error::PoolError;
use crate::gateway::{ContractGateway, PoolContract};
use crate::pool::{Candidate, PoolDetail, PoolSummary};

/// Value substituted for each field whose read fails
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDefaults {
    pub name: &'static str,
    pub creator: Address,
    pub goal_amount: U256,
    pub deadline: u64,
    pub balance: U256,
    pub is_ended: bool,
    pub goal_reached: bool,
    pub has_withdrawn: bool,
    pub candidates: Vec<Address>,
    pub candidate_votes: U256,
    pub my_contribution: U256,
    pub has_voted: bool,
}

pub const DETAIL_DEFAULTS: FieldDefaults = FieldDefaults {
    name: "Unknown Pool",
    creator: Address::ZERO,
    goal_amount: U256::ZERO,
    deadline: 0,
    balance: U256::ZERO,
    is_ended: false,
    goal_reached: false,
    has_withdrawn: false,
    candidates: Vec::new(),
    candidate_votes: U256::ZERO,
    my_contribution: U256::ZERO,
    has_voted: false,
};

/// Await a read, substituting `default` on failure
pub async fn read_or_default<T, F>(pool: &Address, field: &str, read: F, default: T) -> T
where
    F: Future<Output = Result<T, PoolError>>,
{
    match read.await {
        Ok(value) => value,
        Err(e) => {
            log::debug!("{}: {} unavailable ({}), using default", pool, field, e);
            default
        }
    }
}

/// Load full pool state as seen by `account`
pub async fn load_detail(
    gateway: &ContractGateway,
    address: &str,
    account: Option<Address>,
) -> Result<PoolDetail, PoolError> {
    let pool = gateway.pool(address).await?;

    // Distinguishes "not a pool" from a pool with flaky reads
    if let Err(e) = pool.name().await {
        log::error!("Address is not a valid pool contract: {} ({})", address, e);
        return Err(PoolError::NotAContract(format!(
            "{} is not a valid pool contract",
            address
        )));
    }

    let at = pool.address();
    let d = DETAIL_DEFAULTS;

    let my_contribution = async {
        match account {
            Some(ref who) => {
                let read = pool.my_contribution(who);
                read_or_default(&at, "myContribution", read, d.my_contribution).await
            }
            None => d.my_contribution,
        }
    };

    let (
        name,
        creator,
        goal_amount,
        deadline,
        balance,
        is_ended,
        goal_reached,
        has_withdrawn,
        candidate_addresses,
        my_contribution,
    ) = futures::join!(
        read_or_default(&at, "name", pool.name(), d.name.to_string()),
        read_or_default(&at, "creator", pool.creator(), d.creator),
        read_or_default(&at, "goalAmount", pool.goal_amount(), d.goal_amount),
        read_or_default(&at, "deadline", pool.deadline(), d.deadline),
        read_or_default(&at, "balance", pool.balance(), d.balance),
        read_or_default(&at, "isEnded", pool.is_ended(), d.is_ended),
        read_or_default(&at, "goalReached", pool.goal_reached(), d.goal_reached),
        read_or_default(&at, "hasWithdrawn", pool.has_withdrawn(), d.has_withdrawn),
        read_or_default(&at, "candidates", pool.candidates(), d.candidates.clone()),
        my_contribution
    );

    let (has_voted, candidates) = futures::join!(
        load_has_voted(&pool, account, is_ended && goal_reached),
        load_candidates(&pool, &candidate_addresses)
    );

    log::info!(
        "Loaded pool {} ({} candidates, ended={}, goalReached={})",
        at,
        candidates.len(),
        is_ended,
        goal_reached
    );

    Ok(PoolDetail {
        summary: PoolSummary {
            address: at,
            name,
            creator,
            goal_amount,
            deadline,
            balance,
            is_ended,
            goal_reached,
        },
        candidates,
        my_contribution,
        has_voted,
        has_withdrawn,
    })
}

/// Vote status only matters once the pool ended successfully
async fn load_has_voted(
    pool: &PoolContract,
    account: Option<Address>,
    ended_successfully: bool,
) -> bool {
    match account {
        Some(who) if ended_successfully => {
            read_or_default(
                &pool.address(),
                "hasVoted",
                pool.has_voted(&who),
                DETAIL_DEFAULTS.has_voted,
            )
            .await
        }
        _ => DETAIL_DEFAULTS.has_voted,
    }
}

async fn load_candidates(pool: &PoolContract, addresses: &[Address]) -> Vec<Candidate> {
    let at = pool.address();
    let votes = join_all(addresses.iter().map(|candidate| {
        read_or_default(
            &at,
            "candidateVotes",
            pool.candidate_votes(candidate),
            DETAIL_DEFAULTS.candidate_votes,
        )
    }))
    .await;

    addresses
        .iter()
        .zip(votes)
        .map(|(address, votes)| Candidate {
            address: *address,
            votes,
        })
        .collect()
}
