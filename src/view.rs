//! Derived view state and action eligibility
//!
//! Everything here is a pure function of loaded pool state, the wallet
//! session and the wall clock. Nothing is stored; views are recomputed on
//! every render. Eligibility is advisory: the contracts re-validate on-chain.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::address::{self, serialize_checksummed, Address};
use crate::pool::{PoolDetail, PoolSummary};
use crate::session::WalletSession;
use crate::units::format_ether;

pub const MS_PER_DAY: i64 = 86_400_000;

/// Ratios are taken in parts per million before leaving integer math
const PROGRESS_SCALE: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PoolStatus {
    Successful,
    Failed,
    Active,
    /// Deadline passed but the pool has not been closed on-chain
    Ended,
}

impl PoolStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PoolStatus::Successful => "Successful",
            PoolStatus::Failed => "Failed",
            PoolStatus::Active => "Active",
            PoolStatus::Ended => "Ended",
        }
    }
}

/// `deadline * 1000 - now`, in milliseconds
pub fn time_left_ms(deadline: u64, now: DateTime<Utc>) -> i64 {
    i64::try_from(deadline)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000)
        .saturating_sub(now.timestamp_millis())
}

/// Whole days remaining, rounded up, never negative
pub fn days_left(time_left_ms: i64) -> i64 {
    if time_left_ms <= 0 {
        0
    } else {
        (time_left_ms + MS_PER_DAY - 1) / MS_PER_DAY
    }
}

/// Raw funding ratio in percent; `None` when the goal is zero
pub fn progress_pct(balance: U256, goal_amount: U256) -> Option<f64> {
    if goal_amount.is_zero() {
        return None;
    }
    let scaled = balance.saturating_mul(U256::from(PROGRESS_SCALE)) / goal_amount;
    let ppm = u64::try_from(scaled).unwrap_or(u64::MAX);
    Some(ppm as f64 / (PROGRESS_SCALE / 100) as f64)
}

/// Progress bar value, capped at 100
pub fn display_progress(balance: U256, goal_amount: U256) -> f64 {
    progress_pct(balance, goal_amount).map_or(0.0, |pct| pct.min(100.0))
}

pub fn classify(
    is_ended: bool,
    goal_reached: bool,
    deadline: u64,
    now: DateTime<Utc>,
) -> PoolStatus {
    match (is_ended, goal_reached) {
        (true, true) => PoolStatus::Successful,
        (true, false) => PoolStatus::Failed,
        (false, _) if time_left_ms(deadline, now) > 0 => PoolStatus::Active,
        (false, _) => PoolStatus::Ended,
    }
}

/// Which actions the UI should enable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEligibility {
    pub can_fund: bool,
    pub can_add_candidate: bool,
    pub can_vote: bool,
    pub can_close: bool,
    pub can_withdraw: bool,
    pub can_claim_refund: bool,
}

impl ActionEligibility {
    pub fn evaluate(detail: &PoolDetail, account: Option<Address>, now: DateTime<Utc>) -> Self {
        let pool = &detail.summary;
        let time_left = time_left_ms(pool.deadline, now);
        let is_creator = account.map_or(false, |a| a == pool.creator);
        let contributed = !detail.my_contribution.is_zero();

        Self {
            can_fund: !pool.is_ended && time_left > 0,
            can_add_candidate: is_creator && !pool.is_ended,
            can_vote: pool.is_ended && pool.goal_reached && contributed && !detail.has_voted,
            can_close: !pool.is_ended && time_left <= 0,
            can_withdraw: pool.is_ended && pool.goal_reached,
            can_claim_refund: pool.is_ended && !pool.goal_reached && contributed,
        }
    }

    /// A vote may only target a listed candidate
    pub fn can_vote_for(&self, detail: &PoolDetail, candidate: &Address) -> bool {
        self.can_vote && detail.is_candidate(candidate)
    }
}

/// Directory card
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCardView {
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    pub name: String,
    pub status: PoolStatus,
    pub display_progress: f64,
    pub days_left: i64,
    pub goal_ether: String,
    pub balance_ether: String,
    pub creator_short: String,
}

impl PoolCardView {
    pub fn derive(pool: &PoolSummary, now: DateTime<Utc>) -> Self {
        Self {
            address: pool.address,
            name: pool.name.clone(),
            status: classify(pool.is_ended, pool.goal_reached, pool.deadline, now),
            display_progress: display_progress(pool.balance, pool.goal_amount),
            days_left: days_left(time_left_ms(pool.deadline, now)),
            goal_ether: format_ether(pool.goal_amount),
            balance_ether: format_ether(pool.balance),
            creator_short: address::short(&pool.creator),
        }
    }
}

/// Detail page
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolView {
    pub card: PoolCardView,
    pub progress_pct: Option<f64>,
    pub time_left_ms: i64,
    pub my_contribution_ether: String,
    pub is_creator: bool,
    pub actions: ActionEligibility,
}

impl PoolView {
    pub fn derive(detail: &PoolDetail, session: &WalletSession, now: DateTime<Utc>) -> Self {
        let pool = &detail.summary;
        let account = session.account();

        Self {
            card: PoolCardView::derive(pool, now),
            progress_pct: progress_pct(pool.balance, pool.goal_amount),
            time_left_ms: time_left_ms(pool.deadline, now),
            my_contribution_ether: format_ether(detail.my_contribution),
            is_creator: account.map_or(false, |a| a == pool.creator),
            actions: ActionEligibility::evaluate(detail, account, now),
        }
    }
}
