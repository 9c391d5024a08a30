//! Write actions
//!
//! Each action is submitted through the gateway and only reported successful
//! once its receipt is mined. Failures are returned verbatim; nothing is
//! retried and no local state is touched.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::address::{self, Address};
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::gateway::ContractGateway;
use crate::pool::PoolDetail;
use crate::provider::TransactionReceipt;
use crate::session::SessionHandle;
use crate::view::ActionEligibility;

/// A user-initiated write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolAction {
    CreatePool {
        name: String,
        goal_amount_wei: U256,
        duration_days: u64,
    },
    Fund {
        pool: String,
        amount_wei: U256,
    },
    AddCandidate {
        pool: String,
        candidate: String,
    },
    Vote {
        pool: String,
        candidate: String,
    },
    ClosePool {
        pool: String,
    },
    WithdrawToWinner {
        pool: String,
    },
    ClaimRefund {
        pool: String,
    },
}

impl PoolAction {
    /// Target pool, `None` for factory actions
    pub fn pool(&self) -> Option<&str> {
        match self {
            PoolAction::CreatePool { .. } => None,
            PoolAction::Fund { pool, .. }
            | PoolAction::AddCandidate { pool, .. }
            | PoolAction::Vote { pool, .. }
            | PoolAction::ClosePool { pool }
            | PoolAction::WithdrawToWinner { pool }
            | PoolAction::ClaimRefund { pool } => Some(pool.as_str()),
        }
    }

    /// Refuse an action that `detail`, the loaded state of its target pool,
    /// already rules out
    pub fn ensure_eligible(
        &self,
        detail: &PoolDetail,
        account: Option<Address>,
        now: DateTime<Utc>,
    ) -> Result<(), PoolError> {
        let actions = ActionEligibility::evaluate(detail, account, now);

        let (allowed, reason) = match self {
            PoolAction::CreatePool { .. } => return Ok(()),
            PoolAction::Fund { .. } => (
                actions.can_fund,
                "this pool is no longer accepting contributions",
            ),
            PoolAction::AddCandidate { .. } => (
                actions.can_add_candidate,
                "only the creator can add candidates while the pool is open",
            ),
            PoolAction::Vote { candidate, .. } => {
                let candidate = address::parse(candidate)?;
                (
                    actions.can_vote_for(detail, &candidate),
                    "you are not eligible to vote for this candidate",
                )
            }
            PoolAction::ClosePool { .. } => (
                actions.can_close,
                "the pool can only be closed once its deadline has passed",
            ),
            PoolAction::WithdrawToWinner { .. } => (
                actions.can_withdraw,
                "funds can only be withdrawn from a successful pool",
            ),
            PoolAction::ClaimRefund { .. } => (
                actions.can_claim_refund,
                "no refund is available for this account",
            ),
        };

        if allowed {
            Ok(())
        } else {
            Err(PoolError::NotEligible(reason.to_string()))
        }
    }

    fn success_message(&self) -> (&'static str, &'static str) {
        match self {
            PoolAction::CreatePool { .. } => (
                "Pool Created!",
                "Your fund pool has been created successfully.",
            ),
            PoolAction::Fund { .. } => ("Success!", "Your contribution has been sent."),
            PoolAction::AddCandidate { .. } => ("Success!", "Candidate added successfully."),
            PoolAction::Vote { .. } => ("Success!", "Your vote has been cast."),
            PoolAction::ClosePool { .. } => ("Success!", "Pool has been closed."),
            PoolAction::WithdrawToWinner { .. } => {
                ("Success!", "Funds have been withdrawn to the winner.")
            }
            PoolAction::ClaimRefund { .. } => ("Success!", "Your refund has been processed."),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Outcome message for the host to show
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn for_result(
        action: &PoolAction,
        result: &Result<TransactionReceipt, PoolError>,
    ) -> Self {
        match result {
            Ok(_) => {
                let (title, description) = action.success_message();
                Self {
                    kind: NotificationKind::Success,
                    title: title.to_string(),
                    description: description.to_string(),
                }
            }
            Err(e) => Self {
                kind: NotificationKind::Error,
                title: "Error".to_string(),
                description: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

pub struct ActionDispatcher {
    session: SessionHandle,
    config: PoolConfig,
}

impl ActionDispatcher {
    pub fn new(session: SessionHandle, config: PoolConfig) -> Self {
        Self { session, config }
    }

    /// Submit `action` from the session's current account and wait for it
    pub async fn execute(&self, action: &PoolAction) -> Result<TransactionReceipt, PoolError> {
        let provider = self.session.provider()?.clone();
        let from = self
            .session
            .snapshot()
            .account()
            .ok_or(PoolError::WalletNotConnected)?;
        let gateway = ContractGateway::with_config(provider, &self.config);

        log::info!("Executing {:?} from {}", action, from);

        match action {
            PoolAction::CreatePool {
                name,
                goal_amount_wei,
                duration_days,
            } => {
                let factory_address = self.config.factory_address()?;
                if name.trim().is_empty() {
                    return Err(PoolError::InvalidInput("pool name is required".to_string()));
                }
                if goal_amount_wei.is_zero() {
                    return Err(PoolError::InvalidAmount("goal must be positive".to_string()));
                }
                if *duration_days == 0 {
                    return Err(PoolError::InvalidAmount(
                        "duration must be at least one day".to_string(),
                    ));
                }
                let factory = gateway.factory(&factory_address).await?;
                factory
                    .create_fund_pool(&from, name.trim(), *goal_amount_wei, *duration_days)
                    .await
            }
            PoolAction::Fund { pool, amount_wei } => {
                if amount_wei.is_zero() {
                    return Err(PoolError::InvalidAmount(
                        "contribution must be positive".to_string(),
                    ));
                }
                gateway.pool(pool).await?.fund(&from, *amount_wei).await
            }
            PoolAction::AddCandidate { pool, candidate } => {
                let candidate = address::parse(candidate)?;
                gateway.pool(pool).await?.add_candidate(&from, &candidate).await
            }
            PoolAction::Vote { pool, candidate } => {
                let candidate = address::parse(candidate)?;
                gateway.pool(pool).await?.vote(&from, &candidate).await
            }
            PoolAction::ClosePool { pool } => gateway.pool(pool).await?.close_pool(&from).await,
            PoolAction::WithdrawToWinner { pool } => {
                gateway.pool(pool).await?.withdraw_to_winner(&from).await
            }
            PoolAction::ClaimRefund { pool } => gateway.pool(pool).await?.claim_refund(&from).await,
        }
    }

    /// Execute and turn the outcome into a notification
    pub async fn dispatch(
        &self,
        action: &PoolAction,
    ) -> (Notification, Option<TransactionReceipt>) {
        let result = self.execute(action).await;
        if let Err(ref e) = result {
            log::error!("Action {:?} failed: {}", action, e);
        }
        let notification = Notification::for_result(action, &result);
        (notification, result.ok())
    }
}
