//! Pool directory loading
//!
//! The factory enumeration is load-bearing: if it cannot be reached the
//! directory is empty. Individual pools are all-or-nothing: any failed read
//! drops the pool from the listing instead of surfacing a broken card.

use futures::future::join_all;
use serde::Serialize;

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::gateway::ContractGateway;
use crate::pool::PoolSummary;

/// Why a directory came back empty without being an error
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum DirectoryNotice {
    /// Factory address unset, placeholder, malformed or without code
    Unconfigured(String),
    /// Factory reachable but enumeration failed
    FactoryUnavailable(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    /// Newest pool first
    pub pools: Vec<PoolSummary>,
    pub notice: Option<DirectoryNotice>,
}

impl DirectoryListing {
    fn with_notice(notice: DirectoryNotice) -> Self {
        Self {
            pools: Vec::new(),
            notice: Some(notice),
        }
    }

    pub fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            total: self.pools.len(),
            active: self.pools.iter().filter(|p| !p.is_ended).count(),
            successful: self
                .pools
                .iter()
                .filter(|p| p.is_ended && p.goal_reached)
                .count(),
        }
    }
}

/// Header counters shown above the directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub total: usize,
    pub active: usize,
    pub successful: usize,
}

/// Load every pool the configured factory knows about
pub async fn load_directory(gateway: &ContractGateway, config: &PoolConfig) -> DirectoryListing {
    let factory_address = match config.factory_address() {
        Ok(address) => address,
        Err(e) => {
            log::warn!("Factory contract address not set or invalid: {}", e);
            return DirectoryListing::with_notice(DirectoryNotice::Unconfigured(e.to_string()));
        }
    };

    let factory = match gateway.factory(&factory_address).await {
        Ok(factory) => factory,
        Err(e) => {
            log::warn!("No usable factory at {}: {}", factory_address, e);
            return DirectoryListing::with_notice(DirectoryNotice::Unconfigured(e.to_string()));
        }
    };

    let addresses = match factory.all_pools().await {
        Ok(addresses) => addresses,
        Err(e) => {
            log::error!("Error getting pools from factory: {}", e);
            return DirectoryListing::with_notice(DirectoryNotice::FactoryUnavailable(
                e.to_string(),
            ));
        }
    };

    let results = join_all(addresses.iter().map(|address| load_summary(gateway, address))).await;

    let mut pools: Vec<PoolSummary> = addresses
        .iter()
        .zip(results)
        .filter_map(|(address, result)| match result {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::warn!("Dropping pool {} from directory: {}", address, e);
                None
            }
        })
        .collect();
    pools.reverse();

    log::info!(
        "Loaded {} of {} pools from factory {}",
        pools.len(),
        addresses.len(),
        factory_address
    );

    DirectoryListing {
        pools,
        notice: None,
    }
}

/// Summary fields for one pool; any failed read fails the whole pool
pub async fn load_summary(
    gateway: &ContractGateway,
    address: &str,
) -> Result<PoolSummary, PoolError> {
    let pool = gateway.pool(address).await?;

    let (name, creator, goal_amount, deadline, balance, is_ended, goal_reached) =
        futures::try_join!(
            pool.name(),
            pool.creator(),
            pool.goal_amount(),
            pool.deadline(),
            pool.balance(),
            pool.is_ended(),
            pool.goal_reached()
        )?;

    Ok(PoolSummary {
        address: pool.address(),
        name,
        creator,
        goal_amount,
        deadline,
        balance,
        is_ended,
        goal_reached,
    })
}
