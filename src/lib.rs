//! FundPool Sync: chain-backed state for a crowdfunding pool front end
//!
//! This crate keeps a wallet session, a directory of fund pools and a single
//! pool's detail in sync with an EVM chain, and derives what the UI may show
//! and enable from that state.
//!
//! # Architecture
//!
//! - **Wallet Session**: active account and chain, fed by provider events
//! - **Contract Gateway**: `sol!`-typed factory and pool reads/writes over a `Provider`
//! - **Loaders**: all-or-nothing directory summaries, field-tolerant pool detail
//! - **View State**: pure status, progress and action eligibility derivations
//! - **Action Dispatcher**: confirmed writes turned into user notifications
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fundpool_sync::{PoolConfig, PoolStore, RpcProvider, SessionHandle};
//!
//! let config = PoolConfig::from_env();
//! let provider = Arc::new(RpcProvider::from_config(&config));
//! let session = SessionHandle::new(Some(provider));
//! session.probe().await?;
//!
//! let store = PoolStore::new(config, session);
//! store.refresh_directory().await;
//! for card in store.card_views(chrono::Utc::now()) {
//!     println!("{} {}", card.name, card.status.label());
//! }
//! ```

// Public modules
pub mod address;
pub mod config;
pub mod detail;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod pool;
pub mod provider;
pub mod session;
pub mod sync;
pub mod units;
pub mod view;

// Re-exports for convenience
pub use address::Address;
pub use alloy_primitives::U256;
pub use config::PoolConfig;
pub use detail::{load_detail, DETAIL_DEFAULTS};
pub use directory::{load_directory, DirectoryListing, DirectoryNotice, DirectoryStats};
pub use dispatcher::{ActionDispatcher, Notification, NotificationKind, PoolAction};
pub use error::PoolError;
pub use gateway::{ContractGateway, FactoryContract, PoolContract};
pub use pool::{Candidate, PoolDetail, PoolSummary};
pub use provider::{Provider, RpcProvider, TransactionReceipt, TransactionRequest};
pub use session::{ProviderEvent, SessionChange, SessionHandle, WalletSession};
pub use sync::{DetailState, Latest, LoadSequence, LoadTicket, PoolStore};
pub use units::{format_ether, parse_ether};
pub use view::{ActionEligibility, PoolCardView, PoolStatus, PoolView};

// Common result type
pub type Result<T> = std::result::Result<T, PoolError>;
