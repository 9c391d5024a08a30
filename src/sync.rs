//! Load orchestration
//!
//! Loads may overlap: a refresh can start while a slower one is still in
//! flight. Every load takes a ticket from a shared `LoadSequence`; `Latest`
//! only keeps a result if no newer ticket has been committed and the session
//! version is unchanged. A chain switch bumps the session version, which
//! clears everything loaded under the old chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::address;
use crate::config::PoolConfig;
use crate::detail::load_detail;
use crate::directory::{load_directory, DirectoryListing};
use crate::dispatcher::{ActionDispatcher, Notification, PoolAction};
use crate::error::PoolError;
use crate::gateway::ContractGateway;
use crate::pool::PoolDetail;
use crate::session::{ProviderEvent, SessionChange, SessionHandle};
use crate::view::{PoolCardView, PoolView};

/// Monotonic load counter
#[derive(Debug, Default)]
pub struct LoadSequence {
    last: AtomicU64,
}

impl LoadSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Identifies one load for staleness checks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub seq: u64,
    pub session_version: u64,
}

#[derive(Debug)]
struct Slot<T> {
    committed_seq: u64,
    session_version: u64,
    value: Option<T>,
}

/// Most recent committed load result
#[derive(Debug)]
pub struct Latest<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> Latest<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                committed_seq: 0,
                session_version: 0,
                value: None,
            }),
        }
    }

    /// Store `value` unless a newer load already landed or the session moved on
    pub fn commit(&self, ticket: LoadTicket, value: T) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.seq <= slot.committed_seq || ticket.session_version != slot.session_version {
            return false;
        }
        slot.committed_seq = ticket.seq;
        slot.value = Some(value);
        true
    }

    pub fn get(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Drop the value and only accept loads issued under `session_version`
    pub fn invalidate(&self, session_version: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.session_version = session_version;
        slot.value = None;
    }
}

impl<T: Clone> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the last detail load
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DetailState {
    Loaded(PoolDetail),
    NotFound { address: String, reason: String },
}

impl DetailState {
    pub fn address(&self) -> String {
        match self {
            DetailState::Loaded(detail) => detail.address().to_checksum(None),
            DetailState::NotFound { address, .. } => address.clone(),
        }
    }
}

/// Directory and detail state for one page session
pub struct PoolStore {
    config: PoolConfig,
    session: SessionHandle,
    dispatcher: ActionDispatcher,
    sequence: LoadSequence,
    seen_version: AtomicU64,
    directory: Latest<DirectoryListing>,
    detail: Latest<DetailState>,
}

impl PoolStore {
    pub fn new(config: PoolConfig, session: SessionHandle) -> Self {
        let seen_version = session.snapshot().version();
        let store = Self {
            dispatcher: ActionDispatcher::new(session.clone(), config.clone()),
            config,
            session,
            sequence: LoadSequence::new(),
            seen_version: AtomicU64::new(seen_version),
            directory: Latest::new(),
            detail: Latest::new(),
        };
        store.directory.invalidate(seen_version);
        store.detail.invalidate(seen_version);
        store
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn gateway(&self) -> Option<ContractGateway> {
        self.session
            .provider()
            .ok()
            .map(|provider| ContractGateway::with_config(provider.clone(), &self.config))
    }

    /// Clear all loaded state if the session version moved
    pub fn sync_session(&self) -> bool {
        let version = self.session.snapshot().version();
        let previous = self.seen_version.swap(version, Ordering::SeqCst);
        if previous == version {
            return false;
        }
        log::info!(
            "Session version {} -> {}, discarding loaded pool state",
            previous,
            version
        );
        self.directory.invalidate(version);
        self.detail.invalidate(version);
        true
    }

    fn ticket(&self) -> LoadTicket {
        self.sync_session();
        LoadTicket {
            seq: self.sequence.next(),
            session_version: self.session.snapshot().version(),
        }
    }

    /// Reload the directory; `None` if a newer load superseded this one
    pub async fn refresh_directory(&self) -> Option<DirectoryListing> {
        let ticket = self.ticket();

        let listing = match self.gateway() {
            Some(gateway) => load_directory(&gateway, &self.config).await,
            None => {
                log::warn!("No wallet provider, directory unavailable");
                DirectoryListing::default()
            }
        };

        self.sync_session();
        if self.directory.commit(ticket, listing.clone()) {
            Some(listing)
        } else {
            log::debug!("Discarding stale directory load #{}", ticket.seq);
            None
        }
    }

    /// Reload one pool; `None` if superseded or the account changed mid-load
    pub async fn refresh_detail(&self, address: &str) -> Option<DetailState> {
        let ticket = self.ticket();
        let account = self.session.snapshot().account();

        let state = match self.gateway() {
            Some(gateway) => match load_detail(&gateway, address, account).await {
                Ok(detail) => DetailState::Loaded(detail),
                Err(e) => DetailState::NotFound {
                    address: address.to_string(),
                    reason: e.to_string(),
                },
            },
            None => DetailState::NotFound {
                address: address.to_string(),
                reason: "wallet provider unavailable".to_string(),
            },
        };

        self.sync_session();
        if self.session.snapshot().account() != account {
            log::debug!("Account changed during detail load #{}, discarding", ticket.seq);
            return None;
        }
        if self.detail.commit(ticket, state.clone()) {
            Some(state)
        } else {
            log::debug!("Discarding stale detail load #{}", ticket.seq);
            None
        }
    }

    pub fn directory(&self) -> Option<DirectoryListing> {
        self.sync_session();
        self.directory.get()
    }

    pub fn detail(&self) -> Option<DetailState> {
        self.sync_session();
        self.detail.get()
    }

    pub fn card_views(&self, now: DateTime<Utc>) -> Vec<PoolCardView> {
        self.directory()
            .map(|listing| {
                listing
                    .pools
                    .iter()
                    .map(|pool| PoolCardView::derive(pool, now))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn pool_view(&self, now: DateTime<Utc>) -> Option<PoolView> {
        match self.detail()? {
            DetailState::Loaded(detail) => {
                Some(PoolView::derive(&detail, &self.session.snapshot(), now))
            }
            DetailState::NotFound { .. } => None,
        }
    }

    /// Forward a provider notification and reload whatever it invalidated
    pub async fn handle_event(&self, event: ProviderEvent) -> SessionChange {
        let open_detail = self.detail().map(|state| state.address());
        let change = self.session.apply(event);

        match change {
            SessionChange::Unchanged => {}
            SessionChange::AccountChanged => {
                if let Some(address) = open_detail {
                    self.refresh_detail(&address).await;
                }
            }
            SessionChange::Invalidated => {
                self.sync_session();
                match open_detail {
                    Some(address) => {
                        futures::join!(self.refresh_directory(), self.refresh_detail(&address));
                    }
                    None => {
                        self.refresh_directory().await;
                    }
                }
            }
        }

        change
    }

    /// Loaded detail for `pool`, if that is the pool currently shown
    fn shown_detail(&self, pool: &str) -> Option<PoolDetail> {
        let target = address::parse(pool).ok()?;
        match self.detail()? {
            DetailState::Loaded(detail) if detail.address() == target => Some(detail),
            _ => None,
        }
    }

    /// Run a write, then reload what it touched once it is confirmed
    ///
    /// When the target pool is the one on display, an action its loaded state
    /// rules out is refused without sending anything. Only that displayed
    /// detail is reloaded afterwards; the directory always is.
    pub async fn perform(&self, action: PoolAction) -> Notification {
        let shown = action.pool().and_then(|pool| self.shown_detail(pool));

        if let Some(ref detail) = shown {
            let account = self.session.snapshot().account();
            if let Err(e) = action.ensure_eligible(detail, account, Utc::now()) {
                log::warn!("Refusing {:?}: {}", action, e);
                return Notification::for_result(&action, &Err::<_, PoolError>(e));
            }
        }

        let (notification, receipt) = self.dispatcher.dispatch(&action).await;

        if receipt.is_some() {
            match (action.pool(), shown) {
                (Some(pool), Some(_)) => {
                    futures::join!(self.refresh_detail(pool), self.refresh_directory());
                }
                _ => {
                    self.refresh_directory().await;
                }
            }
        }

        notification
    }
}
