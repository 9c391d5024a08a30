//! Wallet session bookkeeping
//!
//! `WalletSession` is plain state: active account, active chain and a version
//! counter that moves whenever the chain changes. `SessionHandle` shares it
//! between the host (which forwards provider notifications) and the loaders
//! (which snapshot it at the start of every load).

use std::sync::{Arc, PoisonError, RwLock};

use crate::address::{self, Address};
use crate::error::PoolError;
use crate::provider::Provider;

/// Notification pushed by the wallet provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

/// What a session update means for dependent state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    /// Account connected, switched or disconnected
    AccountChanged,
    /// Chain switched; every loaded view must be discarded and reloaded
    Invalidated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSession {
    account: Option<Address>,
    chain_id: Option<String>,
    version: u64,
}

impl WalletSession {
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.chain_id.as_deref()
    }

    /// Bumped on every chain change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn on_accounts_changed(&mut self, accounts: &[String]) -> SessionChange {
        let next = match accounts.first() {
            None => None,
            Some(raw) => match address::parse(raw) {
                Ok(address) => Some(address),
                Err(e) => {
                    log::warn!("Provider reported an unusable account ({}), disconnecting", e);
                    None
                }
            },
        };

        if next == self.account {
            return SessionChange::Unchanged;
        }

        match next {
            Some(address) => log::info!("Active account: {}", address),
            None => log::info!("Wallet disconnected"),
        }
        self.account = next;
        SessionChange::AccountChanged
    }

    pub fn on_chain_changed(&mut self, chain_id: impl Into<String>) -> SessionChange {
        let chain_id = chain_id.into();
        log::info!("🔁 Chain changed to {}, invalidating loaded state", chain_id);
        self.chain_id = Some(chain_id);
        self.version += 1;
        SessionChange::Invalidated
    }

    pub fn apply(&mut self, event: ProviderEvent) -> SessionChange {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(&accounts),
            ProviderEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id),
        }
    }
}

/// Shared session context threaded through loaders and the dispatcher
#[derive(Clone)]
pub struct SessionHandle {
    provider: Option<Arc<dyn Provider>>,
    state: Arc<RwLock<WalletSession>>,
}

impl SessionHandle {
    /// `provider` is `None` when no wallet extension is present
    pub fn new(provider: Option<Arc<dyn Provider>>) -> Self {
        Self {
            provider,
            state: Arc::new(RwLock::new(WalletSession::default())),
        }
    }

    pub fn provider(&self) -> Result<&Arc<dyn Provider>, PoolError> {
        self.provider.as_ref().ok_or_else(|| {
            PoolError::ProviderUnavailable(
                "a browser wallet is required to use this application".to_string(),
            )
        })
    }

    /// Current state; callers take a fresh snapshot after every await
    pub fn snapshot(&self) -> WalletSession {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut WalletSession) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Pick up already-authorized accounts without prompting
    ///
    /// The reported account list replaces the session account, so access
    /// revoked while the page was away disconnects it. Without a provider the
    /// session simply stays disconnected.
    pub async fn probe(&self) -> Result<WalletSession, PoolError> {
        let Some(provider) = self.provider.as_ref() else {
            log::debug!("No wallet provider, skipping account check");
            return Ok(self.snapshot());
        };

        let (accounts, chain_id) = futures::try_join!(provider.accounts(), provider.chain_id())?;

        Ok(self.update(|session| {
            session.chain_id = Some(chain_id);
            session.on_accounts_changed(&accounts);
            session.clone()
        }))
    }

    /// Request account authorization; may prompt the user
    pub async fn connect(&self) -> Result<WalletSession, PoolError> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await?;
        let chain_id = provider.chain_id().await?;

        if accounts.is_empty() {
            log::warn!("Wallet authorized no accounts");
            return Err(PoolError::WalletNotConnected);
        }

        Ok(self.update(|session| {
            session.chain_id = Some(chain_id);
            session.on_accounts_changed(&accounts);
            session.clone()
        }))
    }

    /// Forward a provider notification
    pub fn apply(&self, event: ProviderEvent) -> SessionChange {
        self.update(|session| session.apply(event))
    }
}
