//! Per-owner token allowance.
//!
//! The engine only estimates and reports tokens. Enforcement happens here,
//! at the request boundary, before a run starts: the run's advisory estimate
//! is reserved against what the owner has left, and once the run ends the
//! reservation is settled with the tokens actually reported. Concurrent
//! requests of one owner see each other's reservations. Both figures are
//! `ceil(chars / 4)` estimates unless a backend meters usage, so the
//! allowance is approximate.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(
        "token allowance exceeded for '{owner}': {used} used + {requested} estimated > {allowance}"
    )]
    AllowanceExceeded {
        owner: String,
        /// Settled usage plus outstanding reservations.
        used: u64,
        requested: u64,
        allowance: u64,
    },
}

#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Hold `estimated_tokens` for `owner`, failing when the allowance
    /// cannot cover it on top of usage and other reservations.
    async fn reserve(&self, owner: &str, estimated_tokens: u64) -> Result<(), LedgerError>;

    /// Release a reservation of `reserved_tokens` and add `used_tokens` to
    /// `owner`'s usage.
    async fn settle(&self, owner: &str, reserved_tokens: u64, used_tokens: u64);

    /// Settled usage of `owner`.
    async fn used(&self, owner: &str) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
struct Account {
    used: u64,
    reserved: u64,
}

/// In-process ledger. No allowance means unlimited.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    allowance: Option<u64>,
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryLedger {
    pub fn new(allowance: Option<u64>) -> Self {
        Self {
            allowance,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn allowance(&self) -> Option<u64> {
        self.allowance
    }

    /// Tokens currently held by unsettled reservations of `owner`.
    pub async fn reserved(&self, owner: &str) -> u64 {
        self.accounts
            .lock()
            .await
            .get(owner)
            .map_or(0, |account| account.reserved)
    }
}

#[async_trait]
impl UsageLedger for InMemoryLedger {
    async fn reserve(&self, owner: &str, estimated_tokens: u64) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(owner.to_string()).or_default();

        if let Some(allowance) = self.allowance {
            let committed = account.used.saturating_add(account.reserved);
            if committed.saturating_add(estimated_tokens) > allowance {
                return Err(LedgerError::AllowanceExceeded {
                    owner: owner.to_string(),
                    used: committed,
                    requested: estimated_tokens,
                    allowance,
                });
            }
        }

        account.reserved = account.reserved.saturating_add(estimated_tokens);
        debug!(owner, estimated_tokens, reserved = account.reserved, "tokens reserved");
        Ok(())
    }

    async fn settle(&self, owner: &str, reserved_tokens: u64, used_tokens: u64) {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(owner.to_string()).or_default();
        account.reserved = account.reserved.saturating_sub(reserved_tokens);
        account.used = account.used.saturating_add(used_tokens);
        debug!(owner, used_tokens, total = account.used, "usage settled");
    }

    async fn used(&self, owner: &str) -> u64 {
        self.accounts
            .lock()
            .await
            .get(owner)
            .map_or(0, |account| account.used)
    }
}
