//! Least-recently-used account rotation.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::accounts::account::Account;
use crate::error::{AutomationError, Result};
use crate::store;

/// Owns the account collection and picks who plays next.
///
/// Selection only reads. The engine calls [`AccountRotator::mark_used`]
/// when an attempt begins; without it the same account is returned forever.
pub struct AccountRotator {
    accounts: Vec<Account>,
    state_path: Option<PathBuf>,
}

impl AccountRotator {
    /// Create an empty rotator persisting to `state_path`.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            accounts: Vec::new(),
            state_path: Some(state_path.into()),
        }
    }

    /// Create a rotator that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            accounts: Vec::new(),
            state_path: None,
        }
    }

    /// Path of the persisted collection, if any.
    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// Replace the in-memory collection with the persisted one. Failures
    /// are logged and leave an empty collection.
    pub fn load_all(&mut self) {
        let Some(path) = &self.state_path else {
            return;
        };

        match store::load_collection::<Account>(path) {
            Ok(mut accounts) => {
                for account in &mut accounts {
                    account.normalize();
                }
                debug!("loaded {} accounts from {}", accounts.len(), path.display());
                self.accounts = accounts;
            }
            Err(e) => {
                warn!("cannot load accounts, starting empty: {e}");
                self.accounts = Vec::new();
            }
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn get(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    /// Accounts ordered by name, for display.
    pub fn by_name(&self) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = self.accounts.iter().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        accounts
    }

    /// The active account used longest ago. Ties break by id.
    pub fn next_active(&self) -> Option<&Account> {
        self.accounts
            .iter()
            .filter(|a| a.active)
            .min_by(|a, b| a.last_run.cmp(&b.last_run).then_with(|| a.id.cmp(&b.id)))
    }

    /// Stamp an account as used at `now` and persist. Returns `false` when
    /// the account no longer exists.
    pub fn mark_used(&mut self, account_id: &str, now: DateTime<Utc>) -> bool {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            warn!("account {account_id} vanished before it could be marked used");
            return false;
        };
        account.last_run = now;
        if let Err(e) = self.persist() {
            error!("cannot persist account state: {e}");
        }
        true
    }

    /// Add an account. Ids must be unique.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] for a duplicate id or when the
    /// collection cannot be persisted.
    pub fn add(&mut self, mut account: Account) -> Result<()> {
        if self.get(&account.id).is_some() {
            return Err(AutomationError::Store(format!(
                "account {} already exists",
                account.id
            )));
        }
        account.normalize();
        self.accounts.push(account);
        self.persist()
    }

    /// Remove an account. Returns `false` when not found.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn remove(&mut self, account_id: &str) -> Result<bool> {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != account_id);
        if self.accounts.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Replace an account in place. Returns `false` when not found.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn update(&mut self, mut account: Account) -> Result<bool> {
        let Some(existing) = self.accounts.iter_mut().find(|a| a.id == account.id) else {
            return Ok(false);
        };
        account.normalize();
        *existing = account;
        self.persist()?;
        Ok(true)
    }

    /// Include or exclude an account from rotation. Returns `false` when
    /// not found.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection cannot be persisted.
    pub fn set_active(&mut self, account_id: &str, active: bool) -> Result<bool> {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return Ok(false);
        };
        account.active = active;
        self.persist()?;
        Ok(true)
    }

    /// Write the whole collection to disk.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the write fails.
    pub fn persist(&self) -> Result<()> {
        match &self.state_path {
            Some(path) => store::save_collection(path, &self.accounts),
            None => Ok(()),
        }
    }
}
