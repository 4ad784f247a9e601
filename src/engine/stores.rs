//! The task and account collections, and the edits a control surface can
//! request on them.

use std::path::{Path, PathBuf};

use crate::accounts::{Account, AccountRotator};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::scheduler::{GameTask, TaskScheduler};

/// Edit requested by a control surface.
///
/// While the engine runs these are applied by the worker thread, so the
/// collections only ever have one writer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Register a new task.
    AddTask(GameTask),
    /// Replace the task with the same id.
    UpdateTask(GameTask),
    /// Remove a task by id.
    RemoveTask(String),
    /// Include or exclude a task from scheduling.
    SetTaskEnabled { id: String, enabled: bool },
    /// Register a new account.
    AddAccount(Account),
    /// Replace the account with the same id.
    UpdateAccount(Account),
    /// Remove an account by id.
    RemoveAccount(String),
    /// Include or exclude an account from rotation.
    SetAccountActive { id: String, active: bool },
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddTask(t) => write!(f, "add task {}", t.name),
            Self::UpdateTask(t) => write!(f, "update task {}", t.name),
            Self::RemoveTask(id) => write!(f, "remove task {id}"),
            Self::SetTaskEnabled { id, enabled } => write!(f, "set task {id} enabled={enabled}"),
            Self::AddAccount(a) => write!(f, "add account {}", a.name),
            Self::UpdateAccount(a) => write!(f, "update account {}", a.name),
            Self::RemoveAccount(id) => write!(f, "remove account {id}"),
            Self::SetAccountActive { id, active } => {
                write!(f, "set account {id} active={active}")
            }
        }
    }
}

/// Both collections, owned together by whoever drives the engine loop.
pub struct Stores {
    /// Tasks and their run state.
    pub scheduler: TaskScheduler,
    /// Accounts in rotation.
    pub rotator: AccountRotator,
}

impl Stores {
    /// Stores backed by the configured data directory. Nothing is read
    /// until [`Stores::load_all`].
    pub fn open(config: &StorageConfig) -> Self {
        Self {
            scheduler: TaskScheduler::new(config.tasks_path()),
            rotator: AccountRotator::new(config.accounts_path()),
        }
    }

    /// Stores that never touch disk.
    pub fn in_memory() -> Self {
        Self {
            scheduler: TaskScheduler::in_memory(),
            rotator: AccountRotator::in_memory(),
        }
    }

    /// Reload both collections from disk.
    pub fn load_all(&mut self) {
        self.scheduler.load_all();
        self.rotator.load_all();
    }

    /// Where each collection persists.
    pub(crate) fn paths(&self) -> StorePaths {
        StorePaths {
            tasks: self.scheduler.state_path().map(Path::to_path_buf),
            accounts: self.rotator.state_path().map(Path::to_path_buf),
        }
    }

    /// Apply an edit. Returns `false` when the record it names does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate ids or when persisting fails.
    pub fn apply(&mut self, command: EngineCommand) -> Result<bool> {
        match command {
            EngineCommand::AddTask(task) => self.scheduler.add(task).map(|()| true),
            EngineCommand::UpdateTask(task) => self.scheduler.update(task),
            EngineCommand::RemoveTask(id) => self.scheduler.remove(&id),
            EngineCommand::SetTaskEnabled { id, enabled } => {
                self.scheduler.set_enabled(&id, enabled)
            }
            EngineCommand::AddAccount(account) => self.rotator.add(account).map(|()| true),
            EngineCommand::UpdateAccount(account) => self.rotator.update(account),
            EngineCommand::RemoveAccount(id) => self.rotator.remove(&id),
            EngineCommand::SetAccountActive { id, active } => self.rotator.set_active(&id, active),
        }
    }
}

/// Persistence locations of a [`Stores`], kept so the collections can be
/// rebuilt when the worker holding them is lost.
#[derive(Debug, Clone, Default)]
pub(crate) struct StorePaths {
    tasks: Option<PathBuf>,
    accounts: Option<PathBuf>,
}

impl StorePaths {
    /// Fresh stores at these locations, loaded from disk.
    pub(crate) fn reopen(&self) -> Stores {
        let mut stores = Stores {
            scheduler: self
                .tasks
                .clone()
                .map_or_else(TaskScheduler::in_memory, TaskScheduler::new),
            rotator: self
                .accounts
                .clone()
                .map_or_else(AccountRotator::in_memory, AccountRotator::new),
        };
        stores.load_all();
        stores
    }
}
