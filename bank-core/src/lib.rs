//! Bank Core - users, accounts and balances
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Account) and amount rules
//! - **ports**: Store traits the services depend on
//! - **services**: User directory, account ledger, health checks, event log
//! - **adapters**: Concrete stores (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::{Config, SETTINGS_FILE};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{Account, NewAccount, NewUser, User};

/// Main context for bank operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct BankContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub users: UserDirectory,
    pub accounts: AccountLedger,
    pub health: HealthService,
}

impl BankContext {
    /// Open the bank stored in `bank_dir`, creating and migrating it if needed
    ///
    /// A first run writes the default settings.json alongside the database.
    pub fn new(bank_dir: &Path) -> Result<Self> {
        let config = Config::load(bank_dir)?;
        if !bank_dir.join(SETTINGS_FILE).exists() {
            config
                .save(bank_dir)
                .with_context(|| format!("Failed to write settings in {}", bank_dir.display()))?;
        }
        let db_path = config.database_path(bank_dir);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        Self::assemble(config, repository)
    }

    /// A throwaway bank that lives only as long as the context
    pub fn in_memory() -> Result<Self> {
        Self::assemble(Config::default(), Arc::new(DuckDbRepository::open_in_memory()?))
    }

    fn assemble(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        repository.ensure_schema()?;

        let users = UserDirectory::new(repository.clone());
        let accounts = AccountLedger::new(repository.clone(), users.clone());
        let health = HealthService::new(repository.clone());

        Ok(Self {
            config,
            repository,
            users,
            accounts,
            health,
        })
    }
}
