//! Account ledger - account creation and balance mutation
//!
//! Every balance change is one conditional write in the store. The ledger
//! never reads a balance in order to compute a new one, so concurrent
//! callers cannot both act on the same stale value.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::money;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount};
use crate::ports::{AccountStore, InsertOutcome};
use crate::services::UserDirectory;

/// Service owning accounts and their balances
#[derive(Clone)]
pub struct AccountLedger {
    repository: Arc<dyn AccountStore>,
    users: UserDirectory,
}

impl AccountLedger {
    pub fn new(repository: Arc<dyn AccountStore>, users: UserDirectory) -> Self {
        Self { repository, users }
    }

    /// Open an account for `user_id`
    ///
    /// A blank or missing `number` gets a generated 32-character hex number.
    /// A number already in use is a conflict; it is not pre-checked, the
    /// store's unique index rejects it.
    pub fn create(&self, user_id: i64, number: Option<&str>) -> Result<Account> {
        tracing::info!(
            user_id,
            number_supplied = number.is_some_and(|n| !n.trim().is_empty()),
            "creating account"
        );

        let user = self.users.get_by_id(user_id)?;
        let account = NewAccount::for_user(user.id, number);
        account.validate().map_err(|msg| {
            tracing::warn!(user_id, reason = %msg, "rejected account number");
            Error::invalid_argument(msg)
        })?;

        match self.repository.insert_account(&account)? {
            InsertOutcome::Inserted(saved) => {
                tracing::info!(account_id = saved.id, user_id, "account created");
                Ok(saved)
            }
            InsertOutcome::Duplicate => {
                tracing::warn!(user_id, "account number already exists");
                Err(Error::conflict("Account number already exists"))
            }
        }
    }

    /// Accounts owned by `user_id`, oldest first
    pub fn list_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        if !self.users.exists_by_id(user_id)? {
            tracing::warn!(user_id, "listing accounts of unknown user");
            return Err(Error::not_found("User not found"));
        }
        let accounts = self.repository.list_accounts_by_user(user_id)?;
        tracing::info!(user_id, count = accounts.len(), "listed accounts");
        Ok(accounts)
    }

    pub fn get(&self, account_id: i64) -> Result<Account> {
        self.repository
            .find_account(account_id)?
            .ok_or_else(|| Error::not_found("Account not found"))
    }

    /// Add `amount` to the balance
    pub fn deposit(&self, account_id: i64, amount: Decimal) -> Result<()> {
        tracing::info!(account_id, "deposit");
        require_valid_amount(amount)?;

        if self.repository.credit(account_id, amount)? == 0 {
            self.require_account(account_id)?;
            // The write is scoped by id alone, so this should be unreachable
            tracing::warn!(account_id, "deposit matched no rows on an existing account");
            return Err(Error::conflict("Deposit failed"));
        }

        tracing::info!(account_id, "deposit applied");
        Ok(())
    }

    /// Take `amount` from the balance if it covers it
    pub fn withdraw(&self, account_id: i64, amount: Decimal) -> Result<()> {
        tracing::info!(account_id, "withdrawal");
        require_valid_amount(amount)?;

        if self.repository.debit_if_sufficient(account_id, amount)? == 0 {
            self.require_account(account_id)?;
            tracing::warn!(account_id, "withdrawal rejected: insufficient funds");
            return Err(Error::conflict("Insufficient funds"));
        }

        tracing::info!(account_id, "withdrawal applied");
        Ok(())
    }

    /// Explain a zero-row write: missing account, or something else
    fn require_account(&self, account_id: i64) -> Result<()> {
        if self.repository.account_exists(account_id)? {
            Ok(())
        } else {
            tracing::warn!(account_id, "account not found");
            Err(Error::not_found("Account not found"))
        }
    }
}

fn require_valid_amount(amount: Decimal) -> Result<()> {
    money::validate_amount(amount).map_err(|msg| {
        tracing::warn!(reason = msg, "rejected amount");
        Error::invalid_argument(msg)
    })
}
