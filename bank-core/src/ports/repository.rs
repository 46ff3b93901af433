//! Store ports - durable storage abstraction
//!
//! The services depend only on these traits. An implementation must apply
//! each call atomically: inserts either commit or are rejected, and the
//! balance updates are single conditional writes that report how many rows
//! they touched.

use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{Account, NewAccount, NewUser, User};

/// Outcome of an insert into a table with a unique column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The row was committed; carries the stored record
    Inserted(T),
    /// The store rejected the row because a unique value already exists
    Duplicate,
}

/// Storage for users
pub trait UserStore: Send + Sync {
    /// Insert a user, letting the store assign the id
    fn insert_user(&self, user: &NewUser) -> Result<InsertOutcome<User>>;

    fn find_user(&self, id: i64) -> Result<Option<User>>;

    fn user_exists(&self, id: i64) -> Result<bool>;

    fn email_exists(&self, email: &str) -> Result<bool>;

    /// All users in id order
    fn list_users(&self) -> Result<Vec<User>>;
}

/// Storage for accounts and their balances
pub trait AccountStore: Send + Sync {
    /// Insert an account with a zero balance.
    ///
    /// Returns `Duplicate` when the number is taken and
    /// `Error::NotFound` when the owning user does not exist.
    fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome<Account>>;

    fn find_account(&self, id: i64) -> Result<Option<Account>>;

    fn account_exists(&self, id: i64) -> Result<bool>;

    /// Accounts owned by `user_id` in id order
    fn list_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>>;

    /// `balance += amount WHERE id = ?`; returns rows affected
    fn credit(&self, id: i64, amount: Decimal) -> Result<usize>;

    /// `balance -= amount WHERE id = ? AND balance >= amount`; returns rows affected
    fn debit_if_sufficient(&self, id: i64, amount: Decimal) -> Result<usize>;
}

/// Read-only consistency checks over the whole store
pub trait IntegrityChecks: Send + Sync {
    /// Ids of accounts whose balance is below zero
    fn accounts_with_negative_balance(&self) -> Result<Vec<i64>>;

    /// Ids of accounts whose owner does not exist
    fn orphaned_accounts(&self) -> Result<Vec<i64>>;

    /// Names of schema migrations not yet applied
    fn pending_migrations(&self) -> Result<Vec<String>>;
}
