//! In-memory store
//!
//! Implements the store ports over plain collections behind one lock. Each
//! port call takes the lock once, so inserts and conditional writes are
//! atomic just as they are in the database. Used by service tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use crate::domain::money;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount, NewUser, User};
use crate::ports::{AccountStore, InsertOutcome, IntegrityChecks, UserStore};

#[derive(Default)]
struct State {
    /// Shared by users and accounts, like the database sequence
    next_id: i64,
    users: BTreeMap<i64, User>,
    accounts: BTreeMap<i64, Account>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

impl UserStore for MemoryStore {
    fn insert_user(&self, user: &NewUser) -> Result<InsertOutcome<User>> {
        let mut state = self.state()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Ok(InsertOutcome::Duplicate);
        }

        let id = state.next_id();
        let stored = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            registered_at: user.registered_at,
        };
        state.users.insert(id, stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    fn user_exists(&self, id: i64) -> Result<bool> {
        Ok(self.state()?.users.contains_key(&id))
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.state()?.users.values().any(|u| u.email == email))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.state()?.users.values().cloned().collect())
    }
}

impl AccountStore for MemoryStore {
    fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome<Account>> {
        let mut state = self.state()?;
        if !state.users.contains_key(&account.user_id) {
            return Err(Error::not_found(format!("User {} not found", account.user_id)));
        }
        if state.accounts.values().any(|a| a.number == account.number) {
            return Ok(InsertOutcome::Duplicate);
        }

        let id = state.next_id();
        let stored = Account {
            id,
            number: account.number.clone(),
            balance: money::to_fixed(Decimal::ZERO),
            user_id: account.user_id,
            version: 0,
        };
        state.accounts.insert(id, stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    fn find_account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.state()?.accounts.get(&id).cloned())
    }

    fn account_exists(&self, id: i64) -> Result<bool> {
        Ok(self.state()?.accounts.contains_key(&id))
    }

    fn list_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        Ok(self
            .state()?
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn credit(&self, id: i64, amount: Decimal) -> Result<usize> {
        let mut state = self.state()?;
        match state.accounts.get_mut(&id) {
            Some(account) => {
                let balance = account
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| Error::database("balance overflow"))?;
                account.balance = money::to_fixed(balance);
                account.version += 1;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn debit_if_sufficient(&self, id: i64, amount: Decimal) -> Result<usize> {
        let mut state = self.state()?;
        match state.accounts.get_mut(&id) {
            Some(account) if account.balance >= amount => {
                account.balance = money::to_fixed(account.balance - amount);
                account.version += 1;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

impl IntegrityChecks for MemoryStore {
    fn accounts_with_negative_balance(&self) -> Result<Vec<i64>> {
        Ok(self
            .state()?
            .accounts
            .values()
            .filter(|a| a.balance < Decimal::ZERO)
            .map(|a| a.id)
            .collect())
    }

    fn orphaned_accounts(&self) -> Result<Vec<i64>> {
        let state = self.state()?;
        Ok(state
            .accounts
            .values()
            .filter(|a| !state.users.contains_key(&a.user_id))
            .map(|a| a.id)
            .collect())
    }

    // No schema to migrate
    fn pending_migrations(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
