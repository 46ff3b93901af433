//! DuckDB repository implementation

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount, NewUser, User};
use crate::ports::{AccountStore, InsertOutcome, IntegrityChecks, UserStore};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Columns selected for an [`Account`]; balance is read as text to stay exact
const ACCOUNT_COLUMNS: &str =
    "id, number, CAST(balance AS VARCHAR) AS balance, user_id, version";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB reports unique and primary key violations as
/// `Constraint Error: Duplicate key "..." violates unique constraint`
fn is_unique_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("duplicate key")
        || (lower.contains("constraint error") && lower.contains("unique constraint"))
}

fn is_foreign_key_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("constraint error") && lower.contains("foreign key")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Raw account row as selected by [`ACCOUNT_COLUMNS`]
type AccountRow = (i64, String, String, i64, i64);

/// Raw user row: id, name, email, registered_at
type UserRow = (i64, String, String, String);

/// DuckDB repository implementation
///
/// All statements go through one connection. Each call is a single
/// auto-committed statement, so every insert and balance update is atomic.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the file.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> anyhow::Result<crate::services::MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "schema migrated");
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    fn count(&self, sql: &str, id: i64) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(sql, [id], |row| row.get(0))?)
    }

    fn select_ids(&self, sql: &str) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl UserStore for DuckDbRepository {
    fn insert_user(&self, user: &NewUser) -> Result<InsertOutcome<User>> {
        let conn = self.conn()?;
        let registered_at = format_timestamp(&user.registered_at);

        let inserted = conn.query_row(
            "INSERT INTO users (name, email, registered_at) VALUES (?, ?, ?) RETURNING id",
            params![user.name, user.email, registered_at],
            |row| row.get::<_, i64>(0),
        );

        match inserted {
            Ok(id) => Ok(InsertOutcome::Inserted(row_to_user((
                id,
                user.name.clone(),
                user.email.clone(),
                registered_at,
            ))?)),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn find_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let row: Option<UserRow> = conn
            .query_row(
                "SELECT id, name, email, registered_at FROM users WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(row_to_user).transpose()
    }

    fn user_exists(&self, id: i64) -> Result<bool> {
        Ok(self.count("SELECT COUNT(*) FROM users WHERE id = ?", id)? > 0)
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?",
            [email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, email, registered_at FROM users ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<UserRow>, _>>()?;

        rows.into_iter().map(row_to_user).collect()
    }
}

impl AccountStore for DuckDbRepository {
    fn insert_account(&self, account: &NewAccount) -> Result<InsertOutcome<Account>> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO accounts (number, user_id) VALUES (?, ?) RETURNING {}",
            ACCOUNT_COLUMNS
        );

        match conn.query_row(&sql, params![account.number, account.user_id], read_account_row) {
            Ok(row) => Ok(InsertOutcome::Inserted(row_to_account(row)?)),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::not_found(format!(
                "User {} not found",
                account.user_id
            ))),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn find_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        let row = conn.query_row(&sql, [id], read_account_row).optional()?;

        row.map(row_to_account).transpose()
    }

    fn account_exists(&self, id: i64) -> Result<bool> {
        Ok(self.count("SELECT COUNT(*) FROM accounts WHERE id = ?", id)? > 0)
    }

    fn list_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY id",
            ACCOUNT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([user_id], read_account_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(row_to_account).collect()
    }

    fn credit(&self, id: i64, amount: Decimal) -> Result<usize> {
        let conn = self.conn()?;
        // Amount is bound as text so it never passes through f64
        let rows = conn.execute(
            "UPDATE accounts
             SET balance = balance + CAST(? AS DECIMAL(19, 2)), version = version + 1
             WHERE id = ?",
            params![amount.to_string(), id],
        )?;
        Ok(rows)
    }

    fn debit_if_sufficient(&self, id: i64, amount: Decimal) -> Result<usize> {
        let conn = self.conn()?;
        let amount = amount.to_string();
        // DECIMAL(38, 2) holds any valid amount, so one larger than the column
        // can ever store fails the guard instead of the cast
        let rows = conn.execute(
            "UPDATE accounts
             SET balance = balance - CAST(? AS DECIMAL(38, 2)), version = version + 1
             WHERE id = ? AND balance >= CAST(? AS DECIMAL(38, 2))",
            params![amount, id, amount],
        )?;
        Ok(rows)
    }
}

impl IntegrityChecks for DuckDbRepository {
    fn accounts_with_negative_balance(&self) -> Result<Vec<i64>> {
        self.select_ids("SELECT id FROM accounts WHERE balance < 0 ORDER BY id")
    }

    fn orphaned_accounts(&self) -> Result<Vec<i64>> {
        self.select_ids(
            "SELECT a.id FROM accounts a
             LEFT JOIN users u ON u.id = a.user_id
             WHERE u.id IS NULL
             ORDER BY a.id",
        )
    }

    fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .get_pending()
            .map_err(|e| Error::database(format!("{:#}", e)))
    }
}

fn read_account_row(row: &duckdb::Row) -> duckdb::Result<AccountRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn row_to_account((id, number, balance, user_id, version): AccountRow) -> Result<Account> {
    let balance = Decimal::from_str(&balance)
        .map_err(|e| Error::database(format!("Bad balance {:?} on account {}: {}", balance, id, e)))?;
    Ok(Account {
        id,
        number,
        balance,
        user_id,
        version,
    })
}

fn row_to_user((id, name, email, registered_at): UserRow) -> Result<User> {
    Ok(User {
        id,
        name,
        email,
        registered_at: parse_timestamp(&registered_at)?,
    })
}

// Helper functions

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("Bad timestamp {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn insert_user(repo: &DuckDbRepository, email: &str) -> User {
        match repo.insert_user(&NewUser::new("Test", email)).unwrap() {
            InsertOutcome::Inserted(user) => user,
            InsertOutcome::Duplicate => panic!("unexpected duplicate"),
        }
    }

    fn insert_account(repo: &DuckDbRepository, user_id: i64, number: &str) -> Account {
        match repo.insert_account(&NewAccount::new(user_id, number)).unwrap() {
            InsertOutcome::Inserted(account) => account,
            InsertOutcome::Duplicate => panic!("unexpected duplicate"),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_ids_come_from_one_sequence() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        let account = insert_account(&repo, user.id, "ACC000001");

        assert_eq!(user.id, 1);
        assert_eq!(account.id, 2);
        assert_eq!(account.balance.to_string(), "0.00");
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_registered_at_round_trips() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        let found = repo.find_user(user.id).unwrap().unwrap();
        assert_eq!(found, user);
    }

    #[test]
    fn test_duplicate_email_is_reported_as_duplicate() {
        let repo = repo();
        insert_user(&repo, "alice@example.com");

        let outcome = repo
            .insert_user(&NewUser::new("Other", "alice@example.com"))
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(repo.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_number_is_reported_as_duplicate() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        insert_account(&repo, user.id, "DUP-000001");

        let outcome = repo
            .insert_account(&NewAccount::new(user.id, "DUP-000001"))
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);
    }

    #[test]
    fn test_account_for_missing_user_is_not_found() {
        let repo = repo();
        let err = repo
            .insert_account(&NewAccount::new(999, "ACC000001"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(repo.orphaned_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_credit_and_debit_report_rows_affected() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        let account = insert_account(&repo, user.id, "ACC000001");

        assert_eq!(repo.credit(account.id, dec("10.00")).unwrap(), 1);
        assert_eq!(repo.debit_if_sufficient(account.id, dec("10.01")).unwrap(), 0);
        assert_eq!(repo.debit_if_sufficient(account.id, dec("10.00")).unwrap(), 1);
        assert_eq!(repo.credit(12345, dec("1.00")).unwrap(), 0);
        assert_eq!(repo.debit_if_sufficient(12345, dec("1.00")).unwrap(), 0);

        let account = repo.find_account(account.id).unwrap().unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.version, 2);
    }

    #[test]
    fn test_pending_migrations_until_schema_is_ensured() {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        let all: Vec<String> = crate::migrations::MIGRATIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(repo.pending_migrations().unwrap(), all);

        repo.ensure_schema().unwrap();
        assert!(repo.pending_migrations().unwrap().is_empty());
    }

    #[test]
    fn test_amounts_beyond_column_range() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        let account = insert_account(&repo, user.id, "ACC000001");
        repo.credit(account.id, dec("60.00")).unwrap();

        let huge = dec("100000000000000000000.00");
        assert_eq!(repo.debit_if_sufficient(account.id, huge).unwrap(), 0);
        assert_eq!(repo.debit_if_sufficient(12345, huge).unwrap(), 0);
        assert_eq!(repo.debit_if_sufficient(account.id, Decimal::MAX).unwrap(), 0);
        assert!(repo.credit(account.id, huge).is_err());

        let account = repo.find_account(account.id).unwrap().unwrap();
        assert_eq!(account.balance, dec("60.00"));
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_cents_add_up_exactly() {
        let repo = repo();
        let user = insert_user(&repo, "alice@example.com");
        let account = insert_account(&repo, user.id, "ACC000001");

        for _ in 0..10 {
            repo.credit(account.id, dec("0.10")).unwrap();
        }
        let account = repo.find_account(account.id).unwrap().unwrap();
        assert_eq!(account.balance.to_string(), "1.00");
    }

    #[test]
    fn test_list_accounts_by_user_only_returns_owned() {
        let repo = repo();
        let alice = insert_user(&repo, "alice@example.com");
        let bob = insert_user(&repo, "bob@example.com");
        let a1 = insert_account(&repo, alice.id, "ALICE-0001");
        insert_account(&repo, bob.id, "BOB-000001");
        let a2 = insert_account(&repo, alice.id, "ALICE-0002");

        let ids: Vec<i64> = repo
            .list_accounts_by_user(alice.id)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![a1.id, a2.id]);
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(is_retryable_error("Resource temporarily unavailable"));
        assert!(!is_retryable_error("Catalog Error: table not found"));
    }
}
