//! Account domain model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest accepted account number
pub const MIN_NUMBER_LEN: usize = 6;

/// Longest accepted account number (IBAN maximum)
pub const MAX_NUMBER_LEN: usize = 34;

/// A bank account owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Externally visible number, unique across all accounts
    pub number: String,
    /// Never negative; two fractional digits
    pub balance: Decimal,
    pub user_id: i64,
    /// Revision counter, bumped by every balance mutation
    pub version: i64,
}

/// An account that has not been stored yet. Balance always starts at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub user_id: i64,
    pub number: String,
}

impl NewAccount {
    pub fn new(user_id: i64, number: impl Into<String>) -> Self {
        Self {
            user_id,
            number: number.into(),
        }
    }

    /// Build an account for `user_id`, generating a number unless a
    /// non-blank one was supplied
    pub fn for_user(user_id: i64, number: Option<&str>) -> Self {
        match number.filter(|n| !n.trim().is_empty()) {
            Some(n) => Self::new(user_id, n),
            None => Self::new(user_id, Account::generate_number()),
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), String> {
        let len = self.number.chars().count();
        if !(MIN_NUMBER_LEN..=MAX_NUMBER_LEN).contains(&len) {
            return Err(format!(
                "account number must be {}-{} characters, got {}",
                MIN_NUMBER_LEN, MAX_NUMBER_LEN, len
            ));
        }
        Ok(())
    }
}

impl Account {
    /// Generate a random 128-bit account number as 32 lowercase hex digits
    pub fn generate_number() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_number_is_32_hex_chars() {
        let number = Account::generate_number();
        assert_eq!(number.len(), 32);
        assert!(number.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(number, Account::generate_number());
    }

    #[test]
    fn test_supplied_number_is_used_verbatim() {
        let account = NewAccount::for_user(1, Some("ACC-000123"));
        assert_eq!(account.number, "ACC-000123");
        assert_eq!(account.user_id, 1);
    }

    #[test]
    fn test_blank_number_is_generated() {
        assert_eq!(NewAccount::for_user(1, Some("   ")).number.len(), 32);
        assert_eq!(NewAccount::for_user(1, None).number.len(), 32);
    }

    #[test]
    fn test_number_length_bounds() {
        assert!(NewAccount::new(1, "12345").validate().is_err());
        assert!(NewAccount::new(1, "123456").validate().is_ok());
        assert!(NewAccount::new(1, "x".repeat(34)).validate().is_ok());
        assert!(NewAccount::new(1, "x".repeat(35)).validate().is_err());
    }
}
