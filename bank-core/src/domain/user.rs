//! User domain model

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A bank customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Unique across all users
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

/// A user that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // local@domain with no whitespace; deliverability is not our concern
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"))
}

impl NewUser {
    /// Create a new user registered now
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::registered_at(name, email, Utc::now())
    }

    pub fn registered_at(
        name: impl Into<String>,
        email: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            registered_at,
        }
    }

    /// Validate user data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty");
        }
        if self.email.trim().is_empty() {
            return Err("email cannot be empty");
        }
        if !email_pattern().is_match(&self.email) {
            return Err("email is not a valid address");
        }
        Ok(())
    }
}
