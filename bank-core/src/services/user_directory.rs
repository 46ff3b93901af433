//! User directory - user identity and email uniqueness

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, User};
use crate::ports::{InsertOutcome, UserStore};

const EMAIL_TAKEN: &str = "Email already exists";

/// Service owning user records
#[derive(Clone)]
pub struct UserDirectory {
    repository: Arc<dyn UserStore>,
}

impl UserDirectory {
    pub fn new(repository: Arc<dyn UserStore>) -> Self {
        Self { repository }
    }

    /// Register a new user, stamped with the current time
    pub fn create(&self, name: &str, email: &str) -> Result<User> {
        self.create_user(NewUser::new(name, email))
    }

    /// Register a new user with a known registration time
    pub fn create_with_registration(
        &self,
        name: &str,
        email: &str,
        registered_at: DateTime<Utc>,
    ) -> Result<User> {
        self.create_user(NewUser::registered_at(name, email, registered_at))
    }

    fn create_user(&self, user: NewUser) -> Result<User> {
        tracing::info!("creating user");
        user.validate().map_err(|msg| {
            tracing::warn!(reason = msg, "rejected user");
            Error::invalid_argument(msg)
        })?;

        // Fast path only; the unique index decides races
        if self.repository.email_exists(&user.email)? {
            tracing::warn!("email already registered");
            return Err(Error::conflict(EMAIL_TAKEN));
        }

        match self.repository.insert_user(&user)? {
            InsertOutcome::Inserted(saved) => {
                tracing::info!(user_id = saved.id, "user created");
                Ok(saved)
            }
            InsertOutcome::Duplicate => {
                tracing::warn!("email taken by a concurrent registration");
                Err(Error::conflict(EMAIL_TAKEN))
            }
        }
    }

    pub fn get_by_id(&self, id: i64) -> Result<User> {
        tracing::info!(user_id = id, "reading user");
        self.repository.find_user(id)?.ok_or_else(|| {
            tracing::warn!(user_id = id, "user not found");
            Error::not_found("User not found")
        })
    }

    /// All users, oldest first
    pub fn list_all(&self) -> Result<Vec<User>> {
        let users = self.repository.list_users()?;
        tracing::info!(count = users.len(), "listed users");
        Ok(users)
    }

    pub fn exists_by_id(&self, id: i64) -> Result<bool> {
        self.repository.user_exists(id)
    }
}
