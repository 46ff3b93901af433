//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod money;
pub mod result;
mod user;

pub use account::{Account, NewAccount, MAX_NUMBER_LEN, MIN_NUMBER_LEN};
pub use user::{NewUser, User};
