//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account_ledger;
mod health;
pub mod logging;
pub mod migration;
mod user_directory;

pub use account_ledger::AccountLedger;
pub use health::{CheckResult, HealthReport, HealthService, HealthSummary};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use user_directory::UserDirectory;
