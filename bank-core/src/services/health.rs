//! Health service - store integrity checks

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::result::Result;
use crate::ports::IntegrityChecks;

/// Runs read-only integrity checks against the store
pub struct HealthService {
    repository: Arc<dyn IntegrityChecks>,
}

impl HealthService {
    pub fn new(repository: Arc<dyn IntegrityChecks>) -> Self {
        Self { repository }
    }

    /// Run all checks
    pub fn run_checks(&self) -> Result<HealthReport> {
        let mut checks = BTreeMap::new();

        let negative = self.repository.accounts_with_negative_balance()?;
        checks.insert(
            "negative_balances".to_string(),
            CheckResult::from_offenders(
                account_details(&negative),
                "No account has a negative balance",
                |n| format!("{} account(s) have a negative balance", n),
            ),
        );

        let orphaned = self.repository.orphaned_accounts()?;
        checks.insert(
            "orphaned_accounts".to_string(),
            CheckResult::from_offenders(
                account_details(&orphaned),
                "Every account has an owner",
                |n| format!("{} account(s) reference missing users", n),
            ),
        );

        let pending = self.repository.pending_migrations()?;
        checks.insert(
            "pending_migrations".to_string(),
            CheckResult::from_offenders(
                pending.iter().map(|name| json!({ "migration": name })).collect(),
                "Schema is up to date",
                |n| format!("{} migration(s) not applied", n),
            ),
        );

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;
        tracing::info!(passed, errors, "health checks finished");

        Ok(HealthReport {
            checks,
            summary: HealthSummary { passed, errors },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: HealthSummary,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Value>>,
}

impl CheckResult {
    fn from_offenders(offenders: Vec<Value>, ok: &str, failed: impl Fn(usize) -> String) -> Self {
        if offenders.is_empty() {
            return Self {
                status: "pass".to_string(),
                message: ok.to_string(),
                details: None,
            };
        }
        Self {
            status: "error".to_string(),
            message: failed(offenders.len()),
            details: Some(offenders),
        }
    }
}

fn account_details(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "account_id": id })).collect()
}

#[derive(Debug, Serialize)]
pub struct HealthSummary {
    pub passed: i64,
    pub errors: i64,
}
