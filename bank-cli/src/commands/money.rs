//! Deposit and withdraw commands

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use bank_core::domain::money;
use bank_core::domain::result::Result as CoreResult;
use bank_core::{BankContext, Error};

use super::{finish, get_context};
use crate::output;

/// Balance after a successful mutation
#[derive(Debug, Serialize)]
struct BalanceChange {
    account_id: i64,
    amount: Decimal,
    balance: Decimal,
}

pub fn run_deposit(account_id: i64, amount: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = apply(&ctx, account_id, amount, |amount| ctx.accounts.deposit(account_id, amount));
    finish("deposit", json, result, |change| {
        output::success(&format!("Deposited {}", change.amount));
        println!("  Balance: {}", change.balance);
    })
}

pub fn run_withdraw(account_id: i64, amount: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = apply(&ctx, account_id, amount, |amount| ctx.accounts.withdraw(account_id, amount));
    finish("withdraw", json, result, |change| {
        output::success(&format!("Withdrew {}", change.amount));
        println!("  Balance: {}", change.balance);
    })
}

fn apply(
    ctx: &BankContext,
    account_id: i64,
    amount: &str,
    op: impl FnOnce(Decimal) -> CoreResult<()>,
) -> CoreResult<BalanceChange> {
    let amount = money::parse_amount(amount).map_err(Error::invalid_argument)?;
    op(amount)?;
    let account = ctx.accounts.get(account_id)?;
    Ok(BalanceChange {
        account_id,
        amount: money::to_fixed(amount),
        balance: money::to_fixed(account.balance),
    })
}
