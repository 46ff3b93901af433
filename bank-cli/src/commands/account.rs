//! Account command - open and inspect accounts

use anyhow::Result;
use clap::Subcommand;

use super::{finish, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account for a user
    Create {
        /// Owner's user ID
        user_id: i64,
        /// Account number (6-34 characters); generated when omitted
        #[arg(long)]
        number: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a user's accounts
    List {
        /// Owner's user ID
        user_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one account with its balance
    Show {
        /// Account ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        AccountCommands::Create { user_id, number, json } => {
            let result = ctx.accounts.create(user_id, number.as_deref());
            finish("account create", json, result, |account| {
                output::success("Account created");
                println!("  ID: {}", account.id);
                println!("  Number: {}", account.number);
                println!("  Owner: {}", account.user_id);
            })
        }
        AccountCommands::List { user_id, json } => {
            finish("account list", json, ctx.accounts.list_by_user(user_id), |accounts| {
                if accounts.is_empty() {
                    output::info("No accounts for this user.");
                } else {
                    println!("{}", output::accounts_table(accounts));
                }
            })
        }
        AccountCommands::Show { id, json } => {
            finish("account show", json, ctx.accounts.get(id), |account| {
                println!("{}", output::accounts_table(std::slice::from_ref(account)));
            })
        }
    }
}
