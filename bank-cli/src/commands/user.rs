//! User command - register and look up users

use anyhow::Result;
use clap::Subcommand;
use dialoguer::Input;

use super::{finish, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Display name (prompted if omitted)
        #[arg(long)]
        name: Option<String>,
        /// Email address, unique across users (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one user
    Get {
        /// User ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Create { name, email, json } => run_create(name, email, json),
        UserCommands::Get { id, json } => {
            let ctx = get_context()?;
            finish("user get", json, ctx.users.get_by_id(id), |user| {
                println!("{}", output::users_table(std::slice::from_ref(user)));
            })
        }
        UserCommands::List { json } => {
            let ctx = get_context()?;
            finish("user list", json, ctx.users.list_all(), |users| {
                if users.is_empty() {
                    output::info("No users yet.");
                } else {
                    println!("{}", output::users_table(users));
                }
            })
        }
    }
}

fn run_create(name: Option<String>, email: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let name = match name {
        Some(n) => n,
        None => Input::new().with_prompt("Name").interact_text()?,
    };
    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };

    finish("user create", json, ctx.users.create(&name, &email), |user| {
        output::success("User created");
        println!("  ID: {}", user.id);
        println!("  Name: {}", user.name);
        println!("  Email: {}", user.email);
    })
}
