//! Command handlers, one module per top-level subcommand

pub mod config;
pub mod doc;
pub mod fav;
pub mod note;
pub mod progress;
pub mod res;
pub mod search;
pub mod stats;
pub mod user;

use anyhow::{bail, Result};

use wenshu_core::User;

/// The acting user, or an error telling the caller to pass `--user`
pub fn require_user(actor: Option<&User>) -> Result<&User> {
    match actor {
        Some(user) => Ok(user),
        None => bail!("This command needs an acting user. Pass --user <username|email>."),
    }
}

/// Treat an empty string argument as "clear this field"
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
