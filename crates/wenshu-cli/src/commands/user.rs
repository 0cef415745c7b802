//! User command handlers

use anyhow::{bail, Context, Result};
use tracing::warn;

use wenshu_core::{NewUser, Store, User};

use super::{optional_text, require_user};
use crate::auth::{check_new_password, hash_password, verify_password};
use crate::output::Output;

/// Registration input as given on the command line
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Register a new account
pub fn register(store: &Store, reg: Registration, output: &Output) -> Result<()> {
    check_new_password(&reg.password, &reg.confirm)?;
    let password_hash = hash_password(&reg.password)?;

    let user = store.register_user(NewUser {
        username: reg.username,
        email: reg.email,
        password_hash,
        recovery_question: reg.question,
        recovery_answer: reg.answer,
    })?;

    if output.is_json() || output.is_quiet() {
        output.print_user(&user);
    } else {
        output.success(&format!("Registered {} (id {})", user.username, user.id));
    }
    Ok(())
}

/// Show an account by login, or the acting user
pub fn show(
    store: &Store,
    login: Option<String>,
    actor: Option<&User>,
    output: &Output,
) -> Result<()> {
    let user = match login {
        Some(login) => store
            .find_user_by_login(&login)?
            .ok_or_else(|| anyhow::anyhow!("No user found matching: {}", login))?,
        None => require_user(actor)?.clone(),
    };
    output.print_user(&user);
    Ok(())
}

/// Check a login and password
///
/// Unknown logins and wrong passwords fail with the same message.
pub fn verify(store: &Store, login: String, password: String, output: &Output) -> Result<()> {
    let user = store.find_user_by_login(&login)?;
    match user {
        Some(user) if verify_password(&password, &user.password_hash) => {
            output.success(&format!("Credentials valid for {}", user.username));
            Ok(())
        }
        _ => {
            warn!("Failed login attempt for {}", login);
            bail!("Invalid username/email or password")
        }
    }
}

/// Change the acting user's password
pub fn passwd(
    store: &Store,
    actor: Option<&User>,
    current: String,
    password: String,
    confirm: String,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    if !verify_password(&current, &user.password_hash) {
        bail!("Current password is incorrect");
    }
    check_new_password(&password, &confirm)?;

    let hash = hash_password(&password)?;
    store
        .update_user_password(user.id, &hash)
        .context("Failed to update password")?;
    output.success("Password changed");
    Ok(())
}

/// Replace the acting user's recovery question and answer
pub fn recovery(
    store: &Store,
    actor: Option<&User>,
    question: Option<String>,
    answer: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    store.update_user_recovery(user.id, optional_text(question), optional_text(answer))?;
    output.success("Recovery question updated");
    Ok(())
}
