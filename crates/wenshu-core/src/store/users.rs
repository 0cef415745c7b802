//! User accounts
//!
//! Password hashing happens outside this crate; the store only keeps the
//! opaque hash string it is given.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{exists, now_millis, required, to_datetime, Store};
use crate::models::{NewUser, User, UserId};
use crate::storage::{StoreError, StoreResult};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, recovery_question, recovery_answer, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        recovery_question: row.get(4)?,
        recovery_answer: row.get(5)?,
        created_at: to_datetime(row.get(6)?),
    })
}

fn fetch_user(conn: &Connection, id: UserId) -> StoreResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Turn empty optional text into `None`
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Store {
    /// Register a new account
    ///
    /// Username and email must be unique; each clash is reported with its
    /// own reason.
    pub fn register_user(&self, new: NewUser) -> StoreResult<User> {
        let username = required("username", &new.username)?;
        let email = required("email", &new.email)?;
        let password_hash = required("password hash", &new.password_hash)?;
        if !email.contains('@') {
            return Err(StoreError::validation(format!(
                "'{}' is not an email address",
                email
            )));
        }
        let question = non_empty(new.recovery_question);
        let answer = non_empty(new.recovery_answer);

        self.db.write(|tx| {
            if exists(tx, "SELECT 1 FROM users WHERE username = ?", [&username])? {
                return Err(StoreError::conflict(format!(
                    "username '{}' already exists",
                    username
                )));
            }
            if exists(tx, "SELECT 1 FROM users WHERE email = ?", [&email])? {
                return Err(StoreError::conflict(format!(
                    "email '{}' is already registered",
                    email
                )));
            }

            tx.execute(
                r#"
                INSERT INTO users (username, email, password_hash, recovery_question, recovery_answer, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![username, email, password_hash, question, answer, now_millis()],
            )
            .map_err(|e| StoreError::from(e).or_conflict("username or email already registered"))?;

            let id = tx.last_insert_rowid();
            info!("Registered user {} ({})", username, id);
            fetch_user(tx, id)?.ok_or_else(|| StoreError::not_found("User", id))
        })
    }

    /// Get a user by ID
    pub fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.db.read(|conn| fetch_user(conn, id))
    }

    /// Find a user by username or email
    pub fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<User>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        self.db.read(|conn| {
            let user = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM users WHERE username = ?1 OR email = ?1 ORDER BY id LIMIT 1",
                        USER_COLUMNS
                    ),
                    [identifier],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Replace a user's password hash
    pub fn update_user_password(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        let password_hash = required("password hash", password_hash)?;
        self.db.write(|tx| {
            let changed = tx.execute(
                "UPDATE users SET password_hash = ? WHERE id = ?",
                params![password_hash, id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("User", id));
            }
            info!("Updated password for user {}", id);
            Ok(())
        })
    }

    /// Replace a user's password-recovery question and answer
    pub fn update_user_recovery(
        &self,
        id: UserId,
        question: Option<String>,
        answer: Option<String>,
    ) -> StoreResult<()> {
        let question = non_empty(question);
        let answer = non_empty(answer);
        self.db.write(|tx| {
            let changed = tx.execute(
                "UPDATE users SET recovery_question = ?, recovery_answer = ? WHERE id = ?",
                params![question, answer, id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("User", id));
            }
            Ok(())
        })
    }
}
