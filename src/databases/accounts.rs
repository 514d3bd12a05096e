use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::services::session::AccountSnapshot;

#[derive(Debug, FromRow)]
pub struct LoginUser {
    pub id: Uuid,
    pub hashed_password: String,
}

#[derive(Debug, Error)]
pub enum CreateAccountError {
    #[error("An account with this email already exists")]
    EmailInUse,
    #[error("This username is taken")]
    UsernameInUse,
    #[error("Failed to hash password: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub async fn email_in_use(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("SELECT 1 FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(result.is_some())
}

pub async fn username_in_use(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("SELECT 1 FROM accounts WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(result.is_some())
}

/// Login accepts an email or a username.
pub async fn get_login_user(pool: &PgPool, identifier: &str) -> Result<Option<LoginUser>, sqlx::Error> {
    sqlx::query_as::<_, LoginUser>(
        r#"
        SELECT id, password AS hashed_password
        FROM accounts
        WHERE email = $1 OR username = $1
        "#,
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

/// Inserts the credential row for a finalized signup. The plaintext
/// password lives only in the session snapshot; only the argon2 hash
/// is stored.
pub async fn create_account(pool: &PgPool, snapshot: &AccountSnapshot) -> Result<Uuid, CreateAccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = Argon2::default()
        .hash_password(snapshot.password.as_bytes(), &salt)
        .map_err(|e| CreateAccountError::Hash(e.to_string()))?;

    let account_id = Uuid::new_v4();

    let result = sqlx::query(
        "INSERT INTO accounts (id, email, username, password)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(account_id)
    .bind(&snapshot.email)
    .bind(&snapshot.username)
    .bind(hashed_password.to_string())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(account_id),
        Err(e) => match e.as_database_error().and_then(|d| d.constraint()) {
            Some("accounts_email_key") => Err(CreateAccountError::EmailInUse),
            Some("accounts_username_key") => Err(CreateAccountError::UsernameInUse),
            _ => Err(CreateAccountError::Db(e)),
        },
    }
}

/// Compensating action for a failed finalization: if the profile write
/// fails after the credential row landed, the credential is removed so
/// the signup can be retried from the verification step.
pub async fn delete_account(pool: &PgPool, account_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(account_id)
        .execute(pool)
        .await?;

    Ok(())
}
