use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::session::AccountSnapshot;

#[derive(Debug, Serialize, FromRow)]
pub struct Profile {
    pub account_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub dob_day: i32,
    pub dob_month: i32,
    pub dob_year: i32,
    pub bio: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn create_profile(
    pool: &PgPool,
    account_id: Uuid,
    snapshot: &AccountSnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO profiles (account_id, email, username, first_name, last_name,
                               dob_day, dob_month, dob_year, bio, avatar)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, '', $9)",
    )
    .bind(account_id)
    .bind(&snapshot.email)
    .bind(&snapshot.username)
    .bind(&snapshot.first_name)
    .bind(&snapshot.last_name)
    .bind(snapshot.birthday.day as i32)
    .bind(snapshot.birthday.month as i32)
    .bind(snapshot.birthday.year)
    .bind(&snapshot.profile_photo)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_profile(pool: &PgPool, account_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        SELECT account_id, email, username, first_name, last_name,
               dob_day, dob_month, dob_year, bio, avatar, created_at
        FROM profiles
        WHERE account_id = $1
        "#,
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}

/// Unset fields keep their current value.
pub async fn update_profile(
    pool: &PgPool,
    account_id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    bio: Option<&str>,
    avatar: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE profiles
         SET first_name = COALESCE($2, first_name),
             last_name  = COALESCE($3, last_name),
             bio        = COALESCE($4, bio),
             avatar     = COALESCE($5, avatar)
         WHERE account_id = $1",
    )
    .bind(account_id)
    .bind(first_name)
    .bind(last_name)
    .bind(bio)
    .bind(avatar)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
