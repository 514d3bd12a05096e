use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"#[a-zA-Z0-9_]+").unwrap();
}

#[derive(Debug, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub description: String,
    pub mood: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewPost {
    #[serde(rename = "authorId")]
    pub author_id: Uuid,
    #[serde(rename = "authorUsername")]
    pub author_username: String,
    pub description: String,
    pub mood: String,
}

/// Pulls `#hashtags` out of the description, lowercased, without the `#`.
pub fn extract_tags(text: &str) -> Vec<String> {
    TAG_RE
        .find_iter(text)
        .map(|m| m.as_str()[1..].to_lowercase())
        .collect()
}

pub async fn list_posts(pool: &PgPool) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        "SELECT id, author_id, author_username, description, mood, tags, created_at
         FROM posts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn create_post(pool: &PgPool, post: &NewPost) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let tags = extract_tags(&post.description);

    sqlx::query(
        "INSERT INTO posts (id, author_id, author_username, description, mood, tags)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(post.author_id)
    .bind(&post.author_username)
    .bind(&post.description)
    .bind(&post.mood)
    .bind(&tags)
    .execute(pool)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::extract_tags;

    #[test]
    fn tags_are_lowercased_and_stripped() {
        assert_eq!(
            extract_tags("chill evening #Cozy #rainy_day vibes"),
            vec!["cozy", "rainy_day"]
        );
    }

    #[test]
    fn no_tags_means_empty() {
        assert!(extract_tags("no tags here").is_empty());
        assert!(extract_tags("# not a tag").is_empty());
    }
}
