//! Relational store access.
//!
//! Plain parameterized statements over a SQLx pool; there is no query builder
//! and no ORM layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Returns `false` when no user has the given id.
pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_items(pool: &SqlitePool) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>("SELECT id, name, description FROM items ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn insert_item(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO items (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // A single connection that never idles out keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn users() {
        let pool = memory_pool().await;
        assert!(find_user_by_username(&pool, "joey").await.unwrap().is_none());

        let id = insert_user(&pool, "joey", "hash-1").await.unwrap();
        let user = find_user_by_username(&pool, "joey").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.password, "hash-1");

        assert!(insert_user(&pool, "joey", "hash-2").await.is_err());

        assert!(update_password(&pool, id, "hash-3").await.unwrap());
        assert!(!update_password(&pool, id + 100, "hash-4").await.unwrap());
        let user = find_user_by_username(&pool, "joey").await.unwrap().unwrap();
        assert_eq!(user.password, "hash-3");
    }

    #[tokio::test]
    async fn items() {
        let pool = memory_pool().await;
        assert!(list_items(&pool).await.unwrap().is_empty());

        let first = insert_item(&pool, "lamp", Some("desk lamp")).await.unwrap();
        let second = insert_item(&pool, "chair", None).await.unwrap();

        let items = list_items(&pool).await.unwrap();
        assert_eq!(
            items,
            vec![
                Item {
                    id: first,
                    name: "lamp".to_owned(),
                    description: Some("desk lamp".to_owned()),
                },
                Item {
                    id: second,
                    name: "chair".to_owned(),
                    description: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = memory_pool().await;
        migrate(&pool).await.unwrap();
    }
}
