use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Batch lookup used when composing responses that embed several
    /// users at once.
    pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

/// Persisted bearer token. Holds only the SHA-256 digest of the secret.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
}

impl AccessToken {
    pub async fn issue(
        db: &PgPool,
        user_id: Uuid,
        name: &str,
        token_hash: &str,
    ) -> anyhow::Result<AccessToken> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (user_id, name, token_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, token_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(db)
        .await?;
        Ok(token)
    }

    pub async fn find_by_hash(db: &PgPool, token_hash: &str) -> anyhow::Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id, user_id, name, token_hash, created_at
            FROM access_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await?;
        Ok(token)
    }

    /// Deletes one token. Returns how many rows went away (0 when the
    /// token was already revoked).
    pub async fn revoke(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM access_tokens WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }

    /// Login rotation: drop every token the user holds, then issue a
    /// fresh one, atomically. Login therefore leaves exactly one live
    /// session.
    pub async fn rotate_all(
        db: &PgPool,
        user_id: Uuid,
        name: &str,
        token_hash: &str,
    ) -> anyhow::Result<AccessToken> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (user_id, name, token_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, token_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(token)
    }

    /// Refresh rotation: swap only the presented token for a new one.
    /// Concurrent sessions keep their tokens.
    pub async fn rotate_one(
        db: &PgPool,
        current_id: Uuid,
        user_id: Uuid,
        name: &str,
        token_hash: &str,
    ) -> anyhow::Result<AccessToken> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM access_tokens WHERE id = $1")
            .bind(current_id)
            .execute(&mut *tx)
            .await?;
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (user_id, name, token_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, token_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(token)
    }
}
