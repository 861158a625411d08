use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

/// Revoked token ids, kept until the token would have expired anyway.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Returns `false` when `jti` was already revoked.
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<bool>;
    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;
}

pub struct PgTokenBlacklist {
    db: PgPool,
}

impl PgTokenBlacklist {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenBlacklist for PgTokenBlacklist {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("insert revoked token")?
        .rows_affected()
            == 1;

        let purged = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&self.db)
            .await
            .context("purge expired revoked tokens")?
            .rows_affected();
        if purged > 0 {
            debug!(purged, "expired revoked tokens purged");
        }

        Ok(inserted)
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.db)
                .await
                .context("lookup revoked token")?;
        Ok(exists)
    }
}

#[cfg(test)]
pub use memory::MemoryTokenBlacklist;
