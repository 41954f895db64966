use crate::models::sessions::{OtpSession, RefreshSession};

use anyhow::bail;
use async_trait::async_trait;
use sqlx::PgPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save_otp_session(&self, session: &OtpSession) -> Result<(), anyhow::Error>;
    async fn find_otp_session(&self, otp_id: &str) -> Result<Option<OtpSession>, anyhow::Error>;
    async fn save_refresh_session(&self, session: &RefreshSession) -> Result<(), anyhow::Error>;
    async fn find_refresh_session_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshSession>, anyhow::Error>;
    async fn block_refresh_session(&self, token_id: &str) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
    conn: PgPool,
}

impl PgSessionRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn save_otp_session(&self, session: &OtpSession) -> Result<(), anyhow::Error> {
        sqlx::query(
            "INSERT INTO otp_sessions (otp_id, user_id, phone, expire_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.otp_id)
        .bind(&session.user_id)
        .bind(&session.phone)
        .bind(session.expire_at)
        .execute(&self.conn)
        .await?;

        Ok(())
    }

    async fn find_otp_session(&self, otp_id: &str) -> Result<Option<OtpSession>, anyhow::Error> {
        let session =
            sqlx::query_as::<_, OtpSession>("SELECT * FROM otp_sessions WHERE otp_id = $1")
                .bind(otp_id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(session)
    }

    async fn save_refresh_session(&self, session: &RefreshSession) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
                INSERT INTO refresh_sessions (token_id, user_id, refresh_token, expire_at, is_blocked)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.token_id)
        .bind(&session.user_id)
        .bind(&session.refresh_token)
        .bind(session.expire_at)
        .bind(session.is_blocked)
        .execute(&self.conn)
        .await?;

        Ok(())
    }

    async fn find_refresh_session_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshSession>, anyhow::Error> {
        let session = sqlx::query_as::<_, RefreshSession>(
            "SELECT * FROM refresh_sessions WHERE token_id = $1",
        )
        .bind(token_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(session)
    }

    async fn block_refresh_session(&self, token_id: &str) -> Result<(), anyhow::Error> {
        let result = sqlx::query("UPDATE refresh_sessions SET is_blocked = true WHERE token_id = $1")
            .bind(token_id)
            .execute(&self.conn)
            .await?;

        if result.rows_affected() == 0 {
            bail!("Refresh session not found")
        }

        Ok(())
    }
}
