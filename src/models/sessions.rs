use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct OtpSession {
    pub otp_id: String,
    pub user_id: String,
    pub phone: String,
    pub expire_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct RefreshSession {
    pub token_id: String,
    pub user_id: String,
    pub refresh_token: String,
    pub expire_at: DateTime<Utc>,
    pub is_blocked: bool,
}
