use crate::models::users::{Admin, NewAdmin};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, anyhow::Error>;
    async fn find_admin_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<Admin>, anyhow::Error>;
    /// Expects `admin.password` to be hashed already.
    async fn save_admin(&self, admin: &NewAdmin) -> Result<String, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgAdminRepository {
    conn: PgPool,
}

impl PgAdminRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AdminRepository for PgAdminRepository {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, anyhow::Error> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.conn)
            .await?;

        Ok(admin)
    }

    async fn find_admin_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<Admin>, anyhow::Error> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE user_name = $1")
            .bind(user_name)
            .fetch_optional(&self.conn)
            .await?;

        Ok(admin)
    }

    async fn save_admin(&self, admin: &NewAdmin) -> Result<String, anyhow::Error> {
        let admin_id = Uuid::new_v4().hyphenated().to_string();

        sqlx::query("INSERT INTO admins (id, user_name, email, password) VALUES ($1, $2, $3, $4)")
            .bind(&admin_id)
            .bind(&admin.user_name)
            .bind(&admin.email)
            .bind(&admin.password)
            .execute(&self.conn)
            .await?;

        Ok(admin_id)
    }
}
