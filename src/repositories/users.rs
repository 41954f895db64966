use crate::models::{
    users::{NewUser, User},
    Pagination,
};

use anyhow::bail;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;
    async fn find_user_by_user_name(&self, user_name: &str)
        -> Result<Option<User>, anyhow::Error>;
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, anyhow::Error>;
    /// Any user sharing the user name, email or phone, other than `exclude_id`.
    async fn find_conflicting_user(
        &self,
        user: &NewUser,
        exclude_id: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error>;
    /// Expects `user.password` to be hashed already.
    async fn save_user(&self, user: &NewUser) -> Result<String, anyhow::Error>;
    async fn update_verified(&self, user_id: &str) -> Result<(), anyhow::Error>;
    async fn update_block_status(&self, user_id: &str, block: bool)
        -> Result<(), anyhow::Error>;
    async fn find_all_users(&self, pagination: Pagination) -> Result<Vec<User>, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    conn: PgPool,
}

impl PgUserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT * FROM users WHERE {column} = $1"))
            .bind(value)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        self.find_one("id", user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        self.find_one("email", email).await
    }

    async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        self.find_one("user_name", user_name).await
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, anyhow::Error> {
        self.find_one("phone", phone).await
    }

    async fn find_conflicting_user(
        &self,
        user: &NewUser,
        exclude_id: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error> {
        let existing = sqlx::query_as::<_, User>(
            r#"
                SELECT * FROM users
                WHERE (user_name = $1 OR email = $2 OR (phone <> '' AND phone = $3))
                AND ($4::TEXT IS NULL OR id <> $4)
                ORDER BY verified DESC
                LIMIT 1
            "#,
        )
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(exclude_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(existing)
    }

    async fn save_user(&self, user: &NewUser) -> Result<String, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();

        sqlx::query(
            r#"
                INSERT INTO users (id, first_name, last_name, user_name, email, phone, password)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .execute(&self.conn)
        .await?;

        Ok(user_id)
    }

    async fn update_verified(&self, user_id: &str) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET verified = true, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            bail!("User not found")
        }

        Ok(())
    }

    async fn update_block_status(
        &self,
        user_id: &str,
        block: bool,
    ) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET block_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(block)
        .bind(user_id)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            bail!("User not found")
        }

        Ok(())
    }

    async fn find_all_users(&self, pagination: Pagination) -> Result<Vec<User>, anyhow::Error> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.conn)
        .await?;

        Ok(users)
    }
}
