use crate::models::{
    wallets::{Transaction, Wallet},
    Pagination,
};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_wallet_by_user_id(&self, user_id: &str) -> Result<Option<Wallet>, anyhow::Error>;
    async fn save_wallet(&self, user_id: &str) -> Result<String, anyhow::Error>;
    async fn find_wallet_transactions(
        &self,
        wallet_id: &str,
        pagination: Pagination,
    ) -> Result<Vec<Transaction>, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgWalletRepository {
    conn: PgPool,
}

impl PgWalletRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_wallet_by_user_id(&self, user_id: &str) -> Result<Option<Wallet>, anyhow::Error> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(wallet)
    }

    async fn save_wallet(&self, user_id: &str) -> Result<String, anyhow::Error> {
        let wallet_id = Uuid::new_v4().hyphenated().to_string();

        sqlx::query("INSERT INTO wallets (id, user_id, total_amount) VALUES ($1, $2, 0)")
            .bind(&wallet_id)
            .bind(user_id)
            .execute(&self.conn)
            .await?;

        Ok(wallet_id)
    }

    async fn find_wallet_transactions(
        &self,
        wallet_id: &str,
        pagination: Pagination,
    ) -> Result<Vec<Transaction>, anyhow::Error> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
                SELECT * FROM transactions
                WHERE wallet_id = $1
                ORDER BY transaction_date DESC
                LIMIT $2 OFFSET $3
            "#,
        )
        .bind(wallet_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.conn)
        .await?;

        Ok(transactions)
    }
}
