use crate::models::{
    orders::{
        Approval, OrderStatus, PaymentMethod, PaymentMethodUpdate, PaymentType, SalesReport,
        SalesReportRequest, ShopOrder, Stock, UpdateStock,
    },
    Pagination,
};

use anyhow::bail;
use async_trait::async_trait;
use sqlx::PgPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_shop_order_by_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<ShopOrder>, anyhow::Error>;
    async fn find_all_payment_methods(&self) -> Result<Vec<PaymentMethod>, anyhow::Error>;
    async fn find_payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> Result<Option<PaymentMethod>, anyhow::Error>;
    async fn find_payment_method_by_type(
        &self,
        payment_type: PaymentType,
    ) -> Result<Option<PaymentMethod>, anyhow::Error>;
    async fn update_payment_method(
        &self,
        update: &PaymentMethodUpdate,
    ) -> Result<(), anyhow::Error>;
    /// Moves a pending order to placed, takes its lines out of stock and
    /// empties the user's cart, atomically. The order row is locked first, so
    /// a concurrent approval of the same order sees `AlreadyPlaced`.
    async fn approve_order_and_clear_cart(
        &self,
        user_id: &str,
        shop_order_id: &str,
        payment_method_id: &str,
    ) -> Result<Approval, anyhow::Error>;
    async fn find_all_stock(&self, pagination: Pagination) -> Result<Vec<Stock>, anyhow::Error>;
    async fn find_stock_by_sku(&self, sku: &str) -> Result<Option<Stock>, anyhow::Error>;
    /// Fails without changes when the result would drop below zero.
    async fn update_stock_by_sku(&self, update: &UpdateStock) -> Result<(), anyhow::Error>;
    async fn create_full_sales_report(
        &self,
        request: &SalesReportRequest,
    ) -> Result<Vec<SalesReport>, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgOrderRepository {
    conn: PgPool,
}

impl PgOrderRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_shop_order_by_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<ShopOrder>, anyhow::Error> {
        let order = sqlx::query_as::<_, ShopOrder>("SELECT * FROM shop_orders WHERE id = $1")
            .bind(shop_order_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(order)
    }

    async fn find_all_payment_methods(&self) -> Result<Vec<PaymentMethod>, anyhow::Error> {
        let methods =
            sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods ORDER BY id")
                .fetch_all(&self.conn)
                .await?;

        Ok(methods)
    }

    async fn find_payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> Result<Option<PaymentMethod>, anyhow::Error> {
        let method =
            sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE id = $1")
                .bind(payment_method_id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(method)
    }

    async fn find_payment_method_by_type(
        &self,
        payment_type: PaymentType,
    ) -> Result<Option<PaymentMethod>, anyhow::Error> {
        let method = sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE payment_type = $1",
        )
        .bind(payment_type)
        .fetch_optional(&self.conn)
        .await?;

        Ok(method)
    }

    async fn update_payment_method(
        &self,
        update: &PaymentMethodUpdate,
    ) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            r#"
                UPDATE payment_methods
                SET block_status = COALESCE($1, block_status),
                    maximum_amount = COALESCE($2, maximum_amount)
                WHERE id = $3
            "#,
        )
        .bind(update.block_status)
        .bind(update.maximum_amount)
        .bind(&update.id)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            bail!("Payment method not found")
        }

        Ok(())
    }

    async fn approve_order_and_clear_cart(
        &self,
        user_id: &str,
        shop_order_id: &str,
        payment_method_id: &str,
    ) -> Result<Approval, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let status: Option<OrderStatus> = sqlx::query_scalar(
            "SELECT order_status FROM shop_orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(shop_order_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match status {
            None => bail!("Order {} not found", shop_order_id),
            Some(OrderStatus::PaymentPending) => {}
            Some(OrderStatus::OrderPlaced) => return Ok(Approval::AlreadyPlaced),
            Some(status) => return Ok(Approval::NotPending(status)),
        }

        sqlx::query(
            r#"
                SELECT id FROM product_items
                WHERE id IN (SELECT product_item_id FROM order_lines WHERE shop_order_id = $1)
                ORDER BY id
                FOR UPDATE
            "#,
        )
        .bind(shop_order_id)
        .execute(&mut *tx)
        .await?;

        let short: Option<String> = sqlx::query_scalar(
            r#"
                SELECT p.id
                FROM product_items p
                JOIN (
                    SELECT product_item_id, SUM(qty)::BIGINT AS total
                    FROM order_lines
                    WHERE shop_order_id = $1
                    GROUP BY product_item_id
                ) l ON p.id = l.product_item_id
                WHERE p.qty_in_stock < l.total
                ORDER BY p.id
                LIMIT 1
            "#,
        )
        .bind(shop_order_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(product_item_id) = short {
            return Ok(Approval::OutOfStock(product_item_id));
        }

        sqlx::query(
            "UPDATE shop_orders SET order_status = $1, payment_method_id = $2 WHERE id = $3",
        )
        .bind(OrderStatus::OrderPlaced)
        .bind(payment_method_id)
        .bind(shop_order_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
                UPDATE product_items p
                SET qty_in_stock = p.qty_in_stock - l.total
                FROM (
                    SELECT product_item_id, SUM(qty)::BIGINT AS total
                    FROM order_lines
                    WHERE shop_order_id = $1
                    GROUP BY product_item_id
                ) l
                WHERE p.id = l.product_item_id
            "#,
        )
        .bind(shop_order_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
                UPDATE carts
                SET total_price = 0, applied_coupon_id = NULL, discount_amount = 0
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Approval::Placed)
    }

    async fn find_all_stock(&self, pagination: Pagination) -> Result<Vec<Stock>, anyhow::Error> {
        let stock = sqlx::query_as::<_, Stock>(
            r#"
                SELECT id AS product_item_id, sku, qty_in_stock, price
                FROM product_items
                ORDER BY sku
                LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.conn)
        .await?;

        Ok(stock)
    }

    async fn find_stock_by_sku(&self, sku: &str) -> Result<Option<Stock>, anyhow::Error> {
        let stock = sqlx::query_as::<_, Stock>(
            "SELECT id AS product_item_id, sku, qty_in_stock, price FROM product_items WHERE sku = $1",
        )
        .bind(sku)
        .fetch_optional(&self.conn)
        .await?;

        Ok(stock)
    }

    async fn update_stock_by_sku(&self, update: &UpdateStock) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            r#"
                UPDATE product_items
                SET qty_in_stock = qty_in_stock + $1
                WHERE sku = $2 AND qty_in_stock + $1 >= 0
            "#,
        )
        .bind(update.qty_to_add)
        .bind(&update.sku)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            bail!("Stock of {} cannot change by {}", update.sku, update.qty_to_add)
        }

        Ok(())
    }

    async fn create_full_sales_report(
        &self,
        request: &SalesReportRequest,
    ) -> Result<Vec<SalesReport>, anyhow::Error> {
        let report = sqlx::query_as::<_, SalesReport>(
            r#"
                SELECT u.id AS user_id, u.first_name, u.email, o.id AS shop_order_id,
                    o.order_date, o.order_total_price, o.discount, o.order_status,
                    pm.payment_type
                FROM shop_orders o
                JOIN users u ON u.id = o.user_id
                LEFT JOIN payment_methods pm ON pm.id = o.payment_method_id
                WHERE o.order_date >= $1 AND o.order_date <= $2
                ORDER BY o.order_date DESC
                LIMIT $3 OFFSET $4
            "#,
        )
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.pagination.limit())
        .bind(request.pagination.offset())
        .fetch_all(&self.conn)
        .await?;

        Ok(report)
    }
}
