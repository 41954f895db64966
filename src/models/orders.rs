use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pagination;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PaymentPending,
    OrderPlaced,
    OrderCancelled,
    OrderDelivered,
    ReturnRequested,
    ReturnApproved,
    ReturnCancelled,
    OrderReturned,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            OrderStatus::PaymentPending => "payment pending",
            OrderStatus::OrderPlaced => "order placed",
            OrderStatus::OrderCancelled => "order cancelled",
            OrderStatus::OrderDelivered => "order delivered",
            OrderStatus::ReturnRequested => "return requested",
            OrderStatus::ReturnApproved => "return approved",
            OrderStatus::ReturnCancelled => "return cancelled",
            OrderStatus::OrderReturned => "order returned",
        };
        f.write_str(status)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Razorpay,
    Cod,
    Stripe,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payment_type = match self {
            PaymentType::Razorpay => "razor pay",
            PaymentType::Cod => "cod",
            PaymentType::Stripe => "stripe",
        };
        f.write_str(payment_type)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ShopOrder {
    pub id: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub order_total_price: i64,
    pub discount: i64,
    pub order_status: OrderStatus,
    pub payment_method_id: Option<String>,
}

impl ShopOrder {
    pub fn amount_payable(&self) -> i64 {
        (self.order_total_price - self.discount).max(0)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: String,
    pub payment_type: PaymentType,
    pub block_status: bool,
    pub maximum_amount: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PaymentMethodUpdate {
    pub id: String,
    pub block_status: Option<bool>,
    pub maximum_amount: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApproveOrder {
    pub shop_order_id: String,
    pub payment_type: PaymentType,
}

/// Result of trying to place a pending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Approval {
    Placed,
    AlreadyPlaced,
    NotPending(OrderStatus),
    /// Not enough stock left for this product item.
    OutOfStock(String),
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Stock {
    pub product_item_id: String,
    pub sku: String,
    pub qty_in_stock: i64,
    pub price: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateStock {
    pub sku: String,
    /// Negative values take items out of stock.
    pub qty_to_add: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SalesReportRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct SalesReport {
    pub user_id: String,
    pub first_name: String,
    pub email: String,
    pub shop_order_id: String,
    pub order_date: DateTime<Utc>,
    pub order_total_price: i64,
    pub discount: i64,
    pub order_status: OrderStatus,
    pub payment_type: Option<PaymentType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(OrderStatus::PaymentPending.to_string(), "payment pending");
        assert_eq!(OrderStatus::OrderPlaced.to_string(), "order placed");
        assert_eq!(PaymentType::Razorpay.to_string(), "razor pay");
    }

    #[test]
    fn test_amount_payable_never_negative() {
        let order = ShopOrder {
            id: "order-1".to_string(),
            user_id: "user-1".to_string(),
            order_date: Utc::now(),
            order_total_price: 500,
            discount: 700,
            order_status: OrderStatus::PaymentPending,
            payment_method_id: None,
        };
        assert_eq!(order.amount_payable(), 0);
    }
}
