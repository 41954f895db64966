//! In-memory repositories for exercising services without Postgres.

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    admins::AdminRepository, orders::OrderRepository, sessions::SessionRepository,
    users::UserRepository, wallets::WalletRepository,
};
use crate::models::{
    orders::{
        Approval, OrderStatus, PaymentMethod, PaymentMethodUpdate, PaymentType, SalesReport,
        SalesReportRequest, ShopOrder, Stock, UpdateStock,
    },
    sessions::{OtpSession, RefreshSession},
    users::{Admin, NewAdmin, NewUser, User},
    wallets::{Transaction, Wallet},
    Pagination,
};

#[derive(Default)]
pub struct MemoryStore {
    pub users: DashMap<String, User>,
    pub admins: DashMap<String, Admin>,
    pub otp_sessions: DashMap<String, OtpSession>,
    pub refresh_sessions: DashMap<String, RefreshSession>,
    pub wallets: DashMap<String, Wallet>,
    pub transactions: DashMap<String, Transaction>,
    pub orders: DashMap<String, ShopOrder>,
    pub payment_methods: DashMap<String, PaymentMethod>,
    /// user id -> cart item ids
    pub cart_items: DashMap<String, Vec<String>>,
    /// shop order id -> (product item id, qty)
    pub order_lines: DashMap<String, Vec<(String, i64)>>,
    /// product item id -> stock row
    pub product_items: DashMap<String, Stock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payment_methods(self) -> Self {
        for (id, payment_type, maximum_amount) in [
            ("razorpay", PaymentType::Razorpay, 50_000),
            ("cod", PaymentType::Cod, 20_000),
            ("stripe", PaymentType::Stripe, 50_000),
        ] {
            self.payment_methods.insert(
                id.to_string(),
                PaymentMethod {
                    id: id.to_string(),
                    payment_type,
                    block_status: false,
                    maximum_amount,
                },
            );
        }
        self
    }

    pub fn insert_user(&self, user: &NewUser, verified: bool, block_status: bool) -> String {
        let id = Uuid::new_v4().hyphenated().to_string();
        let now = Utc::now();
        self.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                user_name: user.user_name.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
                password: user.password.clone(),
                verified,
                block_status,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn insert_order(&self, user_id: &str, total: i64, status: OrderStatus) -> String {
        let id = Uuid::new_v4().hyphenated().to_string();
        self.orders.insert(
            id.clone(),
            ShopOrder {
                id: id.clone(),
                user_id: user_id.to_string(),
                order_date: Utc::now(),
                order_total_price: total,
                discount: 0,
                order_status: status,
                payment_method_id: None,
            },
        );
        id
    }

    pub fn insert_product_item(&self, id: &str, sku: &str, qty_in_stock: i64) {
        self.product_items.insert(
            id.to_string(),
            Stock {
                product_item_id: id.to_string(),
                sku: sku.to_string(),
                qty_in_stock,
                price: 100,
            },
        );
    }

    fn find_user_by(&self, matches: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .iter()
            .find(|entry| matches(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.users.get(user_id).map(|user| user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.find_user_by(|user| user.email == email))
    }

    async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        Ok(self.find_user_by(|user| user.user_name == user_name))
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.find_user_by(|user| user.phone == phone))
    }

    async fn find_conflicting_user(
        &self,
        user: &NewUser,
        exclude_id: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut conflicts: Vec<User> = self
            .users
            .iter()
            .filter(|entry| Some(entry.key().as_str()) != exclude_id)
            .filter(|entry| {
                let existing = entry.value();
                existing.user_name == user.user_name
                    || existing.email == user.email
                    || (!existing.phone.is_empty() && existing.phone == user.phone)
            })
            .map(|entry| entry.value().clone())
            .collect();
        conflicts.sort_by_key(|existing| !existing.verified);

        Ok(conflicts.into_iter().next())
    }

    async fn save_user(&self, user: &NewUser) -> Result<String, anyhow::Error> {
        Ok(self.insert_user(user, false, false))
    }

    async fn update_verified(&self, user_id: &str) -> Result<(), anyhow::Error> {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.verified = true;
                Ok(())
            }
            None => bail!("User not found"),
        }
    }

    async fn update_block_status(
        &self,
        user_id: &str,
        block: bool,
    ) -> Result<(), anyhow::Error> {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.block_status = block;
                Ok(())
            }
            None => bail!("User not found"),
        }
    }

    async fn find_all_users(&self, pagination: Pagination) -> Result<Vec<User>, anyhow::Error> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.user_name.cmp(&b.user_name));

        Ok(users
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, anyhow::Error> {
        Ok(self
            .admins
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn find_admin_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<Admin>, anyhow::Error> {
        Ok(self
            .admins
            .iter()
            .find(|entry| entry.user_name == user_name)
            .map(|entry| entry.value().clone()))
    }

    async fn save_admin(&self, admin: &NewAdmin) -> Result<String, anyhow::Error> {
        let id = Uuid::new_v4().hyphenated().to_string();
        let now = Utc::now();
        self.admins.insert(
            id.clone(),
            Admin {
                id: id.clone(),
                user_name: admin.user_name.clone(),
                email: admin.email.clone(),
                password: admin.password.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn save_otp_session(&self, session: &OtpSession) -> Result<(), anyhow::Error> {
        self.otp_sessions
            .insert(session.otp_id.clone(), session.clone());
        Ok(())
    }

    async fn find_otp_session(&self, otp_id: &str) -> Result<Option<OtpSession>, anyhow::Error> {
        Ok(self.otp_sessions.get(otp_id).map(|session| session.clone()))
    }

    async fn save_refresh_session(&self, session: &RefreshSession) -> Result<(), anyhow::Error> {
        self.refresh_sessions
            .insert(session.token_id.clone(), session.clone());
        Ok(())
    }

    async fn find_refresh_session_by_token_id(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshSession>, anyhow::Error> {
        Ok(self
            .refresh_sessions
            .get(token_id)
            .map(|session| session.clone()))
    }

    async fn block_refresh_session(&self, token_id: &str) -> Result<(), anyhow::Error> {
        match self.refresh_sessions.get_mut(token_id) {
            Some(mut session) => {
                session.is_blocked = true;
                Ok(())
            }
            None => bail!("Refresh session not found"),
        }
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn find_wallet_by_user_id(&self, user_id: &str) -> Result<Option<Wallet>, anyhow::Error> {
        Ok(self
            .wallets
            .iter()
            .find(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn save_wallet(&self, user_id: &str) -> Result<String, anyhow::Error> {
        if self.wallets.iter().any(|entry| entry.user_id == user_id) {
            bail!("Wallet already exists for user {}", user_id)
        }

        let id = Uuid::new_v4().hyphenated().to_string();
        self.wallets.insert(
            id.clone(),
            Wallet {
                id: id.clone(),
                user_id: user_id.to_string(),
                total_amount: 0,
            },
        );
        Ok(id)
    }

    async fn find_wallet_transactions(
        &self,
        wallet_id: &str,
        pagination: Pagination,
    ) -> Result<Vec<Transaction>, anyhow::Error> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.wallet_id == wallet_id)
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));

        Ok(transactions
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_shop_order_by_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<ShopOrder>, anyhow::Error> {
        Ok(self.orders.get(shop_order_id).map(|order| order.clone()))
    }

    async fn find_all_payment_methods(&self) -> Result<Vec<PaymentMethod>, anyhow::Error> {
        let mut methods: Vec<PaymentMethod> = self
            .payment_methods
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        methods.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(methods)
    }

    async fn find_payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> Result<Option<PaymentMethod>, anyhow::Error> {
        Ok(self
            .payment_methods
            .get(payment_method_id)
            .map(|method| method.clone()))
    }

    async fn find_payment_method_by_type(
        &self,
        payment_type: PaymentType,
    ) -> Result<Option<PaymentMethod>, anyhow::Error> {
        Ok(self
            .payment_methods
            .iter()
            .find(|entry| entry.payment_type == payment_type)
            .map(|entry| entry.value().clone()))
    }

    async fn update_payment_method(
        &self,
        update: &PaymentMethodUpdate,
    ) -> Result<(), anyhow::Error> {
        match self.payment_methods.get_mut(&update.id) {
            Some(mut method) => {
                if let Some(block_status) = update.block_status {
                    method.block_status = block_status;
                }
                if let Some(maximum_amount) = update.maximum_amount {
                    method.maximum_amount = maximum_amount;
                }
                Ok(())
            }
            None => bail!("Payment method not found"),
        }
    }

    async fn approve_order_and_clear_cart(
        &self,
        user_id: &str,
        shop_order_id: &str,
        payment_method_id: &str,
    ) -> Result<Approval, anyhow::Error> {
        let Some(mut order) = self.orders.get_mut(shop_order_id) else {
            bail!("Order {} not found", shop_order_id)
        };
        if order.user_id != user_id {
            bail!("Order {} not found", shop_order_id)
        }
        match order.order_status {
            OrderStatus::PaymentPending => {}
            OrderStatus::OrderPlaced => return Ok(Approval::AlreadyPlaced),
            status => return Ok(Approval::NotPending(status)),
        }

        let lines = self
            .order_lines
            .get(shop_order_id)
            .map(|lines| lines.clone())
            .unwrap_or_default();
        for (product_item_id, _) in &lines {
            let in_stock = self
                .product_items
                .get(product_item_id)
                .map(|item| item.qty_in_stock)
                .unwrap_or(0);
            let wanted: i64 = lines
                .iter()
                .filter(|(id, _)| id == product_item_id)
                .map(|(_, qty)| qty)
                .sum();
            if in_stock < wanted {
                return Ok(Approval::OutOfStock(product_item_id.clone()));
            }
        }

        order.order_status = OrderStatus::OrderPlaced;
        order.payment_method_id = Some(payment_method_id.to_string());
        drop(order);

        for (product_item_id, qty) in &lines {
            if let Some(mut item) = self.product_items.get_mut(product_item_id) {
                item.qty_in_stock -= qty;
            }
        }
        self.cart_items.remove(user_id);

        Ok(Approval::Placed)
    }

    async fn find_all_stock(&self, pagination: Pagination) -> Result<Vec<Stock>, anyhow::Error> {
        let mut stock: Vec<Stock> = self
            .product_items
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        stock.sort_by(|a, b| a.sku.cmp(&b.sku));

        Ok(stock
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }

    async fn find_stock_by_sku(&self, sku: &str) -> Result<Option<Stock>, anyhow::Error> {
        Ok(self
            .product_items
            .iter()
            .find(|entry| entry.sku == sku)
            .map(|entry| entry.value().clone()))
    }

    async fn update_stock_by_sku(&self, update: &UpdateStock) -> Result<(), anyhow::Error> {
        for mut item in self.product_items.iter_mut() {
            if item.sku == update.sku {
                if item.qty_in_stock + update.qty_to_add < 0 {
                    bail!("Stock of {} cannot change by {}", update.sku, update.qty_to_add)
                }
                item.qty_in_stock += update.qty_to_add;
                return Ok(());
            }
        }

        bail!("Stock of {} cannot change by {}", update.sku, update.qty_to_add)
    }

    async fn create_full_sales_report(
        &self,
        request: &SalesReportRequest,
    ) -> Result<Vec<SalesReport>, anyhow::Error> {
        let mut report: Vec<SalesReport> = self
            .orders
            .iter()
            .filter(|entry| {
                entry.order_date >= request.start_date && entry.order_date <= request.end_date
            })
            .filter_map(|entry| {
                let order = entry.value();
                let user = self.users.get(&order.user_id)?;
                let payment_type = order
                    .payment_method_id
                    .as_ref()
                    .and_then(|id| self.payment_methods.get(id))
                    .map(|method| method.payment_type);

                Some(SalesReport {
                    user_id: user.id.clone(),
                    first_name: user.first_name.clone(),
                    email: user.email.clone(),
                    shop_order_id: order.id.clone(),
                    order_date: order.order_date,
                    order_total_price: order.order_total_price,
                    discount: order.discount,
                    order_status: order.order_status,
                    payment_type,
                })
            })
            .collect();
        report.sort_by(|a, b| b.order_date.cmp(&a.order_date));

        Ok(report
            .into_iter()
            .skip(request.pagination.offset() as usize)
            .take(request.pagination.limit() as usize)
            .collect())
    }
}
