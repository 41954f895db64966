use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{ErrorKind, RequestHandler, Service};
use crate::{
    models::{
        orders::{
            Approval, ApproveOrder, OrderStatus, PaymentMethod, PaymentMethodUpdate, PaymentType,
            SalesReport, SalesReportRequest, ShopOrder, Stock, UpdateStock,
        },
        payments::{PaymentOrder, PaymentVerification},
        wallets::{Transaction, Wallet},
        Pagination,
    },
    repositories::{orders::OrderRepository, payments::PaymentProvider, wallets::WalletRepository},
};

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Order is {0}")]
    InvalidOrderStatus(OrderStatus),
    #[error("Payment method not found")]
    PaymentMethodNotFound,
    #[error("Payment method {0} is not available")]
    PaymentMethodUnavailable(PaymentType),
    #[error("Order amount {amount} exceeds the {maximum} limit of {payment_type}")]
    PaymentAmountExceeded {
        payment_type: PaymentType,
        amount: i64,
        maximum: i64,
    },
    #[error("No payment provider configured for {0}")]
    UnsupportedPaymentType(PaymentType),
    #[error("Product item {0} is out of stock")]
    OutOfStock(String),
    #[error("Stock not found for sku {0}")]
    StockNotFound(String),
    #[error("Stock of {sku} is {qty_in_stock}, cannot change by {qty_to_add}")]
    InsufficientStock {
        sku: String,
        qty_in_stock: i64,
        qty_to_add: i64,
    },
    #[error("Report start date is after its end date")]
    InvalidDateRange,
    #[error("Payment not approved")]
    PaymentNotApproved,
    #[error("Payment confirmed but order approval failed: {0}")]
    ApprovalFailed(String),
    #[error("Payment provider error: {0}")]
    Provider(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::WalletNotFound
            | OrderError::OrderNotFound
            | OrderError::PaymentMethodNotFound
            | OrderError::StockNotFound(_) => ErrorKind::NotFound,
            OrderError::UnsupportedPaymentType(_) | OrderError::InvalidDateRange => {
                ErrorKind::Validation
            }
            OrderError::InvalidOrderStatus(_)
            | OrderError::OutOfStock(_)
            | OrderError::InsufficientStock { .. }
            | OrderError::PaymentMethodUnavailable(_)
            | OrderError::PaymentAmountExceeded { .. }
            | OrderError::PaymentNotApproved => ErrorKind::State,
            OrderError::Provider(_) => ErrorKind::ExternalProvider,
            OrderError::ApprovalFailed(_) | OrderError::Database(_) => ErrorKind::Internal,
        }
    }
}

fn database_error(context: &'static str) -> impl Fn(anyhow::Error) -> OrderError {
    move |e| OrderError::Database(format!("{context}: {e}"))
}

pub enum OrderRequest {
    FindUserWallet {
        user_id: String,
        response: oneshot::Sender<Result<Wallet, OrderError>>,
    },
    FindUserWalletTransactions {
        user_id: String,
        pagination: Pagination,
        response: oneshot::Sender<Result<Vec<Transaction>, OrderError>>,
    },
    FindAllPaymentMethods {
        response: oneshot::Sender<Result<Vec<PaymentMethod>, OrderError>>,
    },
    FindPaymentMethodById {
        payment_method_id: String,
        response: oneshot::Sender<Result<PaymentMethod, OrderError>>,
    },
    UpdatePaymentMethod {
        update: PaymentMethodUpdate,
        response: oneshot::Sender<Result<(), OrderError>>,
    },
    MakePaymentOrder {
        user_id: String,
        order: ApproveOrder,
        response: oneshot::Sender<Result<PaymentOrder, OrderError>>,
    },
    VerifyPayment {
        user_id: String,
        shop_order_id: String,
        verification: PaymentVerification,
        response: oneshot::Sender<Result<(), OrderError>>,
    },
    ApproveShopOrder {
        user_id: String,
        order: ApproveOrder,
        response: oneshot::Sender<Result<(), OrderError>>,
    },
    VerifyPaymentAndApprove {
        user_id: String,
        shop_order_id: String,
        verification: PaymentVerification,
        response: oneshot::Sender<Result<(), OrderError>>,
    },
    FindAllStock {
        pagination: Pagination,
        response: oneshot::Sender<Result<Vec<Stock>, OrderError>>,
    },
    UpdateStockBySku {
        update: UpdateStock,
        response: oneshot::Sender<Result<(), OrderError>>,
    },
    FullSalesReport {
        request: SalesReportRequest,
        response: oneshot::Sender<Result<Vec<SalesReport>, OrderError>>,
    },
}

#[derive(Clone)]
pub struct OrderRequestHandler {
    wallets: Arc<dyn WalletRepository>,
    orders: Arc<dyn OrderRepository>,
    payment_providers: Arc<HashMap<PaymentType, Arc<dyn PaymentProvider>>>,
}

impl OrderRequestHandler {
    pub fn new(
        wallets: Arc<dyn WalletRepository>,
        orders: Arc<dyn OrderRepository>,
        payment_providers: HashMap<PaymentType, Arc<dyn PaymentProvider>>,
    ) -> Self {
        OrderRequestHandler {
            wallets,
            orders,
            payment_providers: Arc::new(payment_providers),
        }
    }

    pub async fn find_user_wallet(&self, user_id: &str) -> Result<Wallet, OrderError> {
        let wallet = self
            .wallets
            .find_wallet_by_user_id(user_id)
            .await
            .map_err(database_error("failed to find wallet"))?;

        if let Some(wallet) = wallet {
            return Ok(wallet);
        }

        let wallet_id = self
            .wallets
            .save_wallet(user_id)
            .await
            .map_err(database_error("failed to create wallet"))?;

        log::info!("Created wallet {} for user {}", wallet_id, user_id);
        Ok(Wallet {
            id: wallet_id,
            user_id: user_id.to_string(),
            total_amount: 0,
        })
    }

    /// Unlike `find_user_wallet` this never creates the wallet.
    pub async fn find_user_wallet_transactions(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<Vec<Transaction>, OrderError> {
        let wallet = self
            .wallets
            .find_wallet_by_user_id(user_id)
            .await
            .map_err(database_error("failed to find wallet"))?
            .ok_or(OrderError::WalletNotFound)?;

        self.wallets
            .find_wallet_transactions(&wallet.id, pagination)
            .await
            .map_err(database_error("failed to find wallet transactions"))
    }

    pub async fn find_all_payment_methods(&self) -> Result<Vec<PaymentMethod>, OrderError> {
        self.orders
            .find_all_payment_methods()
            .await
            .map_err(database_error("failed to find payment methods"))
    }

    pub async fn find_payment_method_by_id(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, OrderError> {
        self.orders
            .find_payment_method_by_id(payment_method_id)
            .await
            .map_err(database_error("failed to find payment method"))?
            .ok_or(OrderError::PaymentMethodNotFound)
    }

    pub async fn update_payment_method(
        &self,
        update: PaymentMethodUpdate,
    ) -> Result<(), OrderError> {
        self.find_payment_method_by_id(&update.id).await?;

        self.orders
            .update_payment_method(&update)
            .await
            .map_err(database_error("failed to update payment method"))?;

        log::info!("Payment method {} updated", update.id);
        Ok(())
    }

    async fn find_user_order(
        &self,
        user_id: &str,
        shop_order_id: &str,
    ) -> Result<ShopOrder, OrderError> {
        let order = self
            .orders
            .find_shop_order_by_id(shop_order_id)
            .await
            .map_err(database_error("failed to find shop order"))?
            .ok_or(OrderError::OrderNotFound)?;

        if order.user_id != user_id {
            log::warn!(
                "User {} asked for order {} owned by someone else",
                user_id,
                shop_order_id
            );
            return Err(OrderError::OrderNotFound);
        }

        Ok(order)
    }

    async fn usable_payment_method(
        &self,
        payment_type: PaymentType,
        amount: i64,
    ) -> Result<PaymentMethod, OrderError> {
        let method = self
            .orders
            .find_payment_method_by_type(payment_type)
            .await
            .map_err(database_error("failed to find payment method"))?
            .ok_or(OrderError::PaymentMethodUnavailable(payment_type))?;

        if method.block_status {
            return Err(OrderError::PaymentMethodUnavailable(payment_type));
        }
        if amount > method.maximum_amount {
            return Err(OrderError::PaymentAmountExceeded {
                payment_type,
                amount,
                maximum: method.maximum_amount,
            });
        }

        Ok(method)
    }

    fn provider(&self, payment_type: PaymentType) -> Result<&Arc<dyn PaymentProvider>, OrderError> {
        self.payment_providers
            .get(&payment_type)
            .ok_or(OrderError::UnsupportedPaymentType(payment_type))
    }

    pub async fn make_payment_order(
        &self,
        user_id: &str,
        order: ApproveOrder,
    ) -> Result<PaymentOrder, OrderError> {
        let shop_order = self.find_user_order(user_id, &order.shop_order_id).await?;

        if shop_order.order_status != OrderStatus::PaymentPending {
            return Err(OrderError::InvalidOrderStatus(shop_order.order_status));
        }

        self.usable_payment_method(order.payment_type, shop_order.amount_payable())
            .await?;
        let provider = self.provider(order.payment_type)?;

        let payment_order = provider
            .create_order(&shop_order)
            .await
            .map_err(|e| OrderError::Provider(e.to_string()))?;

        log::info!(
            "Created {} payment order {} for shop order {}",
            order.payment_type,
            payment_order.provider_order_id,
            shop_order.id
        );
        Ok(payment_order)
    }

    async fn verify_order_payment(
        &self,
        shop_order: &ShopOrder,
        verification: &PaymentVerification,
    ) -> Result<(), OrderError> {
        let provider = self.provider(verification.payment_type())?;

        let approved = provider
            .verify_payment(shop_order, verification)
            .await
            .map_err(|e| OrderError::Provider(e.to_string()))?;

        if !approved {
            log::warn!(
                "{} payment was not approved for order {}",
                verification.payment_type(),
                shop_order.id
            );
            return Err(OrderError::PaymentNotApproved);
        }

        Ok(())
    }

    /// Checks that the provider settled `shop_order_id` itself, for its
    /// payable amount.
    pub async fn verify_payment(
        &self,
        user_id: &str,
        shop_order_id: &str,
        verification: &PaymentVerification,
    ) -> Result<(), OrderError> {
        let shop_order = self.find_user_order(user_id, shop_order_id).await?;

        self.verify_order_payment(&shop_order, verification).await
    }

    /// Places the order and clears the user's cart. Approving an order that is
    /// already placed succeeds without changes.
    pub async fn approve_shop_order_and_clear_cart(
        &self,
        user_id: &str,
        order: ApproveOrder,
    ) -> Result<(), OrderError> {
        let shop_order = self.find_user_order(user_id, &order.shop_order_id).await?;

        match shop_order.order_status {
            OrderStatus::PaymentPending => {}
            OrderStatus::OrderPlaced => {
                log::info!("Order {} already placed", shop_order.id);
                return Ok(());
            }
            status => return Err(OrderError::InvalidOrderStatus(status)),
        }

        let method = self
            .usable_payment_method(order.payment_type, shop_order.amount_payable())
            .await?;

        let approval = self
            .orders
            .approve_order_and_clear_cart(user_id, &shop_order.id, &method.id)
            .await
            .map_err(database_error("failed to approve order"))?;

        match approval {
            Approval::Placed => {
                log::info!(
                    "Order {} placed with {} for user {}",
                    shop_order.id,
                    order.payment_type,
                    user_id
                );
                Ok(())
            }
            Approval::AlreadyPlaced => {
                log::info!("Order {} was placed concurrently", shop_order.id);
                Ok(())
            }
            Approval::NotPending(status) => Err(OrderError::InvalidOrderStatus(status)),
            Approval::OutOfStock(product_item_id) => Err(OrderError::OutOfStock(product_item_id)),
        }
    }

    pub async fn verify_payment_and_approve(
        &self,
        user_id: &str,
        shop_order_id: &str,
        verification: PaymentVerification,
    ) -> Result<(), OrderError> {
        let shop_order = self.find_user_order(user_id, shop_order_id).await?;
        self.verify_order_payment(&shop_order, &verification).await?;

        let order = ApproveOrder {
            shop_order_id: shop_order_id.to_string(),
            payment_type: verification.payment_type(),
        };

        self.approve_shop_order_and_clear_cart(user_id, order)
            .await
            .map_err(|e| {
                log::error!(
                    "Payment for order {} confirmed but approval failed: {}",
                    shop_order_id,
                    e
                );
                OrderError::ApprovalFailed(e.to_string())
            })
    }

    pub async fn find_all_stock(&self, pagination: Pagination) -> Result<Vec<Stock>, OrderError> {
        self.orders
            .find_all_stock(pagination)
            .await
            .map_err(database_error("failed to find stock details"))
    }

    pub async fn update_stock_by_sku(&self, update: UpdateStock) -> Result<(), OrderError> {
        let stock = self
            .orders
            .find_stock_by_sku(&update.sku)
            .await
            .map_err(database_error("failed to find stock"))?
            .ok_or_else(|| OrderError::StockNotFound(update.sku.clone()))?;

        if stock.qty_in_stock + update.qty_to_add < 0 {
            return Err(OrderError::InsufficientStock {
                sku: update.sku,
                qty_in_stock: stock.qty_in_stock,
                qty_to_add: update.qty_to_add,
            });
        }

        self.orders
            .update_stock_by_sku(&update)
            .await
            .map_err(database_error("failed to update stock"))?;

        log::info!("Stock of sku {} changed by {}", update.sku, update.qty_to_add);
        Ok(())
    }

    pub async fn get_full_sales_report(
        &self,
        request: SalesReportRequest,
    ) -> Result<Vec<SalesReport>, OrderError> {
        if request.start_date > request.end_date {
            return Err(OrderError::InvalidDateRange);
        }

        let report = self
            .orders
            .create_full_sales_report(&request)
            .await
            .map_err(database_error("failed to create sales report"))?;

        log::info!(
            "Sales report from {} to {} has {} orders",
            request.start_date,
            request.end_date,
            report.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl RequestHandler<OrderRequest> for OrderRequestHandler {
    async fn handle_request(&self, request: OrderRequest) {
        match request {
            OrderRequest::FindUserWallet { user_id, response } => {
                let result = self.find_user_wallet(&user_id).await;
                let _ = response.send(result);
            }
            OrderRequest::FindUserWalletTransactions {
                user_id,
                pagination,
                response,
            } => {
                let result = self
                    .find_user_wallet_transactions(&user_id, pagination)
                    .await;
                let _ = response.send(result);
            }
            OrderRequest::FindAllPaymentMethods { response } => {
                let result = self.find_all_payment_methods().await;
                let _ = response.send(result);
            }
            OrderRequest::FindPaymentMethodById {
                payment_method_id,
                response,
            } => {
                let result = self.find_payment_method_by_id(&payment_method_id).await;
                let _ = response.send(result);
            }
            OrderRequest::UpdatePaymentMethod { update, response } => {
                let result = self.update_payment_method(update).await;
                let _ = response.send(result);
            }
            OrderRequest::MakePaymentOrder {
                user_id,
                order,
                response,
            } => {
                let result = self.make_payment_order(&user_id, order).await;
                let _ = response.send(result);
            }
            OrderRequest::VerifyPayment {
                user_id,
                shop_order_id,
                verification,
                response,
            } => {
                let result = self
                    .verify_payment(&user_id, &shop_order_id, &verification)
                    .await;
                let _ = response.send(result);
            }
            OrderRequest::ApproveShopOrder {
                user_id,
                order,
                response,
            } => {
                let result = self.approve_shop_order_and_clear_cart(&user_id, order).await;
                let _ = response.send(result);
            }
            OrderRequest::VerifyPaymentAndApprove {
                user_id,
                shop_order_id,
                verification,
                response,
            } => {
                let result = self
                    .verify_payment_and_approve(&user_id, &shop_order_id, verification)
                    .await;
                let _ = response.send(result);
            }
            OrderRequest::FindAllStock {
                pagination,
                response,
            } => {
                let result = self.find_all_stock(pagination).await;
                let _ = response.send(result);
            }
            OrderRequest::UpdateStockBySku { update, response } => {
                let result = self.update_stock_by_sku(update).await;
                let _ = response.send(result);
            }
            OrderRequest::FullSalesReport { request, response } => {
                let result = self.get_full_sales_report(request).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct OrderService;

impl OrderService {
    pub fn new() -> Self {
        OrderService {}
    }
}

#[async_trait]
impl Service<OrderRequest, OrderRequestHandler> for OrderService {}
