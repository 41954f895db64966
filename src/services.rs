use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use crate::{
    crypto::TokenService,
    models::orders::PaymentType,
    repositories::{
        admins::PgAdminRepository,
        orders::PgOrderRepository,
        otp::TwilioVerify,
        payments::{PaymentProvider, RazorpayApi, StripeApi},
        sessions::PgSessionRepository,
        users::PgUserRepository,
        wallets::PgWalletRepository,
    },
    settings::Settings,
};

pub mod admin;
pub mod auth;
pub mod orders;

/// Coarse classification a transport maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    State,
    ExternalProvider,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh reply channel and waits for the answer.
pub async fn call<T, R>(
    channel: &mpsc::Sender<T>,
    service: &str,
    build: impl FnOnce(oneshot::Sender<R>) -> T,
) -> Result<R, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(build(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))
}

/// Request channels of the running services.
#[derive(Clone)]
pub struct ServiceHandles {
    pub auth: mpsc::Sender<auth::AuthRequest>,
    pub admin: mpsc::Sender<admin::AdminRequest>,
    pub orders: mpsc::Sender<orders::OrderRequest>,
}

pub fn spawn_services(
    auth_handler: auth::AuthRequestHandler,
    admin_handler: admin::AdminRequestHandler,
    order_handler: orders::OrderRequestHandler,
) -> ServiceHandles {
    let (auth_tx, mut auth_rx) = mpsc::channel(512);
    let (admin_tx, mut admin_rx) = mpsc::channel(512);
    let (order_tx, mut order_rx) = mpsc::channel(512);

    let mut auth_service = auth::AuthService::new();
    let mut admin_service = admin::AdminService::new();
    let mut order_service = orders::OrderService::new();

    log::info!("Starting auth service.");
    tokio::spawn(async move {
        auth_service.run(auth_handler, &mut auth_rx).await;
    });

    log::info!("Starting admin service.");
    tokio::spawn(async move {
        admin_service.run(admin_handler, &mut admin_rx).await;
    });

    log::info!("Starting order service.");
    tokio::spawn(async move {
        order_service.run(order_handler, &mut order_rx).await;
    });

    ServiceHandles {
        auth: auth_tx,
        admin: admin_tx,
        orders: order_tx,
    }
}

pub async fn start_services(
    pool: PgPool,
    settings: Settings,
) -> Result<ServiceHandles, anyhow::Error> {
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let admins = Arc::new(PgAdminRepository::new(pool.clone()));
    let sessions = Arc::new(PgSessionRepository::new(pool.clone()));
    let wallets = Arc::new(PgWalletRepository::new(pool.clone()));
    let orders = Arc::new(PgOrderRepository::new(pool));

    let otp_provider = Arc::new(TwilioVerify::new(
        settings.twilio.url,
        settings.twilio.account_sid,
        settings.twilio.auth_token,
        settings.twilio.service_id,
    ));

    let mut payment_providers: HashMap<PaymentType, Arc<dyn PaymentProvider>> = HashMap::new();
    if let Some(stripe) = settings.stripe {
        payment_providers.insert(
            PaymentType::Stripe,
            Arc::new(StripeApi::new(
                stripe.url,
                stripe.secret_key,
                stripe.publishable_key,
                stripe.currency,
            )),
        );
    }
    if let Some(razorpay) = settings.razorpay {
        payment_providers.insert(
            PaymentType::Razorpay,
            Arc::new(RazorpayApi::new(
                razorpay.url,
                razorpay.key_id,
                razorpay.key_secret,
                razorpay.currency,
            )),
        );
    }
    if payment_providers.is_empty() {
        log::warn!("No payment provider configured; only cash on delivery orders can be approved.");
    }

    let auth_handler = auth::AuthRequestHandler::new(
        users.clone(),
        admins.clone(),
        sessions,
        otp_provider,
        TokenService::new(&settings.tokens.secret),
        auth::AuthOptions {
            country_code: settings.otp.country_code,
            send_timeout: Duration::from_secs(settings.otp.send_timeout_secs),
            signup_otp: settings.otp.signup_otp,
        },
    );
    let admin_handler = admin::AdminRequestHandler::new(admins, users);
    let order_handler = orders::OrderRequestHandler::new(wallets, orders, payment_providers);

    admin_handler
        .bootstrap_admin(&settings.admin)
        .await
        .map_err(|e| anyhow::anyhow!("Could not bootstrap admin: {}", e))?;

    Ok(spawn_services(auth_handler, admin_handler, order_handler))
}
