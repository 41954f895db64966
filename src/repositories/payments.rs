use async_trait::async_trait;

use crate::models::{
    orders::ShopOrder,
    payments::{PaymentOrder, PaymentVerification},
};

mod razorpay;
mod stripe;

pub use razorpay::RazorpayApi;
pub use stripe::StripeApi;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, shop_order: &ShopOrder) -> Result<PaymentOrder, anyhow::Error>;
    /// `Ok(false)` means the provider answered and did not approve a payment
    /// of `shop_order`'s payable amount for `shop_order` itself.
    async fn verify_payment(
        &self,
        shop_order: &ShopOrder,
        verification: &PaymentVerification,
    ) -> Result<bool, anyhow::Error>;
}

/// Providers bill in the currency's minor unit.
fn minor_units(amount: i64) -> i64 {
    amount * 100
}
