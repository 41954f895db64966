use anyhow::bail;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::{minor_units, PaymentProvider};
use crate::models::{
    orders::{PaymentType, ShopOrder},
    payments::{PaymentOrder, PaymentVerification},
};

#[derive(Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    receipt: Option<String>,
}

#[derive(Deserialize)]
struct RazorpayPayment {
    order_id: Option<String>,
    amount: i64,
    status: String,
}

pub struct RazorpayApi {
    url: String,
    key_id: String,
    key_secret: String,
    currency: String,
    client: reqwest::Client,
}

impl RazorpayApi {
    pub fn new(url: String, key_id: String, key_secret: String, currency: String) -> Self {
        Self {
            url,
            key_id,
            key_secret,
            currency,
            client: reqwest::Client::new(),
        }
    }
}

/// Checkout signature: hex HMAC-SHA256 of `order_id|payment_id` keyed with
/// the API secret.
fn signature_matches(key_secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(key_secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());

    mac.verify_slice(&expected).is_ok()
}

/// The captured payment must belong to the provider order created for
/// `shop_order` and cover its payable amount.
fn payment_settles(
    order: &RazorpayOrder,
    payment: &RazorpayPayment,
    shop_order: &ShopOrder,
) -> bool {
    let amount = minor_units(shop_order.amount_payable());
    let same_order = payment.order_id.as_deref() == Some(order.id.as_str())
        && order.receipt.as_deref() == Some(shop_order.id.as_str());
    let same_amount = order.amount == amount && payment.amount == amount;
    let settled = matches!(payment.status.as_str(), "captured" | "authorized");

    same_order && same_amount && settled
}

impl RazorpayApi {
    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/v1/{}", self.url, path))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Razorpay: {} lookup returned {}: {}", path, status, body)
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentProvider for RazorpayApi {
    async fn create_order(&self, shop_order: &ShopOrder) -> Result<PaymentOrder, anyhow::Error> {
        let amount = minor_units(shop_order.amount_payable());
        let payload = json!({
            "amount": amount,
            "currency": self.currency,
            "receipt": shop_order.id,
        });

        let response = self
            .client
            .post(format!("{}/v1/orders", self.url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Razorpay: order creation returned {}: {}", status, body)
        }
        let order: RazorpayOrder = response.json().await?;

        Ok(PaymentOrder {
            payment_type: PaymentType::Razorpay,
            shop_order_id: shop_order.id.clone(),
            provider_order_id: order.id,
            amount,
            currency: self.currency.clone(),
            public_key: self.key_id.clone(),
            client_secret: None,
        })
    }

    async fn verify_payment(
        &self,
        shop_order: &ShopOrder,
        verification: &PaymentVerification,
    ) -> Result<bool, anyhow::Error> {
        let PaymentVerification::Razorpay {
            razorpay_order_id,
            razorpay_payment_id,
            razorpay_signature,
        } = verification
        else {
            bail!("Razorpay: cannot verify a {} payment", verification.payment_type())
        };

        if !signature_matches(
            &self.key_secret,
            razorpay_order_id,
            razorpay_payment_id,
            razorpay_signature,
        ) {
            log::warn!("Razorpay signature mismatch for order {}", razorpay_order_id);
            return Ok(false);
        }

        let payment: RazorpayPayment = self
            .fetch(&format!("payments/{razorpay_payment_id}"))
            .await?;
        let order: RazorpayOrder = self.fetch(&format!("orders/{razorpay_order_id}")).await?;

        if !payment_settles(&order, &payment, shop_order) {
            log::warn!(
                "Razorpay payment {} does not settle order {}",
                razorpay_payment_id,
                shop_order.id
            );
            return Ok(false);
        }

        Ok(true)
    }
}
