use std::collections::HashMap;

use anyhow::bail;
use async_trait::async_trait;
use serde::Deserialize;

use super::{minor_units, PaymentProvider};
use crate::models::{
    orders::{PaymentType, ShopOrder},
    payments::{PaymentOrder, PaymentVerification},
};

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
    amount: i64,
    client_secret: Option<String>,
    status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// The intent must have succeeded for exactly this order and amount.
fn intent_settles(intent: &PaymentIntent, shop_order: &ShopOrder) -> bool {
    let same_order = intent.metadata.get("shop_order_id") == Some(&shop_order.id);
    let same_amount = intent.amount == minor_units(shop_order.amount_payable());

    same_order && same_amount && intent.status == "succeeded"
}

pub struct StripeApi {
    url: String,
    secret_key: String,
    publishable_key: String,
    currency: String,
    client: reqwest::Client,
}

impl StripeApi {
    pub fn new(url: String, secret_key: String, publishable_key: String, currency: String) -> Self {
        Self {
            url,
            secret_key,
            publishable_key,
            currency,
            client: reqwest::Client::new(),
        }
    }

    async fn parse_intent(response: reqwest::Response) -> Result<PaymentIntent, anyhow::Error> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Stripe: request returned {}: {}", status, body)
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentProvider for StripeApi {
    async fn create_order(&self, shop_order: &ShopOrder) -> Result<PaymentOrder, anyhow::Error> {
        let amount = minor_units(shop_order.amount_payable());

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.url))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.to_string()),
                ("currency", self.currency.clone()),
                ("automatic_payment_methods[enabled]", "true".to_string()),
                ("metadata[shop_order_id]", shop_order.id.clone()),
            ])
            .send()
            .await?;
        let intent = Self::parse_intent(response).await?;

        Ok(PaymentOrder {
            payment_type: PaymentType::Stripe,
            shop_order_id: shop_order.id.clone(),
            provider_order_id: intent.id,
            amount,
            currency: self.currency.clone(),
            public_key: self.publishable_key.clone(),
            client_secret: intent.client_secret,
        })
    }

    async fn verify_payment(
        &self,
        shop_order: &ShopOrder,
        verification: &PaymentVerification,
    ) -> Result<bool, anyhow::Error> {
        let PaymentVerification::Stripe { stripe_payment_id } = verification else {
            bail!("Stripe: cannot verify a {} payment", verification.payment_type())
        };

        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.url, stripe_payment_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let intent = Self::parse_intent(response).await?;

        log::debug!("Stripe payment intent {} is {}", intent.id, intent.status);

        if !intent_settles(&intent, shop_order) {
            log::warn!(
                "Stripe payment intent {} does not settle order {}",
                intent.id,
                shop_order.id
            );
            return Ok(false);
        }

        Ok(true)
    }
}
