use serde::{Deserialize, Serialize};

use super::orders::PaymentType;

/// Order created on the payment provider's side, handed to the client to
/// complete checkout.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PaymentOrder {
    pub payment_type: PaymentType,
    pub shop_order_id: String,
    pub provider_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub public_key: String,
    pub client_secret: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentVerification {
    Razorpay {
        razorpay_order_id: String,
        razorpay_payment_id: String,
        razorpay_signature: String,
    },
    Stripe {
        stripe_payment_id: String,
    },
}

impl PaymentVerification {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentVerification::Razorpay { .. } => PaymentType::Razorpay,
            PaymentVerification::Stripe { .. } => PaymentType::Stripe,
        }
    }
}
