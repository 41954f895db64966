use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct Tokens {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Otp {
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default)]
    pub signup_otp: bool,
}

#[derive(Debug, Deserialize)]
pub struct Twilio {
    #[serde(default = "default_twilio_url")]
    pub url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Stripe {
    #[serde(default = "default_stripe_url")]
    pub url: String,
    pub secret_key: String,
    pub publishable_key: String,
    #[serde(default = "default_stripe_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct Razorpay {
    #[serde(default = "default_razorpay_url")]
    pub url: String,
    pub key_id: String,
    pub key_secret: String,
    #[serde(default = "default_razorpay_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct Admin {
    pub email: String,
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    pub tokens: Tokens,
    pub otp: Otp,
    pub twilio: Twilio,
    pub stripe: Option<Stripe>,
    pub razorpay: Option<Razorpay>,
    pub admin: Admin,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("SHOP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_country_code() -> String {
    "+84".to_string()
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_twilio_url() -> String {
    "https://verify.twilio.com".to_string()
}

fn default_stripe_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_stripe_currency() -> String {
    "inr".to_string()
}

fn default_razorpay_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_razorpay_currency() -> String {
    "INR".to_string()
}
