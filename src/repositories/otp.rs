use async_trait::async_trait;

mod twilio;

pub use twilio::TwilioVerify;

/// Out-of-band delivery and checking of one-time codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Sends a code to `phone_number` and returns the provider's handle for it.
    async fn send_otp(&self, phone_number: &str) -> Result<String, anyhow::Error>;
    /// `Ok(false)` means the provider answered and the code does not match.
    async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<bool, anyhow::Error>;
}
