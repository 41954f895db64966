use anyhow::bail;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::OtpProvider;

#[derive(Deserialize)]
struct Verification {
    sid: String,
    status: String,
}

pub struct TwilioVerify {
    url: String,
    account_sid: String,
    auth_token: String,
    service_id: String,
    client: reqwest::Client,
}

impl TwilioVerify {
    pub fn new(url: String, account_sid: String, auth_token: String, service_id: String) -> Self {
        Self {
            url,
            account_sid,
            auth_token,
            service_id,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/v2/Services/{}/{}",
            self.url.trim_end_matches('/'),
            self.service_id,
            resource
        )
    }
}

#[async_trait]
impl OtpProvider for TwilioVerify {
    async fn send_otp(&self, phone_number: &str) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .post(self.endpoint("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone_number), ("Channel", "sms")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Twilio: send returned {}: {}", status, body)
        }

        let verification: Verification = response.json().await?;
        log::debug!(
            "Twilio verification {} is {}",
            verification.sid,
            verification.status
        );

        Ok(verification.sid)
    }

    async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<bool, anyhow::Error> {
        let response = self
            .client
            .post(self.endpoint("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone_number), ("Code", code)])
            .send()
            .await?;

        // Twilio answers 404 once a verification is expired, approved or
        // out of attempts.
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Twilio: verification check returned {}: {}", status, body)
        }

        let verification: Verification = response.json().await?;

        Ok(verification.status == "approved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let twilio = TwilioVerify::new(
            "https://verify.twilio.com/".to_string(),
            "AC123".to_string(),
            "token".to_string(),
            "VA123".to_string(),
        );

        assert_eq!(
            twilio.endpoint("Verifications"),
            "https://verify.twilio.com/v2/Services/VA123/Verifications"
        );
    }
}
