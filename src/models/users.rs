use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    User,
    Admin,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub verified: bool,
    pub block_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Profile handed over by an external identity provider.
#[derive(Clone, Debug, Deserialize)]
pub struct SocialUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: String,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewAdmin {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockUser {
    pub user_id: String,
    pub block: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    UserName(String),
    Phone(String),
}

impl LoginIdentifier {
    /// Picks the first non-empty field in email, user name, phone order.
    pub fn pick(
        email: Option<&str>,
        user_name: Option<&str>,
        phone: Option<&str>,
    ) -> Option<LoginIdentifier> {
        if let Some(email) = present(email) {
            Some(LoginIdentifier::Email(email.to_string()))
        } else if let Some(user_name) = present(user_name) {
            Some(LoginIdentifier::UserName(user_name.to_string()))
        } else {
            present(phone).map(|phone| LoginIdentifier::Phone(phone.to_string()))
        }
    }
}

fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Login {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

impl Login {
    pub fn identifier(&self) -> Option<LoginIdentifier> {
        LoginIdentifier::pick(
            self.email.as_deref(),
            self.user_name.as_deref(),
            self.phone.as_deref(),
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OtpLogin {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub phone: Option<String>,
}

impl OtpLogin {
    pub fn identifier(&self) -> Option<LoginIdentifier> {
        LoginIdentifier::pick(
            self.email.as_deref(),
            self.user_name.as_deref(),
            self.phone.as_deref(),
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OtpVerify {
    pub otp_id: String,
    pub otp: String,
}
