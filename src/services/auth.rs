use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use tokio::{sync::oneshot, time::timeout};
use uuid::Uuid;

use super::{ErrorKind, RequestHandler, Service};
use crate::{
    crypto::{self, CryptoError, GenerateTokenRequest, TokenService, VerifyTokenRequest},
    models::{
        sessions::{OtpSession, RefreshSession},
        users::{Login, LoginIdentifier, NewUser, OtpLogin, OtpVerify, SocialUser, User, UserType},
    },
    repositories::{
        admins::AdminRepository, otp::OtpProvider, sessions::SessionRepository,
        users::UserRepository,
    },
    utils,
};

const OTP_EXPIRE_MINUTES: i64 = 2;
const ACCESS_TOKEN_MINUTES: i64 = 20;
const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Login credentials are empty")]
    EmptyCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("User is not verified")]
    UserNotVerified,
    #[error("User is blocked")]
    UserBlocked,
    #[error("Wrong password")]
    WrongPassword,
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),
    #[error("An admin already exists with this {0}")]
    AdminAlreadyExists(String),
    #[error("User already has this block status")]
    SameBlockStatus,
    #[error("Session not found")]
    SessionNotFound,
    #[error("OTP expired")]
    OtpExpired,
    #[error("Invalid OTP")]
    InvalidOtp,
    #[error("Invalid refresh token: {0}")]
    InvalidRefreshToken(String),
    #[error("Refresh session expired")]
    SessionExpired,
    #[error("Refresh session blocked")]
    SessionBlocked,
    #[error("Hashing error: {0}")]
    Hashing(String),
    #[error("Token error: {0}")]
    Token(String),
    #[error("OTP provider error: {0}")]
    Provider(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::EmptyCredentials => ErrorKind::Validation,
            AuthError::UserNotFound | AuthError::SessionNotFound => ErrorKind::NotFound,
            AuthError::UserAlreadyExists(_) | AuthError::AdminAlreadyExists(_) => {
                ErrorKind::Conflict
            }
            AuthError::UserNotVerified
            | AuthError::UserBlocked
            | AuthError::WrongPassword
            | AuthError::SameBlockStatus
            | AuthError::OtpExpired
            | AuthError::InvalidRefreshToken(_)
            | AuthError::SessionExpired
            | AuthError::SessionBlocked => ErrorKind::State,
            AuthError::InvalidOtp | AuthError::Provider(_) => ErrorKind::ExternalProvider,
            AuthError::Hashing(_) | AuthError::Token(_) | AuthError::Database(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub(crate) fn database_error(context: &'static str) -> impl Fn(anyhow::Error) -> AuthError {
    move |e| AuthError::Database(format!("{context}: {e}"))
}

#[derive(Clone, Debug)]
pub struct AuthOptions {
    pub country_code: String,
    /// Upper bound for each branch of the OTP send fan-out.
    pub send_timeout: Duration,
    /// Dispatch an OTP right after signup.
    pub signup_otp: bool,
}

#[derive(Clone, Debug)]
pub struct GenerateTokenParams {
    pub user_id: String,
    pub user_type: UserType,
}

pub enum AuthRequest {
    UserSignUp {
        user: NewUser,
        response: oneshot::Sender<Result<Option<String>, AuthError>>,
    },
    SignUpOtpVerify {
        otp: OtpVerify,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    GoogleLogin {
        user: SocialUser,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    UserLogin {
        login: Login,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    UserLoginOtpSend {
        login: OtpLogin,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    LoginOtpVerify {
        otp: OtpVerify,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    AdminLogin {
        login: Login,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    GenerateAccessToken {
        params: GenerateTokenParams,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    GenerateRefreshToken {
        params: GenerateTokenParams,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    VerifyRefreshSession {
        refresh_token: String,
        used_for: UserType,
        response: oneshot::Sender<Result<RefreshSession, AuthError>>,
    },
    RefreshAccessToken {
        refresh_token: String,
        used_for: UserType,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    RevokeRefreshToken {
        refresh_token: String,
        used_for: UserType,
        response: oneshot::Sender<Result<(), AuthError>>,
    },
}

#[derive(Clone)]
pub struct AuthRequestHandler {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    sessions: Arc<dyn SessionRepository>,
    otp_provider: Arc<dyn OtpProvider>,
    tokens: TokenService,
    options: AuthOptions,
}

impl AuthRequestHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        admins: Arc<dyn AdminRepository>,
        sessions: Arc<dyn SessionRepository>,
        otp_provider: Arc<dyn OtpProvider>,
        tokens: TokenService,
        options: AuthOptions,
    ) -> Self {
        AuthRequestHandler {
            users,
            admins,
            sessions,
            otp_provider,
            tokens,
            options,
        }
    }

    async fn find_user(&self, identifier: &LoginIdentifier) -> Result<User, AuthError> {
        let user = match identifier {
            LoginIdentifier::Email(email) => self.users.find_user_by_email(email).await,
            LoginIdentifier::UserName(user_name) => {
                self.users.find_user_by_user_name(user_name).await
            }
            LoginIdentifier::Phone(phone) => self.users.find_user_by_phone(phone).await,
        }
        .map_err(database_error("failed to find user from database"))?;

        user.ok_or(AuthError::UserNotFound)
    }

    pub async fn user_login(&self, login: Login) -> Result<String, AuthError> {
        let identifier = login.identifier().ok_or(AuthError::EmptyCredentials)?;
        let user = self.find_user(&identifier).await?;

        if !user.verified {
            return Err(AuthError::UserNotVerified);
        }
        if user.block_status {
            return Err(AuthError::UserBlocked);
        }

        check_password(&login.password, &user.password)?;

        Ok(user.id)
    }

    pub async fn user_login_otp_send(&self, login: OtpLogin) -> Result<String, AuthError> {
        let identifier = login.identifier().ok_or(AuthError::EmptyCredentials)?;
        let user = self.find_user(&identifier).await?;

        if user.block_status {
            return Err(AuthError::UserBlocked);
        }

        self.dispatch_otp(&user.id, &user.phone).await
    }

    /// Sends the code and persists its session concurrently. Both branches
    /// run to completion; the first error observed wins.
    async fn dispatch_otp(&self, user_id: &str, phone: &str) -> Result<String, AuthError> {
        let otp_id = Uuid::new_v4().hyphenated().to_string();
        let session = OtpSession {
            otp_id: otp_id.clone(),
            user_id: user_id.to_string(),
            phone: phone.to_string(),
            expire_at: Utc::now() + chrono::Duration::minutes(OTP_EXPIRE_MINUTES),
        };
        let recipient = format!("{}{}", self.options.country_code, phone);
        let limit = self.options.send_timeout;

        let send: BoxFuture<'_, Result<(), AuthError>> = Box::pin(async move {
            match timeout(limit, self.otp_provider.send_otp(&recipient)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(AuthError::Provider(format!("failed to send otp: {e}"))),
                Err(_) => Err(AuthError::Provider(format!(
                    "otp dispatch timed out after {limit:?}"
                ))),
            }
        });
        let save: BoxFuture<'_, Result<(), AuthError>> = Box::pin(async {
            match timeout(limit, self.sessions.save_otp_session(&session)).await {
                Ok(result) => result.map_err(database_error("failed to save otp session")),
                Err(_) => Err(AuthError::Database(format!(
                    "saving otp session timed out after {limit:?}"
                ))),
            }
        });

        let mut branches: FuturesUnordered<_> = [send, save].into_iter().collect();
        let mut first_error = None;
        while let Some(result) = branches.next().await {
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    log::warn!("Additional OTP dispatch failure for user {}: {}", user_id, e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                log::info!("OTP sent for user {} with otp_id {}", user_id, otp_id);
                Ok(otp_id)
            }
        }
    }

    async fn check_otp(&self, otp: &OtpVerify) -> Result<OtpSession, AuthError> {
        let session = self
            .sessions
            .find_otp_session(&otp.otp_id)
            .await
            .map_err(database_error("failed to find otp session from database"))?
            .ok_or(AuthError::SessionNotFound)?;

        if Utc::now() > session.expire_at {
            return Err(AuthError::OtpExpired);
        }

        let recipient = format!("{}{}", self.options.country_code, session.phone);
        let valid = self
            .otp_provider
            .verify_otp(&recipient, &otp.otp)
            .await
            .map_err(|e| AuthError::Provider(format!("failed to verify otp: {e}")))?;

        if !valid {
            return Err(AuthError::InvalidOtp);
        }

        Ok(session)
    }

    pub async fn login_otp_verify(&self, otp: OtpVerify) -> Result<String, AuthError> {
        let session = self.check_otp(&otp).await?;

        Ok(session.user_id)
    }

    pub async fn user_sign_up(&self, mut user: NewUser) -> Result<Option<String>, AuthError> {
        let existing = self
            .users
            .find_conflicting_user(&user, None)
            .await
            .map_err(database_error("failed to check user details already exist"))?;

        // A resumed signup verifies the phone already on record.
        let (user_id, phone) = match existing {
            Some(existing) if existing.verified => {
                return Err(AuthError::UserAlreadyExists(utils::conflicting_fields(
                    &existing, &user,
                )));
            }
            Some(existing) => {
                log::info!("Resuming signup of unverified user {}", existing.id);
                (existing.id, existing.phone)
            }
            None => {
                user.password = crypto::hash_password(&user.password)
                    .map_err(|e| AuthError::Hashing(e.to_string()))?;
                let user_id = self
                    .users
                    .save_user(&user)
                    .await
                    .map_err(database_error("failed to save user details"))?;
                (user_id, user.phone)
            }
        };

        if !self.options.signup_otp {
            return Ok(None);
        }

        self.dispatch_otp(&user_id, &phone).await.map(Some)
    }

    pub async fn sign_up_otp_verify(&self, otp: OtpVerify) -> Result<String, AuthError> {
        let session = self.check_otp(&otp).await?;

        self.users
            .update_verified(&session.user_id)
            .await
            .map_err(database_error("failed to update user verified on database"))?;

        log::info!("User {} verified", session.user_id);
        Ok(session.user_id)
    }

    pub async fn google_login(&self, user: SocialUser) -> Result<String, AuthError> {
        let existing = self
            .users
            .find_user_by_email(&user.email)
            .await
            .map_err(database_error("failed to get user details with given email"))?;

        if let Some(existing) = existing {
            return Ok(existing.id);
        }

        let new_user = NewUser {
            user_name: utils::generate_random_user_name(&user.first_name),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: String::new(),
            password: String::new(),
        };

        let user_id = self
            .users
            .save_user(&new_user)
            .await
            .map_err(database_error("failed to save user details"))?;

        log::info!("Created user {} from social login", user_id);
        Ok(user_id)
    }

    pub async fn admin_login(&self, login: Login) -> Result<String, AuthError> {
        let admin = match login.identifier() {
            Some(LoginIdentifier::Email(email)) => self.admins.find_admin_by_email(&email).await,
            Some(LoginIdentifier::UserName(user_name)) => {
                self.admins.find_admin_by_user_name(&user_name).await
            }
            Some(LoginIdentifier::Phone(_)) | None => return Err(AuthError::EmptyCredentials),
        }
        .map_err(database_error("failed to find admin"))?
        .ok_or(AuthError::UserNotFound)?;

        check_password(&login.password, &admin.password)?;

        Ok(admin.id)
    }

    pub async fn generate_access_token(
        &self,
        params: GenerateTokenParams,
    ) -> Result<String, AuthError> {
        let token = self
            .tokens
            .generate_token(GenerateTokenRequest {
                user_id: params.user_id,
                used_for: params.user_type,
                expire_at: Utc::now() + chrono::Duration::minutes(ACCESS_TOKEN_MINUTES),
            })
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(token.token_string)
    }

    pub async fn generate_refresh_token(
        &self,
        params: GenerateTokenParams,
    ) -> Result<String, AuthError> {
        let expire_at = Utc::now() + chrono::Duration::days(REFRESH_TOKEN_DAYS);
        let token = self
            .tokens
            .generate_token(GenerateTokenRequest {
                user_id: params.user_id.clone(),
                used_for: params.user_type,
                expire_at,
            })
            .map_err(|e| AuthError::Token(e.to_string()))?;

        self.sessions
            .save_refresh_session(&RefreshSession {
                token_id: token.token_id,
                user_id: params.user_id,
                refresh_token: token.token_string.clone(),
                expire_at,
                is_blocked: false,
            })
            .await
            .map_err(database_error("failed to save refresh session"))?;

        log::info!("Refresh token created and refresh session stored");
        Ok(token.token_string)
    }

    pub async fn verify_and_get_refresh_token_session(
        &self,
        refresh_token: &str,
        used_for: UserType,
    ) -> Result<RefreshSession, AuthError> {
        let verified = self
            .tokens
            .verify_token(VerifyTokenRequest {
                token_string: refresh_token,
                used_for,
            })
            .map_err(|e| AuthError::InvalidRefreshToken(e.to_string()))?;

        let session = self
            .sessions
            .find_refresh_session_by_token_id(&verified.token_id)
            .await
            .map_err(database_error("failed to find refresh session"))?
            .ok_or(AuthError::SessionNotFound)?;

        if Utc::now() > session.expire_at {
            return Err(AuthError::SessionExpired);
        }
        if session.is_blocked {
            return Err(AuthError::SessionBlocked);
        }

        Ok(session)
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        used_for: UserType,
    ) -> Result<String, AuthError> {
        let session = self
            .verify_and_get_refresh_token_session(refresh_token, used_for)
            .await?;

        self.generate_access_token(GenerateTokenParams {
            user_id: session.user_id,
            user_type: used_for,
        })
        .await
    }

    pub async fn revoke_refresh_token(
        &self,
        refresh_token: &str,
        used_for: UserType,
    ) -> Result<(), AuthError> {
        let session = self
            .verify_and_get_refresh_token_session(refresh_token, used_for)
            .await?;

        self.sessions
            .block_refresh_session(&session.token_id)
            .await
            .map_err(database_error("failed to block refresh session"))?;

        log::info!("Refresh session {} revoked", session.token_id);
        Ok(())
    }
}

fn check_password(password: &str, hash: &str) -> Result<(), AuthError> {
    crypto::compare_password(password, hash).map_err(|e| {
        if let CryptoError::Hashing(reason) = &e {
            log::warn!("Stored password hash rejected: {}", reason);
        }
        AuthError::WrongPassword
    })
}

#[async_trait]
impl RequestHandler<AuthRequest> for AuthRequestHandler {
    async fn handle_request(&self, request: AuthRequest) {
        match request {
            AuthRequest::UserSignUp { user, response } => {
                let result = self.user_sign_up(user).await;
                let _ = response.send(result);
            }
            AuthRequest::SignUpOtpVerify { otp, response } => {
                let result = self.sign_up_otp_verify(otp).await;
                let _ = response.send(result);
            }
            AuthRequest::GoogleLogin { user, response } => {
                let result = self.google_login(user).await;
                let _ = response.send(result);
            }
            AuthRequest::UserLogin { login, response } => {
                let result = self.user_login(login).await;
                let _ = response.send(result);
            }
            AuthRequest::UserLoginOtpSend { login, response } => {
                let result = self.user_login_otp_send(login).await;
                let _ = response.send(result);
            }
            AuthRequest::LoginOtpVerify { otp, response } => {
                let result = self.login_otp_verify(otp).await;
                let _ = response.send(result);
            }
            AuthRequest::AdminLogin { login, response } => {
                let result = self.admin_login(login).await;
                let _ = response.send(result);
            }
            AuthRequest::GenerateAccessToken { params, response } => {
                let result = self.generate_access_token(params).await;
                let _ = response.send(result);
            }
            AuthRequest::GenerateRefreshToken { params, response } => {
                let result = self.generate_refresh_token(params).await;
                let _ = response.send(result);
            }
            AuthRequest::VerifyRefreshSession {
                refresh_token,
                used_for,
                response,
            } => {
                let result = self
                    .verify_and_get_refresh_token_session(&refresh_token, used_for)
                    .await;
                let _ = response.send(result);
            }
            AuthRequest::RefreshAccessToken {
                refresh_token,
                used_for,
                response,
            } => {
                let result = self.refresh_access_token(&refresh_token, used_for).await;
                let _ = response.send(result);
            }
            AuthRequest::RevokeRefreshToken {
                refresh_token,
                used_for,
                response,
            } => {
                let result = self.revoke_refresh_token(&refresh_token, used_for).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        AuthService {}
    }
}

#[async_trait]
impl Service<AuthRequest, AuthRequestHandler> for AuthService {}
