use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{
    auth::{database_error, AuthError},
    RequestHandler, Service,
};
use crate::{
    crypto,
    models::{
        users::{BlockUser, NewAdmin, User},
        Pagination,
    },
    repositories::{admins::AdminRepository, users::UserRepository},
    settings,
};

pub enum AdminRequest {
    AdminSignUp {
        admin: NewAdmin,
        response: oneshot::Sender<Result<String, AuthError>>,
    },
    FindAllUsers {
        pagination: Pagination,
        response: oneshot::Sender<Result<Vec<User>, AuthError>>,
    },
    BlockOrUnblockUser {
        request: BlockUser,
        response: oneshot::Sender<Result<(), AuthError>>,
    },
}

#[derive(Clone)]
pub struct AdminRequestHandler {
    admins: Arc<dyn AdminRepository>,
    users: Arc<dyn UserRepository>,
}

impl AdminRequestHandler {
    pub fn new(admins: Arc<dyn AdminRepository>, users: Arc<dyn UserRepository>) -> Self {
        AdminRequestHandler { admins, users }
    }

    pub async fn admin_sign_up(&self, mut admin: NewAdmin) -> Result<String, AuthError> {
        let by_email = self
            .admins
            .find_admin_by_email(&admin.email)
            .await
            .map_err(database_error("failed to check admin email"))?;
        if by_email.is_some() {
            return Err(AuthError::AdminAlreadyExists("email".to_string()));
        }

        let by_user_name = self
            .admins
            .find_admin_by_user_name(&admin.user_name)
            .await
            .map_err(database_error("failed to check admin user_name"))?;
        if by_user_name.is_some() {
            return Err(AuthError::AdminAlreadyExists("user_name".to_string()));
        }

        admin.password =
            crypto::hash_password(&admin.password).map_err(|e| AuthError::Hashing(e.to_string()))?;

        let admin_id = self
            .admins
            .save_admin(&admin)
            .await
            .map_err(database_error("failed to save admin"))?;

        log::info!("Admin {} created", admin_id);
        Ok(admin_id)
    }

    /// Creates the configured admin on first start.
    pub async fn bootstrap_admin(&self, admin: &settings::Admin) -> Result<(), AuthError> {
        let existing = self
            .admins
            .find_admin_by_email(&admin.email)
            .await
            .map_err(database_error("failed to check admin email"))?;

        if existing.is_some() {
            log::debug!("Admin {} already present", admin.email);
            return Ok(());
        }

        self.admin_sign_up(NewAdmin {
            user_name: admin.user_name.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
        })
        .await?;

        Ok(())
    }

    pub async fn find_all_users(&self, pagination: Pagination) -> Result<Vec<User>, AuthError> {
        self.users
            .find_all_users(pagination)
            .await
            .map_err(database_error("failed to find users"))
    }

    pub async fn block_or_unblock_user(&self, request: BlockUser) -> Result<(), AuthError> {
        let user = self
            .users
            .find_user_by_id(&request.user_id)
            .await
            .map_err(database_error("failed to find user"))?
            .ok_or(AuthError::UserNotFound)?;

        if user.block_status == request.block {
            return Err(AuthError::SameBlockStatus);
        }

        self.users
            .update_block_status(&user.id, request.block)
            .await
            .map_err(database_error("failed to update user block status"))?;

        log::info!("User {} block status set to {}", user.id, request.block);
        Ok(())
    }
}

#[async_trait]
impl RequestHandler<AdminRequest> for AdminRequestHandler {
    async fn handle_request(&self, request: AdminRequest) {
        match request {
            AdminRequest::AdminSignUp { admin, response } => {
                let result = self.admin_sign_up(admin).await;
                let _ = response.send(result);
            }
            AdminRequest::FindAllUsers {
                pagination,
                response,
            } => {
                let result = self.find_all_users(pagination).await;
                let _ = response.send(result);
            }
            AdminRequest::BlockOrUnblockUser { request, response } => {
                let result = self.block_or_unblock_user(request).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AdminService;

impl AdminService {
    pub fn new() -> Self {
        AdminService {}
    }
}

#[async_trait]
impl Service<AdminRequest, AdminRequestHandler> for AdminService {}
