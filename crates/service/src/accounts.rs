//! Registration, login and the current-user lookup.

use model::{Actor, NewUser, PublicUser, Role};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{MarketplaceService, ServiceError, check_len, require_text};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

impl MarketplaceService {
    /// Creates an account and returns its public fields.
    ///
    /// The role defaults to customer. A caller-supplied partner/admin role is honoured
    /// only while role self-assignment is enabled.
    ///
    /// # Errors
    /// [`ServiceError::Conflict`] if the phone is already registered,
    /// [`ServiceError::Validation`] for missing fields or an unknown role,
    /// [`ServiceError::Forbidden`] for a disallowed role.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, ServiceError> {
        require_text("phone", &request.phone, 15)?;
        if request.password.is_empty() {
            return Err(ServiceError::Validation("password is required".into()));
        }
        if request.password.len() > auth::MAX_PASSWORD_BYTES {
            return Err(ServiceError::Validation(format!(
                "password must be at most {} bytes",
                auth::MAX_PASSWORD_BYTES
            )));
        }
        check_len("name", request.name.as_deref(), 100)?;
        check_len("email", request.email.as_deref(), 120)?;

        let role = match request.role.as_deref() {
            None => Role::Customer,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| ServiceError::Validation(format!("Invalid role: {}", e.value)))?,
        };
        if role != Role::Customer {
            if !self.allow_role_self_assignment {
                warn!(%role, "Rejected self-assigned role");
                return Err(ServiceError::Forbidden("Role self-assignment is disabled".into()));
            }
            warn!(%role, "Account registered with self-assigned role");
        }

        if self.repos.users.find_by_phone(&request.phone).await?.is_some() {
            return Err(ServiceError::Conflict("Phone number already registered".into()));
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self
            .repos
            .users
            .insert(&NewUser {
                phone: request.phone,
                name: request.name,
                email: request.email,
                password_hash,
                role,
            })
            .await?;

        info!(user_id = user.id, %role, "User registered");
        Ok(PublicUser::from(&user))
    }

    /// Verifies phone and password. The error message does not reveal which one was wrong.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn login(&self, request: LoginRequest) -> Result<PublicUser, ServiceError> {
        let Some(user) = self.repos.users.find_by_phone(&request.phone).await? else {
            warn!("Login for unknown phone");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.into()));
        };

        if !self.hasher.verify(&request.password, &user.password_hash).await? {
            warn!(user_id = user.id, "Login with wrong password");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.into()));
        }

        info!(user_id = user.id, "User logged in");
        Ok(PublicUser::from(&user))
    }

    /// Public fields of the session user.
    #[instrument(skip(self))]
    pub async fn current_user(&self, actor: Actor) -> Result<PublicUser, ServiceError> {
        match self.repos.users.get_by_id(actor.user_id).await {
            Ok(user) => Ok(PublicUser::from(&user)),
            Err(repository::RepositoryError::NotFound) => {
                Err(ServiceError::Unauthenticated("Not authenticated".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
