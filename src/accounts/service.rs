//! Registration, login and current-user lookup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::accounts::store::{NewUser, UserRecord, UserStore};
use crate::accounts::validator::{missing_fields, registration_errors, sanitize};
use crate::auth::{Claims, TokenService, VerifiedIdentity};
use crate::errors::{ClassifiedError, Failure, HandlerError};

pub const EMAIL_TAKEN: &str = "Email already registered";
pub const BAD_CREDENTIALS: &str = "Invalid email or password";
pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A user together with a freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: UserRecord,
    pub token: String,
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    fn session(&self, user: UserRecord) -> Result<Session, HandlerError> {
        let claims = Claims::new(user.id.clone()).with_email(user.email.clone());
        let token = self.tokens.issue(&claims).map_err(Failure::unexpected)?;
        Ok(Session { user, token })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Session, HandlerError> {
        if let Some(missing) = missing_fields(&[
            ("email", request.email.as_deref()),
            ("password", request.password.as_deref()),
            ("name", request.name.as_deref()),
        ]) {
            return Err(ClassifiedError::validation(missing).into());
        }

        let email = request.email.unwrap_or_default();
        let password = request.password.unwrap_or_default();
        let name = request.name.unwrap_or_default();

        if let Some(errors) = registration_errors(&email, &password) {
            return Err(ClassifiedError::validation(errors).into());
        }

        let email = sanitize(&email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ClassifiedError::conflict(EMAIL_TAKEN).into());
        }

        let user = self
            .store
            .create(NewUser {
                email,
                name: sanitize(&name),
                password,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, HandlerError> {
        if let Some(missing) = missing_fields(&[
            ("email", request.email.as_deref()),
            ("password", request.password.as_deref()),
        ]) {
            return Err(ClassifiedError::validation(missing).into());
        }

        let email = sanitize(request.email.as_deref().unwrap_or_default());
        let password = request.password.unwrap_or_default();

        // Unknown email and wrong password are indistinguishable to the caller.
        let Some(user) = self.store.find_by_email(&email).await? else {
            return Err(ClassifiedError::unauthorized(BAD_CREDENTIALS).into());
        };
        if !self.store.verify_password(&user, &password).await? {
            return Err(ClassifiedError::unauthorized(BAD_CREDENTIALS).into());
        }

        tracing::debug!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    /// Look up the user behind a verified token.
    pub async fn current_user(&self, identity: &VerifiedIdentity) -> Result<UserRecord, HandlerError> {
        self.store
            .find_by_id(identity.subject())
            .await?
            .ok_or_else(|| ClassifiedError::unauthorized(USER_NOT_FOUND).into())
    }
}
