use std::sync::Arc;

use uuid::Uuid;

use skillswap_models::auth::{AuthenticatedIdentity, PublicUser, RegisterRequest, TokenPair, User, UserRole};

use super::password::{hash_refresh_token, refresh_token_matches, validate_new_password, PasswordHasher};
use super::tokens::{TokenCodec, TokenKind};
use super::users::{NewUser, UserStore, UserUpdate};
use crate::errors::AuthError;

/// Sanitized user plus a freshly issued token pair.
#[derive(Debug)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Session lifecycle for an account. The stored refresh-token digest is the
/// only server-side session state: set by register, login and refresh,
/// cleared by logout and password change.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    codec: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, codec: Arc<TokenCodec>) -> Self {
        Self { store, hasher, codec }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AuthError> {
        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::DuplicateCredential);
        }

        match self.create_account(request).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "user registered");
                Ok(session)
            }
            Err(AuthError::DuplicateCredential) => Err(AuthError::DuplicateCredential),
            Err(e) => {
                tracing::error!(error = ?e, "registration failed after duplicate check");
                Err(AuthError::RegistrationFailed)
            }
        }
    }

    async fn create_account(&self, request: RegisterRequest) -> Result<AuthSession, AuthError> {
        let password_hash = self.hasher.hash(&request.password).await?;

        let user = self
            .store
            .create(NewUser {
                email: request.email,
                password_hash,
                name: request.name,
                about: request.about,
                birthdate: request.birthdate,
                city: request.city,
                gender: request.gender,
                avatar: request.avatar,
                role: UserRole::default(),
            })
            .await?;

        let tokens = self.start_session(&user).await?;
        Ok(AuthSession { user: user.into(), tokens })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&user).await?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { user: user.into(), tokens })
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::NotFound);
        }

        self.store.update(user_id, UserUpdate::end_session()).await?;
        tracing::info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair. The presented token must match
    /// the stored digest, so each refresh token works once.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let identity = self.codec.authenticate(refresh_token, TokenKind::Refresh)?;

        let user = self
            .store
            .find_by_id(identity.subject_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let stored = match user.refresh_token_hash.as_deref() {
            Some(stored) => stored,
            None => {
                tracing::debug!(user_id = %user.id, "refresh rejected: no active session");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !refresh_token_matches(refresh_token, stored) {
            tracing::warn!(user_id = %user.id, "refresh rejected: token was rotated out");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&user).await?;
        tracing::debug!(user_id = %user.id, "refresh token rotated");
        Ok(AuthSession { user: user.into(), tokens })
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.find_user(user_id).await?;

        if !self.hasher.verify(current_password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        validate_new_password(new_password)?;
        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(new_password).await?;
        self.store
            .update(
                user_id,
                UserUpdate { password_hash: Some(password_hash), refresh_token_hash: Some(None) },
            )
            .await?;

        tracing::info!(user_id = %user_id, "password changed, session ended");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        Ok(self.find_user(user_id).await?.into())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store.find_by_id(user_id).await?.ok_or(AuthError::NotFound)
    }

    /// Issue a pair for `user` and make its refresh token the only valid one.
    async fn start_session(&self, user: &User) -> Result<TokenPair, AuthError> {
        let tokens = self.codec.issue_pair(&AuthenticatedIdentity::from(user))?;
        self.store
            .update(user.id, UserUpdate::rotate_refresh_token(hash_refresh_token(&tokens.refresh_token)))
            .await?;
        Ok(tokens)
    }
}
