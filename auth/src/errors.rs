use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use skillswap_models::auth::ErrorBody;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::tokens::TokenError;
use crate::services::users::StoreError;

/// Every failure an auth operation can surface to a client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User with this email already exists")]
    DuplicateCredential,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden resource")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Registration failed")]
    RegistrationFailed,

    /// Cause is kept for the log only.
    #[error("Internal server error")]
    Infrastructure(String),
}

impl AuthError {
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status_code().as_u16(),
            message: self.to_string(),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateCredential => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AuthError::RegistrationFailed | AuthError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AuthError::Infrastructure(cause) = self {
            tracing::error!(cause = %cause, "request failed on an infrastructure fault");
        }
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateCredential,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Database(e) => AuthError::Infrastructure(e.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::InvalidSignature | TokenError::Malformed => AuthError::TokenInvalid,
        }
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AuthError::Validation(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_models::auth::LoginRequest;
    use validator::Validate;

    #[test]
    fn status_codes_follow_the_error_kind() {
        assert_eq!(AuthError::DuplicateCredential.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(AuthError::RegistrationFailed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn infrastructure_cause_is_not_rendered() {
        let err = AuthError::Infrastructure("connection refused to 10.0.0.5:5432".into());
        let body = err.body();
        assert_eq!(body.status_code, 500);
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn token_errors_collapse_to_invalid_or_expired() {
        assert!(matches!(AuthError::from(TokenError::Expired), AuthError::TokenExpired));
        assert!(matches!(AuthError::from(TokenError::InvalidSignature), AuthError::TokenInvalid));
        assert!(matches!(AuthError::from(TokenError::Malformed), AuthError::TokenInvalid));
    }

    #[test]
    fn validation_messages_are_joined_in_stable_order() {
        let request = LoginRequest { email: "nope".into(), password: String::new() };
        let err = AuthError::from(request.validate().unwrap_err());
        match err {
            AuthError::Validation(message) => {
                assert_eq!(message, "Invalid email format; Password is required")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
