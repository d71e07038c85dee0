use std::sync::Arc;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;
use thiserror::Error;

use skillswap_models::auth::{AuthenticatedIdentity, ErrorBody};

use super::middleware::extract_bearer_token;
use super::tokens::{TokenCodec, TokenError, TokenKind};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WsAuthError {
    #[error("Token not provided")]
    TokenNotProvided,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token verification failed")]
    VerificationFailed,
}

impl ResponseError for WsAuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(ErrorBody {
            status_code: StatusCode::UNAUTHORIZED.as_u16(),
            message: self.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct HandshakeQuery {
    token: Option<String>,
}

/// Authenticates WebSocket handshakes with the access key.
#[derive(Clone)]
pub struct WsTokenGuard {
    codec: Arc<TokenCodec>,
}

impl WsTokenGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// `token` query parameter first, then the bearer header.
    pub fn token_from_request(req: &HttpRequest) -> Option<String> {
        web::Query::<HandshakeQuery>::from_query(req.query_string())
            .ok()
            .and_then(|query| query.into_inner().token)
            .filter(|token| !token.is_empty())
            .or_else(|| extract_bearer_token(req.headers()).map(str::to_owned))
    }

    pub fn authenticate(&self, req: &HttpRequest) -> Result<AuthenticatedIdentity, WsAuthError> {
        let token = Self::token_from_request(req).ok_or(WsAuthError::TokenNotProvided)?;
        self.verify(&token)
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, WsAuthError> {
        let claims = self.codec.verify(token, TokenKind::Access).map_err(|e| match e {
            TokenError::Expired => WsAuthError::TokenExpired,
            TokenError::InvalidSignature | TokenError::Malformed => WsAuthError::InvalidToken,
        })?;

        // Signed by us but not convertible into an identity.
        AuthenticatedIdentity::try_from(claims).map_err(|_| WsAuthError::VerificationFailed)
    }
}
