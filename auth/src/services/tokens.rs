use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use secrecy::ExposeSecret;
use skillswap_config::JwtConfig;
use skillswap_models::auth::{AuthenticatedIdentity, Claims, TokenPair};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AuthError;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Signs and verifies HS256 access and refresh tokens, each with its own
/// secret and lifetime.
pub struct TokenCodec {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: SigningKey::from_secret(
                config.access_secret.expose_secret().as_bytes(),
                config.access_ttl,
            ),
            refresh: SigningKey::from_secret(
                config.refresh_secret.expose_secret().as_bytes(),
                config.refresh_ttl,
            ),
            validation: strict_validation(&config.issuer),
            issuer: config.issuer.clone(),
        }
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue(&self, identity: &AuthenticatedIdentity, kind: TokenKind) -> Result<String, AuthError> {
        let key = self.key(kind);
        let iat = get_current_timestamp();
        let exp = iat.checked_add(key.ttl.as_secs()).ok_or_else(|| {
            AuthError::Infrastructure(format!("{:?} token lifetime overflows the expiry timestamp", kind))
        })?;
        let claims = Claims {
            sub: identity.subject_id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &key.encoding)
            .map_err(|e| AuthError::Infrastructure(format!("failed to sign {:?} token: {}", kind, e)))
    }

    pub fn issue_access_token(&self, identity: &AuthenticatedIdentity) -> Result<String, AuthError> {
        self.issue(identity, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, identity: &AuthenticatedIdentity) -> Result<String, AuthError> {
        self.issue(identity, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, identity: &AuthenticatedIdentity) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(identity)?,
            refresh_token: self.issue_refresh_token(identity)?,
        })
    }

    /// Verify signature, expiry and issuer against the key for `kind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.key(kind).decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Like [`verify`](Self::verify), additionally requiring a well-formed subject.
    pub fn authenticate(&self, token: &str, kind: TokenKind) -> Result<AuthenticatedIdentity, TokenError> {
        let claims = self.verify(token, kind)?;
        AuthenticatedIdentity::try_from(claims).map_err(|_| TokenError::Malformed)
    }
}

fn strict_validation(issuer: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation
}

/// Verify `token` against an explicit secret.
pub fn verify_with_secret(token: &str, secret: &[u8], issuer: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &strict_validation(issuer))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_models::auth::UserRole;

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtConfig::new(
            "access-secret",
            Duration::from_secs(900),
            "refresh-secret",
            Duration::from_secs(86_400),
        ))
    }

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            subject_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn issued_tokens_verify_back_to_the_same_identity() {
        let codec = codec();
        let who = identity();
        let pair = codec.issue_pair(&who).unwrap();

        assert_eq!(codec.authenticate(&pair.access_token, TokenKind::Access).unwrap(), who);
        assert_eq!(codec.authenticate(&pair.refresh_token, TokenKind::Refresh).unwrap(), who);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn lifetimes_follow_the_token_kind() {
        let codec = codec();
        let pair = codec.issue_pair(&identity()).unwrap();

        let access = codec.verify(&pair.access_token, TokenKind::Access).unwrap();
        let refresh = codec.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(access.exp - access.iat, 900);
        assert_eq!(refresh.exp - refresh.iat, 86_400);
        assert_eq!(access.iss, "skillswap");
    }

    #[test]
    fn tokens_are_not_interchangeable_between_kinds() {
        let codec = codec();
        let pair = codec.issue_pair(&identity()).unwrap();

        assert_eq!(
            codec.verify(&pair.access_token, TokenKind::Refresh).unwrap_err(),
            TokenError::InvalidSignature
        );
        assert_eq!(
            codec.verify(&pair.refresh_token, TokenKind::Access).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn overflowing_lifetime_fails_without_panicking() {
        let codec = TokenCodec::new(&JwtConfig::new(
            "access-secret",
            Duration::from_secs(u64::MAX),
            "refresh-secret",
            Duration::from_secs(86_400),
        ));

        let err = codec.issue_access_token(&identity()).unwrap_err();
        assert!(matches!(err, AuthError::Infrastructure(_)));
        assert!(codec.issue_refresh_token(&identity()).is_ok());
    }

    #[test]
    fn two_tokens_issued_back_to_back_differ() {
        let codec = codec();
        let who = identity();
        assert_ne!(codec.issue_access_token(&who).unwrap(), codec.issue_access_token(&who).unwrap());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "a@x.com".to_string(),
            role: UserRole::User,
            jti: "1".to_string(),
            iat: now - 120,
            exp: now - 60,
            iss: "skillswap".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert_eq!(codec().verify(&token, TokenKind::Access).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn foreign_issuer_and_garbage_are_rejected() {
        let other = TokenCodec::new(
            &JwtConfig::new("access-secret", Duration::from_secs(60), "r", Duration::from_secs(60))
                .with_issuer("someone-else"),
        );
        let token = other.issue_access_token(&identity()).unwrap();

        assert_eq!(codec().verify(&token, TokenKind::Access).unwrap_err(), TokenError::Malformed);
        assert_eq!(codec().verify("not.a.jwt", TokenKind::Access).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn explicit_secret_verification_matches_codec() {
        let codec = codec();
        let who = identity();
        let token = codec.issue_refresh_token(&who).unwrap();

        let claims = verify_with_secret(&token, b"refresh-secret", "skillswap").unwrap();
        assert_eq!(claims.sub, who.subject_id.to_string());
        assert!(verify_with_secret(&token, b"access-secret", "skillswap").is_err());
    }
}
