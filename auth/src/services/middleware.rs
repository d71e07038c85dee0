use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error as ActixError, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use skillswap_models::auth::{AuthenticatedIdentity, UserRole};

use super::tokens::{TokenCodec, TokenKind};
use crate::errors::AuthError;

/// Turns a presented credential into an identity.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<AuthenticatedIdentity, AuthError>;
}

/// Verifies bearer JWTs of one kind.
pub struct BearerVerifier {
    codec: Arc<TokenCodec>,
    kind: TokenKind,
}

impl BearerVerifier {
    pub fn new(codec: Arc<TokenCodec>, kind: TokenKind) -> Self {
        Self { codec, kind }
    }
}

impl CredentialVerifier for BearerVerifier {
    fn verify(&self, credential: &str) -> Result<AuthenticatedIdentity, AuthError> {
        Ok(self.codec.authenticate(credential, self.kind)?)
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verifier = Arc::clone(&self.verifier);

        Box::pin(async move {
            let outcome = match extract_bearer_token(req.headers()) {
                Some(token) => verifier.verify(token),
                None => Err(AuthError::Unauthorized),
            };

            match outcome {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    tracing::debug!(path = %req.path(), reason = %e, "bearer token rejected");
                    Ok(req.into_response(e.error_response()).map_into_right_body())
                }
            }
        })
    }
}

/// Bearer-token guard. Attaches an [`AuthenticatedIdentity`] to the request
/// or answers 401.
#[derive(Clone)]
pub struct AuthMiddlewareFactory {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthMiddlewareFactory {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn access(codec: Arc<TokenCodec>) -> Self {
        Self::new(Arc::new(BearerVerifier::new(codec, TokenKind::Access)))
    }

    pub fn refresh(codec: Arc<TokenCodec>) -> Self {
        Self::new(Arc::new(BearerVerifier::new(codec, TokenKind::Refresh)))
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service: Rc::new(service),
            verifier: Arc::clone(&self.verifier),
        }))
    }
}

/// Role requirement for one route, keyed by method and route pattern.
#[derive(Debug, Clone, Copy)]
pub struct RouteRole {
    pub method: &'static str,
    pub pattern: &'static str,
    pub roles: &'static [UserRole],
}

pub type RouteRoles = &'static [RouteRole];

pub fn required_roles(table: RouteRoles, method: &str, pattern: &str) -> Option<&'static [UserRole]> {
    table
        .iter()
        .find(|entry| entry.method.eq_ignore_ascii_case(method) && entry.pattern == pattern)
        .map(|entry| entry.roles)
}

/// Undeclared routes are open. A declared route needs an identity whose
/// role is in the set; an empty set admits nobody.
pub fn authorize(
    required: Option<&[UserRole]>,
    identity: Option<&AuthenticatedIdentity>,
) -> Result<(), AuthError> {
    let Some(required) = required else {
        return Ok(());
    };
    let identity = identity.ok_or(AuthError::Unauthorized)?;
    if required.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

pub struct RoleAuthMiddleware<S> {
    service: Rc<S>,
    table: RouteRoles,
}

impl<S, B> Service<ServiceRequest> for RoleAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let table = self.table;

        Box::pin(async move {
            let required = req
                .match_pattern()
                .and_then(|pattern| required_roles(table, req.method().as_str(), &pattern));

            let decision = {
                let extensions = req.extensions();
                authorize(required, extensions.get::<AuthenticatedIdentity>())
            };

            match decision {
                Ok(()) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), reason = %e, "role check failed");
                    Ok(req.into_response(e.error_response()).map_into_right_body())
                }
            }
        })
    }
}

/// Role guard driven by a static route table. Wrap it inside an
/// [`AuthMiddlewareFactory`] so the identity is attached first.
#[derive(Clone, Copy)]
pub struct RoleAuthMiddlewareFactory {
    table: RouteRoles,
}

impl RoleAuthMiddlewareFactory {
    pub fn new(table: RouteRoles) -> Self {
        Self { table }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = RoleAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleAuthMiddleware {
            service: Rc::new(service),
            table: self.table,
        }))
    }
}

/// Extractor for the identity attached by [`AuthMiddlewareFactory`].
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub AuthenticatedIdentity);

impl FromRequest for CurrentIdentity {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedIdentity>()
                .cloned()
                .map(CurrentIdentity)
                .ok_or(AuthError::Unauthorized),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;
    use uuid::Uuid;

    fn identity(role: UserRole) -> AuthenticatedIdentity {
        AuthenticatedIdentity { subject_id: Uuid::new_v4(), email: "a@x.com".to_string(), role }
    }

    static TABLE: RouteRoles = &[
        RouteRole { method: "GET", pattern: "/admin/{id}", roles: &[UserRole::Admin] },
        RouteRole { method: "GET", pattern: "/sealed", roles: &[] },
    ];

    #[test]
    fn undeclared_route_is_open() {
        assert!(authorize(required_roles(TABLE, "GET", "/public"), None).is_ok());
    }

    #[test]
    fn declared_route_requires_identity() {
        let err = authorize(required_roles(TABLE, "GET", "/admin/{id}"), None).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[test]
    fn role_outside_the_set_is_forbidden() {
        let user = identity(UserRole::User);
        let admin = identity(UserRole::Admin);
        let required = required_roles(TABLE, "get", "/admin/{id}");

        assert!(matches!(authorize(required, Some(&user)), Err(AuthError::Forbidden)));
        assert!(authorize(required, Some(&admin)).is_ok());
    }

    #[test]
    fn empty_role_set_admits_nobody() {
        let admin = identity(UserRole::Admin);
        let required = required_roles(TABLE, "GET", "/sealed");
        assert!(matches!(authorize(required, Some(&admin)), Err(AuthError::Forbidden)));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
