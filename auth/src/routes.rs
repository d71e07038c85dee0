use actix_web::{error, web, ResponseError};

use skillswap_models::auth::UserRole;

use crate::errors::AuthError;
use crate::handlers;
use crate::services::{AuthMiddlewareFactory, RoleAuthMiddlewareFactory, RouteRole, RouteRoles};
use crate::state::AppState;

/// Role requirements, keyed by the full route pattern.
pub static ROUTE_ROLES: RouteRoles = &[RouteRole {
    method: "GET",
    pattern: "/auth/admin/users/{id}",
    roles: &[UserRole::Admin],
}];

pub const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Malformed JSON answers 400 and an oversized body 413, both with the usual
/// error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            let auth_error = match &err {
                error::JsonPayloadError::Overflow { .. }
                | error::JsonPayloadError::OverflowKnownLength { .. } => AuthError::PayloadTooLarge,
                error::JsonPayloadError::ContentType => {
                    AuthError::Validation("Content-Type must be application/json".to_string())
                }
                other => AuthError::Validation(format!("Invalid request body: {}", other)),
            };
            error::InternalError::from_response(err, auth_error.error_response()).into()
        })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        error::InternalError::from_response(
            err,
            AuthError::Validation("Invalid path parameter".to_string()).error_response(),
        )
        .into()
    })
}

/// Register state, extractor configs and every route.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let codec = state.codec.clone();

        cfg.app_data(web::Data::new(state))
            .app_data(json_config())
            .app_data(path_config())
            .route("/health", web::get().to(handlers::health::health_check))
            .route("/notifications", web::get().to(handlers::notifications::notifications))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login))
                    .service(
                        web::resource("/refresh")
                            .wrap(AuthMiddlewareFactory::refresh(codec.clone()))
                            .route(web::post().to(handlers::auth::refresh)),
                    )
                    .service(
                        web::scope("")
                            .wrap(RoleAuthMiddlewareFactory::new(ROUTE_ROLES))
                            .wrap(AuthMiddlewareFactory::access(codec))
                            .route("/logout", web::post().to(handlers::auth::logout))
                            .route("/me", web::get().to(handlers::auth::me))
                            .route("/password", web::patch().to(handlers::auth::change_password))
                            .route("/admin/users/{id}", web::get().to(handlers::auth::get_user)),
                    ),
            );
    }
}
