use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use skillswap_models::auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UserResponse,
};

use crate::errors::AuthError;
use crate::services::{extract_bearer_token, AuthSession, CurrentIdentity};
use crate::state::AppState;

fn auth_response(message: &str, session: AuthSession) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: session.user,
        tokens: session.tokens,
    }
}

pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AuthError> {
    let request = request.into_inner();
    request.validate()?;

    let session = state.auth.register(request).await?;
    Ok(HttpResponse::Created().json(auth_response("User registered successfully", session)))
}

pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    request.validate()?;

    let session = state.auth.login(&request.email, &request.password).await?;
    Ok(HttpResponse::Ok().json(auth_response("Login successful", session)))
}

pub async fn logout(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
) -> Result<HttpResponse, AuthError> {
    state.auth.logout(identity.0.subject_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Logout successful")))
}

/// Behind the refresh guard; the raw token is needed again to compare it
/// with the stored digest.
pub async fn refresh(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AuthError> {
    let token = extract_bearer_token(req.headers()).ok_or(AuthError::Unauthorized)?;

    let session = state.auth.refresh_tokens(token).await?;
    Ok(HttpResponse::Ok().json(auth_response("Tokens refreshed", session)))
}

pub async fn me(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
) -> Result<HttpResponse, AuthError> {
    let user = state.auth.current_user(identity.0.subject_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}

pub async fn change_password(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AuthError> {
    request.validate()?;

    state
        .auth
        .change_password(identity.0.subject_id, &request.current_password, &request.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated")))
}

pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AuthError> {
    let user = state.auth.current_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}
