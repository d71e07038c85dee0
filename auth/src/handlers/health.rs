use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_status = match state.auth.store().ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!(error = %e, "user store health check failed");
            "disconnected"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "auth-service",
        "store": store_status,
        "timestamp": chrono::Utc::now()
    }))
}
