#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use skillswap_auth::services::{InMemoryUserStore, NewUser, PasswordHasher, UserStore};
use skillswap_auth::AppState;
use skillswap_config::JwtConfig;
use skillswap_models::auth::UserRole;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";
pub const PASSWORD: &str = "password123";

/// Build an initialized test service over the given `AppState`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new().configure(skillswap_auth::configure($state.clone())),
        )
        .await
    };
}

/// Send a request and return `(status, json body)`.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = res.status();
        let body: serde_json::Value = actix_web::test::read_body_json(res).await;
        (status, body)
    }};
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig::new(ACCESS_SECRET, Duration::from_secs(900), REFRESH_SECRET, Duration::from_secs(3600))
}

pub fn test_state() -> (AppState, Arc<InMemoryUserStore>) {
    let store = Arc::new(InMemoryUserStore::new());
    let state = AppState::new(&jwt_config(), 4, store.clone());
    (state, store)
}

pub fn unique_email() -> String {
    format!("user_{}@example.com", Uuid::new_v4().simple())
}

pub fn registration(email: &str) -> Value {
    json!({ "email": email, "password": PASSWORD, "name": "A" })
}

/// Insert an admin directly into the store; returns its email.
pub async fn seed_admin(store: &InMemoryUserStore) -> String {
    let email = unique_email();
    let password_hash = PasswordHasher::new(4).hash(PASSWORD).await.unwrap();
    store
        .create(NewUser {
            email: email.clone(),
            password_hash,
            name: "Admin".to_string(),
            about: None,
            birthdate: None,
            city: None,
            gender: None,
            avatar: None,
            role: UserRole::Admin,
        })
        .await
        .unwrap();
    email
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn tokens(body: &Value) -> (String, String) {
    (
        body["tokens"]["accessToken"].as_str().unwrap().to_string(),
        body["tokens"]["refreshToken"].as_str().unwrap().to_string(),
    )
}
