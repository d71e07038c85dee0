use std::sync::Arc;

use skillswap_config::JwtConfig;

use crate::services::{
    AuthService, NotificationHub, PasswordHasher, TokenCodec, UserStore, WsTokenGuard,
};

/// Shared application state, cloned into every worker.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub codec: Arc<TokenCodec>,
    pub ws_guard: WsTokenGuard,
    pub notifications: Arc<NotificationHub>,
}

impl AppState {
    pub fn new(jwt: &JwtConfig, bcrypt_cost: u32, store: Arc<dyn UserStore>) -> Self {
        let codec = Arc::new(TokenCodec::new(jwt));
        Self {
            auth: AuthService::new(store, PasswordHasher::new(bcrypt_cost), Arc::clone(&codec)),
            ws_guard: WsTokenGuard::new(Arc::clone(&codec)),
            notifications: Arc::new(NotificationHub::new()),
            codec,
        }
    }
}
