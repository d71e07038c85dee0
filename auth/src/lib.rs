//! Authentication and session token lifecycle for SkillSwap.
//!
//! Registration, login, logout and refresh-token rotation
//! ([`services::AuthService`]), bcrypt password hashing, HS256 access and
//! refresh tokens with separate secrets, bearer and role guards for actix-web,
//! and the authenticated notification WebSocket.

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

pub use errors::AuthError;
pub use routes::{configure, ROUTE_ROLES};
pub use state::AppState;
