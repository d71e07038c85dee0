pub mod middleware;
pub mod notifications;
pub mod password;
pub mod sessions;
pub mod tokens;
pub mod users;
pub mod ws_guard;

pub use middleware::*;
pub use notifications::{Notification, NotificationHub, NotificationKind, RoomMembership};
pub use password::PasswordHasher;
pub use sessions::{AuthService, AuthSession};
pub use tokens::{verify_with_secret, TokenCodec, TokenError, TokenKind};
pub use users::{InMemoryUserStore, NewUser, PgUserStore, StoreError, UserStore, UserUpdate};
pub use ws_guard::{WsAuthError, WsTokenGuard};
