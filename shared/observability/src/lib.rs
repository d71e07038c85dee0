//! SkillSwap observability library
//!
//! Subscriber setup shared by every service binary and an actix-web request
//! logger that records method, route, status and latency. Request headers,
//! bodies and query strings are never written to the log.

pub mod init;
pub mod middleware;

pub use init::*;
pub use middleware::*;
