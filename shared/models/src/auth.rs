use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// A stored account. Holds credential material, so it is never serialized;
/// responses go through [`PublicUser`].
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    /// SHA-256 of the refresh token currently allowed to rotate, `None` when
    /// the account has no active session.
    pub refresh_token_hash: Option<String>,
    pub name: String,
    pub about: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_active_session(&self) -> bool {
        self.refresh_token_hash.is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("has_active_session", &self.has_active_session())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub about: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
            about: user.about,
            birthdate: user.birthdate,
            city: user.city,
            gender: user.gender,
            avatar: user.avatar,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(max = 500, message = "About must not exceed 500 characters"))]
    pub about: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// JWT payload shared by access and refresh tokens. Which secret signed it is
/// the only thing that distinguishes the two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
}

/// Identity attached to a request or socket once its token has been verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    pub subject_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for AuthenticatedIdentity {
    fn from(user: &User) -> Self {
        AuthenticatedIdentity {
            subject_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl TryFrom<Claims> for AuthenticatedIdentity {
    type Error = uuid::Error;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(AuthenticatedIdentity {
            subject_id: claims.sub.parse()?,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuu".to_string(),
            refresh_token_hash: Some("deadbeef".to_string()),
            name: "A".to_string(),
            about: None,
            birthdate: None,
            city: Some("Moscow".to_string()),
            gender: Some(Gender::Female),
            avatar: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_user_carries_no_credential_material() {
        let json = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("refreshTokenHash"));
        assert!(!object.contains_key("refreshToken"));
        assert_eq!(object["email"], "a@x.com");
        assert_eq!(object["role"], "user");
        assert!(object.contains_key("createdAt"));
    }

    #[test]
    fn user_debug_redacts_hashes() {
        let rendered = format!("{:?}", sample_user());
        assert!(!rendered.contains("$2b$"));
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("has_active_session: true"));
    }

    #[test]
    fn identity_from_claims_requires_uuid_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            email: "a@x.com".to_string(),
            role: UserRole::Admin,
            jti: "1".to_string(),
            iat: 0,
            exp: 0,
            iss: "skillswap".to_string(),
        };
        assert!(AuthenticatedIdentity::try_from(claims).is_err());
    }

    #[test]
    fn role_round_trips_through_database_text() {
        for role in [UserRole::User, UserRole::Admin] {
            assert_eq!(UserRole::from_db(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_db("root"), None);
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn error_body_uses_status_code_key() {
        let body = ErrorBody { status_code: 401, message: "Invalid credentials".to_string() };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 401);
    }

    fn register_request(name: &str) -> RegisterRequest {
        serde_json::from_value(serde_json::json!({
            "email": "a@x.com",
            "password": "password123",
            "name": name,
        }))
        .unwrap()
    }

    #[test]
    fn single_letter_name_is_accepted() {
        assert!(register_request("A").validate().is_ok());
        assert!(register_request("").validate().is_err());
        assert!(register_request(&"n".repeat(51)).validate().is_err());
    }
}
