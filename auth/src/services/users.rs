use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use sqlx::{postgres::PgRow, PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use skillswap_models::auth::{Gender, User, UserRole};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fields for a new account. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub about: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
    pub role: UserRole,
}

/// Partial update. `None` leaves a column untouched; for the refresh hash,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub refresh_token_hash: Option<Option<String>>,
}

impl UserUpdate {
    pub fn rotate_refresh_token(hash: String) -> Self {
        Self { refresh_token_hash: Some(Some(hash)), ..Default::default() }
    }

    pub fn end_session() -> Self {
        Self { refresh_token_hash: Some(None), ..Default::default() }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Applies all fields of `update` atomically.
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, refresh_token_hash, name, about, birthdate, \
     city, gender, avatar, role, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
        let role: String = row.try_get("role")?;
        let gender: Option<String> = row.try_get("gender")?;
        let id: Uuid = row.try_get("id")?;

        Ok(User {
            id,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            refresh_token_hash: row.try_get("refresh_token_hash")?,
            name: row.try_get("name")?,
            about: row.try_get("about")?,
            birthdate: row.try_get("birthdate")?,
            city: row.try_get("city")?,
            gender: gender.as_deref().and_then(Gender::from_db),
            avatar: row.try_get("avatar")?,
            role: UserRole::from_db(&role).unwrap_or_else(|| {
                tracing::warn!(user_id = %id, role = %role, "unknown role in users table, treating as user");
                UserRole::User
            }),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&query).bind(email).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (
                id, email, password_hash, name, about, birthdate, city, gender, avatar, role
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.about.as_ref())
            .bind(user.birthdate)
            .bind(user.city.as_ref())
            .bind(user.gender.map(|g| g.as_str()))
            .bind(user.avatar.as_ref())
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail
                } else {
                    StoreError::Database(e)
                }
            })?;

        Self::user_from_row(&row)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let (touch_refresh, refresh_token_hash) = match update.refresh_token_hash {
            Some(value) => (true, value),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = COALESCE($1, password_hash),
                refresh_token_hash = CASE WHEN $2 THEN $3 ELSE refresh_token_hash END,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(update.password_hash)
        .bind(touch_refresh)
        .bind(refresh_token_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Process-local store for tests and `AUTH_STORE=memory` runs.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let id = match self.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        // The email entry stays locked until the user row exists.
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    refresh_token_hash: None,
                    name: new_user.name,
                    about: new_user.about,
                    birthdate: new_user.birthdate,
                    city: new_user.city,
                    gender: new_user.gender,
                    avatar: new_user.avatar,
                    role: new_user.role,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(refresh_token_hash) = update.refresh_token_hash {
            user.refresh_token_hash = refresh_token_hash;
        }
        user.updated_at = Utc::now();
        Ok(())
    }
}
