//! # User Repository
//!
//! Staff accounts. Passwords are stored as Argon2 PHC strings and checked
//! here; session tokens are the API's concern.
//!
//! ```text
//! POST /auth/login { email, password }
//!      │
//!      ▼
//! UserRepository::authenticate
//!      ├── no such email / inactive  → None
//!      ├── argon2 verify fails       → None
//!      └── ok                        → Some(User)   → API issues JWT
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use bistro_core::validation::{validate_email, validate_name, validate_password};
use bistro_core::{Role, User};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, created_at";

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for staff accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates a staff account.
    pub async fn insert(&self, new: NewUser) -> DbResult<User> {
        let email = validate_email(&new.email)?;
        let name = validate_name("name", &new.name, 100)?;
        validate_password(&new.password)?;

        let user = User {
            id: generate_id(),
            email,
            password_hash: hash_password(&new.password)?,
            name,
            role: new.role,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(email = %user.email, role = %user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &user.email),
            other => other,
        })?;

        info!(id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Changes role, name, active flag or password.
    pub async fn update(&self, id: &str, update: UserUpdate) -> DbResult<User> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name("name", n, 100))
            .transpose()?;
        let password_hash = match update.password.as_deref() {
            Some(p) => {
                validate_password(p)?;
                Some(hash_password(p)?)
            }
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE(?2, name),
                role = COALESCE(?3, role),
                is_active = COALESCE(?4, is_active),
                password_hash = COALESCE(?5, password_hash)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(update.role)
        .bind(update.is_active)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Checks credentials. Inactive accounts never authenticate.
    pub async fn authenticate(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let user = match self.get_by_email(email).await? {
            Some(u) if u.is_active => u,
            _ => return Ok(None),
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
