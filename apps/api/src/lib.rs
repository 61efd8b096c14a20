//! # Bistro API
//!
//! HTTP JSON server for the restaurant.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Routes                                   │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Front of house│  │  Kitchen       │  │  Back office               ││
//! │  │                │  │                │  │                            ││
//! │  │ • POST /orders │  │ • GET /kitchen │  │ • /reports/*               ││
//! │  │ • PATCH status │  │   /orders      │  │ • /expenses                ││
//! │  │ • POST /billing│  │ • PATCH status │  │ • /users                   ││
//! │  │ • POST /sales  │  │                │  │ • /products, /categories   ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  bistro-db   │  │ bistro-core  │  │    JWT Auth              ││  │
//! │  │  │              │  │              │  │                          ││  │
//! │  │  │ SQLite, WAL  │  │ Access matrix│  │ Bearer session tokens    ││  │
//! │  │  │ transactions │  │ lifecycle    │  │ AuthSession extractor    ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `BISTRO_BIND_ADDR` - Listen address (default: 0.0.0.0:8080)
//! - `DATABASE_PATH` - SQLite file (default: ./bistro.db)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `JWT_SECRET` - Secret for session tokens
//! - `JWT_LIFETIME_SECS` - Session lifetime (default: 43200)
//! - `BISTRO_ALLOW_NEGATIVE_STOCK` - Accept orders past zero stock (default: false)
//! - `BISTRO_SALE_RETRIES` - Sale transaction attempts (default: 3)
//! - `BISTRO_POLL_INTERVAL_SECS` - Kitchen display poll hint (default: 10)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;

use bistro_db::Database;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            db,
            jwt,
            config: Arc::new(config),
        }
    }
}

/// Builds the full router over `state`.
pub fn build_router(state: AppState) -> Router {
    routes::router().with_state(state)
}
