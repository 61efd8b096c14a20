//! Login and session introspection.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bistro_core::{Session, User};

use crate::auth::AuthSession;
use crate::error::{ApiError, ApiResult};
use crate::routes::ApiJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = match state.db.users().authenticate(&req.email, &req.password).await? {
        Some(user) => user,
        None => {
            warn!(email = %req.email, "Login failed");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "Login");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.lifetime_secs(),
        user,
    }))
}

async fn me(session: AuthSession) -> Json<Session> {
    Json(session.0)
}
