//! Staff accounts. Admin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use tracing::info;

use bistro_core::{Permission, User};
use bistro_db::repository::user::{NewUser, UserUpdate};

use crate::auth::AuthSession;
use crate::error::{ApiError, ApiResult};
use crate::routes::ApiJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user))
}

async fn list_users(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Vec<User>>> {
    session.require(Permission::ManageStaff)?;
    Ok(Json(state.db.users().list().await?))
}

async fn create_user(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let admin = session.require(Permission::ManageStaff)?;
    let user = state.db.users().insert(body).await?;
    info!(by = %admin.user_id, user_id = %user.id, role = %user.role, "Staff account created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    let admin = session.require(Permission::ManageStaff)?;

    // Locking yourself out is never what was meant.
    if admin.user_id == id && body.is_active == Some(false) {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    Ok(Json(state.db.users().update(&id, body).await?))
}
