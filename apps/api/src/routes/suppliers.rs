use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use bistro_core::{Permission, Supplier};
use bistro_db::repository::supplier::NewSupplier;

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::ApiJson;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/suppliers", get(list_suppliers).post(create_supplier))
}

async fn list_suppliers(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Vec<Supplier>>> {
    session.require(Permission::ManageSuppliers)?;
    Ok(Json(state.db.suppliers().list().await?))
}

async fn create_supplier(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    session.require(Permission::ManageSuppliers)?;
    let supplier = state.db.suppliers().insert(body).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}
