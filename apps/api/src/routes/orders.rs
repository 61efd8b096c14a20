//! Table orders and the kitchen display.
//!
//! ```text
//! POST  /orders               waiter takes the order   → PENDING (201)
//! GET   /kitchen/orders       kitchen display polls    → PENDING/PREPARING/READY
//! PATCH /orders/{id}/status   chef / waiter move it    → PREPARING → READY → SERVED
//! POST  /billing              cashier closes it        → COMPLETED (see sales.rs)
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use bistro_core::{OrderStatus, Permission, SaleDetail};
use bistro_db::repository::sale::{NewOrder, SaleFilter};

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::{ApiJson, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_status))
        .route("/kitchen/orders", get(kitchen_orders))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

async fn list_orders(
    State(state): State<AppState>,
    _session: AuthSession,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Vec<SaleDetail>>> {
    let filter = SaleFilter {
        status: query.status,
        limit: query.limit,
        ..SaleFilter::default()
    };
    Ok(Json(state.db.sales().list(&filter).await?))
}

async fn get_order(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    Ok(Json(state.db.sales().get_detail(&id).await?))
}

async fn create_order(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewOrder>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let user = session.require(Permission::CreateOrder)?;
    let order = state.db.sales().create_order(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

/// The permission depends on the edge, so it is checked by the lifecycle
/// table rather than here.
async fn update_status(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult<Json<SaleDetail>> {
    let order = state
        .db
        .sales()
        .transition_status(&id, body.status, session.role)
        .await?;
    Ok(Json(order))
}

async fn kitchen_orders(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Vec<SaleDetail>>> {
    session.require(Permission::ViewKitchen)?;
    Ok(Json(state.db.sales().kitchen_queue().await?))
}
