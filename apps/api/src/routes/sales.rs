//! Counter sales, sales history and billing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use bistro_core::{OrderStatus, Permission, SaleDetail};
use bistro_db::repository::sale::{NewSale, SaleFilter, Settlement};

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::{ApiJson, ApiQuery, DateQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route("/billing", post(settle_bill))
}

/// Completed sales. Staff without `ViewAllSales` see only the ones they
/// took or billed.
async fn list_sales(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult<Json<Vec<SaleDetail>>> {
    let user_id = if session.can(Permission::ViewAllSales) {
        None
    } else {
        Some(session.require(Permission::ViewOwnSales)?.user_id.clone())
    };

    let filter = SaleFilter {
        status: Some(OrderStatus::Completed),
        user_id,
        range: query.range()?,
        limit: None,
    };
    Ok(Json(state.db.sales().list(&filter).await?))
}

async fn create_sale(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let user = session.require(Permission::Checkout)?;
    let sale = state.db.sales().create_sale(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn settle_bill(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<Settlement>,
) -> ApiResult<Json<SaleDetail>> {
    let user = session.require(Permission::SettleBill)?;
    let sale = state
        .db
        .sales()
        .settle_bill(body, &user.user_id, user.role)
        .await?;
    Ok(Json(sale))
}
