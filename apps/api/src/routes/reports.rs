use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use bistro_core::Permission;
use bistro_db::repository::report::{InventoryReport, ProfitReport, SalesReport};

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::{ApiQuery, DateQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/sales", get(sales_report))
        .route("/reports/inventory", get(inventory_report))
        .route("/reports/profit", get(profit_report))
}

async fn sales_report(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult<Json<SalesReport>> {
    session.require(Permission::ViewReports)?;
    Ok(Json(state.db.reports().sales_report(query.range()?).await?))
}

async fn inventory_report(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<InventoryReport>> {
    session.require(Permission::ViewReports)?;
    Ok(Json(state.db.reports().inventory_report().await?))
}

async fn profit_report(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult<Json<ProfitReport>> {
    session.require(Permission::ViewReports)?;
    Ok(Json(state.db.reports().profit_report(query.range()?).await?))
}
