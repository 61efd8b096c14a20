//! Customers and their loyalty balance (read-only here; earned at billing).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use bistro_core::{CoreError, Customer, Permission};
use bistro_db::repository::customer::{CustomerUpdate, NewCustomer};

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::{ApiJson, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/{id}", get(get_customer).put(update_customer))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

async fn list_customers(
    State(state): State<AppState>,
    _session: AuthSession,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(
        state.db.customers().list(query.search.as_deref()).await?,
    ))
}

async fn get_customer(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or(CoreError::CustomerNotFound(id))?;
    Ok(Json(customer))
}

async fn create_customer(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    session.require(Permission::ManageCustomers)?;
    let customer = state.db.customers().insert(body).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    session.require(Permission::ManageCustomers)?;
    Ok(Json(state.db.customers().update(&id, body).await?))
}
