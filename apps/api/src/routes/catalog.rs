//! Menu: categories and products, plus stock corrections.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use bistro_core::{Category, CategorySummary, CoreError, Permission, Product};
use bistro_db::repository::product::{NewProduct, ProductFilter, ProductUpdate};

use crate::auth::AuthSession;
use crate::error::{ApiError, ApiResult};
use crate::routes::{ApiJson, ApiQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/stock", post(adjust_stock))
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

async fn list_categories(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Vec<CategorySummary>>> {
    session.require(Permission::ViewCatalog)?;
    Ok(Json(state.db.categories().list().await?))
}

async fn create_category(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    session.require(Permission::ManageCatalog)?;
    let category = state
        .db
        .categories()
        .insert(&body.name, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

async fn list_products(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    session.require(Permission::ViewCatalog)?;
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
        low_stock: query.low_stock,
    };
    Ok(Json(state.db.products().list(&filter).await?))
}

async fn get_product(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    session.require(Permission::ViewCatalog)?;
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or(CoreError::ProductNotFound(id))?;
    Ok(Json(product))
}

async fn create_product(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    session.require(Permission::ManageCatalog)?;
    let product = state.db.products().insert(body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    session.require(Permission::ManageCatalog)?;
    Ok(Json(state.db.products().update(&id, body).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    session.require(Permission::ManageCatalog)?;
    state.db.products().soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Either a relative `delta` (delivery, wastage) or an absolute `stock`
/// (stock count), not both.
#[derive(Debug, Deserialize)]
pub struct StockChange {
    pub delta: Option<i64>,
    pub stock: Option<i64>,
}

async fn adjust_stock(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockChange>,
) -> ApiResult<Json<Product>> {
    session.require(Permission::ManageInventory)?;

    let products = state.db.products();
    let product = match (body.delta, body.stock) {
        (Some(delta), None) => {
            products
                .adjust_stock(&id, delta, state.config.stock_policy())
                .await?
        }
        (None, Some(stock)) => products.set_stock(&id, stock).await?,
        _ => return Err(ApiError::bad_request("Provide exactly one of delta or stock")),
    };
    Ok(Json(product))
}
