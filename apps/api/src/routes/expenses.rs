use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use bistro_core::{Expense, ExpenseCategory, Permission};
use bistro_db::repository::expense::{ExpenseFilter, NewExpense};

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::routes::{ApiJson, ApiQuery, DateQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/expenses", get(list_expenses).post(create_expense))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<ExpenseCategory>,
}

async fn list_expenses(
    State(state): State<AppState>,
    session: AuthSession,
    ApiQuery(query): ApiQuery<ExpenseQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    session.require(Permission::ManageExpenses)?;

    let range = DateQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .range()?;
    let filter = ExpenseFilter {
        range,
        category: query.category,
    };
    Ok(Json(state.db.expenses().list(&filter).await?))
}

async fn create_expense(
    State(state): State<AppState>,
    session: AuthSession,
    ApiJson(body): ApiJson<NewExpense>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let user = session.require(Permission::ManageExpenses)?;
    let expense = state.db.expenses().insert(&user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}
