//! HTTP routes.
//!
//! Handlers are thin: authenticate, check the permission, call one
//! repository method, pick a status code. Business rules live in
//! `bistro-core` and transaction boundaries in `bistro-db`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use axum::Router;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use bistro_db::DateRange;

use crate::error::ApiError;
use crate::AppState;

pub mod auth;
pub mod catalog;
pub mod customers;
pub mod expenses;
pub mod health;
pub mod orders;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod users;

/// Every route, unbound from state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(health::router())
        .merge(catalog::router())
        .merge(customers::router())
        .merge(suppliers::router())
        .merge(orders::router())
        .merge(sales::router())
        .merge(reports::router())
        .merge(expenses::router())
        .merge(users::router())
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejection is a 400 with the usual `{"error"}` body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::bad_request(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// `Query` whose rejection is a 400 with the usual `{"error"}` body.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::bad_request(e.body_text()))?;
        Ok(ApiQuery(value))
    }
}

// =============================================================================
// Date Ranges
// =============================================================================

/// `?startDate=&endDate=`, each either RFC 3339 or a plain `YYYY-MM-DD`.
///
/// A plain end date covers that whole day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateQuery {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        let start = self
            .start_date
            .as_deref()
            .map(|s| parse_bound("startDate", s, NaiveTime::MIN))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|s| parse_bound("endDate", s, end_of_day()))
            .transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ApiError::bad_request("startDate must not be after endDate"));
            }
        }

        Ok(DateRange::new(start, end))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(field: &str, raw: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(time_of_day).and_utc())
        .map_err(|_| ApiError::bad_request(format!("{field} must be YYYY-MM-DD or RFC 3339")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> DateQuery {
        DateQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    #[test]
    fn test_plain_dates_cover_whole_days() {
        let range = query(Some("2026-01-01"), Some("2026-01-31")).range().unwrap();
        assert_eq!(
            range.start.unwrap().to_rfc3339(),
            "2026-01-01T00:00:00+00:00"
        );
        assert_eq!(
            range.end.unwrap().to_rfc3339(),
            "2026-01-31T23:59:59.999+00:00"
        );
    }

    #[test]
    fn test_rfc3339_and_open_ranges() {
        let range = query(Some("2026-01-01T10:00:00+05:30"), None).range().unwrap();
        assert_eq!(
            range.start.unwrap().to_rfc3339(),
            "2026-01-01T04:30:00+00:00"
        );
        assert!(range.end.is_none());

        assert_eq!(query(None, None).range().unwrap(), DateRange::all());
    }

    #[test]
    fn test_bad_ranges_rejected() {
        assert!(query(Some("yesterday"), None).range().is_err());
        assert!(query(Some("2026-02-01"), Some("2026-01-01")).range().is_err());
    }
}
