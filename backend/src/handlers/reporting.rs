//! Staff report handlers
//!
//! Every report answers JSON by default and CSV with `?format=csv`.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use shared::DateRange;

use super::{blank_as_none, ApiQuery};

use crate::error::AppError;
use crate::services::reporting::{export_to_csv, gross_profit_csv};
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub end_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub format: Option<String>,
}

impl ReportQuery {
    fn range(&self) -> DateRange {
        DateRange::from_bounds(self.start_date, self.end_date)
    }

    fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("csv"))
    }
}

#[derive(Serialize)]
struct RowsResponse<T> {
    ok: bool,
    range: DateRange,
    rows: Vec<T>,
}

fn csv_response(name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", name),
            ),
        ],
        body,
    )
        .into_response()
}

fn rows_response<T: Serialize>(
    name: &str,
    query: &ReportQuery,
    rows: Vec<T>,
) -> Result<Response, AppError> {
    if query.wants_csv() {
        return Ok(csv_response(name, export_to_csv(&rows)?));
    }
    Ok(Json(RowsResponse {
        ok: true,
        range: query.range(),
        rows,
    })
    .into_response())
}

pub async fn purchases_report(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Response, AppError> {
    let rows = ReportingService::new(state.db.clone(), &state.config.reporting)
        .purchases(query.range())
        .await?;
    rows_response("purchases", &query, rows)
}

pub async fn sales_report(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Response, AppError> {
    let rows = ReportingService::new(state.db.clone(), &state.config.reporting)
        .sales(query.range())
        .await?;
    rows_response("sales", &query, rows)
}

pub async fn customers_report(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Response, AppError> {
    let rows = ReportingService::new(state.db.clone(), &state.config.reporting)
        .customers(query.range())
        .await?;
    rows_response("customers", &query, rows)
}

pub async fn gross_profit_report(
    State(state): State<AppState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Response, AppError> {
    let report = ReportingService::new(state.db.clone(), &state.config.reporting)
        .gross_profit(query.range())
        .await?;
    if query.wants_csv() {
        return Ok(csv_response("gross_profit", gross_profit_csv(&report)?));
    }
    Ok(Json(serde_json::json!({
        "ok": true,
        "range": query.range(),
        "rows": report.rows,
        "total": report.total,
        "opex": report.opex,
        "net_profit": report.net_profit,
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse(uri: &str) -> ReportQuery {
        let uri: Uri = uri.parse().unwrap();
        let Query(query) = Query::<ReportQuery>::try_from_uri(&uri).unwrap();
        query
    }

    #[test]
    fn test_blank_start_date_is_open() {
        let query = parse("http://localhost/?start_date=&end_date=2025-01-31&format=csv");
        assert_eq!(query.start_date, None);
        assert_eq!(query.end_date, chrono::NaiveDate::from_ymd_opt(2025, 1, 31));
        assert!(query.wants_csv());
        assert!(query
            .range()
            .contains(chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()));
    }

    #[test]
    fn test_format_defaults_to_json() {
        let query = parse("http://localhost/?format=");
        assert!(!query.wants_csv());
        assert!(query.start_date.is_none() && query.end_date.is_none());
    }
}
