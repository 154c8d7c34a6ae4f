//! Pull endpoints returning exports for client reconciliation.
//!
//! ```text
//! GET /api/v1/sync/expenses?since=&limit=&offset=
//! GET /api/v1/sync/get-all-server-data
//! ```

use actix_web::{get, web};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::sync::{ExpenseSnapshot, FullSnapshot, IncrementalSnapshot, SnapshotWindow};
use crate::domain::{Category, Error, FieldError, parse_client_timestamp};

use super::ApiResult;
use super::auth::AuthenticatedUser;
use super::state::HttpState;
use super::validation::{FieldPath, Violations};

/// Query string of the incremental export.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncrementalParams {
    /// Watermark from a previous export; rows changed at or after it are
    /// returned.
    pub since: Option<String>,
    /// Page size; `0` or absent means no limit.
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
}

/// Exported expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpenseSnapshotResponse {
    pub id: i64,
    pub local_id: Option<String>,
    #[serde(rename = "productName")]
    pub product_name: String,
    pub price: f64,
    /// Category name, or `null` for uncategorised expenses.
    pub category: Option<String>,
    pub timestamp: String,
    pub updated_at: String,
    /// Set once the expense was deleted.
    pub deleted_at: Option<String>,
}

/// Category in the full export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

/// Body of the incremental export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IncrementalResponse {
    pub expenses: Vec<ExpenseSnapshotResponse>,
    /// Watermark to send as `since` on the next pull.
    pub server_timestamp: String,
}

/// Body of the full export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FullExportResponse {
    pub expenses: Vec<ExpenseSnapshotResponse>,
    pub categories: Vec<CategoryResponse>,
    #[serde(rename = "productNames")]
    pub product_names: Vec<String>,
    pub server_timestamp: String,
}

fn iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl From<ExpenseSnapshot> for ExpenseSnapshotResponse {
    fn from(expense: ExpenseSnapshot) -> Self {
        Self {
            id: expense.id.get(),
            local_id: expense.local_id.map(|id| id.as_str().to_owned()),
            product_name: expense.product.as_str().to_owned(),
            price: expense.price.as_f64(),
            category: expense.category,
            timestamp: iso(expense.timestamp),
            updated_at: iso(expense.updated_at),
            deleted_at: expense.deleted_at.map(iso),
        }
    }
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id.get(),
            name: category.name.as_str().to_owned(),
        }
    }
}

impl From<IncrementalSnapshot> for IncrementalResponse {
    fn from(snapshot: IncrementalSnapshot) -> Self {
        Self {
            expenses: snapshot.expenses.into_iter().map(Into::into).collect(),
            server_timestamp: iso(snapshot.server_timestamp),
        }
    }
}

impl From<FullSnapshot> for FullExportResponse {
    fn from(snapshot: FullSnapshot) -> Self {
        Self {
            expenses: snapshot.expenses.into_iter().map(Into::into).collect(),
            categories: snapshot.categories.into_iter().map(Into::into).collect(),
            product_names: snapshot.product_names,
            server_timestamp: iso(snapshot.server_timestamp),
        }
    }
}

fn count(raw: Option<&str>) -> Result<Option<u32>, FieldError> {
    raw.map(|text| {
        text.trim().parse::<u32>().map_err(|_| FieldError::WrongType {
            expected: "non-negative integer",
        })
    })
    .transpose()
}

/// Validate the query string into an export window.
pub(crate) fn parse_window(params: &IncrementalParams) -> Result<SnapshotWindow, Error> {
    let mut violations = Violations::default();
    let since = violations.check(
        &FieldPath::root("since"),
        params
            .since
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_client_timestamp)
            .transpose(),
    );
    let limit = violations.check(&FieldPath::root("limit"), count(params.limit.as_deref()));
    let offset = violations.check(&FieldPath::root("offset"), count(params.offset.as_deref()));
    violations.finish()?;

    Ok(SnapshotWindow {
        since: since.flatten(),
        limit: limit.flatten().filter(|value| *value > 0),
        offset: offset.flatten().filter(|value| *value > 0),
    })
}

/// Expenses changed since a watermark, deletions included.
#[utoipa::path(
    get,
    path = "/api/v1/sync/expenses",
    params(IncrementalParams),
    responses(
        (status = 200, description = "Changed expenses", body = IncrementalResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 422, description = "Invalid query parameters", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["sync"],
    operation_id = "exportIncremental",
    security(("BearerToken" = []))
)]
#[get("/sync/expenses")]
pub async fn export_incremental(
    user: AuthenticatedUser,
    state: web::Data<HttpState>,
    params: web::Query<IncrementalParams>,
) -> ApiResult<web::Json<IncrementalResponse>> {
    let window = parse_window(&params)?;
    let snapshot = state
        .snapshots
        .export_incremental(user.user_id(), window)
        .await?;
    Ok(web::Json(snapshot.into()))
}

/// Everything the caller owns, for a fresh client install.
#[utoipa::path(
    get,
    path = "/api/v1/sync/get-all-server-data",
    responses(
        (status = 200, description = "Full export", body = FullExportResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["sync"],
    operation_id = "exportFull",
    security(("BearerToken" = []))
)]
#[get("/sync/get-all-server-data")]
pub async fn export_full(
    user: AuthenticatedUser,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<FullExportResponse>> {
    let snapshot = state.snapshots.export_full(user.user_id()).await?;
    Ok(web::Json(snapshot.into()))
}

#[cfg(test)]
#[path = "snapshots_tests.rs"]
mod tests;
