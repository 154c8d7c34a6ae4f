//! Sync endpoints: batch push and full client replacement.
//!
//! ```text
//! POST /api/v1/sync/expenses
//! POST /api/v1/sync/replace-all-client-data
//! ```
//!
//! Both validate the whole body before calling the domain, so a rejected
//! request never opens a store transaction.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use utoipa::ToSchema;

use crate::domain::sync::{
    CreatedExpense, ReplaceReport, ReplacementExpense, SyncBatch, SyncReport, UpdatedExpense,
};
use crate::domain::{Error, ErrorCode, FieldError};

use super::ApiResult;
use super::auth::AuthenticatedUser;
use super::state::HttpState;
use super::validation::{
    FieldPath, Violations, category, expense_id, local_id, optional_array, optional_expense_id,
    optional_local_id, price, product, required_array, timestamp,
};

const SERVER_ERROR_MESSAGE: &str = "Sync failed; no changes were applied";
const REPLACE_FAILURE: &str = "Failed to sync expenses";

/// Expense created offline.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatedExpenseRequest {
    pub local_id: String,
    #[serde(rename = "productName")]
    pub product_name: String,
    pub price: f64,
    pub category: String,
    /// ISO-8601 timestamp or `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
}

/// Edit of a server-known expense.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatedExpenseRequest {
    pub id: i64,
    #[serde(rename = "productName")]
    pub product_name: String,
    pub price: f64,
    pub category: String,
    /// Client-side modification time compared against the server's
    /// `updated_at`.
    pub timestamp: String,
}

/// Body of `POST /sync/expenses`. Every list is optional.
///
/// Fields are held loosely and validated item by item so every problem is
/// reported at once.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SyncRequest {
    #[serde(default)]
    #[schema(value_type = Option<Vec<CreatedExpenseRequest>>)]
    pub created: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<UpdatedExpenseRequest>>)]
    pub updated: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<i64>>)]
    pub deleted_ids: Option<Value>,
}

/// Server id assigned to a client-created expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedMappingResponse {
    pub local_id: String,
    pub server_id: i64,
}

/// Outcome of one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateResultResponse {
    pub id: i64,
    /// `success`, `skipped`, `conflict`, or `not_found`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_id: Option<i64>,
}

/// Itemised problem reported alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncErrorEntry {
    /// `duplicate_update` or `server_error`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_id: Option<i64>,
}

/// Result of a sync call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    pub created_map: Vec<CreatedMappingResponse>,
    pub updated_results: Vec<UpdateResultResponse>,
    pub deleted_count: u64,
    pub errors: Vec<SyncErrorEntry>,
}

impl SyncResponse {
    /// Shape returned when the whole call was rolled back.
    fn server_error() -> Self {
        Self {
            created_map: Vec::new(),
            updated_results: Vec::new(),
            deleted_count: 0,
            errors: vec![SyncErrorEntry {
                kind: "server_error".to_owned(),
                id: None,
                message: SERVER_ERROR_MESSAGE.to_owned(),
                conflicting_id: None,
            }],
        }
    }
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        let errors = report
            .duplicate_updates()
            .map(|(id, conflicting_id)| SyncErrorEntry {
                kind: "duplicate_update".to_owned(),
                id: Some(id.get()),
                message: "Duplicate expense found".to_owned(),
                conflicting_id: Some(conflicting_id.get()),
            })
            .collect();
        let updated_results = report
            .updated_results
            .iter()
            .map(|outcome| UpdateResultResponse {
                id: outcome.id().get(),
                status: outcome.status().as_str().to_owned(),
                message: outcome.message().map(str::to_owned),
                conflicting_id: outcome.conflicting_id().map(|id| id.get()),
            })
            .collect();
        let created_map = report
            .created_map
            .into_iter()
            .map(|mapping| CreatedMappingResponse {
                local_id: mapping.local_id.as_str().to_owned(),
                server_id: mapping.server_id.get(),
            })
            .collect();
        Self {
            created_map,
            updated_results,
            deleted_count: report.deleted_count,
            errors,
        }
    }
}

/// Row of a full client upload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacementExpenseRequest {
    /// Server id; when present the row updates that expense.
    pub id: Option<i64>,
    /// Client id; used to create the row when `id` is absent.
    pub local_id: Option<String>,
    pub product: String,
    pub price: f64,
    pub category: String,
    pub timestamp: String,
}

/// Body of `POST /sync/replace-all-client-data`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReplaceRequest {
    #[serde(default)]
    #[schema(value_type = Vec<ReplacementExpenseRequest>)]
    pub expenses: Option<Value>,
}

/// Counts of rows applied by a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplaceResponse {
    pub created_count: u64,
    pub updated_count: u64,
}

impl From<ReplaceReport> for ReplaceResponse {
    fn from(report: ReplaceReport) -> Self {
        Self {
            created_count: report.created_count,
            updated_count: report.updated_count,
        }
    }
}

/// Failure body of a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplaceFailureResponse {
    pub error: String,
    pub message: String,
}

fn as_object<'a>(
    violations: &mut Violations,
    path: &FieldPath,
    item: &'a Value,
) -> Option<&'a Map<String, Value>> {
    let object = item.as_object();
    if object.is_none() {
        violations.check::<()>(path, Err(FieldError::WrongType { expected: "object" }));
    }
    object
}

fn parse_created(violations: &mut Violations, path: &FieldPath, item: &Value) -> Option<CreatedExpense> {
    let fields = as_object(violations, path, item)?;
    let local_id = violations.check(&path.key("local_id"), local_id(fields.get("local_id")));
    let product = violations.check(&path.key("productName"), product(fields.get("productName")));
    let price = violations.check(&path.key("price"), price(fields.get("price")));
    let category = violations.check(&path.key("category"), category(fields.get("category")));
    let timestamp = violations.check(&path.key("timestamp"), timestamp(fields.get("timestamp")));
    Some(CreatedExpense {
        local_id: local_id?,
        product: product?,
        price: price?,
        category: category?,
        timestamp: timestamp?,
    })
}

fn parse_updated(violations: &mut Violations, path: &FieldPath, item: &Value) -> Option<UpdatedExpense> {
    let fields = as_object(violations, path, item)?;
    let id = violations.check(&path.key("id"), expense_id(fields.get("id")));
    let product = violations.check(&path.key("productName"), product(fields.get("productName")));
    let price = violations.check(&path.key("price"), price(fields.get("price")));
    let category = violations.check(&path.key("category"), category(fields.get("category")));
    let timestamp = violations.check(&path.key("timestamp"), timestamp(fields.get("timestamp")));
    Some(UpdatedExpense {
        id: id?,
        product: product?,
        price: price?,
        category: category?,
        timestamp: timestamp?,
    })
}

fn parse_replacement(
    violations: &mut Violations,
    path: &FieldPath,
    item: &Value,
) -> Option<ReplacementExpense> {
    let fields = as_object(violations, path, item)?;
    let id = violations.check(&path.key("id"), optional_expense_id(fields.get("id")));
    let local_id = violations.check(&path.key("local_id"), optional_local_id(fields.get("local_id")));
    let product = violations.check(&path.key("product"), product(fields.get("product")));
    let price = violations.check(&path.key("price"), price(fields.get("price")));
    let category = violations.check(&path.key("category"), category(fields.get("category")));
    let timestamp = violations.check(&path.key("timestamp"), timestamp(fields.get("timestamp")));
    Some(ReplacementExpense {
        id: id?,
        local_id: local_id?,
        product: product?,
        price: price?,
        category: category?,
        timestamp: timestamp?,
    })
}

/// Validate a sync body into a domain batch, reporting every violation.
pub(crate) fn parse_sync_request(request: &SyncRequest) -> Result<SyncBatch, Error> {
    let mut violations = Violations::default();
    let mut batch = SyncBatch::default();

    let created_path = FieldPath::root("created");
    if let Some(items) = violations.check(&created_path, optional_array(request.created.as_ref())) {
        for (index, item) in items.iter().enumerate() {
            if let Some(parsed) = parse_created(&mut violations, &created_path.index(index), item) {
                batch.created.push(parsed);
            }
        }
    }

    let updated_path = FieldPath::root("updated");
    if let Some(items) = violations.check(&updated_path, optional_array(request.updated.as_ref())) {
        for (index, item) in items.iter().enumerate() {
            if let Some(parsed) = parse_updated(&mut violations, &updated_path.index(index), item) {
                batch.updated.push(parsed);
            }
        }
    }

    let deleted_path = FieldPath::root("deleted_ids");
    if let Some(items) =
        violations.check(&deleted_path, optional_array(request.deleted_ids.as_ref()))
    {
        for (index, item) in items.iter().enumerate() {
            if let Some(id) = violations.check(&deleted_path.index(index), expense_id(Some(item))) {
                batch.deleted_ids.push(id);
            }
        }
    }

    violations.finish()?;
    Ok(batch)
}

/// Validate a replacement body into domain rows.
pub(crate) fn parse_replace_request(request: &ReplaceRequest) -> Result<Vec<ReplacementExpense>, Error> {
    let mut violations = Violations::default();
    let mut rows = Vec::new();

    let path = FieldPath::root("expenses");
    if let Some(items) = violations.check(&path, required_array(request.expenses.as_ref())) {
        for (index, item) in items.iter().enumerate() {
            if let Some(parsed) = parse_replacement(&mut violations, &path.index(index), item) {
                rows.push(parsed);
            }
        }
    }

    violations.finish()?;
    Ok(rows)
}

/// Push a batch of offline creations, edits, and deletions.
///
/// Per-item conflicts are reported in the 200 body; only a store failure
/// rolls the call back and returns 500.
#[utoipa::path(
    post,
    path = "/api/v1/sync/expenses",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Batch applied", body = SyncResponse),
        (status = 400, description = "Malformed JSON", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 422, description = "Validation failed", body = Error),
        (status = 500, description = "Batch rolled back", body = SyncResponse)
    ),
    tags = ["sync"],
    operation_id = "syncExpenses",
    security(("BearerToken" = []))
)]
#[post("/sync/expenses")]
pub async fn sync_expenses(
    user: AuthenticatedUser,
    state: web::Data<HttpState>,
    payload: web::Json<SyncRequest>,
) -> ApiResult<HttpResponse> {
    let batch = parse_sync_request(&payload)?;
    match state.sync.run_sync(user.user_id(), batch).await {
        Ok(report) => Ok(HttpResponse::Ok().json(SyncResponse::from(report))),
        Err(error) => {
            warn!(code = ?error.code(), error = %error, "sync request failed");
            Ok(HttpResponse::InternalServerError().json(SyncResponse::server_error()))
        }
    }
}

/// Overwrite or extend server data from a full client upload.
#[utoipa::path(
    post,
    path = "/api/v1/sync/replace-all-client-data",
    request_body = ReplaceRequest,
    responses(
        (status = 200, description = "Rows applied", body = ReplaceResponse),
        (status = 400, description = "Malformed JSON", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 422, description = "Validation failed", body = Error),
        (status = 500, description = "Upload rolled back", body = ReplaceFailureResponse)
    ),
    tags = ["sync"],
    operation_id = "replaceAllClientData",
    security(("BearerToken" = []))
)]
#[post("/sync/replace-all-client-data")]
pub async fn replace_all_client_data(
    user: AuthenticatedUser,
    state: web::Data<HttpState>,
    payload: web::Json<ReplaceRequest>,
) -> ApiResult<HttpResponse> {
    let rows = parse_replace_request(&payload)?;
    match state.sync.replace_all(user.user_id(), rows).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ReplaceResponse::from(report))),
        Err(error) => {
            warn!(code = ?error.code(), error = %error, "client data replacement failed");
            let message = if error.code() == ErrorCode::InternalError {
                "Internal server error".to_owned()
            } else {
                error.message().to_owned()
            };
            Ok(HttpResponse::InternalServerError().json(ReplaceFailureResponse {
                error: REPLACE_FAILURE.to_owned(),
                message,
            }))
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
