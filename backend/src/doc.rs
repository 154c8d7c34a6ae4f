//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the sync and export endpoints, the health probes, the
//! request and response schemas, and the bearer token security scheme. The
//! generated document backs Swagger UI in debug builds and is exported by
//! `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::snapshots::{
    CategoryResponse, ExpenseSnapshotResponse, FullExportResponse, IncrementalResponse,
};
use crate::inbound::http::sync::{
    CreatedExpenseRequest, CreatedMappingResponse, ReplaceFailureResponse, ReplaceRequest,
    ReplaceResponse, ReplacementExpenseRequest, SyncErrorEntry, SyncRequest, SyncResponse,
    UpdateResultResponse, UpdatedExpenseRequest,
};

/// Name of the bearer security scheme referenced by protected paths.
pub const BEARER_SCHEME: &str = "BearerToken";

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut scheme = Http::new(HttpAuthScheme::Bearer);
        scheme.description = Some("Access token issued by the identity provider.".to_owned());
        components.add_security_scheme(BEARER_SCHEME, SecurityScheme::Http(scheme));
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "spendsync API",
        description = "Offline-first expense synchronisation for authenticated users.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::sync::sync_expenses,
        crate::inbound::http::sync::replace_all_client_data,
        crate::inbound::http::snapshots::export_incremental,
        crate::inbound::http::snapshots::export_full,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SyncRequest,
        CreatedExpenseRequest,
        UpdatedExpenseRequest,
        SyncResponse,
        CreatedMappingResponse,
        UpdateResultResponse,
        SyncErrorEntry,
        ReplaceRequest,
        ReplacementExpenseRequest,
        ReplaceResponse,
        ReplaceFailureResponse,
        IncrementalResponse,
        FullExportResponse,
        ExpenseSnapshotResponse,
        CategoryResponse,
    )),
    tags(
        (name = "sync", description = "Offline client synchronisation"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn schema_fields(doc: &utoipa::openapi::OpenApi, name: &str) -> Vec<String> {
        let schemas = &doc.components.as_ref().expect("components").schemas;
        match schemas.get(name).expect("schema registered") {
            RefOr::T(Schema::Object(obj)) => obj.properties.keys().cloned().collect(),
            _ => panic!("expected object schema for {name}"),
        }
    }

    #[rstest]
    #[case("/api/v1/sync/expenses")]
    #[case("/api/v1/sync/replace-all-client-data")]
    #[case("/api/v1/sync/get-all-server-data")]
    #[case("/health/ready")]
    fn document_lists_paths(#[case] path: &str) {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");

        assert!(matches!(
            components.security_schemes.get(BEARER_SCHEME),
            Some(SecurityScheme::Http(_))
        ));
    }

    #[rstest]
    fn sync_response_schema_has_result_fields() {
        let fields = schema_fields(&ApiDoc::openapi(), "SyncResponse");

        for field in ["created_map", "updated_results", "deleted_count", "errors"] {
            assert!(fields.iter().any(|name| name == field), "missing {field}");
        }
    }

    #[rstest]
    fn error_schema_has_code_and_message() {
        let fields = schema_fields(&ApiDoc::openapi(), "Error");

        assert!(fields.iter().any(|name| name == "code"));
        assert!(fields.iter().any(|name| name == "message"));
    }
}
