//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use spendsync::Trace;
#[cfg(debug_assertions)]
use spendsync::doc::ApiDoc;
use spendsync::inbound::http::error::{json_error_handler, query_error_handler};
use spendsync::inbound::http::health::{HealthState, live, ready};
use spendsync::inbound::http::snapshots::{export_full, export_incremental};
use spendsync::inbound::http::state::HttpState;
use spendsync::inbound::http::sync::{replace_all_client_data, sync_expenses};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Largest accepted JSON body; full client uploads can be sizeable.
const JSON_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Sync endpoints, versioned under one prefix.
fn sync_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(sync_expenses)
        .service(export_incremental)
        .service(export_full)
        .service(replace_all_client_data)
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(
            web::JsonConfig::default()
                .limit(JSON_LIMIT_BYTES)
                .error_handler(json_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .wrap(Trace)
        .service(sync_routes())
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the sync API and flag the process ready.
///
/// Readiness is set only after the socket is bound, so probes never report
/// ready for a server that failed to start.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config));
    let worker_health = health_state.clone();

    let server = HttpServer::new(move || build_app(worker_health.clone(), http_state.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
