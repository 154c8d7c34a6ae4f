//! Print the sync API OpenAPI document as JSON.

use std::io::Write;
use std::process::ExitCode;

use spendsync::doc::ApiDoc;
use utoipa::OpenApi;

fn main() -> ExitCode {
    let document = match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => json,
        Err(error) => {
            let _ = writeln!(std::io::stderr(), "failed to render OpenAPI document: {error}");
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{document}").is_err() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
