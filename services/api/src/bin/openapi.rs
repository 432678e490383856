//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3 document for the lesson studio REST API.
//!
//! Usage: `openapi [OUTPUT]`. The document goes to `openapi.json` when no
//! output path is given.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

/// The generated document with the service's own title and version.
fn api_document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Lesson Studio API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    std::fs::write(&path, api_document().to_pretty_json()?)?;
    println!("OpenAPI specification generated at {}", path);
    Ok(())
}
