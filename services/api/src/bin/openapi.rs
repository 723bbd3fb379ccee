//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3 document for the courseware REST API. The output path
//! defaults to `openapi.json` and can be given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());

    let api_doc = ApiDoc::openapi();
    let route_count = api_doc.paths.paths.len();
    std::fs::write(&path, api_doc.to_pretty_json()?)?;

    println!("OpenAPI document with {} paths written to {}", route_count, path);
    Ok(())
}
