//! HTTP response utilities.
//!
//! Provides shared functions for serving JSON responses directly from
//! the gateway (deception payloads and the fixed forwarding-failure
//! body).

use pingora::Result;
use pingora::http::ResponseHeader;
use pingora::proxy::Session;

/// The fixed body returned when forwarding to the active node fails
/// after retries. Deliberately free of internal detail.
#[must_use]
pub fn sync_error_body() -> String {
    serde_json::json!({"error": "Node Sync Error"}).to_string()
}

/// Serves a JSON body with the given status and finishes the response.
///
/// # Errors
///
/// Returns an error if headers cannot be built or the response cannot
/// be written.
pub async fn serve_json(session: &mut Session, status: u16, body: String) -> Result<bool> {
    let mut header = ResponseHeader::build(status, None)?;
    header.insert_header("Content-Type", "application/json")?;
    header.insert_header("Content-Length", body.len().to_string())?;
    header.insert_header(
        "Cache-Control",
        "no-store, no-cache, must-revalidate, max-age=0",
    )?;
    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(bytes::Bytes::from(body)), true)
        .await?;
    Ok(true)
}
