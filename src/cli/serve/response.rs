//! HTTP response helpers.

use crate::offline;
use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

/// Header naming where a response came from: cache, network or placeholder.
pub const SOURCE_HEADER: &str = "X-Pixfall-Source";

/// Send a worker response as-is.
pub fn respond(request: Request, res: offline::Response) -> Result<()> {
    let mut response = Response::from_data(res.body).with_status_code(StatusCode(res.status));
    for (key, value) in &res.headers {
        if let Some(header) = make_header(key, value) {
            response.add_header(header);
        }
    }
    if let Some(header) = make_header(SOURCE_HEADER, res.source.as_str()) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// 502 for a non-image request the network could not answer.
pub fn respond_bad_gateway(request: Request, error: &dyn std::fmt::Display) -> Result<()> {
    let body = format!("502 Bad Gateway\n\n{error}");
    send_plain(request, 502, body)
}

/// 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_plain(request, 503, "503 Service Unavailable".into())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    send_plain(request, 405, "405 Method Not Allowed".into())
}

fn send_plain(request: Request, status: u16, body: String) -> Result<()> {
    use crate::utils::mime::types::PLAIN;

    let mut response = Response::from_string(body).with_status_code(StatusCode(status));
    if let Some(header) = make_header("Content-Type", PLAIN) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// `Sec-Fetch-Dest` header value, if sent.
pub fn fetch_dest(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("sec-fetch-dest"))
        .map(|h| h.value.to_string())
}

fn make_header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}
