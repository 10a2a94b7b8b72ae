//! Conversions between `tiny_http` and the crate's request/response types

use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{is_hop_by_hop, Method, Request, Response};
use std::io::Cursor;
use tiny_http::{Header, StatusCode};
use tracing::debug;

pub type HttpResponse = tiny_http::Response<Cursor<Vec<u8>>>;

/// Read an incoming request, body included (blocking)
pub fn read_request(request: &mut tiny_http::Request) -> TilawahResult<Request> {
    let method = Method::parse(&request.method().to_string());
    let url = request.url().to_string();
    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect();

    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .map_err(|e| TilawahError::io(format!("reading body of {}", url), e))?;

    Ok(Request::from_parts(method, url, headers, body))
}

pub fn to_http(response: Response) -> HttpResponse {
    let mut out = tiny_http::Response::from_data(response.body)
        .with_status_code(StatusCode(response.status));
    for (name, value) in response.headers.iter().filter(|(k, _)| !is_hop_by_hop(k)) {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => out.add_header(header),
            Err(()) => debug!("Dropping unrepresentable header {}", name),
        }
    }
    out
}

pub fn plain(status: u16, message: &str) -> Response {
    Response::new(status, message).with_header("Content-Type", "text/plain; charset=utf-8")
}

/// Response for a request nothing could answer
pub fn error_response(err: &TilawahError) -> Response {
    if err.is_network_failure() {
        plain(502, &format!("502 Bad Gateway: {}", err))
    } else {
        plain(500, "500 Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_map_to_bad_gateway() {
        let response = error_response(&TilawahError::network("/surah/1", "refused"));
        assert_eq!(response.status, 502);

        let response = error_response(&TilawahError::Internal("bug".to_string()));
        assert_eq!(response.status, 500);
        assert_eq!(response.body, b"500 Internal Server Error");
    }

    #[test]
    fn conversion_keeps_status() {
        let response = to_http(
            Response::new(503, "{}")
                .with_header("Content-Type", "application/json")
                .with_header("Transfer-Encoding", "chunked"),
        );
        assert_eq!(response.status_code(), StatusCode(503));
        assert!(response
            .headers()
            .iter()
            .all(|h| !h.field.equiv("Transfer-Encoding")));
    }
}
