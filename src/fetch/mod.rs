//! Request/response model and the network seam
//!
//! Requests are origin-relative (`/api/surahs?page=2`); the [`Fetcher`]
//! decides where they actually go.

mod upstream;

pub use upstream::UpstreamFetcher;

use crate::error::TilawahResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl Method {
    /// Parse a method name, case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the request was issued by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Full-page document load
    Navigate,
    /// Anything else (scripts, images, XHR)
    Subresource,
}

/// Headers that describe a single connection and must not be replayed or stored
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "host",
    "content-length",
    "content-encoding",
    "accept-encoding",
];

/// Whether a header only makes sense on the current hop
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// An intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path plus optional query, e.g. `/api/surahs?page=2`
    pub url: String,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// A plain GET subresource request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            mode: RequestMode::Subresource,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A GET navigation request
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Build a request from raw parts, inferring the mode from its headers
    pub fn from_parts(
        method: Method,
        url: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        let mode = Self::infer_mode(&method, &headers);
        Self {
            method,
            url: url.into(),
            mode,
            headers,
            body,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Navigation if the browser says so (`Sec-Fetch-Mode: navigate`), or
    /// for a GET that asks for HTML when that header is missing.
    fn infer_mode(method: &Method, headers: &[(String, String)]) -> RequestMode {
        if let Some(mode) = find_header(headers, "sec-fetch-mode") {
            return if mode.eq_ignore_ascii_case("navigate") {
                RequestMode::Navigate
            } else {
                RequestMode::Subresource
            };
        }

        let wants_html = find_header(headers, "accept").is_some_and(|a| a.contains("text/html"));
        if *method == Method::Get && wants_html {
            RequestMode::Navigate
        } else {
            RequestMode::Subresource
        }
    }

    /// Path without query or fragment
    pub fn path(&self) -> &str {
        let end = self.url.find(['?', '#']).unwrap_or(self.url.len());
        &self.url[..end]
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Store key: method plus URL
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A response snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A JSON response with the matching content type
    ///
    /// Struct fields are written in declaration order.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> TilawahResult<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(status, body).with_header("Content-Type", "application/json"))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in the 2xx range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Copy without connection-specific headers, suitable for storing
    pub fn without_hop_headers(&self) -> Self {
        Self {
            status: self.status,
            headers: self
                .headers
                .iter()
                .filter(|(k, _)| !is_hop_by_hop(k))
                .cloned()
                .collect(),
            body: self.body.clone(),
        }
    }
}

/// Network access used by the controller
///
/// A failure to obtain any response is an error; a non-2xx status is not.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> TilawahResult<Response>;
}
