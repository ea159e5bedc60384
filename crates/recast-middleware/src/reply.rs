//! Interceptor outcomes
//!
//! Every request ends in exactly one [`Outcome`]: a [`Reply`] to write, or
//! [`Outcome::Next`] to hand the request to the next handler.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, HeaderMap, Response, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// Caching applied to this response (`true` / `false`)
pub const CACHE_HEADER: &str = "x-recast-cache";

/// Whether the response came from the cache (`true` / `false`)
pub const CACHE_HIT_HEADER: &str = "x-recast-cache-hit";

/// Fingerprint of the served source
pub const CACHE_HASH_HEADER: &str = "x-recast-cache-hash";

/// Content type of side artifacts
pub const SOURCE_MAP_CONTENT_TYPE: &str = "application/json";

/// Result of intercepting one request
#[derive(Debug)]
pub enum Outcome {
    /// Not ours: delegate to the next handler
    Next,
    /// Write this response
    Respond(Reply),
}

impl Outcome {
    /// Reply, if the request was answered
    #[must_use]
    pub fn into_reply(self) -> Option<Reply> {
        match self {
            Self::Next => None,
            Self::Respond(reply) => Some(reply),
        }
    }

    /// Whether the request was delegated
    #[must_use]
    pub fn is_next(&self) -> bool {
        matches!(self, Self::Next)
    }
}

/// Response payload
#[derive(Debug)]
pub enum ReplyBody {
    /// In-memory text
    Text(Arc<str>),
    /// Open file, streamed
    File(tokio::fs::File),
}

/// A response ready to write
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
}

impl Reply {
    /// Text response
    #[must_use]
    pub fn text(status: StatusCode, headers: HeaderMap, body: impl Into<Arc<str>>) -> Self {
        Self {
            status,
            headers,
            body: ReplyBody::Text(body.into()),
        }
    }

    /// Streamed file response
    #[must_use]
    pub fn file(headers: HeaderMap, file: tokio::fs::File) -> Self {
        Self {
            status: StatusCode::OK,
            headers,
            body: ReplyBody::File(file),
        }
    }

    /// With content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.headers.insert(CONTENT_TYPE, content_type);
        self
    }

    /// Status code
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body
    #[inline]
    #[must_use]
    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Read the whole body into a string
    ///
    /// # Errors
    /// Returns error if a streamed file cannot be read or is not UTF-8
    pub async fn into_text(self) -> std::io::Result<String> {
        match self.body {
            ReplyBody::Text(text) => Ok(text.to_string()),
            ReplyBody::File(mut file) => {
                let mut text = String::new();
                file.read_to_string(&mut text).await?;
                Ok(text)
            }
        }
    }

    /// Convert into an HTTP response
    #[must_use]
    pub fn into_response(self) -> Response<Body> {
        let body = match self.body {
            ReplyBody::Text(text) => Body::from(text.to_string()),
            ReplyBody::File(file) => Body::wrap_stream(ReaderStream::new(file)),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Header value for a flag
#[must_use]
pub(crate) fn flag(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}

/// Content type for a file served as-is, by extension
#[must_use]
pub fn content_type_for(path: &Path) -> HeaderValue {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let content_type = match extension.as_deref() {
        Some("js" | "mjs" | "cjs" | "jsx") => "application/javascript; charset=utf-8",
        Some("ts" | "tsx") => "application/typescript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("css") => "text/css; charset=utf-8",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    };
    HeaderValue::from_static(content_type)
}
