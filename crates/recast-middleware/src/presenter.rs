//! Transformation error presentation
//!
//! Either a plain `500` carrying the error, or a `200` script that logs the
//! error to the browser console so a failed asset is visible instead of
//! silently missing. The mode is fixed per process.

use crate::reply::Reply;
use crate::transform::TransformError;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// How transformation failures reach the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMode {
    /// `500 Internal Server Error` with the raw message
    #[default]
    StatusResponse,
    /// Executable script reporting to `console.error`
    ConsoleScript,
}

impl ErrorMode {
    /// Mode selected by the `console_errors` flag
    #[inline]
    #[must_use]
    pub const fn from_console_errors(enabled: bool) -> Self {
        if enabled {
            Self::ConsoleScript
        } else {
            Self::StatusResponse
        }
    }
}

/// Renders [`TransformError`]s as replies
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPresenter {
    mode: ErrorMode,
}

impl ErrorPresenter {
    /// Create presenter for `mode`
    #[inline]
    #[must_use]
    pub const fn new(mode: ErrorMode) -> Self {
        Self { mode }
    }

    /// Render `error`, keeping any headers already set for the request
    #[must_use]
    pub fn present(&self, error: &TransformError, mut headers: HeaderMap) -> Reply {
        match self.mode {
            ErrorMode::StatusResponse => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                Reply::text(StatusCode::INTERNAL_SERVER_ERROR, headers, error.to_string())
            }
            ErrorMode::ConsoleScript => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/javascript; charset=utf-8"),
                );
                Reply::text(StatusCode::OK, headers, console_script(error))
            }
        }
    }
}

/// Script logging `error` to the console.
fn console_script(error: &TransformError) -> String {
    let output = serde_json::to_string(error).unwrap_or_else(|_| "{}".to_string());
    format!(
        "/* Transformation error from recast */\n /* See error console output for details. */\n var output = {output}\n console.error(\"{}\", output.codeFrame)",
        escape_js_string(&error.to_string())
    )
}

/// Escape `text` for a double- or single-quoted JavaScript string literal.
fn escape_js_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\u{:04x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }
    escaped
}
