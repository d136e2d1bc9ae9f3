use std::fmt;

use crate::http::headers::HeaderMap;
use crate::http::request::{HTTP_VERSION, MAX_URL_LEN, Method, Request};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    MethodNotSupported,
    VersionNotSupported,
    UrlTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ParseError::InvalidRequest => "malformed request line",
            ParseError::MethodNotSupported => "method not supported",
            ParseError::VersionNotSupported => "HTTP version not supported",
            ParseError::UrlTooLong => "URL too long",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for ParseError {}

/// Parses a request header block.
///
/// `buf` holds CR LF separated lines: the request line followed by the
/// header lines. Empty lines, including a final blank line, are ignored, as
/// are header lines without a `:` or with an empty name.
pub fn parse_http_request(buf: &[u8]) -> Result<Request<'_>, ParseError> {
    let text = std::str::from_utf8(buf).map_err(|_| ParseError::InvalidRequest)?;
    let mut lines = text.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split(' ');

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let url = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() || method_str.is_empty() || url.is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::MethodNotSupported)?;
    if url.len() > MAX_URL_LEN {
        return Err(ParseError::UrlTooLong);
    }
    if version != HTTP_VERSION {
        return Err(ParseError::VersionNotSupported);
    }

    // Headers
    let mut headers = HeaderMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        headers.insert_unique(name, value.trim());
    }

    Ok(Request {
        method,
        url,
        version,
        headers,
    })
}
