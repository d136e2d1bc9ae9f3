use crate::http::headers::HeaderMap;

/// The only protocol version the server speaks.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Longest URL accepted on a request line.
pub const MAX_URL_LEN: usize = 2048;

/// HTTP request methods.
///
/// Only the two read-only methods are served; everything else is rejected
/// while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use contentd::http::request::Method;
    /// assert_eq!(Method::from_str("HEAD"), Some(Method::HEAD));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
        }
    }

    /// Whether the response to this method carries a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::GET)
    }
}

/// A parsed request, borrowing from the session's request buffer.
///
/// The buffer is cleared and reused for every request of a keep-alive
/// connection, so a `Request` never outlives one exchange.
#[derive(Debug, Clone)]
pub struct Request<'buf> {
    /// The HTTP method (GET or HEAD)
    pub method: Method,
    /// The request path/URL (e.g., "/index.html")
    pub url: &'buf str,
    /// HTTP version, always "HTTP/1.1" once parsed
    pub version: &'buf str,
    /// Every header of the request, first occurrence of a name wins
    pub headers: HeaderMap<'buf>,
}

impl<'buf> Request<'buf> {
    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&'buf str> {
        self.headers.lookup(key)
    }

    /// The `Accept` header, used for content negotiation.
    pub fn accept(&self) -> Option<&'buf str> {
        self.header("Accept")
    }

    /// The `Connection` header.
    pub fn connection(&self) -> Option<&'buf str> {
        self.header("Connection")
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// True only when the `Connection` value is exactly `keep-alive`. A
    /// missing header closes the connection, unlike the HTTP/1.1 default;
    /// existing clients of this server rely on that.
    pub fn keep_alive(&self) -> bool {
        self.connection() == Some("keep-alive")
    }
}
