/// HTTP status codes the server emits.
///
/// - `Ok` (200): resource found and served
/// - `BadRequest` (400): request line or headers could not be parsed
/// - `NotFound` (404): no such resource under the server root
/// - `InternalServerError` (500): resource exists but could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use contentd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Everything that goes into a response header block.
///
/// Bodies never live here: they are streamed from disk after the head has
/// been flushed.
///
/// # Example
///
/// ```ignore
/// let head = ResponseHead::new(StatusCode::Ok)
///     .content_type("image/png")
///     .content_length(1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead<'a> {
    pub status: StatusCode,
    pub content_type: Option<&'a str>,
    pub content_length: Option<u64>,
}

impl<'a> ResponseHead<'a> {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            content_length: None,
        }
    }

    pub fn content_type(mut self, mime: &'a str) -> Self {
        self.content_type = Some(mime);
        self
    }

    pub fn content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::Ok)
    }

    /// Head of a 404 response: no type, no length, no body.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BadRequest)
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::InternalServerError)
    }
}
