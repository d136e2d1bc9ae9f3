use std::fmt;
use std::time::{Duration, SystemTime};

use bytes::BytesMut;

use crate::http::parser::{ParseError, parse_http_request};
use crate::http::response::ResponseHead;
use crate::http::writer::write_head;
use crate::net::{BufferedConnection, ConnectionError};
use crate::proxy::{ContentProxy, ResolveError};

/// Sizes and timeout shared by every session of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_request_size: usize,
    pub max_response_size: usize,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum SessionError {
    /// Reading the request failed: timeout, socket error or peer shutdown.
    Receive(ConnectionError),
    /// The header block did not fit in the request buffer.
    RequestTooLarge { limit: usize },
    Parse(ParseError),
    /// The response head did not fit in the response buffer.
    ResponseTooLarge { limit: usize },
    Send(ConnectionError),
    /// The resource exists but could not be produced.
    Resolve(ResolveError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Receive(e) => write!(f, "failed reading request: {e}"),
            SessionError::RequestTooLarge { limit } => {
                write!(f, "request header exceeds {limit} bytes")
            }
            SessionError::Parse(e) => write!(f, "bad request: {e}"),
            SessionError::ResponseTooLarge { limit } => {
                write!(f, "response header exceeds {limit} bytes")
            }
            SessionError::Send(e) => write!(f, "failed sending response: {e}"),
            SessionError::Resolve(e) => write!(f, "cannot serve resource: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Receive(e) | SessionError::Send(e) => Some(e),
            SessionError::Parse(e) => Some(e),
            SessionError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}

enum SessionState {
    AwaitRequest,
    Dispatch,
    Closed,
}

/// Per-worker HTTP/1.1 state machine.
///
/// A session owns a request buffer and a response buffer sized once at
/// startup. [`HttpSession::run`] drives one connection through
/// request/response exchanges until the client stops asking for
/// `Connection: keep-alive` or something fails; the buffers are then reused
/// for the worker's next connection.
#[derive(Debug)]
pub struct HttpSession {
    request: BytesMut,
    response: BytesMut,
    limits: SessionLimits,
}

impl HttpSession {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            request: BytesMut::with_capacity(limits.max_request_size),
            response: BytesMut::with_capacity(limits.max_response_size),
            limits,
        }
    }

    /// Serves requests on `conn` until the exchange ends.
    ///
    /// Returns the number of requests answered. A peer that closes the
    /// connection between requests ends the session normally; every other
    /// failure is returned and the caller is expected to drop the
    /// connection.
    pub async fn run(
        &mut self,
        conn: &BufferedConnection,
        proxy: &ContentProxy,
    ) -> Result<usize, SessionError> {
        let mut served = 0;
        let mut state = SessionState::AwaitRequest;

        loop {
            state = match state {
                SessionState::AwaitRequest => {
                    self.reset();
                    if self.read_request(conn).await? {
                        SessionState::Dispatch
                    } else {
                        SessionState::Closed
                    }
                }

                SessionState::Dispatch => {
                    let keep_alive = self.dispatch(conn, proxy).await?;
                    served += 1;
                    tracing::debug!(keep_alive, "request served");

                    if keep_alive {
                        SessionState::AwaitRequest // go back for next request
                    } else {
                        SessionState::Closed
                    }
                }

                SessionState::Closed => return Ok(served),
            };
        }
    }

    /// Clears both buffers, keeping their allocations.
    pub fn reset(&mut self) {
        self.request.clear();
        self.response.clear();
    }

    /// Reads header lines into the request buffer up to the blank line.
    ///
    /// Returns `Ok(false)` when the peer closed the connection before sending
    /// anything.
    async fn read_request(&mut self, conn: &BufferedConnection) -> Result<bool, SessionError> {
        let limit = self.limits.max_request_size;

        loop {
            // every stored line is followed by CR LF
            let remaining = limit.saturating_sub(self.request.len());
            if remaining <= 2 {
                return Err(SessionError::RequestTooLarge { limit });
            }

            let read = conn
                .receive_line(&mut self.request, remaining - 1, self.limits.timeout)
                .await;
            match read {
                Ok(0) => return Ok(true),
                Ok(_) => self.request.extend_from_slice(b"\r\n"),
                Err(ConnectionError::Closed) if self.request.is_empty() => return Ok(false),
                Err(ConnectionError::LineTooLong { .. }) => {
                    return Err(SessionError::RequestTooLarge { limit });
                }
                Err(e) => return Err(SessionError::Receive(e)),
            }
        }
    }

    /// Parses the buffered request, resolves it and writes the response.
    ///
    /// Returns whether the connection stays open.
    async fn dispatch(
        &mut self,
        conn: &BufferedConnection,
        proxy: &ContentProxy,
    ) -> Result<bool, SessionError> {
        let limit = self.limits.max_response_size;
        let response = &mut self.response;

        let request = match parse_http_request(&self.request) {
            Ok(request) => request,
            Err(e) => {
                send_head(conn, response, limit, &ResponseHead::bad_request()).await?;
                return Err(SessionError::Parse(e));
            }
        };

        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            accept = ?request.accept(),
            "request parsed"
        );

        match proxy.resolve(request.url, request.accept()).await {
            Ok(file) => {
                let head = ResponseHead::ok()
                    .content_type(&file.mime)
                    .content_length(file.size);
                send_head(conn, response, limit, &head).await?;

                if request.method.has_body() {
                    conn.send_file(&file.path, file.size)
                        .await
                        .map_err(SessionError::Send)?;
                }
            }
            Err(ResolveError::NotFound) => {
                tracing::debug!(url = %request.url, "not found");
                send_head(conn, response, limit, &ResponseHead::not_found()).await?;
            }
            Err(e) => {
                send_head(conn, response, limit, &ResponseHead::internal_error()).await?;
                return Err(SessionError::Resolve(e));
            }
        }

        Ok(request.keep_alive())
    }
}

/// Builds `head` in the response buffer and flushes it to the client.
async fn send_head(
    conn: &BufferedConnection,
    buf: &mut BytesMut,
    limit: usize,
    head: &ResponseHead<'_>,
) -> Result<(), SessionError> {
    write_head(head, SystemTime::now(), buf, limit)
        .map_err(|e| SessionError::ResponseTooLarge { limit: e.limit })?;
    conn.send(buf).await.map_err(SessionError::Send)?;
    conn.flush().await.map_err(SessionError::Send)?;
    Ok(())
}
