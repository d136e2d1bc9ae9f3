//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 side of the server: request framing
//! and parsing, response heads, and the per-connection session loop with
//! keep-alive support. Only `GET` and `HEAD` are served.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`session`**: The per-worker session implementing the request-response state machine
//! - **`parser`**: Parses a buffered request header block
//! - **`request`**: HTTP request representation borrowing from the request buffer
//! - **`headers`**: Unique-key header map used by the parser
//! - **`response`**: Status codes and response heads
//! - **`writer`**: Serializes response heads into the response buffer
//!
//! # Session State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────────┐
//!        │  AwaitRequest   │ ← Read header lines up to the blank line
//!        └──────┬──────────┘
//!               │ Request buffered
//!               ▼
//!        ┌──────────────────┐
//!        │    Dispatch      │ ← Parse, resolve through the proxy, respond
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Connection: keep-alive → AwaitRequest (same connection)
//!               └─ Anything else → Closed
//! ```
//!
//! Any error along the way ends the session; the worker closes the
//! connection and goes back to accepting.
//!
//! # Example
//!
//! ```ignore
//! use contentd::http::session::{HttpSession, SessionLimits};
//! use contentd::net::BufferedConnection;
//!
//! let mut session = HttpSession::new(limits);
//! loop {
//!     let (socket, _addr) = listener.accept().await?;
//!     let conn = BufferedConnection::open(socket, 8192, 8192)?;
//!     if let Err(e) = session.run(&conn, &proxy).await {
//!         eprintln!("Session error: {}", e);
//!     }
//!     conn.close(std::net::Shutdown::Both).await?;
//! }
//! ```

pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod session;
pub mod writer;
