//! contentd - static content server with image re-encoding
//!
//! Serves files from a root directory over HTTP/1.1 and, when a client
//! advertises a quality weight for an image type, hands back a cached
//! re-encoded variant of the image instead of the original.

pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod server;
