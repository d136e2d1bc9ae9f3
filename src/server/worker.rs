use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::http::session::{HttpSession, SessionLimits};
use crate::net::BufferedConnection;
use crate::proxy::ContentProxy;

/// Pause after a failed `accept` before the worker tries again.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Buffer sizes for the connections a worker opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSizes {
    pub write_buffer: usize,
    pub read_buffer: usize,
}

/// One serving slot: accepts a connection, runs its session to the end,
/// closes it, and starts over.
///
/// Workers share the listener and the proxy; the session and its buffers
/// belong to the worker alone.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    listener: Arc<TcpListener>,
    proxy: Arc<ContentProxy>,
    session: HttpSession,
    sizes: ConnectionSizes,
}

impl Worker {
    pub fn new(
        id: usize,
        listener: Arc<TcpListener>,
        proxy: Arc<ContentProxy>,
        limits: SessionLimits,
        sizes: ConnectionSizes,
    ) -> Self {
        Self {
            id,
            listener,
            proxy,
            session: HttpSession::new(limits),
            sizes,
        }
    }

    /// Serves connections for the lifetime of the process.
    pub async fn run(mut self) {
        info!(worker = self.id, "worker started");
        loop {
            self.serve_one().await;
        }
    }

    /// Accepts and fully serves a single connection. Failures are logged and
    /// stay inside this call.
    pub async fn serve_one(&mut self) {
        let (socket, peer) = match self.listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(worker = self.id, error = %e, "failed accepting connection");
                // EMFILE and friends persist until some connection closes
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                return;
            }
        };
        debug!(worker = self.id, peer = %peer, "connection established");

        let conn = match BufferedConnection::open(socket, self.sizes.write_buffer, self.sizes.read_buffer) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(worker = self.id, peer = %peer, error = %e, "failed opening connection");
                return;
            }
        };

        match self.session.run(&conn, &self.proxy).await {
            Ok(served) => {
                debug!(worker = self.id, peer = %peer, requests = served, "closing http session");
            }
            Err(e) => {
                warn!(worker = self.id, peer = %peer, error = %e, "http session aborted");
            }
        }

        if let Err(e) = conn.close(Shutdown::Both).await {
            debug!(worker = self.id, peer = %peer, error = %e, "shutdown failed");
        }
    }
}
