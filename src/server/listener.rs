use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::proxy::{ContentProxy, MagicSniffer, MagickTranscoder};
use crate::server::worker::{ConnectionSizes, Worker};

/// Binds the listening socket described by `cfg`, honouring its backlog.
pub fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let addr = cfg.listen_addr()?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("can't open listening socket at {addr}"))?;
    Ok(socket.listen(cfg.backlog)?)
}

/// Builds the shared proxy from `cfg` with the default services.
pub fn content_proxy(cfg: &Config) -> ContentProxy {
    ContentProxy::with_services(
        cfg.proxy_settings(),
        Arc::new(MagicSniffer),
        Arc::new(MagickTranscoder::new(cfg.transcoder.clone())),
    )
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = bind(cfg)?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, Arc::new(content_proxy(cfg)), cfg).await
}

/// Runs `cfg.thread_number` workers on `listener` until one of them stops.
///
/// Workers only stop by panicking, which is reported as an error.
pub async fn serve(
    listener: TcpListener,
    proxy: Arc<ContentProxy>,
    cfg: &Config,
) -> anyhow::Result<()> {
    let listener = Arc::new(listener);
    let sizes = ConnectionSizes {
        write_buffer: cfg.connection_write_buffer,
        read_buffer: cfg.connection_read_buffer,
    };

    info!(workers = cfg.thread_number, "starting working server tasks");
    let mut workers = JoinSet::new();
    for id in 0..cfg.thread_number {
        let worker = Worker::new(
            id,
            Arc::clone(&listener),
            Arc::clone(&proxy),
            cfg.session_limits(),
            sizes,
        );
        workers.spawn(worker.run());
    }

    while let Some(res) = workers.join_next().await {
        res.context("worker stopped")?;
    }
    Ok(())
}
