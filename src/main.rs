use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use contentd::config::Config;
use contentd::server;

const CONFIG_ENV: &str = "CONTENTD_CONFIG";

fn usage() {
    eprintln!("usage: contentd <config-file>");
    eprintln!("       {CONFIG_ENV}=<config-file> contentd");
}

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let Some(path) = config_path() else {
        usage();
        std::process::exit(2);
    };
    if path.as_os_str() == "-h" || path.as_os_str() == "--help" {
        usage();
        return;
    }

    if let Err(e) = run(&path) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> anyhow::Result<()> {
    let cfg = Config::load(path)
        .with_context(|| format!("failed loading configuration from {}", path.display()))?;
    tracing::info!(
        root = %cfg.server_root.display(),
        cache = %cfg.server_cache.display(),
        threads = cfg.thread_number,
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.thread_number)
        .enable_all()
        .build()
        .context("failed building runtime")?;

    runtime.block_on(async {
        tokio::select! {
            res = server::listener::run(&cfg) => {
                res?;
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
            }
        }

        Ok::<_, anyhow::Error>(())
    })
}
