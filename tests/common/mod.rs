//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::bail;
use contentd::proxy::{ContentProxy, ContentProxySettings, MagicSniffer, Transcoder};
use tokio::net::{TcpListener, TcpStream};

/// Smallest header the magic sniffer recognizes as PNG.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "contentd-{prefix}-{}-{}-{nanos}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Transcoder that copies the source and counts its calls.
#[derive(Default)]
pub struct CopyTranscoder {
    calls: AtomicUsize,
}

impl CopyTranscoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcoder for CopyTranscoder {
    fn transcode(&self, src: &Path, dst: &Path, _quality: u8) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // widen the window in which concurrent callers could race
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::copy(src, dst)?;
        Ok(())
    }
}

pub struct FailingTranscoder;

impl Transcoder for FailingTranscoder {
    fn transcode(&self, _src: &Path, _dst: &Path, quality: u8) -> anyhow::Result<()> {
        bail!("cannot encode at quality {quality}")
    }
}

/// Reports success without writing anything.
pub struct SilentTranscoder;

impl Transcoder for SilentTranscoder {
    fn transcode(&self, _src: &Path, _dst: &Path, _quality: u8) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Root and cache directories plus a proxy serving from them.
pub struct Site {
    pub root: TempDir,
    pub cache: TempDir,
}

impl Site {
    pub fn new() -> Self {
        Self {
            root: TempDir::new("root"),
            cache: TempDir::new("cache"),
        }
    }

    pub fn settings(&self) -> ContentProxySettings {
        ContentProxySettings {
            root: self.root.path().to_path_buf(),
            cache: self.cache.path().to_path_buf(),
            index: "index.html".to_string(),
        }
    }

    pub fn proxy(&self, transcoder: Arc<dyn Transcoder>) -> ContentProxy {
        ContentProxy::with_services(self.settings(), Arc::new(MagicSniffer), transcoder)
    }
}

/// A connected loopback pair: (accepted side, client side).
pub async fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (accepted.unwrap().0, client.unwrap())
}
