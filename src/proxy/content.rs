//! URL resolution with on-demand image variants.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::proxy::file::{FileData, MagicSniffer, MimeSniffer};
use crate::proxy::negotiate;
use crate::proxy::transcode::{MagickTranscoder, Transcoder};

/// Where the proxy finds originals and keeps variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentProxySettings {
    pub root: PathBuf,
    pub cache: PathBuf,
    /// Resource served for the URL `/`.
    pub index: String,
}

#[derive(Debug)]
pub enum ResolveError {
    /// Nothing servable exists for the URL.
    NotFound,
    Io(io::Error),
    /// The variant could not be produced.
    Transcode(anyhow::Error),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound => write!(f, "resource not found"),
            ResolveError::Io(e) => write!(f, "cannot read resource: {e}"),
            ResolveError::Transcode(e) => write!(f, "transcoding failed: {e:#}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Resolves request URLs to files, producing quality-reduced image variants
/// on demand.
///
/// One instance is shared by every worker. Lookups of originals run
/// concurrently; the cache check, transcode and load of a variant happen
/// under a single proxy-wide lock, so at most one transcode runs at a time
/// and a variant is never produced twice.
pub struct ContentProxy {
    settings: ContentProxySettings,
    lock: Mutex<()>,
    sniffer: Arc<dyn MimeSniffer>,
    transcoder: Arc<dyn Transcoder>,
}

impl fmt::Debug for ContentProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentProxy")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ContentProxy {
    /// Proxy with the magic-number sniffer and the ImageMagick transcoder.
    pub fn new(settings: ContentProxySettings) -> Self {
        Self::with_services(
            settings,
            Arc::new(MagicSniffer),
            Arc::new(MagickTranscoder::default()),
        )
    }

    pub fn with_services(
        settings: ContentProxySettings,
        sniffer: Arc<dyn MimeSniffer>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            settings,
            lock: Mutex::new(()),
            sniffer,
            transcoder,
        }
    }

    /// Resolves `url` to the file to serve.
    ///
    /// Images requested with an `Accept` header carrying a usable weight for
    /// their type (or for `*/*`) are replaced by the matching cached variant,
    /// which is transcoded first if it does not exist yet. A failed transcode
    /// fails the whole call; the original is not served instead.
    pub async fn resolve(&self, url: &str, accept: Option<&str>) -> Result<FileData, ResolveError> {
        let url = self.map_url(url)?;
        let original = self
            .load(self.settings.root.join(relative(&url)))
            .await?
            .ok_or(ResolveError::NotFound)?;

        let Some(accept) = accept else {
            return Ok(original);
        };
        if !original.is_image() {
            return Ok(original);
        }
        let Some(weight) = negotiate::quality_weight(&original.mime, accept) else {
            tracing::debug!(url = %url, accept, "no usable weight, serving original");
            return Ok(original);
        };

        let key = negotiate::cache_key(weight, &url);
        let variant_path = self.settings.cache.join(relative(&key));

        let _guard = self.lock.lock().await;

        if let Some(variant) = self.load(variant_path.clone()).await? {
            tracing::debug!(key = %key, "cache hit");
            return Ok(variant);
        }

        tracing::info!(key = %key, quality = weight, "transcoding variant");
        self.transcode(original.path, variant_path.clone(), weight).await?;

        self.load(variant_path.clone()).await?.ok_or_else(|| {
            ResolveError::Transcode(anyhow::anyhow!(
                "transcoder left no output at {}",
                variant_path.display()
            ))
        })
    }

    /// Validates `url` and maps `/` to the index resource.
    fn map_url<'u>(&self, url: &'u str) -> Result<Cow<'u, str>, ResolveError> {
        if !url.starts_with('/') || url.split('/').any(|segment| segment == "..") {
            return Err(ResolveError::NotFound);
        }
        if url == "/" {
            return Ok(Cow::Owned(format!("/{}", self.settings.index)));
        }
        Ok(Cow::Borrowed(url))
    }

    async fn load(&self, path: PathBuf) -> Result<Option<FileData>, ResolveError> {
        let sniffer = Arc::clone(&self.sniffer);
        tokio::task::spawn_blocking(move || FileData::load(&path, sniffer.as_ref()))
            .await
            .map_err(|e| ResolveError::Io(io::Error::other(e)))?
            .map_err(ResolveError::Io)
    }

    async fn transcode(&self, src: PathBuf, dst: PathBuf, quality: u8) -> Result<(), ResolveError> {
        let transcoder = Arc::clone(&self.transcoder);
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            transcoder.transcode(&src, &dst, quality)
        })
        .await
        .map_err(|e| ResolveError::Transcode(e.into()))?
        .map_err(ResolveError::Transcode)
    }
}

/// `url` as a path relative to a base directory.
fn relative(url: &str) -> &Path {
    Path::new(url.trim_start_matches('/'))
}
