//! Image re-encoding service.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Re-encodes the image at `src` into `dst` at `quality` (0..=100).
///
/// Implementations are called from tokio's blocking pool and may block.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, src: &Path, dst: &Path, quality: u8) -> Result<()>;
}

/// Transcoder backed by the ImageMagick command line.
///
/// Runs `<command> <src> -quality <q> <dst>`; the output format follows the
/// extension of `dst`.
#[derive(Debug, Clone)]
pub struct MagickTranscoder {
    command: String,
}

impl MagickTranscoder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for MagickTranscoder {
    fn default() -> Self {
        Self::new("convert")
    }
}

impl Transcoder for MagickTranscoder {
    fn transcode(&self, src: &Path, dst: &Path, quality: u8) -> Result<()> {
        if quality > 100 {
            bail!("quality {quality} outside 0..=100");
        }

        let output = Command::new(&self.command)
            .arg(src)
            .arg("-quality")
            .arg(quality.to_string())
            .arg(dst)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run `{}`", self.command))?;

        if !output.status.success() {
            bail!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
