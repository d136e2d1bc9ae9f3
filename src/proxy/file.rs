//! Resolved resources and MIME sniffing.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A file ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub path: PathBuf,
    pub size: u64,
    /// Full MIME string as reported by the sniffer, parameters included.
    pub mime: String,
}

impl FileData {
    /// Stats `path` and sniffs its type.
    ///
    /// Returns `Ok(None)` when nothing servable lives at `path`: missing
    /// entries, directories and paths running through a regular file.
    pub fn load(path: &Path, sniffer: &dyn MimeSniffer) -> io::Result<Option<Self>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mime: sniffer.sniff(path)?,
        }))
    }

    /// MIME type without parameters, e.g. `image/png` for
    /// `image/png; charset=binary`.
    pub fn essence(&self) -> &str {
        essence(&self.mime)
    }

    pub fn is_image(&self) -> bool {
        self.essence()
            .split_once('/')
            .is_some_and(|(kind, _)| kind.eq_ignore_ascii_case("image"))
    }
}

pub fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Maps a file on disk to its MIME type.
pub trait MimeSniffer: Send + Sync {
    fn sniff(&self, path: &Path) -> io::Result<String>;
}

/// Detects well-known binary formats by their leading bytes and falls back
/// to the file extension for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"II*\0", "image/tiff"),
    (b"MM\0*", "image/tiff"),
    (b"\0\0\x01\0", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
];

impl MagicSniffer {
    pub fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
        if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
            return Some("image/webp");
        }
        SIGNATURES
            .iter()
            .find(|(magic, _)| head.starts_with(magic))
            .map(|(_, mime)| *mime)
    }
}

impl MimeSniffer for MagicSniffer {
    fn sniff(&self, path: &Path) -> io::Result<String> {
        let mut head = [0u8; 16];
        let mut file = fs::File::open(path)?;
        let mut filled = 0;
        while filled < head.len() {
            let n = file.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if let Some(mime) = Self::sniff_bytes(&head[..filled]) {
            return Ok(mime.to_string());
        }

        let guess = mime_guess::from_path(path).first_or_octet_stream();
        if guess.type_() == mime_guess::mime::TEXT {
            Ok(format!("{}; charset=utf-8", guess.essence_str()))
        } else {
            Ok(guess.essence_str().to_string())
        }
    }
}
