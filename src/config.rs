//! Server configuration.
//!
//! The native format is one `key value` pair per line:
//!
//! ```text
//! # where originals live
//! server_root     /srv/www
//! server_cache    /var/cache/contentd
//! thread_number   4
//! port            8080
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Unknown keys and
//! unparsable numbers are errors. Files ending in `.yaml` or `.yml` are read
//! as a YAML mapping with the same keys. Numeric settings left at zero fall
//! back to their defaults.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::http::session::SessionLimits;
use crate::proxy::ContentProxySettings;

const DEFAULT_BUFFER_SIZE: usize = 8192;
const DEFAULT_THREAD_NUMBER: usize = 1;
const DEFAULT_BACKLOG: u32 = 10;
const DEFAULT_HTTP_SIZE: usize = 8192;
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub connection_write_buffer: usize,
    pub connection_read_buffer: usize,
    pub server_root: PathBuf,
    pub server_cache: PathBuf,
    pub server_index: String,
    pub thread_number: usize,
    /// Receive timeout in seconds.
    pub timeout: u64,
    pub port: u16,
    pub backlog: u32,
    pub http_max_request_size: usize,
    pub http_max_response_size: usize,
    pub bind_address: String,
    /// Command used to re-encode images.
    pub transcoder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_write_buffer: DEFAULT_BUFFER_SIZE,
            connection_read_buffer: DEFAULT_BUFFER_SIZE,
            server_root: PathBuf::from("root"),
            server_cache: PathBuf::from("cache"),
            server_index: "index.html".to_string(),
            thread_number: DEFAULT_THREAD_NUMBER,
            timeout: DEFAULT_TIMEOUT_SECS,
            port: 80,
            backlog: DEFAULT_BACKLOG,
            http_max_request_size: DEFAULT_HTTP_SIZE,
            http_max_response_size: DEFAULT_HTTP_SIZE,
            bind_address: "0.0.0.0".to_string(),
            transcoder: "convert".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    /// A line of a `key value` file could not be applied.
    Line { line: usize, message: String },
    Yaml(serde_yaml::Error),
    /// `bind_address` is not an IP address.
    Address(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config file: {e}"),
            ConfigError::Line { line, message } => {
                write!(f, "invalid line in config file at line {line}: {message}")
            }
            ConfigError::Yaml(e) => write!(f, "invalid YAML config: {e}"),
            ConfigError::Address(addr) => write!(f, "invalid bind address `{addr}`"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl Config {
    /// Reads the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml(&text)
        } else {
            Self::parse(&text)
        }
    }

    /// Parses the `key value` format.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::zeroed();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once(char::is_whitespace)
                .map(|(key, value)| (key, value.trim()))
                .ok_or_else(|| ConfigError::Line {
                    line: index + 1,
                    message: format!("missing value for `{line}`"),
                })?;

            cfg.apply(key, value).map_err(|message| ConfigError::Line {
                line: index + 1,
                message,
            })?;
        }

        Ok(cfg.with_defaults())
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text).map_err(ConfigError::Yaml)?;
        Ok(cfg.with_defaults())
    }

    /// Address the listener binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.bind_address)
            .map_err(|_| ConfigError::Address(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_request_size: self.http_max_request_size,
            max_response_size: self.http_max_response_size,
            timeout: self.timeout(),
        }
    }

    pub fn proxy_settings(&self) -> ContentProxySettings {
        ContentProxySettings {
            root: self.server_root.clone(),
            cache: self.server_cache.clone(),
            index: self.server_index.clone(),
        }
    }

    /// Defaults with every numeric field zeroed, so that only values set in
    /// the file survive [`Config::with_defaults`] unchanged.
    fn zeroed() -> Self {
        Self {
            connection_write_buffer: 0,
            connection_read_buffer: 0,
            thread_number: 0,
            timeout: 0,
            backlog: 0,
            http_max_request_size: 0,
            http_max_response_size: 0,
            ..Self::default()
        }
    }

    fn with_defaults(mut self) -> Self {
        fn or_default<T: PartialEq + Default>(value: &mut T, default: T) {
            if *value == T::default() {
                *value = default;
            }
        }

        or_default(&mut self.connection_write_buffer, DEFAULT_BUFFER_SIZE);
        or_default(&mut self.connection_read_buffer, DEFAULT_BUFFER_SIZE);
        or_default(&mut self.thread_number, DEFAULT_THREAD_NUMBER);
        or_default(&mut self.timeout, DEFAULT_TIMEOUT_SECS);
        or_default(&mut self.backlog, DEFAULT_BACKLOG);
        or_default(&mut self.http_max_request_size, DEFAULT_HTTP_SIZE);
        or_default(&mut self.http_max_response_size, DEFAULT_HTTP_SIZE);
        self
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "connection_write_buffer" => self.connection_write_buffer = number(value)?,
            "connection_read_buffer" => self.connection_read_buffer = number(value)?,
            "server_root" => self.server_root = PathBuf::from(value),
            "server_cache" => self.server_cache = PathBuf::from(value),
            "server_index" => self.server_index = value.to_string(),
            "thread_number" => self.thread_number = number(value)?,
            "timeout" => self.timeout = number(value)?,
            "port" => self.port = number(value)?,
            "backlog" => self.backlog = number(value)?,
            "http_max_request_size" => self.http_max_request_size = number(value)?,
            "http_max_response_size" => self.http_max_response_size = number(value)?,
            "bind_address" => self.bind_address = value.to_string(),
            "transcoder" => self.transcoder = value.to_string(),
            _ => return Err(format!("unknown key `{key}`")),
        }
        Ok(())
    }
}

fn number<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("invalid number `{value}`: {e}"))
}
