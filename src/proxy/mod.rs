//! Content negotiation proxy
//!
//! This module maps request URLs to files under the server root and, for
//! images, to re-encoded variants kept in a cache directory. The quality of a
//! variant comes from the weight the client's `Accept` header gives the
//! image's type.
//!
//! Variants live at `<cache>/q=<weight><url>`, so a variant is looked up by
//! path alone and survives restarts.

pub mod content;
pub mod file;
pub mod negotiate;
pub mod transcode;

pub use content::{ContentProxy, ContentProxySettings, ResolveError};
pub use file::{FileData, MagicSniffer, MimeSniffer};
pub use transcode::{MagickTranscoder, Transcoder};
