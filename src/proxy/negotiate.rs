//! `Accept` header negotiation for image quality.
//!
//! The `q` weight a client attaches to a media range is reused as the
//! compression quality of the image variant it receives: `image/png;q=0.4`
//! asks for a PNG re-encoded at quality 40.

/// Media range consulted when the resource's own type carries no usable
/// weight.
pub const WILDCARD: &str = "*/*";

/// Picks the transcode quality for a resource of type `mime`.
///
/// The entry matching `mime` (parameters stripped) is tried first, then the
/// `*/*` entry. A weight is usable only inside the open interval (0, 1); it is
/// scaled by 100, rounded and kept within 1..=99. `None` means the resource is
/// served unchanged.
///
/// ```
/// # use contentd::proxy::negotiate::quality_weight;
/// assert_eq!(quality_weight("image/png", "image/webp;q=0.8,*/*;q=0.5"), Some(50));
/// assert_eq!(quality_weight("image/png", "image/png"), None);
/// ```
pub fn quality_weight(mime: &str, accept: &str) -> Option<u8> {
    let essence = crate::proxy::file::essence(mime);
    entry_quality(accept, essence)
        .and_then(scale)
        .or_else(|| entry_quality(accept, WILDCARD).and_then(scale))
}

/// The `q` parameter of the first `accept` entry whose media range is
/// `range`. An entry without `q` yields `None`.
pub fn entry_quality(accept: &str, range: &str) -> Option<f64> {
    accept
        .split(',')
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let media = parts.next()?.trim();
            if !media.eq_ignore_ascii_case(range) {
                return None;
            }
            Some(parts.find_map(|param| {
                let (name, value) = param.split_once('=')?;
                if name.trim().eq_ignore_ascii_case("q") {
                    value.trim().parse::<f64>().ok()
                } else {
                    None
                }
            }))
        })
        .flatten()
}

fn scale(q: f64) -> Option<u8> {
    if q > 0.0 && q < 1.0 {
        Some((q * 100.0).round().clamp(1.0, 99.0) as u8)
    } else {
        None
    }
}

/// Cache key of the `weight` variant of `url`; doubles as the variant's
/// path relative to the cache directory.
pub fn cache_key(weight: u8, url: &str) -> String {
    format!("/q={weight}{url}")
}
