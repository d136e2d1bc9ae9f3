use std::fmt;
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};

use crate::http::request::HTTP_VERSION;
use crate::http::response::ResponseHead;

/// The header block did not fit in the response buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTooLarge {
    pub limit: usize,
}

impl fmt::Display for ResponseTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response header exceeds {} bytes", self.limit)
    }
}

impl std::error::Error for ResponseTooLarge {}

/// Serializes `head` into `buf`, stamped with `date`.
///
/// Fields are written in a fixed order: status line, `Date`,
/// `Content-Type`, `Content-Length`, blank line. Absent optional fields are
/// left out entirely. `buf` is cleared first and never grows past `limit`
/// bytes; on overflow it is left empty.
pub fn write_head(
    head: &ResponseHead<'_>,
    date: SystemTime,
    buf: &mut BytesMut,
    limit: usize,
) -> Result<usize, ResponseTooLarge> {
    buf.clear();

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        head.status.as_u16(),
        head.status.reason_phrase()
    );
    put(buf, limit, status_line.as_bytes())?;

    put_header(buf, limit, "Date", &httpdate::fmt_http_date(date))?;
    if let Some(mime) = head.content_type {
        put_header(buf, limit, "Content-Type", mime)?;
    }
    if let Some(len) = head.content_length {
        put_header(buf, limit, "Content-Length", &len.to_string())?;
    }

    // Header/body separator
    put(buf, limit, b"\r\n")?;

    Ok(buf.len())
}

fn put_header(
    buf: &mut BytesMut,
    limit: usize,
    name: &str,
    value: &str,
) -> Result<(), ResponseTooLarge> {
    let len = name.len() + 2 + value.len() + 2;
    if buf.len() + len > limit {
        buf.clear();
        return Err(ResponseTooLarge { limit });
    }
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
    Ok(())
}

fn put(buf: &mut BytesMut, limit: usize, bytes: &[u8]) -> Result<(), ResponseTooLarge> {
    if buf.len() + bytes.len() > limit {
        buf.clear();
        return Err(ResponseTooLarge { limit });
    }
    buf.put_slice(bytes);
    Ok(())
}
