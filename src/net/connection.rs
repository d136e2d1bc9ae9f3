use std::net::{Shutdown, SocketAddr};
use std::path::Path;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::net::ConnectionError;
use crate::net::buffer::{ReadBuffer, WriteBuffer};
use crate::net::sendfile;

/// One accepted socket with buffered, independently locked directions.
///
/// All operations take `&self`: the read side and the write side each sit
/// behind their own mutex. Dropping the connection releases both buffers;
/// [`BufferedConnection::close`] additionally shuts the socket down.
#[derive(Debug)]
pub struct BufferedConnection {
    reader: Mutex<Reader>,
    writer: Mutex<Writer>,
    peer: Option<SocketAddr>,
}

#[derive(Debug)]
struct Reader {
    stream: OwnedReadHalf,
    buffer: ReadBuffer,
}

#[derive(Debug)]
struct Writer {
    stream: OwnedWriteHalf,
    buffer: WriteBuffer,
}

impl BufferedConnection {
    /// Wraps `stream`, reserving a write buffer of `write_capacity` bytes and
    /// a read buffer of `read_capacity` bytes.
    pub fn open(
        stream: TcpStream,
        write_capacity: usize,
        read_capacity: usize,
    ) -> Result<Self, ConnectionError> {
        let write_buffer = WriteBuffer::with_capacity(write_capacity)?;
        let read_buffer = ReadBuffer::with_capacity(read_capacity)?;
        let peer = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: Mutex::new(Reader {
                stream: read_half,
                buffer: read_buffer,
            }),
            writer: Mutex::new(Writer {
                stream: write_half,
                buffer: write_buffer,
            }),
            peer,
        })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Reads up to `buf.len()` bytes.
    ///
    /// Buffered bytes are served first, without touching the socket. When the
    /// buffer is empty the socket is read once, waiting at most `timeout`.
    /// Returns `Ok(0)` when the peer shut down and nothing is pending.
    pub async fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, ConnectionError> {
        let mut reader = self.reader.lock().await;
        reader.receive(buf, timeout).await
    }

    /// Reads one CR LF terminated line and appends it, without the
    /// terminator, to `line`.
    ///
    /// At most `max - 1` bytes are accepted before the call fails with
    /// [`ConnectionError::LineTooLong`]. On any error `line` is restored to
    /// its previous length. Returns the number of bytes appended, which is 0
    /// for an empty line.
    pub async fn receive_line(
        &self,
        line: &mut BytesMut,
        max: usize,
        timeout: Duration,
    ) -> Result<usize, ConnectionError> {
        let start = line.len();
        let limit = max.saturating_sub(1);
        let mut byte = [0u8; 1];

        loop {
            let n = match self.receive(&mut byte, timeout).await {
                Ok(n) => n,
                Err(e) => {
                    line.truncate(start);
                    return Err(e);
                }
            };
            if n == 0 {
                line.truncate(start);
                return Err(ConnectionError::Closed);
            }

            if byte[0] == b'\n' && line.len() > start && line[line.len() - 1] == b'\r' {
                line.truncate(line.len() - 1);
                return Ok(line.len() - start);
            }

            line.put_u8(byte[0]);
            // a trailing CR may still turn out to be the terminator
            let pending_cr = usize::from(byte[0] == b'\r');
            if line.len() - start - pending_cr > limit {
                line.truncate(start);
                return Err(ConnectionError::LineTooLong { max });
            }
        }
    }

    /// Queues `bytes` for sending.
    ///
    /// Payloads at least as large as the write buffer bypass it: pending data
    /// is flushed and the payload is written directly. Smaller payloads are
    /// appended, flushing first when they would not fit. Always reports the
    /// full length as accepted.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize, ConnectionError> {
        let mut writer = self.writer.lock().await;
        writer.send(bytes).await
    }

    /// Writes out everything currently buffered.
    pub async fn flush(&self) -> Result<(), ConnectionError> {
        let mut writer = self.writer.lock().await;
        writer.flush().await
    }

    /// Sends the first `byte_count` bytes of the file at `path` with a
    /// zero-copy transfer. Pending buffered bytes go out first.
    pub async fn send_file(&self, path: &Path, byte_count: u64) -> Result<(), ConnectionError> {
        let file = tokio::fs::File::open(path).await?.into_std().await;
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        sendfile::send_file(&mut writer.stream, file, byte_count).await?;
        Ok(())
    }

    /// Shuts down the requested direction(s) and releases both buffers.
    ///
    /// Buffered output that was never flushed is discarded.
    pub async fn close(self, how: Shutdown) -> Result<(), ConnectionError> {
        let reader = self.reader.into_inner();
        let writer = self.writer.into_inner();
        let stream = reader
            .stream
            .reunite(writer.stream)
            .map_err(std::io::Error::other)?;
        stream.into_std()?.shutdown(how)?;
        Ok(())
    }
}

impl Reader {
    async fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, ConnectionError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.buffer.is_empty() {
            return Ok(self.buffer.take(buf));
        }

        if buf.len() < self.buffer.capacity() {
            let read = read_timeout(&mut self.stream, self.buffer.slot(), timeout).await?;
            let n = read.min(buf.len());
            buf[..n].copy_from_slice(&self.buffer.slot()[..n]);
            self.buffer.fill(read, n);
            Ok(n)
        } else {
            read_timeout(&mut self.stream, buf, timeout).await
        }
    }
}

impl Writer {
    async fn send(&mut self, bytes: &[u8]) -> Result<usize, ConnectionError> {
        if bytes.len() >= self.buffer.capacity() {
            self.flush().await?;
            self.stream.write_all(bytes).await?;
            return Ok(bytes.len());
        }

        if !self.buffer.try_append(bytes) {
            self.flush().await?;
            let appended = self.buffer.try_append(bytes);
            debug_assert!(appended, "payload smaller than capacity must fit an empty buffer");
        }
        Ok(bytes.len())
    }

    async fn flush(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.stream.write_all(self.buffer.pending()).await?;
        self.buffer.clear();
        Ok(())
    }
}

async fn read_timeout(
    stream: &mut OwnedReadHalf,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<usize, ConnectionError> {
    match tokio::time::timeout(timeout, stream.read(buf)).await {
        Ok(read) => Ok(read?),
        Err(_) => Err(ConnectionError::Timeout(timeout)),
    }
}
