use std::fs::File;
use std::io;

use tokio::net::tcp::OwnedWriteHalf;

/// Upper bound for a single `sendfile(2)` call.
#[cfg(target_os = "linux")]
const SENDFILE_CHUNK: u64 = 1 << 20;

/// Transfers exactly `byte_count` bytes of `file` to the socket.
///
/// On Linux the bytes go from the page cache to the socket with
/// `sendfile(2)`; the call is retried on readiness until everything is out.
#[cfg(target_os = "linux")]
pub(crate) async fn send_file(
    stream: &mut OwnedWriteHalf,
    file: File,
    byte_count: u64,
) -> io::Result<()> {
    use std::os::fd::AsRawFd;
    use tokio::io::Interest;

    let socket = stream.as_ref();
    let mut offset: libc::off_t = 0;
    let mut remaining = byte_count;

    while remaining > 0 {
        let chunk = remaining.min(SENDFILE_CHUNK) as usize;
        socket.writable().await?;
        let sent = socket.try_io(Interest::WRITABLE, || {
            sendfile(socket.as_raw_fd(), file.as_raw_fd(), &mut offset, chunk)
        });
        match sent {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file ended before the announced size was sent",
                ));
            }
            Ok(n) => remaining -= n as u64,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn sendfile(
    out_fd: std::os::fd::RawFd,
    in_fd: std::os::fd::RawFd,
    offset: &mut libc::off_t,
    count: usize,
) -> io::Result<usize> {
    // SAFETY: both descriptors stay open for the duration of the call and
    // `offset` points to a live `off_t`.
    let ret = unsafe { libc::sendfile(out_fd, in_fd, offset, count) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) async fn send_file(
    stream: &mut OwnedWriteHalf,
    file: File,
    byte_count: u64,
) -> io::Result<()> {
    use tokio::io::AsyncReadExt;

    let mut body = tokio::fs::File::from_std(file).take(byte_count);
    let copied = tokio::io::copy(&mut body, stream).await?;
    if copied < byte_count {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file ended before the announced size was sent",
        ));
    }
    Ok(())
}
