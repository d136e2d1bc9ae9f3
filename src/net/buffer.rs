//! Fixed-capacity byte buffers owned by a [`BufferedConnection`](super::BufferedConnection).
//!
//! Both buffers reserve their storage up front with a fallible allocation so
//! that a connection can refuse to open instead of aborting the process.

use crate::net::ConnectionError;

/// Outgoing bytes waiting for the next flush.
#[derive(Debug)]
pub struct WriteBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl WriteBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, ConnectionError> {
        Ok(Self {
            data: reserve(capacity)?,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Free space left before a flush is required.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Appends `bytes` if they fit entirely.
    ///
    /// Returns `false` and leaves the buffer untouched when the append would
    /// exceed the capacity. Nothing is ever truncated.
    #[must_use]
    pub fn try_append(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining() {
            return false;
        }
        self.data.extend_from_slice(bytes);
        true
    }

    pub fn pending(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Bytes received from the socket but not yet handed to a caller.
///
/// The unread bytes always form one contiguous window
/// `storage[start..start + len]`.
#[derive(Debug)]
pub struct ReadBuffer {
    storage: Vec<u8>,
    start: usize,
    len: usize,
}

impl ReadBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, ConnectionError> {
        let mut storage = reserve(capacity)?;
        storage.resize(capacity, 0);
        Ok(Self {
            storage,
            start: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn unread(&self) -> &[u8] {
        &self.storage[self.start..self.start + self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves up to `out.len()` unread bytes into `out`.
    pub fn take(&mut self, out: &mut [u8]) -> usize {
        let n = self.len.min(out.len());
        out[..n].copy_from_slice(&self.storage[self.start..self.start + n]);
        self.start += n;
        self.len -= n;
        if self.len == 0 {
            self.start = 0;
        }
        n
    }

    /// Whole storage, handed to the socket for a fresh read.
    ///
    /// Only valid while the window is empty; callers must follow up with
    /// [`ReadBuffer::fill`].
    pub fn slot(&mut self) -> &mut [u8] {
        debug_assert!(self.is_empty());
        &mut self.storage
    }

    /// Records that `read` bytes landed in the slot and `consumed` of them
    /// were already handed out.
    pub fn fill(&mut self, read: usize, consumed: usize) {
        debug_assert!(consumed <= read && read <= self.storage.len());
        self.start = consumed;
        self.len = read - consumed;
        if self.len == 0 {
            self.start = 0;
        }
    }
}

fn reserve(capacity: usize) -> Result<Vec<u8>, ConnectionError> {
    if capacity == 0 {
        return Err(ConnectionError::Allocation { capacity });
    }
    let mut data = Vec::new();
    data.try_reserve_exact(capacity)
        .map_err(|_| ConnectionError::Allocation { capacity })?;
    Ok(data)
}
