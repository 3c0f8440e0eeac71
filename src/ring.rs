//! Fixed capacity byte ring
//!
//! Holds the sampled result bytes between the moment the data plane produces them and the
//! moment they fit into an outbound packet.

use crate::error::Error;

pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    /// Index of the oldest byte not yet taken
    read: usize,
    /// Number of bytes waiting to be taken, never more than `N`
    pending: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            read: 0,
            pending: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    pub fn is_full(&self) -> bool {
        self.pending == N
    }

    /// Append a byte. Fails with [`Error::BufferFull`] without touching the contents if there is
    /// no room left.
    pub fn push(&mut self, byte: u8) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::BufferFull);
        }
        let write = (self.read + self.pending) % N;
        self.data[write] = byte;
        self.pending += 1;
        Ok(())
    }

    /// Move up to `dst.len()` of the oldest bytes into `dst`, returning how many were moved
    pub fn take_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.pending);
        for slot in &mut dst[..n] {
            *slot = self.data[self.read];
            self.read = (self.read + 1) % N;
        }
        self.pending -= n;
        n
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
