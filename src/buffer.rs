use bytes::{Buf, BytesMut};

/// A fixed-capacity staging area between the transport chunks and the segment scanner.
///
/// Bytes are appended at the back with [`fill`](ScratchBuffer::fill) and released from the front
/// with [`consume`](ScratchBuffer::consume); whatever has not been consumed stays at the front for
/// the next round, so the scanner always sees one contiguous window.
#[derive(Debug)]
pub(crate) struct ScratchBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ScratchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        ScratchBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Copies as much of `src` as fits and returns how many bytes were taken.
    pub fn fill(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.capacity - self.buf.len());
        // `BytesMut` moves the unconsumed tail back to the front of its allocation when it
        // runs out of room, which is the compaction step.
        self.buf.extend_from_slice(&src[..n]);
        n
    }

    pub fn unconsumed(&self) -> &[u8] {
        &self.buf
    }

    /// Releases `n` bytes from the front.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are buffered.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.buf.len(), "consumed past the end of the scratch buffer");
        self.buf.advance(n);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_stops_at_capacity() {
        let mut buf = ScratchBuffer::with_capacity(4);
        assert_eq!(buf.fill(b"abcdef"), 4);
        assert!(buf.is_full());
        assert_eq!(buf.unconsumed(), b"abcd");
        assert_eq!(buf.fill(b"ef"), 0);
    }

    #[test]
    fn test_consume_keeps_tail() {
        let mut buf = ScratchBuffer::with_capacity(4);
        buf.fill(b"abcd");
        buf.consume(3);
        assert_eq!(buf.unconsumed(), b"d");
        assert!(!buf.is_full());

        assert_eq!(buf.fill(b"efgh"), 3);
        assert_eq!(buf.unconsumed(), b"defg");
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_clear() {
        let mut buf = ScratchBuffer::with_capacity(8);
        buf.fill(b"abc");
        buf.clear();
        assert_eq!(buf.len(), 0);
    }

    #[test]
    #[should_panic]
    fn test_consume_out_of_bounds() {
        let mut buf = ScratchBuffer::with_capacity(8);
        buf.fill(b"abc");
        buf.consume(4);
    }
}
