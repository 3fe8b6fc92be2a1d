//! A growable byte buffer with independent read/write cursors, used to stage partial frames
//! across non-blocking reads and writes (C7-C9). Adapted from the teacher's channel buffer, but
//! backed by a plain `Vec<u8>` with head/tail cursors rather than a `slice_deque::SliceDeque` —
//! CIP messages are small and bounded, so the ring-buffer machinery the teacher needed for
//! high-throughput game traffic isn't warranted here.

const DEFAULT_CAPACITY: usize = 1024;

/// `data[head..tail]` is the readable region; `data[tail..]` is free space available for a
/// socket read to land in.
pub struct Buffer {
    data: Vec<u8>,
    head: usize,
    tail: usize,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Buffer {
        Buffer {
            data: vec![0u8; capacity],
            head: 0,
            tail: 0,
        }
    }

    /// The bytes available to read.
    #[inline]
    pub fn ingress(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Free space at the tail a socket read can land in. Grows the buffer if there's none left.
    pub fn egress(&mut self) -> &mut [u8] {
        if self.tail == self.data.len() {
            self.compact();
        }
        if self.tail == self.data.len() {
            self.data.resize(self.data.len() * 2, 0);
        }
        &mut self.data[self.tail..]
    }

    /// Record that `count` bytes were written into the slice returned by `egress`.
    #[inline]
    pub fn move_tail(&mut self, count: usize) {
        self.tail += count;
        debug_assert!(self.tail <= self.data.len());
    }

    /// Discard `count` bytes from the front of `ingress` — a frame (or part of one) was consumed.
    #[inline]
    pub fn move_head(&mut self, count: usize) {
        self.head += count;
        debug_assert!(self.head <= self.tail);
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Append bytes to the buffer, growing as needed, and return the number of readable bytes
    /// after the append.
    pub fn write_slice(&mut self, bytes: &[u8]) -> usize {
        if self.tail + bytes.len() > self.data.len() {
            self.compact();
        }
        while self.tail + bytes.len() > self.data.len() {
            self.data.resize(self.data.len() * 2, 0);
        }
        self.data[self.tail..self.tail + bytes.len()].copy_from_slice(bytes);
        self.tail += bytes.len();
        self.len()
    }

    /// Slide the readable region down to offset 0, reclaiming space consumed by `move_head`.
    fn compact(&mut self) {
        if self.head == 0 {
            return;
        }
        self.data.copy_within(self.head..self.tail, 0);
        self.tail -= self.head;
        self.head = 0;
    }
}

impl Default for Buffer {
    fn default() -> Buffer {
        Buffer::new()
    }
}
