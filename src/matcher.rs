//! Byte-by-byte detection of a wait pattern in the child's output.
//!
//! The buffer only holds what was seen since the wait was armed or since the
//! last newline, whichever is later. A pattern therefore never spans a line
//! break.

/// Capacity of the first allocation once a byte arrives.
const INITIAL_CAPACITY: usize = 64;

/// Growable byte window with an explicit doubling growth policy.
///
/// Holds no allocation until the first push.
#[derive(Debug, Default)]
pub struct MatchBuffer {
    bytes: Vec<u8>,
}

impl MatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) {
        if self.bytes.capacity() == 0 {
            self.bytes.reserve_exact(INITIAL_CAPACITY);
        } else if self.bytes.len() == self.bytes.capacity() {
            // Double: request as much again as we already hold.
            self.bytes.reserve_exact(self.bytes.capacity());
        }
        self.bytes.push(byte);
    }

    /// Forget the content but keep the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Forget the content and give the allocation back.
    pub fn release(&mut self) {
        self.bytes = Vec::new();
    }

    pub fn contains(&self, pattern: &[u8]) -> bool {
        !pattern.is_empty()
            && self.bytes.len() >= pattern.len()
            && self.bytes.windows(pattern.len()).any(|w| w == pattern)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

/// Outcome of feeding one byte to the [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// No wait is armed, the byte was ignored.
    Idle,
    /// The byte was buffered, no match yet.
    Pending,
    /// The pattern is now present. The buffer has been cleared.
    Matched,
    /// A newline without a match. The buffer has been cleared.
    BufferReset,
}

/// Incremental substring matcher, armed with one pattern at a time.
#[derive(Debug, Default)]
pub struct Matcher {
    pattern: Option<Vec<u8>>,
    buffer: MatchBuffer,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start looking for `pattern` with an empty window.
    pub fn arm(&mut self, pattern: &str) {
        self.pattern = Some(pattern.as_bytes().to_vec());
        self.buffer.clear();
    }

    /// Stop looking and drop the window's allocation.
    pub fn disarm(&mut self) {
        self.pattern = None;
        self.buffer.release();
    }

    pub fn is_armed(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn buffer(&self) -> &MatchBuffer {
        &self.buffer
    }

    pub fn push(&mut self, byte: u8) -> MatchResult {
        let Some(pattern) = &self.pattern else {
            return MatchResult::Idle;
        };
        self.buffer.push(byte);
        if self.buffer.contains(pattern) {
            self.buffer.clear();
            MatchResult::Matched
        } else if byte == b'\n' {
            self.buffer.clear();
            MatchResult::BufferReset
        } else {
            MatchResult::Pending
        }
    }
}
