//! Bounded buffer for frames sent while the connection is down

use std::collections::VecDeque;

/// Capacity of the outbound buffer
pub const OUTBOUND_CAPACITY: usize = 64;

/// FIFO of pending outbound frames
///
/// Beyond capacity the oldest frame is dropped. The buffer is drained in
/// order when the connection (re)opens.
#[derive(Debug, Clone)]
pub struct OutboundBuffer {
    frames: VecDeque<String>,
    capacity: usize,
    dropped: u64,
}

impl OutboundBuffer {
    /// Create a buffer holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Queue a frame, returning the one evicted to make room
    pub fn push(&mut self, frame: String) -> Option<String> {
        if self.capacity == 0 {
            self.dropped += 1;
            return Some(frame);
        }
        let evicted = if self.frames.len() >= self.capacity {
            self.dropped += 1;
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Put a frame back at the head, e.g. after a failed flush
    pub fn requeue(&mut self, frame: String) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() >= self.capacity {
            self.frames.pop_back();
            self.dropped += 1;
        }
        self.frames.push_front(frame);
    }

    /// Take the oldest frame
    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop_front()
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames dropped to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for OutboundBuffer {
    fn default() -> Self {
        Self::new(OUTBOUND_CAPACITY)
    }
}
