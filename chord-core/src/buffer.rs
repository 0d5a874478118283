//! # Capture Buffer
//!
//! Accumulates incoming mono samples into fixed-size, overlapping analysis
//! windows. The buffer is bounded: when the capture side produces faster
//! than the pipeline consumes, the oldest samples are dropped so recognition
//! stays close to real time instead of building up a backlog.

use std::collections::VecDeque;

/// Ring size relative to the window; must keep at least two full windows
/// so one overflow never destroys the window currently being assembled.
const RING_WINDOWS: usize = 4;

/// Bounded sample ring with overlapping window extraction.
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    window_size: usize,
    hop: usize,
    capacity: usize,
    dropped: u64,
}

impl SampleBuffer {
    /// Creates a buffer holding up to `RING_WINDOWS` windows of samples.
    pub fn new(window_size: usize, hop: usize) -> Self {
        Self::with_capacity(window_size, hop, window_size * RING_WINDOWS)
    }

    /// Creates a buffer with an explicit capacity. Capacities below two
    /// windows are raised to that minimum.
    pub fn with_capacity(window_size: usize, hop: usize, capacity: usize) -> Self {
        let capacity = capacity.max(window_size * 2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            window_size,
            hop,
            capacity,
            dropped: 0,
        }
    }

    /// Appends newly captured samples. Never blocks; if the ring would
    /// overflow, the oldest excess is discarded and counted.
    pub fn push(&mut self, samples: &[f32]) {
        self.samples.extend(samples.iter().copied());
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(..excess);
            self.dropped += excess as u64;
        }
    }

    /// Returns the next analysis window once enough samples have arrived,
    /// advancing the read cursor by one hop. `None` means "not ready",
    /// not an error.
    pub fn try_extract_window(&mut self) -> Option<Vec<f32>> {
        if self.samples.len() < self.window_size {
            return None;
        }
        let window: Vec<f32> = self.samples.iter().take(self.window_size).copied().collect();
        self.samples.drain(..self.hop);
        Some(window)
    }

    /// Number of samples discarded due to overflow since creation.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
