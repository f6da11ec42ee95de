//! Rolling sample window
//!
//! Fixed-capacity circular buffer whose active size can be changed at
//! runtime (3-20). The window statistic is the median, which rejects single
//! outliers without the lag a moving average adds.

use super::tuning::{MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};

/// Circular buffer of raw distance samples (mm)
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: [u32; MAX_WINDOW_SIZE as usize],
    size: usize,
    head: usize,
    len: usize,
}

impl SampleWindow {
    /// Create an empty window
    ///
    /// `size` must already be clamped to the valid range.
    pub fn new(size: u8) -> Self {
        Self {
            samples: [0; MAX_WINDOW_SIZE as usize],
            size: size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE) as usize,
            head: 0,
            len: 0,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: u32) {
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % self.size;
        if self.len < self.size {
            self.len += 1;
        }
    }

    /// Overwrite every slot with one value
    pub fn fill(&mut self, sample: u32) {
        self.samples[..self.size].fill(sample);
        self.head = 0;
        self.len = self.size;
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Change the active size; drops all samples
    pub fn resize(&mut self, size: u8) {
        self.size = size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE) as usize;
        self.clear();
    }

    pub fn size(&self) -> u8 {
        self.size as u8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.size
    }

    fn active(&self) -> &[u32] {
        // While filling, samples occupy 0..len since head started at 0
        &self.samples[..self.len]
    }

    /// Median of the stored samples (lower middle for even counts)
    pub fn median(&self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        let mut sorted = [0u32; MAX_WINDOW_SIZE as usize];
        let sorted = &mut sorted[..self.len];
        sorted.copy_from_slice(self.active());
        sorted.sort_unstable();
        Some(sorted[(self.len - 1) / 2])
    }

    /// Max minus min of the stored samples
    pub fn spread(&self) -> u32 {
        let active = self.active();
        match (active.iter().min(), active.iter().max()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }
}
