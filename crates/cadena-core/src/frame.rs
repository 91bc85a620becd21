//! Frame blocks: the unit of data flowing between pipeline stages.
//!
//! A frame block is a two-dimensional slab of PCM samples, frame-count ×
//! channel-count, stored interleaved as `f32`. [`FrameBlock`] owns its
//! samples and is what [`Processor::process`](crate::Processor::process)
//! consumes and produces; [`FrameView`] is the borrowed equivalent used
//! where re-chunking must not copy (see
//! [`FixedSizeInputAdapter`](crate::FixedSizeInputAdapter)).

use std::ops::Range;

/// An owned block of interleaved PCM samples.
///
/// `len()` counts frames, not samples: a stereo block of 256 frames holds
/// 512 samples. The channel count is fixed for the block's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBlock {
    samples: Vec<f32>,
    channels: usize,
}

impl FrameBlock {
    /// Create an empty block for the given channel count.
    pub fn new(channels: usize) -> Self {
        assert!(channels >= 1, "frame blocks need at least one channel");
        Self {
            samples: Vec::new(),
            channels,
        }
    }

    /// The empty mono block the engine feeds to source stages.
    pub fn empty() -> Self {
        Self::new(1)
    }

    /// Build a block from interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len()` is not a multiple of `channels`.
    pub fn from_interleaved(samples: Vec<f32>, channels: usize) -> Self {
        assert!(channels >= 1, "frame blocks need at least one channel");
        assert!(
            samples.len() % channels == 0,
            "interleaved length {} is not a multiple of {} channels",
            samples.len(),
            channels
        );
        Self { samples, channels }
    }

    /// Build a single-channel block.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self {
            samples,
            channels: 1,
        }
    }

    /// A block of `len` silent frames.
    pub fn zeros(len: usize, channels: usize) -> Self {
        assert!(channels >= 1, "frame blocks need at least one channel");
        Self {
            samples: vec![0.0; len * channels],
            channels,
        }
    }

    /// Concatenate blocks into one contiguous block.
    ///
    /// Non-empty inputs must share a channel count. An empty slice yields
    /// the empty block.
    pub fn concat(blocks: &[FrameBlock]) -> Self {
        let channels = blocks
            .iter()
            .find(|b| !b.is_empty())
            .map_or(1, FrameBlock::channels);
        let total: usize = blocks.iter().map(|b| b.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for block in blocks {
            debug_assert!(
                block.is_empty() || block.channels == channels,
                "cannot concatenate blocks with differing channel counts"
            );
            samples.extend_from_slice(&block.samples);
        }
        Self { samples, channels }
    }

    /// Number of frames in the block.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Whether the block holds no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The raw interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable access to the raw interleaved samples.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// One frame as a `channels`-long slice.
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }

    /// Iterate over frames.
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks_exact(self.channels)
    }

    /// Iterate mutably over frames.
    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.samples.chunks_exact_mut(self.channels)
    }

    /// Borrow the whole block as a view.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            samples: &self.samples,
            channels: self.channels,
        }
    }

    /// Borrow a frame range as a view.
    pub fn slice(&self, range: Range<usize>) -> FrameView<'_> {
        FrameView {
            samples: &self.samples[range.start * self.channels..range.end * self.channels],
            channels: self.channels,
        }
    }

    /// Append the frames of a view.
    pub fn extend_from_view(&mut self, view: FrameView<'_>) {
        debug_assert!(
            view.is_empty() || view.channels == self.channels,
            "cannot append a view with a differing channel count"
        );
        self.samples.extend_from_slice(view.samples);
    }

    /// Consume the block, returning its interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl Default for FrameBlock {
    fn default() -> Self {
        Self::empty()
    }
}

/// A borrowed view over interleaved PCM frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView<'a> {
    samples: &'a [f32],
    channels: usize,
}

impl<'a> FrameView<'a> {
    /// View over interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len()` is not a multiple of `channels`.
    pub fn from_interleaved(samples: &'a [f32], channels: usize) -> Self {
        assert!(channels >= 1, "frame views need at least one channel");
        assert!(
            samples.len() % channels == 0,
            "interleaved length {} is not a multiple of {} channels",
            samples.len(),
            channels
        );
        Self { samples, channels }
    }

    /// Number of frames in the view.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Whether the view holds no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The raw interleaved samples.
    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    /// One frame as a `channels`-long slice.
    pub fn frame(&self, index: usize) -> &'a [f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }

    /// Iterate over frames.
    pub fn frames(&self) -> impl Iterator<Item = &'a [f32]> {
        self.samples.chunks_exact(self.channels)
    }

    /// Narrow the view to a frame range, keeping the original lifetime.
    pub fn slice(&self, range: Range<usize>) -> FrameView<'a> {
        FrameView {
            samples: &self.samples[range.start * self.channels..range.end * self.channels],
            channels: self.channels,
        }
    }

    /// Copy the viewed frames into an owned block.
    pub fn to_block(&self) -> FrameBlock {
        FrameBlock {
            samples: self.samples.to_vec(),
            channels: self.channels,
        }
    }
}
