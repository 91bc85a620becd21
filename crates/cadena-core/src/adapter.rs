//! Fixed-size input re-chunking for block-aligned stages.
//!
//! Windowed analyzers (FFT, envelope followers) need input in exact
//! window-sized blocks, while upstream stages emit whatever block size the
//! source was configured for. [`FixedSizeInputAdapter`] sits between the
//! two: it absorbs arbitrarily-sized input and emits fixed-size blocks,
//! optionally zero-padding the final one.
//!
//! Output is a lending iterator ([`Blocks`]): call
//! [`next_block`](Blocks::next_block) until it returns `None`. When a
//! whole incoming chunk happens to be exactly one block and nothing is
//! buffered, the adapter emits a view straight into the input instead of
//! copying, observable through pointer identity.

use crate::frame::FrameView;

/// Re-chunks variably-sized frame input into fixed-size blocks.
#[derive(Debug)]
pub struct FixedSizeInputAdapter {
    buffer: Vec<f32>,
    buffer_size: usize,
    channels: usize,
    len: usize,
    pad: bool,
}

impl FixedSizeInputAdapter {
    /// Adapter emitting `buffer_size`-frame blocks; the final block may be
    /// shorter.
    pub fn new(buffer_size: usize, channels: usize) -> Self {
        assert!(buffer_size >= 1, "block size must be at least one frame");
        assert!(channels >= 1, "adapter needs at least one channel");
        Self {
            buffer: vec![0.0; buffer_size * channels],
            buffer_size,
            channels,
            len: 0,
            pad: false,
        }
    }

    /// Adapter that zero-pads the final block to exactly `buffer_size`.
    pub fn with_padding(buffer_size: usize, channels: usize) -> Self {
        Self {
            pad: true,
            ..Self::new(buffer_size, channels)
        }
    }

    /// Emitted block size in frames.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Channel count of the frames handled.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames currently held back waiting for a full block.
    pub fn buffered(&self) -> usize {
        self.len
    }

    /// Whether the final block is zero-padded.
    pub fn pads(&self) -> bool {
        self.pad
    }

    /// Total frames this adapter will emit for an input of
    /// `input_totalframes` frames.
    ///
    /// With padding enabled the count is rounded up to the next multiple
    /// of the block size; without padding it is unchanged.
    pub fn blocksize(&self, input_totalframes: u64) -> u64 {
        if self.pad {
            input_totalframes.div_ceil(self.buffer_size as u64) * self.buffer_size as u64
        } else {
            input_totalframes
        }
    }

    /// Feed one incoming block, yielding re-chunked fixed-size blocks.
    ///
    /// The returned sequence is lazy, finite and single-pass. Each item is
    /// `(block, eod_for_block)`; the flag is `true` exactly on the final
    /// block produced by the final call of a run. After an `eod` emission
    /// the fill cursor is empty again; the adapter is not meant to be
    /// reused across independent runs without re-initialization.
    pub fn process<'a>(&'a mut self, frames: FrameView<'a>, eod: bool) -> Blocks<'a> {
        debug_assert!(
            frames.is_empty() || frames.channels() == self.channels,
            "input channel count does not match the adapter"
        );
        Blocks {
            adapter: self,
            frames,
            eod,
            consumed: 0,
            flushed: false,
        }
    }
}

/// Lending iterator over the fixed-size blocks of one
/// [`FixedSizeInputAdapter::process`] call.
#[derive(Debug)]
pub struct Blocks<'a> {
    adapter: &'a mut FixedSizeInputAdapter,
    frames: FrameView<'a>,
    eod: bool,
    consumed: usize,
    flushed: bool,
}

impl Blocks<'_> {
    /// The next fixed-size block, or `None` when the call's input is
    /// exhausted.
    pub fn next_block(&mut self) -> Option<(FrameView<'_>, bool)> {
        let channels = self.adapter.channels;
        loop {
            let remaining = self.frames.len() - self.consumed;
            if remaining == 0 {
                break;
            }
            let space = self.adapter.buffer_size - self.adapter.len;
            let copylen = remaining.min(space);
            let start = self.consumed;
            self.consumed += copylen;
            let last_chunk = self.eod && self.consumed == self.frames.len();

            // Fast path: nothing buffered and a whole block arrived at
            // once, so the input can be handed straight through.
            if self.adapter.len == 0 && copylen == self.adapter.buffer_size {
                return Some((self.frames.slice(start..start + copylen), last_chunk));
            }

            let dst = self.adapter.len * channels;
            let src = &self.frames.samples()[start * channels..(start + copylen) * channels];
            self.adapter.buffer[dst..dst + src.len()].copy_from_slice(src);
            self.adapter.len += copylen;
            if self.adapter.len == self.adapter.buffer_size {
                self.adapter.len = 0;
                let view = FrameView::from_interleaved(&self.adapter.buffer, channels);
                return Some((view, last_chunk));
            }
        }

        // Input exhausted; on eod a partial fill still has to go out.
        if self.eod && self.adapter.len > 0 && !self.flushed {
            self.flushed = true;
            let filled = self.adapter.len;
            self.adapter.len = 0;
            if self.adapter.pad {
                self.adapter.buffer[filled * channels..].fill(0.0);
                let view = FrameView::from_interleaved(&self.adapter.buffer, channels);
                return Some((view, true));
            }
            let view = FrameView::from_interleaved(&self.adapter.buffer[..filled * channels], channels);
            return Some((view, true));
        }
        None
    }
}
