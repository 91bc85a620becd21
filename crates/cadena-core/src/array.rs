//! In-memory source stage.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::frame::FrameBlock;
use crate::processor::{
    Capability, Decoder, MediaInfo, Processor, ProcessorState, SourceRequest, StreamSpec,
};

const DEFAULT_BLOCKSIZE: usize = 8192;

/// Source stage backed by an in-memory sample array.
///
/// Feeds previously captured frames through a pipe. Besides direct use,
/// this is what a frozen pipe swaps in for its original source (see
/// [`RunOptions::stack`](crate::pipe::RunOptions::stack)): re-opening
/// rewinds to the first frame, so the same instance can source any number
/// of runs.
pub struct ArrayDecoder {
    samples: FrameBlock,
    samplerate: u32,
    blocksize: usize,
    span: Range<usize>,
    start: f64,
    duration: Option<f64>,
    position: usize,
    state: ProcessorState,
}

impl ArrayDecoder {
    /// Registry id of this type.
    pub const ID: &'static str = "array_dec";

    /// Source the given frames at the given native sample rate.
    pub fn new(samples: FrameBlock, samplerate: u32) -> Self {
        let span = 0..samples.len();
        Self {
            samples,
            samplerate,
            blocksize: DEFAULT_BLOCKSIZE,
            span,
            start: 0.0,
            duration: None,
            position: 0,
            state: ProcessorState::new(),
        }
    }

    /// Restrict playback to a segment of the array.
    ///
    /// `start` is an offset in seconds; `duration` is a length in seconds,
    /// `None` meaning everything from `start` to the end. Bounds that
    /// overrun the array are clamped.
    pub fn with_segment(mut self, start: f64, duration: Option<f64>) -> Self {
        self.start = start.max(0.0);
        self.duration = duration;
        let rate = f64::from(self.samplerate);
        let total = self.samples.len();
        let first = ((self.start * rate) as usize).min(total);
        let last = match duration {
            Some(secs) => first.saturating_add((secs * rate).ceil() as usize).min(total),
            None => total,
        };
        self.span = first..last;
        self
    }

    /// The frames this source feeds into the pipe.
    pub fn samples(&self) -> &FrameBlock {
        &self.samples
    }
}

impl Processor for ArrayDecoder {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Decoder
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn open(&mut self, request: &SourceRequest) -> Result<()> {
        if let Some(channels) = request.channels {
            if usize::from(channels) != self.samples.channels() {
                return Err(Error::unsupported_operation(
                    Self::ID,
                    "cannot convert the channel count of an in-memory array",
                ));
            }
        }
        if let Some(samplerate) = request.samplerate {
            if samplerate != self.samplerate {
                return Err(Error::unsupported_operation(
                    Self::ID,
                    "cannot resample an in-memory array",
                ));
            }
        }
        if request.blocksize == Some(0) {
            return Err(Error::unsupported_operation(
                Self::ID,
                "block size must be at least one frame",
            ));
        }
        self.blocksize = request.blocksize.unwrap_or(DEFAULT_BLOCKSIZE);
        self.position = self.span.start;
        self.state.record_source(StreamSpec {
            channels: self.samples.channels() as u16,
            samplerate: self.samplerate,
            blocksize: self.blocksize,
            totalframes: self.span.len() as u64,
        });
        Ok(())
    }

    fn channels(&self) -> u16 {
        self.samples.channels() as u16
    }

    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn blocksize(&self) -> usize {
        self.blocksize
    }

    fn totalframes(&self) -> u64 {
        self.span.len() as u64
    }

    /// Emit the next block of frames.
    ///
    /// The final block carries `eod` even when it is full sized; an empty
    /// array yields one empty block with `eod` set.
    fn process(&mut self, frames: FrameBlock, _eod: bool) -> Result<(FrameBlock, bool)> {
        if !frames.is_empty() {
            return Err(Error::unsupported_operation(
                Self::ID,
                "source stages do not accept input frames",
            ));
        }
        if !self.state.is_configured() {
            return Err(Error::unsupported_operation(
                Self::ID,
                "open() the source before streaming",
            ));
        }
        let total = self.span.end;
        let start = self.position.min(total);
        let end = total.min(start + self.blocksize);
        self.position = end;
        Ok((self.samples.slice(start..end).to_block(), end == total))
    }

    fn mediainfo(&self) -> Option<MediaInfo> {
        let full = self.samples.len() as f64 / f64::from(self.samplerate);
        Some(MediaInfo {
            uri: format!("array://{}x{}", self.samples.len(), self.samples.channels()),
            duration: self.duration.unwrap_or_else(|| (full - self.start).max(0.0)),
            start: self.start,
            is_segment: self.start != 0.0 || self.duration.is_some(),
            samplerate: self.samplerate,
        })
    }
}

impl Decoder for ArrayDecoder {
    fn format(&self) -> &'static str {
        "array"
    }
}

crate::pipeable!(ArrayDecoder);

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> FrameBlock {
        FrameBlock::from_mono((0..frames).map(|i| i as f32).collect())
    }

    fn drain(dec: &mut ArrayDecoder) -> Vec<(FrameBlock, bool)> {
        let mut out = Vec::new();
        loop {
            let (block, eod) = dec.process(FrameBlock::empty(), false).unwrap();
            out.push((block, eod));
            if eod {
                break;
            }
        }
        out
    }

    #[test]
    fn emits_blocks_with_final_eod() {
        let mut dec = ArrayDecoder::new(ramp(10), 8000);
        dec.open(&SourceRequest {
            blocksize: Some(4),
            ..SourceRequest::default()
        })
        .unwrap();
        let blocks = drain(&mut dec);
        let lens: Vec<usize> = blocks.iter().map(|(b, _)| b.len()).collect();
        let eods: Vec<bool> = blocks.iter().map(|(_, e)| *e).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(eods, vec![false, false, true]);
        assert_eq!(blocks[2].0.samples(), &[8.0, 9.0]);
    }

    #[test]
    fn exact_multiple_ends_on_a_full_block() {
        let mut dec = ArrayDecoder::new(ramp(8), 8000);
        dec.open(&SourceRequest {
            blocksize: Some(4),
            ..SourceRequest::default()
        })
        .unwrap();
        let blocks = drain(&mut dec);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].0.len(), 4);
        assert!(blocks[1].1);
    }

    #[test]
    fn empty_array_yields_one_empty_eod_block() {
        let mut dec = ArrayDecoder::new(FrameBlock::empty(), 8000);
        dec.open(&SourceRequest::default()).unwrap();
        let (block, eod) = dec.process(FrameBlock::empty(), false).unwrap();
        assert!(block.is_empty());
        assert!(eod);
    }

    #[test]
    fn reopening_rewinds_to_the_start() {
        let mut dec = ArrayDecoder::new(ramp(6), 8000);
        let request = SourceRequest {
            blocksize: Some(4),
            ..SourceRequest::default()
        };
        dec.open(&request).unwrap();
        let first_run = drain(&mut dec);
        dec.open(&request).unwrap();
        let second_run = drain(&mut dec);
        assert_eq!(first_run, second_run);
    }

    #[test]
    fn refuses_input_frames() {
        let mut dec = ArrayDecoder::new(ramp(4), 8000);
        dec.open(&SourceRequest::default()).unwrap();
        let err = dec.process(ramp(2), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn refuses_format_conversion_requests() {
        let mut dec = ArrayDecoder::new(ramp(4), 8000);
        assert!(dec
            .open(&SourceRequest {
                samplerate: Some(44100),
                ..SourceRequest::default()
            })
            .is_err());
        assert!(dec
            .open(&SourceRequest {
                channels: Some(2),
                ..SourceRequest::default()
            })
            .is_err());
        // matching the native format is not a conversion
        dec.open(&SourceRequest {
            channels: Some(1),
            samplerate: Some(8000),
            blocksize: None,
        })
        .unwrap();
        assert_eq!(dec.blocksize(), DEFAULT_BLOCKSIZE);
    }

    #[test]
    fn refuses_a_zero_block_size() {
        let mut dec = ArrayDecoder::new(ramp(4), 8000);
        let err = dec
            .open(&SourceRequest {
                blocksize: Some(0),
                ..SourceRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn segment_selects_a_sample_range() {
        // 40 frames at 10 Hz: 4 seconds of signal
        let mut dec = ArrayDecoder::new(ramp(40), 10).with_segment(1.0, Some(2.0));
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(dec.totalframes(), 20);

        let blocks = drain(&mut dec);
        let samples: Vec<f32> = blocks
            .iter()
            .flat_map(|(b, _)| b.samples().to_vec())
            .collect();
        assert_eq!(samples.first(), Some(&10.0));
        assert_eq!(samples.last(), Some(&29.0));

        let info = dec.mediainfo().unwrap();
        assert!(info.is_segment);
        assert_eq!(info.start, 1.0);
        assert_eq!(info.duration, 2.0);
    }

    #[test]
    fn segment_bounds_are_clamped_to_the_array() {
        let mut dec = ArrayDecoder::new(ramp(40), 10).with_segment(3.0, Some(5.0));
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(dec.totalframes(), 10);
        let blocks = drain(&mut dec);
        assert_eq!(blocks.last().unwrap().0.samples().last(), Some(&39.0));

        // a segment starting past the end plays nothing
        let mut empty = ArrayDecoder::new(ramp(40), 10).with_segment(10.0, None);
        empty.open(&SourceRequest::default()).unwrap();
        let (block, eod) = empty.process(FrameBlock::empty(), false).unwrap();
        assert!(block.is_empty());
        assert!(eod);
    }

    #[test]
    fn mediainfo_describes_the_array() {
        let mut dec = ArrayDecoder::new(ramp(4000), 8000);
        dec.open(&SourceRequest::default()).unwrap();
        let info = dec.mediainfo().unwrap();
        assert_eq!(info.uri, "array://4000x1");
        assert!((info.duration - 0.5).abs() < 1e-9);
        assert_eq!(info.samplerate, 8000);
        assert!(!info.is_segment);
    }

    #[test]
    fn streaming_before_open_is_refused() {
        let mut dec = ArrayDecoder::new(ramp(4), 8000);
        let err = dec.process(FrameBlock::empty(), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }
}
