//! Stream-edge fade stage.

use cadena_core::{Capability, Effect, FrameBlock, Processor, ProcessorState, Result, StreamSpec};

/// Linear fade-in and fade-out placed against the stream length.
///
/// The fade-in ramps from silence at the first frame up to unity after
/// `in_frames`; the fade-out mirrors it over the last `out_frames` of
/// the stream, down to silence at the final frame. Placement uses the
/// total frame count recorded at setup, so the stage needs an upstream
/// source that reports one. A length of zero disables that ramp; when
/// the ramps overlap both apply.
pub struct Fade {
    fade_in: u64,
    fade_out: u64,
    position: u64,
    state: ProcessorState,
}

impl Fade {
    /// Registry id of this type.
    pub const ID: &'static str = "fade";

    /// Fade in over the first `in_frames` and out over the last `out_frames`.
    pub fn new(in_frames: u64, out_frames: u64) -> Self {
        Self {
            fade_in: in_frames,
            fade_out: out_frames,
            position: 0,
            state: ProcessorState::new(),
        }
    }

    /// Frames the opening ramp spans.
    pub fn fade_in(&self) -> u64 {
        self.fade_in
    }

    /// Frames the closing ramp spans.
    pub fn fade_out(&self) -> u64 {
        self.fade_out
    }

    fn gain_at(&self, frame: u64, total: u64) -> f32 {
        let mut gain = 1.0;
        if self.fade_in > 0 && frame < self.fade_in {
            gain *= frame as f32 / self.fade_in as f32;
        }
        let from_end = total.saturating_sub(frame + 1);
        if self.fade_out > 0 && from_end < self.fade_out {
            gain *= from_end as f32 / self.fade_out as f32;
        }
        gain
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Processor for Fade {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Effect
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.position = 0;
        self.state.record_source(upstream);
        Ok(())
    }

    fn process(&mut self, mut frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        let total = self.totalframes();
        let channels = frames.channels().max(1);
        for frame in frames.samples_mut().chunks_mut(channels) {
            let gain = self.gain_at(self.position, total);
            for sample in frame {
                *sample *= gain;
            }
            self.position += 1;
        }
        Ok((frames, eod))
    }
}

impl Effect for Fade {}

cadena_core::pipeable!(Fade);

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(totalframes: u64) -> StreamSpec {
        StreamSpec {
            channels: 1,
            samplerate: 8000,
            blocksize: 8,
            totalframes,
        }
    }

    #[test]
    fn ramps_meet_at_unity() {
        let mut fade = Fade::new(4, 4);
        fade.setup(spec(8)).unwrap();
        let (out, _) = fade
            .process(FrameBlock::from_mono(vec![1.0; 8]), true)
            .unwrap();
        assert_eq!(out.samples(), &[0.0, 0.25, 0.5, 0.75, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn zero_length_ramps_pass_through() {
        let mut fade = Fade::default();
        fade.setup(spec(4)).unwrap();
        let (out, _) = fade
            .process(FrameBlock::from_mono(vec![0.5; 4]), true)
            .unwrap();
        assert_eq!(out.samples(), &[0.5; 4]);
    }

    #[test]
    fn position_persists_across_blocks() {
        let mut fade = Fade::new(4, 0);
        fade.setup(spec(8)).unwrap();
        let (first, _) = fade
            .process(FrameBlock::from_mono(vec![1.0; 4]), false)
            .unwrap();
        let (second, _) = fade
            .process(FrameBlock::from_mono(vec![1.0; 4]), true)
            .unwrap();
        assert_eq!(first.samples(), &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(second.samples(), &[1.0; 4]);
    }

    #[test]
    fn gain_applies_per_frame_across_channels() {
        let mut fade = Fade::new(2, 0);
        fade.setup(StreamSpec {
            channels: 2,
            ..spec(4)
        })
        .unwrap();
        let (out, _) = fade
            .process(FrameBlock::from_interleaved(vec![1.0; 8], 2), true)
            .unwrap();
        assert_eq!(out.samples(), &[0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn setup_rewinds_the_ramp() {
        let mut fade = Fade::new(2, 0);
        fade.setup(spec(4)).unwrap();
        fade.process(FrameBlock::from_mono(vec![1.0; 4]), true)
            .unwrap();

        fade.setup(spec(4)).unwrap();
        let (out, _) = fade
            .process(FrameBlock::from_mono(vec![1.0; 4]), true)
            .unwrap();
        assert_eq!(out.samples(), &[0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn overlapping_ramps_multiply() {
        let mut fade = Fade::new(4, 4);
        fade.setup(spec(4)).unwrap();
        let (out, _) = fade
            .process(FrameBlock::from_mono(vec![1.0; 4]), true)
            .unwrap();
        // frame 1: in 1/4, out 2/4; frame 2: in 2/4, out 1/4
        assert_eq!(out.samples(), &[0.0, 0.125, 0.125, 0.0]);
    }
}
