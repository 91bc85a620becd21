//! Constant gain stage.

use cadena_core::{Capability, Effect, FrameBlock, Processor, ProcessorState, Result};

/// Scales every sample by a constant factor.
///
/// The factor is linear internally; [`from_db`](Gain::from_db) converts
/// from decibels at construction. Unity gain passes the signal through
/// unchanged.
///
/// # Example
///
/// ```rust
/// use cadena_effects::Gain;
///
/// let halved = Gain::from_db(-6.02);
/// assert!((halved.factor() - 0.5).abs() < 0.01);
/// ```
pub struct Gain {
    factor: f32,
    state: ProcessorState,
}

impl Gain {
    /// Registry id of this type.
    pub const ID: &'static str = "gain";

    /// Scale by a linear factor (1.0 is unity).
    pub fn new(factor: f32) -> Self {
        Self {
            factor,
            state: ProcessorState::new(),
        }
    }

    /// Scale by a level in decibels (0 dB is unity).
    pub fn from_db(db: f32) -> Self {
        Self::new(10f32.powf(db / 20.0))
    }

    /// The linear scale factor.
    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Processor for Gain {
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

    fn process(&mut self, mut frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        for sample in frames.samples_mut() {
            *sample *= self.factor;
        }
        Ok((frames, eod))
    }
}

impl Effect for Gain {}

cadena_core::pipeable!(Gain);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_samples_by_the_factor() {
        let mut gain = Gain::new(0.5);
        let input = FrameBlock::from_mono(vec![1.0, -0.5, 0.25]);
        let (out, eod) = gain.process(input, true).unwrap();
        assert_eq!(out.samples(), &[0.5, -0.25, 0.125]);
        assert!(eod);
    }

    #[test]
    fn unity_is_a_passthrough() {
        let mut gain = Gain::default();
        let input = FrameBlock::from_interleaved(vec![0.1, 0.2, 0.3, 0.4], 2);
        let (out, _) = gain.process(input, false).unwrap();
        assert_eq!(out.samples(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(out.channels(), 2);
    }

    #[test]
    fn db_construction_matches_linear() {
        assert!((Gain::from_db(0.0).factor() - 1.0).abs() < 1e-6);
        assert!((Gain::from_db(-6.0206).factor() - 0.5).abs() < 1e-4);
        assert!((Gain::from_db(20.0).factor() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn negative_gain_inverts_polarity() {
        let mut gain = Gain::new(-1.0);
        let (out, _) = gain
            .process(FrameBlock::from_mono(vec![0.5, -0.25]), false)
            .unwrap();
        assert_eq!(out.samples(), &[-0.5, 0.25]);
    }
}
