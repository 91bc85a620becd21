//! Whole-stream level measurements.
//!
//! Three scalar analyzers that observe every frame of a run and report one
//! number each after post-processing: the true signed maximum, the RMS
//! level in dB and the DC offset. All of them pass their input through
//! unchanged.

use cadena_core::{
    Analyzer, AnalyzerResult, Capability, FrameBlock, Processor, ProcessorState, Result,
};

/// Compute the RMS (root mean square) level of a signal.
///
/// Returns the RMS value in linear scale (not dB).
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = signal.iter().map(|&x| x * x).sum();
    (sum_sq / signal.len() as f32).sqrt()
}

/// Compute the RMS level in dB, floored at -200 dB for silence.
pub fn rms_db(signal: &[f32]) -> f32 {
    let rms_val = rms(signal);
    if rms_val > 1e-10 {
        20.0 * rms_val.log10()
    } else {
        -200.0 // effectively silence
    }
}

/// Tracks the largest sample value seen over the whole stream.
///
/// The maximum is signed: a stream holding only negative samples reports
/// a negative maximum. Use the absolute peak analyzers downstream if you
/// need magnitude.
pub struct MaxLevel {
    max: f32,
    state: ProcessorState,
}

impl MaxLevel {
    /// Registry id of this type.
    pub const ID: &'static str = "max_level";

    /// New analyzer with no samples seen yet.
    pub fn new() -> Self {
        Self {
            max: f32::NEG_INFINITY,
            state: ProcessorState::new(),
        }
    }
}

impl Default for MaxLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MaxLevel {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::ValueAnalyzer
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        for &sample in frames.samples() {
            self.max = self.max.max(sample);
        }
        Ok((frames, eod))
    }

    fn result(&self) -> Option<AnalyzerResult> {
        // an empty stream never updates the running maximum
        let value = if self.max.is_finite() {
            f64::from(self.max)
        } else {
            0.0
        };
        Some(AnalyzerResult::scalar(
            Self::ID,
            self.name(),
            self.unit(),
            value,
        ))
    }
}

impl Analyzer for MaxLevel {
    fn name(&self) -> &'static str {
        "Max level"
    }

    fn unit(&self) -> &'static str {
        ""
    }
}

cadena_core::pipeable!(MaxLevel);

/// Measures the RMS level of the whole stream in dB.
pub struct RmsLevel {
    sum_sq: f64,
    count: u64,
    level_db: f64,
    state: ProcessorState,
}

impl RmsLevel {
    /// Registry id of this type.
    pub const ID: &'static str = "rms_level";

    /// New analyzer with no samples seen yet.
    pub fn new() -> Self {
        Self {
            sum_sq: 0.0,
            count: 0,
            level_db: -200.0,
            state: ProcessorState::new(),
        }
    }
}

impl Default for RmsLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RmsLevel {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::ValueAnalyzer
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        for &sample in frames.samples() {
            self.sum_sq += f64::from(sample) * f64::from(sample);
        }
        self.count += frames.samples().len() as u64;
        Ok((frames, eod))
    }

    fn post_process(&mut self) -> Result<()> {
        let rms_val = if self.count > 0 {
            (self.sum_sq / self.count as f64).sqrt()
        } else {
            0.0
        };
        self.level_db = if rms_val > 1e-10 {
            20.0 * rms_val.log10()
        } else {
            -200.0
        };
        Ok(())
    }

    fn result(&self) -> Option<AnalyzerResult> {
        Some(AnalyzerResult::scalar(
            Self::ID,
            self.name(),
            self.unit(),
            self.level_db,
        ))
    }
}

impl Analyzer for RmsLevel {
    fn name(&self) -> &'static str {
        "RMS level"
    }

    fn unit(&self) -> &'static str {
        "dB"
    }
}

cadena_core::pipeable!(RmsLevel);

/// Measures the mean sample value of the whole stream.
///
/// A clean AC signal reports near zero; a constant bias shows up directly.
pub struct DcOffset {
    sum: f64,
    count: u64,
    mean: f64,
    state: ProcessorState,
}

impl DcOffset {
    /// Registry id of this type.
    pub const ID: &'static str = "dc_offset";

    /// New analyzer with no samples seen yet.
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            mean: 0.0,
            state: ProcessorState::new(),
        }
    }
}

impl Default for DcOffset {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DcOffset {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::ValueAnalyzer
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        for &sample in frames.samples() {
            self.sum += f64::from(sample);
        }
        self.count += frames.samples().len() as u64;
        Ok((frames, eod))
    }

    fn post_process(&mut self) -> Result<()> {
        self.mean = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
        Ok(())
    }

    fn result(&self) -> Option<AnalyzerResult> {
        Some(AnalyzerResult::scalar(
            Self::ID,
            self.name(),
            self.unit(),
            self.mean,
        ))
    }
}

impl Analyzer for DcOffset {
    fn name(&self) -> &'static str {
        "DC offset"
    }

    fn unit(&self) -> &'static str {
        ""
    }
}

cadena_core::pipeable!(DcOffset);
