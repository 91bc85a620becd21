//! Windowed RMS envelope.

use cadena_core::{
    Analyzer, AnalyzerResult, Capability, Error, FixedSizeInputAdapter, FrameBlock, Processor,
    ProcessorState, Result, StreamSpec,
};

use crate::level::rms_db;

const DEFAULT_WINDOW: usize = 2048;

/// Tracks the RMS level in dB over consecutive fixed-size windows.
///
/// Incoming blocks are re-chunked to the window size; the final window is
/// not padded, so a stream that does not divide evenly ends on a shorter
/// window measured over the frames it actually holds. The result is a
/// series with one value per window.
pub struct RmsEnvelope {
    window: usize,
    adapter: Option<FixedSizeInputAdapter>,
    levels: Vec<f64>,
    state: ProcessorState,
}

impl RmsEnvelope {
    /// Registry id of this type.
    pub const ID: &'static str = "rms_envelope";

    /// Envelope over the default window of 2048 frames.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Envelope over windows of `frames` frames.
    pub fn with_window(frames: usize) -> Self {
        Self {
            window: frames,
            adapter: None,
            levels: Vec::new(),
            state: ProcessorState::new(),
        }
    }

    /// Window length in frames.
    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for RmsEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RmsEnvelope {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Analyzer
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.state.record_source(upstream);
        self.adapter = Some(FixedSizeInputAdapter::new(
            self.window,
            usize::from(upstream.channels),
        ));
        self.levels.clear();
        Ok(())
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        let Some(adapter) = self.adapter.as_mut() else {
            return Err(Error::unsupported_operation(
                Self::ID,
                "setup() the stage before streaming",
            ));
        };
        let mut blocks = adapter.process(frames.view(), eod);
        while let Some((block, _)) = blocks.next_block() {
            self.levels.push(f64::from(rms_db(block.samples())));
        }
        Ok((frames, eod))
    }

    fn result(&self) -> Option<AnalyzerResult> {
        Some(AnalyzerResult::series(
            Self::ID,
            self.name(),
            self.unit(),
            self.levels.clone(),
        ))
    }
}

impl Analyzer for RmsEnvelope {
    fn name(&self) -> &'static str {
        "RMS envelope"
    }

    fn unit(&self) -> &'static str {
        "dB"
    }
}

cadena_core::pipeable!(RmsEnvelope);
