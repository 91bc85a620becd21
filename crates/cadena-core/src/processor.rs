//! The processor contract: the lifecycle every pipeline stage implements.
//!
//! A processor moves through a fixed lifecycle per run:
//!
//! 1. **configure**: sources get [`Processor::open`] with the caller's
//!    format request; downstream stages get [`Processor::setup`] with the
//!    concrete format produced by the stage before them.
//! 2. **stream**: [`Processor::process`] is called once per block until
//!    the end-of-data flag comes back `true`.
//! 3. **finalize**: [`Processor::post_process`] once per run (analyzers
//!    finish their aggregates), then [`Processor::release`] frees any
//!    external resources.
//!
//! Shared bookkeeping (recorded formats, media metadata, instance
//! identity) lives in a [`ProcessorState`] every implementation embeds and
//! exposes through [`Processor::state`]; all defaulting behavior is
//! provided as trait default methods over that state.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::FrameBlock;
use crate::result::AnalyzerResult;

/// A processor shared between a pipe and whatever else holds a handle to
/// it (for example a dependent stage listing it as a parent).
///
/// Pointer identity of the `Arc` is what the pipe algebra deduplicates on.
pub type SharedProcessor = Arc<Mutex<dyn Processor>>;

/// Wrap a processor for use in a pipe.
pub fn shared(processor: impl Processor + 'static) -> SharedProcessor {
    Arc::new(Mutex::new(processor))
}

/// The concrete stream format flowing out of one stage and into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub samplerate: u32,
    /// Nominal frames per block.
    pub blocksize: usize,
    /// Total frames the stage will emit over the run.
    pub totalframes: u64,
}

impl StreamSpec {
    /// Stream duration in seconds.
    pub fn duration(&self) -> f64 {
        self.totalframes as f64 / f64::from(self.samplerate)
    }
}

/// Output format requested of a source stage.
///
/// Unset fields fall back to the media's native values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceRequest {
    /// Requested channel count.
    pub channels: Option<u16>,
    /// Requested sample rate in Hz.
    pub samplerate: Option<u32>,
    /// Requested frames per block.
    pub blocksize: Option<usize>,
}

/// Descriptive metadata about the media behind a source stage.
///
/// `samplerate` is the native rate of the media, independent of whatever
/// output rate the decoder was asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    /// Location of the media (file path, `array://...`, ...).
    pub uri: String,
    /// Duration of the decoded range in seconds.
    pub duration: f64,
    /// Offset of the decoded range in seconds.
    pub start: f64,
    /// Whether the decoded range is a sub-segment of the media.
    pub is_segment: bool,
    /// Native sample rate of the media in Hz.
    pub samplerate: u32,
}

/// The role a processor type fulfills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Produces frames from media; usable as a pipe source.
    Decoder,
    /// Transforms frames in flight.
    Effect,
    /// Observes frames and produces a result.
    Analyzer,
    /// An analyzer whose result is a single scalar.
    ValueAnalyzer,
    /// Consumes frames into an output artifact (file, stream).
    Encoder,
    /// Observes frames and renders a visual artifact.
    Grapher,
}

impl Capability {
    /// Every capability, in display order.
    pub const ALL: [Capability; 6] = [
        Capability::Decoder,
        Capability::Effect,
        Capability::Analyzer,
        Capability::ValueAnalyzer,
        Capability::Encoder,
        Capability::Grapher,
    ];

    /// The capability this one specializes, if any.
    pub fn parent(self) -> Option<Capability> {
        match self {
            Capability::ValueAnalyzer => Some(Capability::Analyzer),
            _ => None,
        }
    }

    /// Whether this capability is `other` or a specialization of it.
    pub fn is_a(self, other: Capability) -> bool {
        self == other || self.parent().is_some_and(|p| p.is_a(other))
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Decoder => "decoder",
            Capability::Effect => "effect",
            Capability::Analyzer => "analyzer",
            Capability::ValueAnalyzer => "value_analyzer",
            Capability::Encoder => "encoder",
            Capability::Grapher => "grapher",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-instance bookkeeping every processor embeds.
///
/// Holds the recorded upstream format (`source_*`), the format the stage
/// actually consumes (`input_*`), the media metadata captured from the
/// pipe's original source, and the instance identity.
#[derive(Debug)]
pub struct ProcessorState {
    source: Option<StreamSpec>,
    source_mediainfo: Option<MediaInfo>,
    input_channels: Option<u16>,
    input_samplerate: Option<u32>,
    input_blocksize: Option<usize>,
    input_stepsize: Option<usize>,
    uuid: Uuid,
}

impl ProcessorState {
    /// Fresh state with a new instance identity.
    pub fn new() -> Self {
        Self {
            source: None,
            source_mediainfo: None,
            input_channels: None,
            input_samplerate: None,
            input_blocksize: None,
            input_stepsize: None,
            uuid: Uuid::new_v4(),
        }
    }

    /// Record the upstream format and resolve the `input_*` values.
    ///
    /// Repeated calls overwrite the recorded format but leave
    /// already-resolved `input_*` values alone. `input_stepsize` defaults
    /// to the upstream *block size*; there is no upstream stepsize field.
    pub fn record_source(&mut self, spec: StreamSpec) {
        self.source = Some(spec);
        self.input_channels.get_or_insert(spec.channels);
        self.input_samplerate.get_or_insert(spec.samplerate);
        self.input_blocksize.get_or_insert(spec.blocksize);
        self.input_stepsize.get_or_insert(spec.blocksize);
    }

    /// Whether a format has been recorded yet.
    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// The recorded upstream format.
    ///
    /// # Panics
    ///
    /// Panics if called before `setup`/`open` recorded a format.
    pub fn source_spec(&self) -> StreamSpec {
        self.source
            .expect("stream format queried before setup; configure the stage first")
    }

    /// Media metadata captured from the pipe's original source, if any.
    pub fn source_mediainfo(&self) -> Option<&MediaInfo> {
        self.source_mediainfo.as_ref()
    }

    /// Store the original source's media metadata.
    pub fn set_source_mediainfo(&mut self, info: MediaInfo) {
        self.source_mediainfo = Some(info);
    }

    /// The channel count this stage consumes.
    pub fn input_channels(&self) -> Option<u16> {
        self.input_channels
    }

    /// The sample rate this stage consumes.
    pub fn input_samplerate(&self) -> Option<u32> {
        self.input_samplerate
    }

    /// The block size this stage consumes.
    pub fn input_blocksize(&self) -> Option<usize> {
        self.input_blocksize
    }

    /// The hop between consecutive consumed windows.
    pub fn input_stepsize(&self) -> Option<usize> {
        self.input_stepsize
    }

    /// Pin the consumed channel count before setup resolves it.
    pub fn set_input_channels(&mut self, channels: u16) {
        self.input_channels = Some(channels);
    }

    /// Pin the consumed sample rate before setup resolves it.
    pub fn set_input_samplerate(&mut self, samplerate: u32) {
        self.input_samplerate = Some(samplerate);
    }

    /// Pin the consumed block size before setup resolves it.
    pub fn set_input_blocksize(&mut self, blocksize: usize) {
        self.input_blocksize = Some(blocksize);
    }

    /// Pin the consumed window hop before setup resolves it.
    pub fn set_input_stepsize(&mut self, stepsize: usize) {
        self.input_stepsize = Some(stepsize);
    }

    /// Instance identity, stable for this state's lifetime.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self::new()
    }
}

/// The contract every pipeline stage implements.
///
/// Implementations embed a [`ProcessorState`] and expose it through
/// [`state`](Processor::state)/[`state_mut`](Processor::state_mut); the
/// trait's default methods supply the shared lifecycle behavior on top of
/// it. Only the two accessors, [`id`](Processor::id) and
/// [`capability`](Processor::capability) are mandatory.
pub trait Processor: Send {
    /// Stable identifier, constant per concrete type.
    ///
    /// Must match `^[a-z][_a-z0-9]*$`; enforced when the type is
    /// registered. By convention each concrete type also exposes it as an
    /// associated `ID` constant.
    fn id(&self) -> &'static str;

    /// The role this type fulfills.
    fn capability(&self) -> Capability;

    /// Shared per-instance bookkeeping.
    fn state(&self) -> &ProcessorState;

    /// Mutable access to the shared bookkeeping.
    fn state_mut(&mut self) -> &mut ProcessorState;

    /// Configure this stage as the pipe's source.
    ///
    /// Only source-capable stages (decoders) override this; the default
    /// refuses. Unset request fields fall back to the media's native
    /// values. Re-opening rewinds the stage to the start of its media.
    fn open(&mut self, request: &SourceRequest) -> Result<()> {
        let _ = request;
        Err(Error::unsupported_operation(
            self.id(),
            "only source stages accept open()",
        ))
    }

    /// Configure this stage from the format of the stage before it.
    ///
    /// The default records the format and resolves the `input_*` values
    /// (see [`ProcessorState::record_source`]). Overrides should call it
    /// before doing their own work.
    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.state_mut().record_source(upstream);
        Ok(())
    }

    /// Channel count this stage emits. Defaults to the recorded upstream
    /// value; format-changing stages override.
    fn channels(&self) -> u16 {
        self.state().source_spec().channels
    }

    /// Sample rate this stage emits.
    fn samplerate(&self) -> u32 {
        self.state().source_spec().samplerate
    }

    /// Nominal block size this stage emits.
    fn blocksize(&self) -> usize {
        self.state().source_spec().blocksize
    }

    /// Total frames this stage will emit over the run.
    fn totalframes(&self) -> u64 {
        self.state().source_spec().totalframes
    }

    /// Transform one block. The default is identity.
    ///
    /// `eod` is `true` exactly on the final block of a run; stages that
    /// buffer internally flush on it. Sources are driven with an empty
    /// input block and must refuse non-empty input with
    /// [`Error::UnsupportedOperation`].
    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        Ok((frames, eod))
    }

    /// Called exactly once per run after the final `process` call on
    /// every stage, before `release`. Analyzers finalize aggregates here.
    fn post_process(&mut self) -> Result<()> {
        Ok(())
    }

    /// Free external resources (files, handles).
    ///
    /// Called exactly once per run after `post_process`, and on abort
    /// paths; must be safe even if setup never completed.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    /// Media metadata describing what is flowing through this stage.
    ///
    /// Defaults to whatever the engine captured from the pipe's original
    /// source; decoders override with their own.
    fn mediainfo(&self) -> Option<MediaInfo> {
        self.state().source_mediainfo().cloned()
    }

    /// Engine hook: store the original source's media metadata.
    fn set_source_mediainfo(&mut self, info: MediaInfo) {
        self.state_mut().set_source_mediainfo(info);
    }

    /// The finished result, for analyzers. The engine collects this into
    /// the pipe's result container after `post_process`.
    fn result(&self) -> Option<AnalyzerResult> {
        None
    }

    /// Stages that must appear earlier in any pipe containing this one.
    ///
    /// The pipe algebra inserts them (recursively) before this stage.
    fn parents(&self) -> Vec<SharedProcessor> {
        Vec::new()
    }

    /// Instance identity, assigned at construction.
    fn uuid(&self) -> Uuid {
        self.state().uuid()
    }
}

impl fmt::Debug for dyn Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("id", &self.id())
            .field("uuid", &self.uuid())
            .finish_non_exhaustive()
    }
}

/// Source-capable stages: produce frames from media.
pub trait Decoder: Processor {
    /// Container/stream format identifier, for diagnostics.
    fn format(&self) -> &'static str;
}

/// Frame-transforming stages.
pub trait Effect: Processor {}

/// Observing stages that produce an [`AnalyzerResult`].
pub trait Analyzer: Processor {
    /// Human-readable result name.
    fn name(&self) -> &'static str;

    /// Unit of the result values.
    fn unit(&self) -> &'static str;
}

/// Stages that write frames into an output artifact.
pub trait Encoder: Processor {
    /// File extension of the produced artifact, without the dot.
    fn file_extension(&self) -> &'static str;

    /// MIME type of the produced artifact.
    fn mime_type(&self) -> &'static str;
}

/// Stages that render a visual artifact from the stream.
pub trait Grapher: Processor {
    /// Render the accumulated data as a standalone SVG document.
    fn render(&self) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough {
        state: ProcessorState,
    }

    impl Passthrough {
        fn new() -> Self {
            Self {
                state: ProcessorState::new(),
            }
        }
    }

    impl Processor for Passthrough {
        fn id(&self) -> &'static str {
            "passthrough"
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
    }

    fn spec() -> StreamSpec {
        StreamSpec {
            channels: 2,
            samplerate: 44100,
            blocksize: 512,
            totalframes: 44100,
        }
    }

    #[test]
    fn setup_records_source_format() {
        let mut stage = Passthrough::new();
        stage.setup(spec()).unwrap();
        assert_eq!(stage.channels(), 2);
        assert_eq!(stage.samplerate(), 44100);
        assert_eq!(stage.blocksize(), 512);
        assert_eq!(stage.totalframes(), 44100);
    }

    #[test]
    fn input_stepsize_defaults_to_source_blocksize() {
        let mut state = ProcessorState::new();
        state.record_source(spec());
        assert_eq!(state.input_stepsize(), Some(512));
        assert_eq!(state.input_blocksize(), Some(512));
    }

    #[test]
    fn preset_input_values_survive_setup() {
        let mut state = ProcessorState::new();
        state.set_input_blocksize(1024);
        state.set_input_stepsize(256);
        state.record_source(spec());
        assert_eq!(state.input_blocksize(), Some(1024));
        assert_eq!(state.input_stepsize(), Some(256));
        assert_eq!(state.input_channels(), Some(2));
    }

    #[test]
    fn second_setup_overwrites_source_but_not_input() {
        let mut state = ProcessorState::new();
        state.record_source(spec());
        state.record_source(StreamSpec {
            channels: 1,
            samplerate: 8000,
            blocksize: 64,
            totalframes: 100,
        });
        assert_eq!(state.source_spec().channels, 1);
        // resolved on the first call, kept on the second
        assert_eq!(state.input_channels(), Some(2));
        assert_eq!(state.input_blocksize(), Some(512));
    }

    #[test]
    fn process_defaults_to_identity() {
        let mut stage = Passthrough::new();
        stage.setup(spec()).unwrap();
        let block = FrameBlock::from_mono(vec![1.0, 2.0]);
        let (out, eod) = stage.process(block.clone(), true).unwrap();
        assert_eq!(out, block);
        assert!(eod);
    }

    #[test]
    fn open_is_refused_by_non_sources() {
        let mut stage = Passthrough::new();
        let err = stage.open(&SourceRequest::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn mediainfo_defaults_to_captured_source_metadata() {
        let mut stage = Passthrough::new();
        assert!(stage.mediainfo().is_none());
        let info = MediaInfo {
            uri: "array://4x1".into(),
            duration: 0.5,
            start: 0.0,
            is_segment: false,
            samplerate: 8,
        };
        stage.set_source_mediainfo(info.clone());
        assert_eq!(stage.mediainfo(), Some(info));
    }

    #[test]
    fn uuids_are_unique_per_instance_and_stable() {
        let a = Passthrough::new();
        let b = Passthrough::new();
        assert_ne!(a.uuid(), b.uuid());
        assert_eq!(a.uuid(), a.uuid());
    }

    #[test]
    #[should_panic(expected = "queried before setup")]
    fn format_queries_before_setup_panic() {
        let stage = Passthrough::new();
        let _ = stage.channels();
    }

    #[test]
    fn value_analyzer_is_an_analyzer() {
        assert!(Capability::ValueAnalyzer.is_a(Capability::Analyzer));
        assert!(Capability::ValueAnalyzer.is_a(Capability::ValueAnalyzer));
        assert!(!Capability::Analyzer.is_a(Capability::ValueAnalyzer));
        assert!(!Capability::Decoder.is_a(Capability::Effect));
    }
}
