//! Pipe composition and the streaming execution engine.
//!
//! A [`ProcessPipe`] is an ordered sequence of stages headed by a source.
//! Pipes are built with the `|` operator (see [`pipeable!`](crate::pipeable))
//! or assembled from registered ids with [`ProcessPipe::from_description`];
//! either way a stage's declared [`parents`](crate::processor::Processor::parents)
//! are inserted ahead of it and repeated instances collapse to one.
//!
//! [`ProcessPipe::run`] drives a full pass: the source is opened with the
//! caller's format request, configuration cascades downstream with each
//! stage seeing the format of the stage immediately before it, then frames
//! stream source-to-tail until end-of-data. Afterwards analyzer results
//! land in the pipe's [`ResultContainer`] and every stage except the
//! source is released and dropped from the sequence, so the same pipe can
//! be rebuilt and run again. With [`RunOptions::stack`] the source's
//! output is additionally frozen into an in-memory buffer that replaces
//! the source, making later runs independent of the original media.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::array::ArrayDecoder;
use crate::error::{Error, Result};
use crate::frame::FrameBlock;
use crate::processor::{shared, Processor, SharedProcessor, SourceRequest, StreamSpec};
use crate::registry;
use crate::result::ResultContainer;

/// Options for one [`ProcessPipe::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Format request forwarded to the source stage's `open`.
    pub request: SourceRequest,
    /// Freeze the source's output into an in-memory buffer after the run,
    /// replacing the source for subsequent runs.
    pub stack: bool,
}

/// An ordered sequence of processors plus the results they produce.
pub struct ProcessPipe {
    processors: Vec<SharedProcessor>,
    results: ResultContainer,
}

impl ProcessPipe {
    /// An empty pipe with a fresh result container.
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
            results: ResultContainer::new(),
        }
    }

    /// Assemble a pipe from a textual chain of registered ids, for
    /// example `"gain | rms_level"`.
    ///
    /// Elements are separated by `|`; each must be a well-formed id
    /// ([`Error::UnsupportedPipeElement`] otherwise) naming a registered,
    /// factory-constructible type.
    pub fn from_description(description: &str) -> Result<Self> {
        let mut pipe = Self::new();
        for token in description.split('|') {
            let token = token.trim();
            if token.is_empty() || !registry::is_valid_id(token) {
                return Err(Error::unsupported_element(format!("'{token}'")));
            }
            pipe.append(registry::create(token)?);
        }
        Ok(pipe)
    }

    /// Append a stage, inserting its declared parents first.
    ///
    /// Parents are expanded recursively so dependencies always precede
    /// dependents; an instance already in the pipe is not added twice.
    /// Cyclic parent declarations are not supported.
    pub fn append(&mut self, processor: SharedProcessor) {
        if self.contains(&processor) {
            return;
        }
        let parents = lock(&processor).parents();
        for parent in parents {
            self.append(parent);
        }
        if !self.contains(&processor) {
            self.processors.push(processor);
        }
    }

    /// Whether this exact instance is already in the pipe.
    pub fn contains(&self, processor: &SharedProcessor) -> bool {
        self.processors.iter().any(|p| Arc::ptr_eq(p, processor))
    }

    /// The stages, in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, SharedProcessor> {
        self.processors.iter()
    }

    /// Number of stages currently in the pipe.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether the pipe has no stages.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Results accumulated by analyzer stages across runs of this pipe.
    pub fn results(&self) -> &ResultContainer {
        &self.results
    }

    /// Execute one full pass with default options.
    ///
    /// Equivalent to [`run_with`](Self::run_with) with
    /// [`RunOptions::default()`]: the source keeps its native format and
    /// no stack buffer is kept.
    pub fn run(&mut self) -> Result<()> {
        self.run_with(RunOptions::default())
    }

    /// Execute one full pass over the source's frames.
    ///
    /// Follows the lifecycle described in the [module docs](self): open
    /// the source, cascade setup, stream until end-of-data, post-process,
    /// then release every stage but the source and drop it from the pipe.
    /// On failure all stages including the source are released exactly
    /// once and the error is returned; the stage sequence is left intact
    /// so the caller can inspect it.
    pub fn run_with(&mut self, options: RunOptions) -> Result<()> {
        let Some(first) = self.processors.first() else {
            return Err(Error::EmptyPipe);
        };
        let source = Arc::clone(first);
        let stages: Vec<SharedProcessor> = self.processors[1..].to_vec();
        #[cfg(feature = "tracing")]
        tracing::debug!("pipe_run: [{}] stack={}", self, options.stack);

        match self.drive(&source, &stages, options) {
            Ok(replacement) => {
                let released = release_all(&stages);
                self.processors.drain(1..);
                if let Some(frozen) = replacement {
                    self.processors[0] = frozen;
                }
                released
            }
            Err(err) => {
                let _ = release_all(&stages);
                let _ = lock(&source).release();
                Err(err)
            }
        }
    }

    fn drive(
        &mut self,
        source: &SharedProcessor,
        stages: &[SharedProcessor],
        options: RunOptions,
    ) -> Result<Option<SharedProcessor>> {
        let (source_spec, source_info) = {
            let mut src = lock(source);
            src.open(&options.request)?;
            (output_spec(&*src), src.mediainfo())
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "pipe_open: {}ch {}Hz, blocks of {}, {} frames total",
            source_spec.channels,
            source_spec.samplerate,
            source_spec.blocksize,
            source_spec.totalframes
        );

        // Every stage hears about the original source's media, but is
        // configured with the format of the stage directly before it.
        let mut upstream = source_spec;
        for stage in stages {
            let mut s = lock(stage);
            if let Some(info) = &source_info {
                s.set_source_mediainfo(info.clone());
            }
            s.setup(upstream)?;
            upstream = output_spec(&*s);
            #[cfg(feature = "tracing")]
            tracing::trace!(
                "pipe_setup: {} emits {}ch {}Hz",
                s.id(),
                upstream.channels,
                upstream.samplerate
            );
        }

        let mut stacked: Vec<FrameBlock> = Vec::new();
        loop {
            let (mut frames, mut eod) = lock(source).process(FrameBlock::empty(), false)?;
            if options.stack {
                stacked.push(frames.clone());
            }
            for stage in stages {
                let (next, next_eod) = lock(stage).process(frames, eod)?;
                frames = next;
                eod = next_eod;
            }
            if eod {
                break;
            }
        }

        for stage in stages {
            let mut s = lock(stage);
            s.post_process()?;
            if let Some(result) = s.result() {
                self.results.insert(result);
            }
        }

        if !options.stack {
            return Ok(None);
        }
        let mut buffer = match stacked.len() {
            1 => stacked.swap_remove(0),
            _ => FrameBlock::concat(&stacked),
        };
        if buffer.is_empty() {
            buffer = FrameBlock::new(usize::from(source_spec.channels));
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("pipe_stack: froze {} frames into an in-memory source", buffer.len());
        let mut frozen = ArrayDecoder::new(buffer, source_spec.samplerate);
        frozen.open(&SourceRequest {
            channels: Some(source_spec.channels),
            samplerate: Some(source_spec.samplerate),
            blocksize: Some(source_spec.blocksize),
        })?;
        Ok(Some(shared(frozen)))
    }
}

impl Default for ProcessPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for processor in &self.processors {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(lock(processor).id())?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessPipe")
            .field("processors", &format_args!("{self}"))
            .field("results", &self.results.len())
            .finish()
    }
}

impl Extend<SharedProcessor> for ProcessPipe {
    fn extend<I: IntoIterator<Item = SharedProcessor>>(&mut self, iter: I) {
        for processor in iter {
            self.append(processor);
        }
    }
}

impl FromIterator<SharedProcessor> for ProcessPipe {
    fn from_iter<I: IntoIterator<Item = SharedProcessor>>(iter: I) -> Self {
        let mut pipe = Self::new();
        pipe.extend(iter);
        pipe
    }
}

impl<'a> IntoIterator for &'a ProcessPipe {
    type Item = &'a SharedProcessor;
    type IntoIter = std::slice::Iter<'a, SharedProcessor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Values accepted on the right-hand side of the `|` operator.
pub trait IntoPipeElement {
    /// Add this value's stages to the pipe.
    fn extend_pipe(self, pipe: &mut ProcessPipe);
}

impl IntoPipeElement for SharedProcessor {
    fn extend_pipe(self, pipe: &mut ProcessPipe) {
        pipe.append(self);
    }
}

// Does not overlap with the impl above: `dyn Processor` is unsized and
// `P` here is implicitly `Sized`.
impl<P: Processor + 'static> IntoPipeElement for Arc<Mutex<P>> {
    fn extend_pipe(self, pipe: &mut ProcessPipe) {
        pipe.append(self);
    }
}

impl IntoPipeElement for ProcessPipe {
    fn extend_pipe(self, pipe: &mut ProcessPipe) {
        for processor in self.processors {
            pipe.append(processor);
        }
    }
}

impl<T: IntoPipeElement> IntoPipeElement for Vec<T> {
    fn extend_pipe(self, pipe: &mut ProcessPipe) {
        for element in self {
            element.extend_pipe(pipe);
        }
    }
}

impl<Rhs: IntoPipeElement> BitOr<Rhs> for ProcessPipe {
    type Output = ProcessPipe;

    fn bitor(mut self, rhs: Rhs) -> ProcessPipe {
        rhs.extend_pipe(&mut self);
        self
    }
}

impl<Rhs: IntoPipeElement> BitOrAssign<Rhs> for ProcessPipe {
    fn bitor_assign(&mut self, rhs: Rhs) {
        rhs.extend_pipe(self);
    }
}

/// Give concrete processor types the `|` composition operator.
///
/// Coherence rules rule out a single blanket operator impl over every
/// [`Processor`] type, so each concrete stage type opts in:
///
/// ```
/// use cadena_core::{Capability, Processor, ProcessorState};
///
/// struct MyStage {
///     state: ProcessorState,
/// }
///
/// impl Processor for MyStage {
///     fn id(&self) -> &'static str {
///         "my_stage"
///     }
///     fn capability(&self) -> Capability {
///         Capability::Effect
///     }
///     fn state(&self) -> &ProcessorState {
///         &self.state
///     }
///     fn state_mut(&mut self) -> &mut ProcessorState {
///         &mut self.state
///     }
/// }
///
/// cadena_core::pipeable!(MyStage);
/// ```
#[macro_export]
macro_rules! pipeable {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::pipe::IntoPipeElement for $ty {
            fn extend_pipe(self, pipe: &mut $crate::pipe::ProcessPipe) {
                pipe.append($crate::processor::shared(self));
            }
        }

        impl<Rhs: $crate::pipe::IntoPipeElement> ::std::ops::BitOr<Rhs> for $ty {
            type Output = $crate::pipe::ProcessPipe;

            fn bitor(self, rhs: Rhs) -> $crate::pipe::ProcessPipe {
                let mut pipe = $crate::pipe::ProcessPipe::new();
                pipe.append($crate::processor::shared(self));
                rhs.extend_pipe(&mut pipe);
                pipe
            }
        }
    )+};
}

fn lock(processor: &SharedProcessor) -> MutexGuard<'_, dyn Processor + 'static> {
    processor.lock().expect("processor mutex poisoned")
}

fn output_spec(processor: &dyn Processor) -> StreamSpec {
    StreamSpec {
        channels: processor.channels(),
        samplerate: processor.samplerate(),
        blocksize: processor.blocksize(),
        totalframes: processor.totalframes(),
    }
}

fn release_all(stages: &[SharedProcessor]) -> Result<()> {
    let mut first_err = None;
    for stage in stages {
        if let Err(err) = lock(stage).release() {
            first_err.get_or_insert(err);
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
