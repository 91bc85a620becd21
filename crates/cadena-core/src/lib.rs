//! Cadena Core - processor contract and streaming pipeline engine
//!
//! This crate provides the component model every cadena stage implements
//! and the engine that drives chains of them over streaming audio.
//!
//! # Core Abstractions
//!
//! ## Processor Lifecycle
//!
//! - [`Processor`] - Object-safe lifecycle trait every stage implements
//! - [`ProcessorState`] - Embedded bookkeeping (formats, metadata, identity)
//! - [`Decoder`], [`Effect`], [`Analyzer`], [`Encoder`], [`Grapher`] - Capability traits per role
//! - [`Capability`] - Runtime capability tags with specialization (`value_analyzer` ⊂ `analyzer`)
//!
//! ## Pipes
//!
//! - [`ProcessPipe`] - Ordered stage sequence built with the `|` operator
//! - [`pipeable!`] - Opts a concrete stage type into the `|` algebra
//! - [`RunOptions`] - Per-run source format request and stack mode
//!
//! ## Registry
//!
//! - [`registry`] - Process-wide id-to-type table with validation and
//!   capability queries
//! - [`RegistryEntry`] / [`ProcessorDescriptor`] - What a startup routine registers
//!
//! ## Buffering
//!
//! - [`FixedSizeInputAdapter`] - Re-chunks arbitrary blocks into fixed-size
//!   windows, with optional zero padding and a zero-copy fast path
//!
//! ## Frames & Results
//!
//! - [`FrameBlock`] / [`FrameView`] - Owned and borrowed interleaved sample blocks
//! - [`ResultContainer`], [`AnalyzerResult`], [`AnalyzerValue`] - Analyzer outputs
//!
//! # Example
//!
//! ```rust,ignore
//! use cadena_decoders::WavDecoder;
//! use cadena_analyzers::{MaxLevel, RmsLevel};
//!
//! let mut pipe = WavDecoder::new("input.wav") | MaxLevel::new() | RmsLevel::new();
//! pipe.run()?;
//! println!("{}", pipe.results().to_json()?);
//! ```
//!
//! # Design Principles
//!
//! - **Single-threaded engine**: one run is a sequential pull-transform-push loop
//! - **Format cascade**: each stage is configured with the format of the stage
//!   directly before it, so format-changing stages compose
//! - **Deterministic cleanup**: every stage is released exactly once per run,
//!   success or failure

pub mod adapter;
pub mod array;
pub mod error;
pub mod frame;
pub mod pipe;
pub mod processor;
pub mod registry;
pub mod result;

// Re-export main types at crate root
pub use adapter::{Blocks, FixedSizeInputAdapter};
pub use array::ArrayDecoder;
pub use error::{Error, Result};
pub use frame::{FrameBlock, FrameView};
pub use pipe::{IntoPipeElement, ProcessPipe, RunOptions};
pub use processor::{
    Analyzer, Capability, Decoder, Effect, Encoder, Grapher, MediaInfo, Processor, ProcessorState,
    SharedProcessor, SourceRequest, StreamSpec, shared,
};
pub use registry::{ProcessorDescriptor, ProcessorFactory, RegistryEntry, register_builtins};
pub use result::{AnalyzerResult, AnalyzerValue, ResultContainer};
