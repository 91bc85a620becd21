//! Decoder stages for cadena pipelines.
//!
//! This crate provides the sources that head a pipe:
//!
//! - [`WavDecoder`]: streams a WAV file from disk block by block,
//!   normalizing integer samples to `f32`
//! - [`ArrayDecoder`] (re-exported from `cadena-core`): sources an
//!   in-memory sample array
//!
//! Both support selecting a `start`/`duration` segment of the media and
//! honor the block size requested for a run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadena_decoders::WavDecoder;
//! use cadena_analyzers::MaxLevel;
//!
//! let decoder = WavDecoder::new("input.wav").with_segment(1.0, Some(4.0));
//! let mut pipe = decoder | MaxLevel::new();
//! pipe.run()?;
//! ```

mod wav;

pub use cadena_core::ArrayDecoder;
pub use wav::WavDecoder;

use cadena_core::{Capability, ProcessorDescriptor, RegistryEntry, Result, registry};

/// Register this crate's decoder types in the process-wide registry.
///
/// Decoders need constructor arguments (a path, an array), so they are
/// registered for discovery without a factory; build them directly and
/// compose with `|`. Safe to call more than once.
pub fn register() -> Result<()> {
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: WavDecoder::ID,
            type_name: "WavDecoder",
            capability: Capability::Decoder,
            description: "Streams frames from a WAV file, with optional segment selection",
        },
        factory: None,
    })
}
