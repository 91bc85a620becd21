//! Cadena Encoders - file-writing sink stages
//!
//! This crate provides encoders built on cadena-core:
//!
//! - [`WavEncoder`] - Streams frames into a WAV file, 16-bit PCM or
//!   32-bit float
//!
//! Encoders pass their input through unchanged, so they can sit anywhere
//! downstream and coexist with analyzers in one pipe.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadena_decoders::WavDecoder;
//! use cadena_effects::Gain;
//! use cadena_encoders::WavEncoder;
//!
//! let mut pipe = WavDecoder::new("in.wav")
//!     | Gain::from_db(-3.0)
//!     | WavEncoder::new("out.wav");
//! pipe.run()?;
//! ```

pub mod wav;

// Re-export main types at crate root
pub use wav::WavEncoder;

use cadena_core::{Capability, ProcessorDescriptor, RegistryEntry, Result, registry};

/// Register this crate's processors with the process-wide registry.
///
/// Encoders need a target path, so they are registered for discovery
/// without a factory; build them directly and compose with `|`. Safe to
/// call more than once.
pub fn register() -> Result<()> {
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: WavEncoder::ID,
            type_name: "WavEncoder",
            capability: Capability::Encoder,
            description: "Writes the stream to a WAV file, 16-bit PCM or 32-bit float",
        },
        factory: None,
    })
}
