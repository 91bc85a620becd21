//! Cadena Effects - frame-transforming pipeline stages
//!
//! This crate provides effects built on cadena-core:
//!
//! - [`Gain`] - Constant level scaling, linear or dB
//! - [`Fade`] - Linear fade-in/fade-out placed against the stream length
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadena_decoders::WavDecoder;
//! use cadena_effects::{Fade, Gain};
//! use cadena_encoders::WavEncoder;
//!
//! let mut pipe = WavDecoder::new("in.wav")
//!     | Gain::from_db(-6.0)
//!     | Fade::new(4410, 4410)
//!     | WavEncoder::new("out.wav");
//! pipe.run()?;
//! ```

pub mod fade;
pub mod gain;

// Re-export main types at crate root
pub use fade::Fade;
pub use gain::Gain;

use cadena_core::{Capability, ProcessorDescriptor, RegistryEntry, Result, registry, shared};

/// Register this crate's processors with the process-wide registry.
///
/// Both effects have usable defaults, so they carry factories and can be
/// built from presets by id. Safe to call more than once.
pub fn register() -> Result<()> {
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: Gain::ID,
            type_name: "Gain",
            capability: Capability::Effect,
            description: "Scales every sample by a constant factor",
        },
        factory: Some(|| shared(Gain::default())),
    })?;
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: Fade::ID,
            type_name: "Fade",
            capability: Capability::Effect,
            description: "Linear fade-in and fade-out at the stream edges",
        },
        factory: Some(|| shared(Fade::default())),
    })?;
    Ok(())
}
