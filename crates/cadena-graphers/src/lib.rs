//! Cadena Graphers - visual rendering pipeline stages
//!
//! This crate provides graphers built on cadena-core:
//!
//! - [`Waveform`] - Per-bucket min/max peaks rendered as a standalone SVG
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::{Arc, Mutex};
//!
//! use cadena_decoders::WavDecoder;
//! use cadena_graphers::Waveform;
//!
//! let wave = Arc::new(Mutex::new(Waveform::new(800)));
//! let mut pipe = WavDecoder::new("in.wav") | wave.clone();
//! pipe.run()?;
//! let svg = wave.lock().unwrap().render()?;
//! ```

pub mod waveform;

// Re-export main types at crate root
pub use waveform::Waveform;

use cadena_core::{Capability, ProcessorDescriptor, RegistryEntry, Result, registry, shared};

/// Register this crate's processors with the process-wide registry.
///
/// Safe to call more than once.
pub fn register() -> Result<()> {
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: Waveform::ID,
            type_name: "Waveform",
            capability: Capability::Grapher,
            description: "Renders per-bucket min/max peaks as an SVG waveform",
        },
        factory: Some(|| shared(Waveform::default())),
    })?;
    Ok(())
}
