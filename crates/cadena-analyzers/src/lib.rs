//! Cadena Analyzers - stream measurement stages
//!
//! This crate provides analyzers built on cadena-core. All of them pass
//! frames through unchanged and deposit an
//! [`AnalyzerResult`](cadena_core::AnalyzerResult) into the pipe's result
//! container after the run:
//!
//! - [`MaxLevel`] - True signed maximum sample value
//! - [`RmsLevel`] - Whole-stream RMS level in dB
//! - [`DcOffset`] - Mean sample value
//! - [`RmsEnvelope`] - Per-window RMS level series in dB
//! - [`SpectralCentroid`] - Mean Hann-windowed FFT centroid in Hz
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadena_analyzers::{MaxLevel, RmsLevel};
//! use cadena_decoders::WavDecoder;
//!
//! let mut pipe = WavDecoder::new("take.wav") | MaxLevel::new() | RmsLevel::new();
//! pipe.run()?;
//! println!("{:?}", pipe.results().get("rms_level"));
//! ```

pub mod envelope;
pub mod level;
pub mod spectral;
pub mod window;

// Re-export main types at crate root
pub use envelope::RmsEnvelope;
pub use level::{DcOffset, MaxLevel, RmsLevel};
pub use spectral::SpectralCentroid;
pub use window::Window;

use cadena_core::{Capability, ProcessorDescriptor, RegistryEntry, Result, registry, shared};

/// Register this crate's processors with the process-wide registry.
///
/// Every analyzer has usable defaults, so each entry carries a factory
/// and can be built from presets by id. Safe to call more than once.
pub fn register() -> Result<()> {
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: MaxLevel::ID,
            type_name: "MaxLevel",
            capability: Capability::ValueAnalyzer,
            description: "True signed maximum sample value",
        },
        factory: Some(|| shared(MaxLevel::new())),
    })?;
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: RmsLevel::ID,
            type_name: "RmsLevel",
            capability: Capability::ValueAnalyzer,
            description: "Whole-stream RMS level in dB",
        },
        factory: Some(|| shared(RmsLevel::new())),
    })?;
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: DcOffset::ID,
            type_name: "DcOffset",
            capability: Capability::ValueAnalyzer,
            description: "Mean sample value of the stream",
        },
        factory: Some(|| shared(DcOffset::new())),
    })?;
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: RmsEnvelope::ID,
            type_name: "RmsEnvelope",
            capability: Capability::Analyzer,
            description: "Per-window RMS level series in dB",
        },
        factory: Some(|| shared(RmsEnvelope::new())),
    })?;
    registry::register(RegistryEntry {
        descriptor: ProcessorDescriptor {
            id: SpectralCentroid::ID,
            type_name: "SpectralCentroid",
            capability: Capability::ValueAnalyzer,
            description: "Mean Hann-windowed spectral centroid in Hz",
        },
        factory: Some(|| shared(SpectralCentroid::new())),
    })?;
    Ok(())
}
