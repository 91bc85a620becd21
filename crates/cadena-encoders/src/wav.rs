//! WAV file sink stage.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use cadena_core::{
    Capability, Encoder, Error, FrameBlock, Processor, ProcessorState, Result, StreamSpec,
};
use hound::{SampleFormat, WavWriter};

/// Streams frames into a WAV file.
///
/// The writer is created at setup from the format cascaded down the pipe,
/// so the file always matches whatever channel count and sample rate the
/// stages upstream produce. Samples are written as 16-bit PCM with
/// clamping by default; [`with_float_output`](Self::with_float_output)
/// switches to 32-bit IEEE float. The file is finalized on the stream's
/// end-of-data block, or at release when a run is cut short.
pub struct WavEncoder {
    path: PathBuf,
    float: bool,
    writer: Option<WavWriter<BufWriter<File>>>,
    state: ProcessorState,
}

impl WavEncoder {
    /// Registry id of this type.
    pub const ID: &'static str = "wav_enc";

    /// Encode 16-bit PCM to the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            float: false,
            writer: None,
            state: ProcessorState::new(),
        }
    }

    /// Write 32-bit IEEE float samples instead of 16-bit PCM.
    pub fn with_float_output(mut self) -> Self {
        self.float = true;
        self
    }

    /// The file this encoder writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|err| Error::stage(Self::ID, err))?;
        }
        Ok(())
    }
}

impl Processor for WavEncoder {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Encoder
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.state.record_source(upstream);
        let spec = hound::WavSpec {
            channels: upstream.channels,
            sample_rate: upstream.samplerate,
            bits_per_sample: if self.float { 32 } else { 16 },
            sample_format: if self.float {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        };
        self.writer =
            Some(WavWriter::create(&self.path, spec).map_err(|err| Error::stage(Self::ID, err))?);
        tracing::debug!(
            "wav_create: {} ({}ch {}Hz, {})",
            self.path.display(),
            spec.channels,
            spec.sample_rate,
            if self.float { "float" } else { "16-bit pcm" }
        );
        Ok(())
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::unsupported_operation(
                Self::ID,
                "setup() the stage before streaming",
            ));
        };
        if self.float {
            for &sample in frames.samples() {
                writer
                    .write_sample(sample)
                    .map_err(|err| Error::stage(Self::ID, err))?;
            }
        } else {
            let max_val = (1i32 << 15) as f32;
            for &sample in frames.samples() {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer
                    .write_sample(int_sample)
                    .map_err(|err| Error::stage(Self::ID, err))?;
            }
        }
        if eod {
            self.finish()?;
        }
        Ok((frames, eod))
    }

    fn release(&mut self) -> Result<()> {
        self.finish()
    }
}

impl Encoder for WavEncoder {
    fn file_extension(&self) -> &'static str {
        "wav"
    }

    fn mime_type(&self) -> &'static str {
        "audio/x-wav"
    }
}

cadena_core::pipeable!(WavEncoder);
