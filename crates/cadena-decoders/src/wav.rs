//! WAV file source stage.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use cadena_core::{
    Capability, Decoder, Error, FrameBlock, MediaInfo, Processor, ProcessorState, Result,
    SourceRequest, StreamSpec,
};
use hound::{SampleFormat, WavReader};

const DEFAULT_BLOCKSIZE: usize = 8192;

/// How decoded frames map onto the requested channel layout.
#[derive(Debug, Clone, Copy)]
enum ChannelMode {
    Native,
    Mono,
    Stereo,
}

#[derive(Debug, Clone, Copy)]
struct Native {
    spec: hound::WavSpec,
    totalframes: u64,
}

/// Streams frames from a WAV file on disk.
///
/// The file is opened when the pipe runs; 16/24/32-bit integer samples
/// are normalized to `f32` in `[-1.0, 1.0)` and IEEE float samples pass
/// through unchanged. Blocks come out at the run's requested block size
/// with the final one flagged end-of-data. The format request may downmix
/// multi-channel media to mono or duplicate mono to stereo; sample rate
/// conversion is not performed.
///
/// # Example
/// ```ignore
/// let decoder = WavDecoder::new("take.wav").with_segment(1.0, Some(4.0));
/// let mut pipe = decoder | MaxLevel::new();
/// pipe.run()?;
/// ```
pub struct WavDecoder {
    path: PathBuf,
    start: f64,
    duration: Option<f64>,
    blocksize: usize,
    mode: ChannelMode,
    reader: Option<WavReader<BufReader<File>>>,
    native: Option<Native>,
    remaining: u64,
    state: ProcessorState,
}

impl WavDecoder {
    /// Registry id of this type.
    pub const ID: &'static str = "wav_dec";

    /// Decode the WAV file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            start: 0.0,
            duration: None,
            blocksize: DEFAULT_BLOCKSIZE,
            mode: ChannelMode::Native,
            reader: None,
            native: None,
            remaining: 0,
            state: ProcessorState::new(),
        }
    }

    /// Restrict decoding to a segment of the media.
    ///
    /// `start` is an offset in seconds; `duration` is a length in seconds,
    /// `None` meaning everything from `start` to the end. Bounds that
    /// overrun the file are clamped.
    pub fn with_segment(mut self, start: f64, duration: Option<f64>) -> Self {
        self.start = start.max(0.0);
        self.duration = duration;
        self
    }

    /// The file this decoder reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn output_channels(&self, native: u16) -> u16 {
        match self.mode {
            ChannelMode::Native => native,
            ChannelMode::Mono => 1,
            ChannelMode::Stereo => 2,
        }
    }

    fn assemble(&self, raw: Vec<f32>, channels: usize) -> FrameBlock {
        match self.mode {
            ChannelMode::Native => FrameBlock::from_interleaved(raw, channels),
            ChannelMode::Mono => FrameBlock::from_mono(
                raw.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                    .collect(),
            ),
            ChannelMode::Stereo => {
                let mut doubled = Vec::with_capacity(raw.len() * 2);
                for sample in raw {
                    doubled.push(sample);
                    doubled.push(sample);
                }
                FrameBlock::from_interleaved(doubled, 2)
            }
        }
    }
}

impl Processor for WavDecoder {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Decoder
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn open(&mut self, request: &SourceRequest) -> Result<()> {
        let mut reader = WavReader::open(&self.path).map_err(|err| Error::stage(Self::ID, err))?;
        let spec = reader.spec();
        if let Some(rate) = request.samplerate {
            if rate != spec.sample_rate {
                return Err(Error::unsupported_operation(
                    Self::ID,
                    format!("cannot resample {}Hz media to {rate}Hz", spec.sample_rate),
                ));
            }
        }
        self.mode = match request.channels {
            None => ChannelMode::Native,
            Some(c) if c == spec.channels => ChannelMode::Native,
            Some(1) => ChannelMode::Mono,
            Some(2) if spec.channels == 1 => ChannelMode::Stereo,
            Some(c) => {
                return Err(Error::unsupported_operation(
                    Self::ID,
                    format!("cannot convert {} channels to {c}", spec.channels),
                ));
            }
        };
        if request.blocksize == Some(0) {
            return Err(Error::unsupported_operation(
                Self::ID,
                "block size must be at least one frame",
            ));
        }
        self.blocksize = request.blocksize.unwrap_or(DEFAULT_BLOCKSIZE);

        let totalframes = u64::from(reader.duration());
        let rate = f64::from(spec.sample_rate);
        let first = ((self.start * rate) as u64).min(totalframes);
        let last = match self.duration {
            Some(secs) => first
                .saturating_add((secs * rate).ceil() as u64)
                .min(totalframes),
            None => totalframes,
        };
        if first > 0 {
            reader
                .seek(first as u32)
                .map_err(|err| Error::stage(Self::ID, err))?;
        }
        self.remaining = last - first;
        self.native = Some(Native { spec, totalframes });
        self.reader = Some(reader);

        tracing::debug!(
            "wav_open: {} ({}ch {}Hz, {} of {} frames)",
            self.path.display(),
            spec.channels,
            spec.sample_rate,
            last - first,
            totalframes
        );

        self.state.record_source(StreamSpec {
            channels: self.output_channels(spec.channels),
            samplerate: spec.sample_rate,
            blocksize: self.blocksize,
            totalframes: last - first,
        });
        Ok(())
    }

    /// Emit the next block of decoded frames.
    ///
    /// The final block carries `eod` even when it is full sized; an empty
    /// file or segment yields one empty block with `eod` set.
    fn process(&mut self, frames: FrameBlock, _eod: bool) -> Result<(FrameBlock, bool)> {
        if !frames.is_empty() {
            return Err(Error::unsupported_operation(
                Self::ID,
                "source stages do not accept input frames",
            ));
        }
        let (Some(native), Some(reader)) = (self.native, self.reader.as_mut()) else {
            return Err(Error::unsupported_operation(
                Self::ID,
                "open() the source before streaming",
            ));
        };

        let channels = usize::from(native.spec.channels);
        let take = self.remaining.min(self.blocksize as u64) as usize;
        let want = take * channels;
        let mut raw = Vec::with_capacity(want);
        match native.spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.samples::<f32>().take(want) {
                    raw.push(sample.map_err(|err| Error::stage(Self::ID, err))?);
                }
            }
            SampleFormat::Int => {
                let scale = (1u32 << (native.spec.bits_per_sample - 1)) as f32;
                for sample in reader.samples::<i32>().take(want) {
                    let value = sample.map_err(|err| Error::stage(Self::ID, err))?;
                    raw.push(value as f32 / scale);
                }
            }
        }
        let got = raw.len() / channels;
        raw.truncate(got * channels);
        self.remaining -= got as u64;
        if got < take {
            // the header promised more frames than the body holds
            self.remaining = 0;
        }
        Ok((self.assemble(raw, channels), self.remaining == 0))
    }

    fn release(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }

    fn mediainfo(&self) -> Option<MediaInfo> {
        let native = self.native?;
        let full = native.totalframes as f64 / f64::from(native.spec.sample_rate);
        Some(MediaInfo {
            uri: self.path.display().to_string(),
            duration: self.duration.unwrap_or_else(|| (full - self.start).max(0.0)),
            start: self.start,
            is_segment: self.start != 0.0 || self.duration.is_some(),
            samplerate: native.spec.sample_rate,
        })
    }
}

impl Decoder for WavDecoder {
    fn format(&self) -> &'static str {
        "wav"
    }
}

cadena_core::pipeable!(WavDecoder);

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_core::AnalyzerResult;
    use tempfile::NamedTempFile;

    fn write_i16(path: &Path, samples: &[i16], channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn write_f32(path: &Path, samples: &[f32], channels: u16, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn drain(dec: &mut WavDecoder) -> Vec<(FrameBlock, bool)> {
        let mut out = Vec::new();
        loop {
            let (block, eod) = dec.process(FrameBlock::empty(), false).unwrap();
            out.push((block, eod));
            if eod {
                break;
            }
        }
        out
    }

    fn flatten(blocks: &[(FrameBlock, bool)]) -> Vec<f32> {
        blocks
            .iter()
            .flat_map(|(b, _)| b.samples().to_vec())
            .collect()
    }

    #[test]
    fn decodes_16_bit_pcm_to_normalized_f32() {
        let file = NamedTempFile::new().unwrap();
        write_i16(file.path(), &[0, 16384, -16384, 24576], 1, 44100);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(dec.totalframes(), 4);

        let blocks = drain(&mut dec);
        assert_eq!(flatten(&blocks), vec![0.0, 0.5, -0.5, 0.75]);
        assert!(blocks.last().unwrap().1);
    }

    #[test]
    fn decodes_float_samples_unchanged() {
        let file = NamedTempFile::new().unwrap();
        let samples = [0.1f32, -0.9, 0.5];
        write_f32(file.path(), &samples, 1, 48000);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(flatten(&drain(&mut dec)), samples.to_vec());
    }

    #[test]
    fn blocksize_request_shapes_the_blocks() {
        let file = NamedTempFile::new().unwrap();
        let ramp: Vec<f32> = (0..10).map(|i| i as f32 / 16.0).collect();
        write_f32(file.path(), &ramp, 1, 8000);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest {
            blocksize: Some(4),
            ..SourceRequest::default()
        })
        .unwrap();

        let blocks = drain(&mut dec);
        let lens: Vec<usize> = blocks.iter().map(|(b, _)| b.len()).collect();
        let eods: Vec<bool> = blocks.iter().map(|(_, e)| *e).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(eods, vec![false, false, true]);
        assert_eq!(flatten(&blocks), ramp);
    }

    #[test]
    fn segment_selects_a_time_range() {
        let file = NamedTempFile::new().unwrap();
        let ramp: Vec<f32> = (0..8000).map(|i| i as f32 / 8192.0).collect();
        write_f32(file.path(), &ramp, 1, 8000);

        let mut dec = WavDecoder::new(file.path()).with_segment(0.25, Some(0.5));
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(dec.totalframes(), 4000);

        let samples = flatten(&drain(&mut dec));
        assert_eq!(samples.len(), 4000);
        assert_eq!(samples.first(), Some(&(2000.0 / 8192.0)));
        assert_eq!(samples.last(), Some(&(5999.0 / 8192.0)));

        let info = dec.mediainfo().unwrap();
        assert!(info.is_segment);
        assert_eq!(info.start, 0.25);
        assert_eq!(info.duration, 0.5);
    }

    #[test]
    fn segment_bounds_are_clamped_to_the_file() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &vec![0.25f32; 8000], 1, 8000);

        let mut dec = WavDecoder::new(file.path()).with_segment(0.75, Some(1.0));
        dec.open(&SourceRequest::default()).unwrap();
        assert_eq!(dec.totalframes(), 2000);
        assert_eq!(flatten(&drain(&mut dec)).len(), 2000);
    }

    #[test]
    fn downmix_request_averages_channels() {
        let file = NamedTempFile::new().unwrap();
        // six frames of L=0.25, R=0.75
        let interleaved: Vec<i16> = [8192i16, 24576].repeat(6);
        write_i16(file.path(), &interleaved, 2, 44100);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest {
            channels: Some(1),
            ..SourceRequest::default()
        })
        .unwrap();
        assert_eq!(dec.channels(), 1);

        let blocks = drain(&mut dec);
        assert_eq!(blocks[0].0.channels(), 1);
        assert_eq!(flatten(&blocks), vec![0.5; 6]);
    }

    #[test]
    fn mono_duplicates_to_stereo_on_request() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.1f32, 0.2], 1, 44100);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest {
            channels: Some(2),
            ..SourceRequest::default()
        })
        .unwrap();
        assert_eq!(dec.channels(), 2);

        let blocks = drain(&mut dec);
        assert_eq!(blocks[0].0.channels(), 2);
        assert_eq!(flatten(&blocks), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn resampling_requests_are_refused() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.0f32; 8], 1, 44100);

        let mut dec = WavDecoder::new(file.path());
        let err = dec
            .open(&SourceRequest {
                samplerate: Some(22050),
                ..SourceRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));

        // matching the native rate is not a conversion
        dec.open(&SourceRequest {
            samplerate: Some(44100),
            ..SourceRequest::default()
        })
        .unwrap();
    }

    #[test]
    fn unsupported_channel_conversions_are_refused() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.0f32; 8], 2, 44100);

        let mut dec = WavDecoder::new(file.path());
        let err = dec
            .open(&SourceRequest {
                channels: Some(3),
                ..SourceRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn zero_blocksize_requests_are_refused() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.0f32; 8], 1, 44100);

        let mut dec = WavDecoder::new(file.path());
        let err = dec
            .open(&SourceRequest {
                blocksize: Some(0),
                ..SourceRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn missing_file_fails_at_open() {
        let mut dec = WavDecoder::new("/definitely/not/here.wav");
        let err = dec.open(&SourceRequest::default()).unwrap_err();
        assert!(matches!(err, Error::Stage { .. }));
    }

    #[test]
    fn mediainfo_reports_the_native_media() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &vec![0.0f32; 4000], 1, 8000);

        let mut dec = WavDecoder::new(file.path());
        assert!(dec.mediainfo().is_none());

        dec.open(&SourceRequest::default()).unwrap();
        let info = dec.mediainfo().unwrap();
        assert_eq!(info.uri, file.path().display().to_string());
        assert!((info.duration - 0.5).abs() < 1e-9);
        assert_eq!(info.samplerate, 8000);
        assert!(!info.is_segment);
    }

    #[test]
    fn refuses_input_frames() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.0f32; 8], 1, 8000);

        let mut dec = WavDecoder::new(file.path());
        dec.open(&SourceRequest::default()).unwrap();
        let err = dec
            .process(FrameBlock::from_mono(vec![1.0]), false)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn streaming_before_open_is_refused() {
        let mut dec = WavDecoder::new("/irrelevant.wav");
        let err = dec.process(FrameBlock::empty(), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    struct Peak {
        state: ProcessorState,
        peak: f32,
    }

    impl Peak {
        fn new() -> Self {
            Self {
                state: ProcessorState::new(),
                peak: 0.0,
            }
        }
    }

    impl Processor for Peak {
        fn id(&self) -> &'static str {
            "peak_probe"
        }
        fn capability(&self) -> Capability {
            Capability::ValueAnalyzer
        }
        fn state(&self) -> &ProcessorState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ProcessorState {
            &mut self.state
        }
        fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
            for &sample in frames.samples() {
                self.peak = self.peak.max(sample.abs());
            }
            Ok((frames, eod))
        }
        fn result(&self) -> Option<AnalyzerResult> {
            Some(AnalyzerResult::scalar(
                self.id(),
                "Peak",
                "",
                f64::from(self.peak),
            ))
        }
    }

    cadena_core::pipeable!(Peak);

    #[test]
    fn wav_source_drives_a_pipe() {
        let file = NamedTempFile::new().unwrap();
        write_f32(file.path(), &[0.125f32, -0.625, 0.25], 1, 8000);

        let mut pipe = WavDecoder::new(file.path()) | Peak::new();
        pipe.run().unwrap();
        let result = pipe.results().get("peak_probe").unwrap();
        assert_eq!(result.value.as_scalar(), Some(0.625));
    }
}
