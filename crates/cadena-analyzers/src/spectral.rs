//! Spectral analysis over windowed FFT frames.

use std::sync::Arc;

use cadena_core::{
    Analyzer, AnalyzerResult, Capability, Error, FixedSizeInputAdapter, FrameBlock, Processor,
    ProcessorState, Result, StreamSpec,
};
use rustfft::{FftPlanner, num_complex::Complex};

use crate::window::Window;

const DEFAULT_FFT_SIZE: usize = 2048;

/// Compute the spectral centroid (center of mass) of a magnitude spectrum.
///
/// `spectrum` holds the positive-frequency bins (DC to Nyquist). Returns
/// the centroid frequency in Hz, 0.0 for an all-silent spectrum.
pub fn spectral_centroid(spectrum: &[f32], samplerate: f32) -> f32 {
    let fft_size = (spectrum.len() - 1) * 2;
    let bin_width = samplerate / fft_size as f32;

    let mut weighted_sum = 0.0;
    let mut magnitude_sum = 0.0;
    for (i, &mag) in spectrum.iter().enumerate() {
        weighted_sum += i as f32 * bin_width * mag;
        magnitude_sum += mag;
    }

    if magnitude_sum > 1e-10 {
        weighted_sum / magnitude_sum
    } else {
        0.0
    }
}

struct Windowing {
    adapter: FixedSizeInputAdapter,
    fft: Arc<dyn rustfft::Fft<f32>>,
    coeffs: Vec<f32>,
    samplerate: f32,
    channels: usize,
}

/// Measures the mean spectral centroid of the stream in Hz.
///
/// The stream is cut into Hann-windowed FFT frames (multi-channel input
/// is averaged down to mono first); the final frame is zero-padded to the
/// FFT size. Each frame contributes one centroid and the result is their
/// mean.
pub struct SpectralCentroid {
    fft_size: usize,
    windowing: Option<Windowing>,
    sum: f64,
    count: u64,
    centroid: f64,
    state: ProcessorState,
}

impl SpectralCentroid {
    /// Registry id of this type.
    pub const ID: &'static str = "spectral_centroid";

    /// Centroid over the default FFT size of 2048 frames.
    pub fn new() -> Self {
        Self::with_fft_size(DEFAULT_FFT_SIZE)
    }

    /// Centroid over FFT frames of `size` frames.
    pub fn with_fft_size(size: usize) -> Self {
        Self {
            fft_size: size,
            windowing: None,
            sum: 0.0,
            count: 0,
            centroid: 0.0,
            state: ProcessorState::new(),
        }
    }

    /// FFT frame length.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

impl Default for SpectralCentroid {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for SpectralCentroid {
    fn id(&self) -> &'static str {
        Self::ID
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

    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.state.record_source(upstream);
        let mut planner = FftPlanner::new();
        self.windowing = Some(Windowing {
            adapter: FixedSizeInputAdapter::with_padding(
                self.fft_size,
                usize::from(upstream.channels),
            ),
            fft: planner.plan_fft_forward(self.fft_size),
            coeffs: Window::Hann.coefficients(self.fft_size),
            samplerate: upstream.samplerate as f32,
            channels: usize::from(upstream.channels),
        });
        self.sum = 0.0;
        self.count = 0;
        Ok(())
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        let Some(win) = self.windowing.as_mut() else {
            return Err(Error::unsupported_operation(
                Self::ID,
                "setup() the stage before streaming",
            ));
        };
        let mut blocks = win.adapter.process(frames.view(), eod);
        while let Some((block, _)) = blocks.next_block() {
            let mut buffer: Vec<Complex<f32>> = block
                .frames()
                .map(|frame| frame.iter().sum::<f32>() / win.channels as f32)
                .zip(&win.coeffs)
                .map(|(sample, &w)| Complex::new(sample * w, 0.0))
                .collect();
            win.fft.process(&mut buffer);

            let spectrum: Vec<f32> = buffer[..self.fft_size / 2 + 1]
                .iter()
                .map(|c| c.norm())
                .collect();
            self.sum += f64::from(spectral_centroid(&spectrum, win.samplerate));
            self.count += 1;
        }
        Ok((frames, eod))
    }

    fn post_process(&mut self) -> Result<()> {
        self.centroid = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        };
        Ok(())
    }

    fn result(&self) -> Option<AnalyzerResult> {
        Some(AnalyzerResult::scalar(
            Self::ID,
            self.name(),
            self.unit(),
            self.centroid,
        ))
    }
}

impl Analyzer for SpectralCentroid {
    fn name(&self) -> &'static str {
        "Spectral centroid"
    }

    fn unit(&self) -> &'static str {
        "Hz"
    }
}

cadena_core::pipeable!(SpectralCentroid);

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_core::ArrayDecoder;
    use std::f32::consts::PI;

    fn sine(len: usize, freq: f32, samplerate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / samplerate).sin())
            .collect()
    }

    fn spec(totalframes: u64) -> StreamSpec {
        StreamSpec {
            channels: 1,
            samplerate: 8000,
            blocksize: 1024,
            totalframes,
        }
    }

    #[test]
    fn centroid_formula_weighs_bins_by_magnitude() {
        // single occupied bin: centroid is exactly that bin's frequency
        let mut spectrum = vec![0.0; 513];
        spectrum[64] = 1.0;
        let centroid = spectral_centroid(&spectrum, 8000.0);
        assert!((centroid - 500.0).abs() < 1e-3, "centroid {centroid}");
    }

    #[test]
    fn silent_spectrum_reports_zero() {
        assert_eq!(spectral_centroid(&[0.0; 513], 8000.0), 0.0);
    }

    #[test]
    fn pure_tone_centroid_is_near_its_frequency() {
        // 500 Hz sits exactly on bin 64 of a 1024-point FFT at 8 kHz
        let mut analyzer = SpectralCentroid::with_fft_size(1024);
        analyzer.setup(spec(2048)).unwrap();
        analyzer
            .process(FrameBlock::from_mono(sine(2048, 500.0, 8000.0)), true)
            .unwrap();
        analyzer.post_process().unwrap();
        let centroid = analyzer.result().unwrap().value.as_scalar().unwrap();
        assert!((centroid - 500.0).abs() < 10.0, "centroid {centroid}");
    }

    #[test]
    fn short_tail_is_zero_padded_not_dropped() {
        let mut analyzer = SpectralCentroid::with_fft_size(1024);
        analyzer.setup(spec(1536)).unwrap();
        analyzer
            .process(FrameBlock::from_mono(sine(1536, 500.0, 8000.0)), true)
            .unwrap();
        analyzer.post_process().unwrap();
        assert_eq!(analyzer.count, 2);
        let centroid = analyzer.result().unwrap().value.as_scalar().unwrap();
        assert!((centroid - 500.0).abs() < 50.0, "centroid {centroid}");
    }

    #[test]
    fn dc_signal_sits_at_the_bottom_of_the_spectrum() {
        let mut analyzer = SpectralCentroid::with_fft_size(1024);
        analyzer.setup(spec(1024)).unwrap();
        analyzer
            .process(FrameBlock::from_mono(vec![1.0; 1024]), true)
            .unwrap();
        analyzer.post_process().unwrap();
        let centroid = analyzer.result().unwrap().value.as_scalar().unwrap();
        assert!(centroid < 20.0, "centroid {centroid}");
    }

    #[test]
    fn silence_reports_zero() {
        let mut analyzer = SpectralCentroid::with_fft_size(1024);
        analyzer.setup(spec(1024)).unwrap();
        analyzer
            .process(FrameBlock::from_mono(vec![0.0; 1024]), true)
            .unwrap();
        analyzer.post_process().unwrap();
        assert_eq!(analyzer.result().unwrap().value.as_scalar(), Some(0.0));
    }

    #[test]
    fn streaming_before_setup_is_refused() {
        let mut analyzer = SpectralCentroid::new();
        let err = analyzer.process(FrameBlock::empty(), true).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn centroid_rides_along_a_pipe() {
        let samples = FrameBlock::from_mono(sine(4096, 500.0, 8000.0));
        let mut pipe = ArrayDecoder::new(samples, 8000) | SpectralCentroid::with_fft_size(1024);
        pipe.run().unwrap();

        let result = pipe.results().get(SpectralCentroid::ID).unwrap();
        let centroid = result.value.as_scalar().unwrap();
        assert!((centroid - 500.0).abs() < 10.0, "centroid {centroid}");
        assert_eq!(result.unit, "Hz");
    }
}
