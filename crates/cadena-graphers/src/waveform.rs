//! Min/max peak waveform rendered to SVG.

use cadena_core::{
    Capability, Error, FrameBlock, Grapher, Processor, ProcessorState, Result, StreamSpec,
};

const DEFAULT_WIDTH: usize = 1500;
const DEFAULT_HEIGHT: usize = 200;

const BACKGROUND: &str = "#16161e";
const AXIS: &str = "#3b3b54";
const PEAKS: &str = "#7aa2f7";

/// Signed sample extremes over one bucket of consecutive frames.
#[derive(Clone, Copy, Debug)]
struct Bucket {
    min: f32,
    max: f32,
}

impl Bucket {
    fn seed(sample: f32) -> Self {
        Self {
            min: sample,
            max: sample,
        }
    }

    fn update(&mut self, sample: f32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }
}

/// Accumulates per-bucket min/max peaks and renders them as an SVG
/// waveform.
///
/// At setup the stream length is split into `width` buckets of equal frame
/// count; every sample of every channel folds into the bucket its frame
/// falls in. A stream shorter than announced fills fewer buckets, a longer
/// one folds the surplus into the last bucket. [`render`](Grapher::render)
/// can be called any time after the run and returns a standalone SVG
/// document, one vertical line per bucket spanning its min and max.
pub struct Waveform {
    width: usize,
    height: usize,
    frames_per_bucket: u64,
    position: u64,
    buckets: Vec<Bucket>,
    state: ProcessorState,
}

impl Waveform {
    /// Registry id of this type.
    pub const ID: &'static str = "waveform";

    /// Waveform `width` buckets wide at the default height of 200 pixels.
    pub fn new(width: usize) -> Self {
        Self::with_size(width, DEFAULT_HEIGHT)
    }

    /// Waveform with an explicit image size in pixels.
    pub fn with_size(width: usize, height: usize) -> Self {
        assert!(width >= 1, "waveform needs at least one bucket");
        assert!(height >= 1, "waveform needs a visible height");
        Self {
            width,
            height,
            frames_per_bucket: 0,
            position: 0,
            buckets: Vec::new(),
            state: ProcessorState::new(),
        }
    }

    /// Image width in pixels, one bucket per pixel column.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl Processor for Waveform {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn capability(&self) -> Capability {
        Capability::Grapher
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn setup(&mut self, upstream: StreamSpec) -> Result<()> {
        self.state.record_source(upstream);
        self.frames_per_bucket = (upstream.totalframes / self.width as u64).max(1);
        self.position = 0;
        self.buckets.clear();
        Ok(())
    }

    fn process(&mut self, frames: FrameBlock, eod: bool) -> Result<(FrameBlock, bool)> {
        if !self.state.is_configured() {
            return Err(Error::unsupported_operation(
                Self::ID,
                "setup() the stage before streaming",
            ));
        }
        for frame in frames.frames() {
            let index = (self.position / self.frames_per_bucket).min(self.width as u64 - 1) as usize;
            for &sample in frame {
                // buckets fill contiguously, so a missing index is the next one
                match self.buckets.get_mut(index) {
                    Some(bucket) => bucket.update(sample),
                    None => self.buckets.push(Bucket::seed(sample)),
                }
            }
            self.position += 1;
        }
        Ok((frames, eod))
    }
}

impl Grapher for Waveform {
    fn render(&self) -> Result<String> {
        let w = self.width;
        let h = self.height;
        let mid = h as f32 / 2.0;

        let mut svg = String::with_capacity(256 + 96 * self.buckets.len());
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n"
        ));
        svg.push_str(&format!(
            "<rect width=\"{w}\" height=\"{h}\" fill=\"{BACKGROUND}\"/>\n"
        ));
        svg.push_str(&format!(
            "<line x1=\"0\" y1=\"{mid:.1}\" x2=\"{w}\" y2=\"{mid:.1}\" stroke=\"{AXIS}\" stroke-width=\"1\"/>\n"
        ));
        for (i, bucket) in self.buckets.iter().enumerate() {
            let x = i as f32 + 0.5;
            let top = mid - bucket.max.clamp(-1.0, 1.0) * mid;
            let bottom = mid - bucket.min.clamp(-1.0, 1.0) * mid;
            svg.push_str(&format!(
                "<line x1=\"{x:.1}\" y1=\"{top:.1}\" x2=\"{x:.1}\" y2=\"{bottom:.1}\" stroke=\"{PEAKS}\" stroke-width=\"1\"/>\n"
            ));
        }
        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

cadena_core::pipeable!(Waveform);
