//! File-to-file processing through a stage chain.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use cadena_analyzers::{MaxLevel, RmsLevel};
use cadena_core::{
    Capability, FrameBlock, ProcessPipe, Processor, ProcessorState, RunOptions, SharedProcessor,
    SourceRequest, shared,
};
use cadena_decoders::WavDecoder;
use cadena_effects::{Fade, Gain};
use cadena_encoders::WavEncoder;

use crate::preset::Pipeline;
use crate::stages::{create_stage, seconds_to_frames};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Gain to apply in dB
    #[arg(long, value_name = "DB")]
    gain_db: Option<f32>,

    /// Fade-in length in seconds
    #[arg(long, value_name = "SECONDS")]
    fade_in: Option<f32>,

    /// Fade-out length in seconds
    #[arg(long, value_name = "SECONDS")]
    fade_out: Option<f32>,

    /// Write 32-bit float samples instead of 16-bit PCM
    #[arg(long)]
    float: bool,

    /// Preset file (TOML) naming the stages to run
    #[arg(short, long, value_name = "FILE")]
    preset: Option<PathBuf>,

    /// Decoder block size in frames
    #[arg(long, value_name = "FRAMES")]
    blocksize: Option<usize>,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    println!("Reading {}...", args.input.display());
    let media = probe(&args.input)?;
    println!(
        "  {} frames, {} Hz, {:.2}s",
        media.totalframes,
        media.samplerate,
        media.totalframes as f64 / f64::from(media.samplerate)
    );

    // Build the stage chain
    let mut stages: Vec<SharedProcessor> = Vec::new();

    if let Some(preset_path) = &args.preset {
        let text = std::fs::read_to_string(preset_path)
            .with_context(|| format!("reading preset {}", preset_path.display()))?;
        let pipeline: Pipeline = toml::from_str(&text)
            .with_context(|| format!("parsing preset {}", preset_path.display()))?;

        println!("Loading preset: {}", pipeline.name);
        if let Some(description) = &pipeline.description {
            println!("  {description}");
        }
        for stage in &pipeline.stages {
            stages.push(create_stage(&stage.id, media.samplerate, &stage.params)?);
        }
    }

    if let Some(db) = args.gain_db {
        stages.push(shared(Gain::from_db(db)));
    }

    if args.fade_in.is_some() || args.fade_out.is_some() {
        stages.push(shared(Fade::new(
            seconds_to_frames(args.fade_in.unwrap_or(0.0), media.samplerate),
            seconds_to_frames(args.fade_out.unwrap_or(0.0), media.samplerate),
        )));
    }

    println!("Processing with {} stage(s)...", stages.len());

    let pb = ProgressBar::new(media.totalframes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let encoder = if args.float {
        WavEncoder::new(&args.output).with_float_output()
    } else {
        WavEncoder::new(&args.output)
    };

    let mut pipe = ProcessPipe::new();
    pipe.append(shared(WavDecoder::new(&args.input)));
    pipe.extend(stages);
    pipe.append(shared(RmsLevel::new()));
    pipe.append(shared(MaxLevel::new()));
    pipe.append(shared(Progress::new(pb)));
    pipe.append(shared(encoder));

    let options = RunOptions {
        request: SourceRequest {
            blocksize: args.blocksize,
            ..SourceRequest::default()
        },
        ..RunOptions::default()
    };
    pipe.run_with(options)
        .with_context(|| format!("processing {}", args.input.display()))?;

    let results = pipe.results();
    println!("\nStats:");
    if let Some(rms) = results.get(RmsLevel::ID).and_then(|r| r.value.as_scalar()) {
        println!("  Output RMS:  {:.1} dB", rms);
    }
    if let Some(peak) = results.get(MaxLevel::ID).and_then(|r| r.value.as_scalar()) {
        println!("  Output Peak: {:.1} dB", linear_to_db(peak));
    }

    println!("\nWrote {}", args.output.display());

    Ok(())
}

/// Native format of the input, learned before the pipe is built (fade
/// lengths and preset stages need the sample rate up front).
struct Media {
    samplerate: u32,
    totalframes: u64,
}

fn probe(path: &Path) -> anyhow::Result<Media> {
    let mut decoder = WavDecoder::new(path);
    decoder
        .open(&SourceRequest::default())
        .with_context(|| format!("opening {}", path.display()))?;
    let media = Media {
        samplerate: decoder.samplerate(),
        totalframes: decoder.totalframes(),
    };
    decoder.release()?;
    Ok(media)
}

fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

/// Pass-through stage that advances a progress bar as frames stream by.
struct Progress {
    bar: ProgressBar,
    position: u64,
    state: ProcessorState,
}

impl Progress {
    fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            position: 0,
            state: ProcessorState::new(),
        }
    }
}

impl Processor for Progress {
    fn id(&self) -> &'static str {
        "progress"
    }

    fn capability(&self) -> Capability {
        Capability::Effect
    }

    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(
        &mut self,
        frames: FrameBlock,
        eod: bool,
    ) -> cadena_core::Result<(FrameBlock, bool)> {
        self.position += frames.len() as u64;
        self.bar.set_position(self.position);
        if eod {
            self.bar.finish_with_message("done");
        }
        Ok((frames, eod))
    }
}
