//! Waveform rendering command.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Args;

use cadena_core::Grapher;
use cadena_decoders::WavDecoder;
use cadena_graphers::Waveform;

#[derive(Args)]
pub struct GraphArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output SVG file (default: the input path with an .svg extension)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value = "1500")]
    width: usize,

    /// Image height in pixels
    #[arg(long, default_value = "200")]
    height: usize,
}

pub fn run(args: GraphArgs) -> anyhow::Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("svg"));

    println!("Rendering waveform of {}...", args.input.display());

    let wave = Arc::new(Mutex::new(Waveform::with_size(args.width, args.height)));
    let mut pipe = WavDecoder::new(&args.input) | wave.clone();
    pipe.run()
        .with_context(|| format!("graphing {}", args.input.display()))?;

    let svg = wave.lock().expect("waveform mutex poisoned").render()?;
    std::fs::write(&output, svg).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote waveform to {}", output.display());

    Ok(())
}
