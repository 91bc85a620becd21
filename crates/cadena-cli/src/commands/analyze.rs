//! Run analyzers over an audio file and report their results.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use cadena_core::{
    AnalyzerValue, Capability, ProcessPipe, RunOptions, SourceRequest, registry, shared,
};
use cadena_decoders::WavDecoder;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Comma-separated analyzer ids (default: every registered analyzer)
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    analyzers: Vec<String>,

    /// Decoder block size in frames
    #[arg(long, value_name = "FRAMES")]
    blocksize: Option<usize>,

    /// Write the results as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let ids: Vec<String> = if args.analyzers.is_empty() {
        registry::all(Some(Capability::Analyzer), true)
            .into_iter()
            .map(|d| d.id.to_string())
            .collect()
    } else {
        args.analyzers.clone()
    };

    if ids.is_empty() {
        anyhow::bail!("no analyzers registered");
    }

    for id in &ids {
        let descriptor = registry::get(id)?;
        if !descriptor.capability.is_a(Capability::Analyzer) {
            anyhow::bail!(
                "'{}' is not an analyzer (capability: {})",
                id,
                descriptor.capability
            );
        }
    }

    println!("Analyzing {}...", args.input.display());

    let mut pipe = ProcessPipe::new();
    pipe.append(shared(WavDecoder::new(&args.input)));
    for id in &ids {
        pipe.append(registry::create(id)?);
    }

    let options = RunOptions {
        request: SourceRequest {
            blocksize: args.blocksize,
            ..SourceRequest::default()
        },
        ..RunOptions::default()
    };
    pipe.run_with(options)
        .with_context(|| format!("analyzing {}", args.input.display()))?;

    let results = pipe.results();

    println!();
    println!("  {:<18}  {:<20}  {}", "Id", "Name", "Value");
    println!("  {:<18}  {:<20}  {}", "--", "----", "-----");
    for result in results.iter() {
        match &result.value {
            AnalyzerValue::Scalar(value) => {
                println!(
                    "  {:<18}  {:<20}  {:.4} {}",
                    result.id, result.name, value, result.unit
                );
            }
            AnalyzerValue::Series(values) if values.is_empty() => {
                println!("  {:<18}  {:<20}  empty series", result.id, result.name);
            }
            AnalyzerValue::Series(values) => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!(
                    "  {:<18}  {:<20}  {} values in [{:.4}, {:.4}] {}",
                    result.id,
                    result.name,
                    values.len(),
                    min,
                    max,
                    result.unit
                );
            }
        }
    }

    if let Some(path) = &args.json {
        std::fs::write(path, results.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!();
        println!("Wrote results to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    #[test]
    fn selected_analyzers_run_and_export_json() {
        cadena_analyzers::register().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let json = dir.path().join("results.json");

        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&input, spec).unwrap();
        for _ in 0..1000 {
            writer.write_sample(0.75f32).unwrap();
        }
        writer.finalize().unwrap();

        run(AnalyzeArgs {
            input,
            analyzers: vec!["max_level".to_string()],
            blocksize: Some(100),
            json: Some(json.clone()),
        })
        .unwrap();

        let text = std::fs::read_to_string(&json).unwrap();
        let values: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(values[0]["id"], "max_level");
        assert!((values[0]["value"].as_f64().unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn non_analyzer_ids_are_refused() {
        cadena_effects::register().unwrap();

        let err = run(AnalyzeArgs {
            input: PathBuf::from("unused.wav"),
            analyzers: vec!["gain".to_string()],
            blocksize: None,
            json: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("not an analyzer"));
    }
}
