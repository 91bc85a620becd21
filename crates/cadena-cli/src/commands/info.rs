//! Display media information about an audio file.

use clap::Args;

use cadena_core::{Processor, SourceRequest};
use cadena_decoders::WavDecoder;

/// Display media information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let mut decoder = WavDecoder::new(&args.file);
    decoder.open(&SourceRequest::default())?;

    let info = decoder
        .mediainfo()
        .ok_or_else(|| anyhow::anyhow!("no media information for {}", args.file.display()))?;

    println!("File:        {}", args.file.display());
    println!("Channels:    {}", decoder.channels());
    println!("Sample Rate: {} Hz", info.samplerate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration,
        decoder.totalframes()
    );

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    decoder.release()?;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_format_scales_with_magnitude() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
