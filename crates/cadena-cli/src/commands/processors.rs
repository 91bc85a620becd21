//! Processor listing command.

use clap::Args;

use cadena_core::{Capability, registry};

#[derive(Args)]
pub struct ProcessorsArgs {
    /// Only list processors with this capability
    /// (decoder, effect, analyzer, value_analyzer, encoder, grapher)
    #[arg(long, value_name = "CAPABILITY")]
    capability: Option<String>,
}

pub fn run(args: ProcessorsArgs) -> anyhow::Result<()> {
    let capability = match args.capability.as_deref() {
        None => None,
        Some(name) => Some(parse_capability(name)?),
    };

    let descriptors = registry::all(capability, true);

    println!("Registered Processors");
    println!("=====================");
    println!();

    for descriptor in &descriptors {
        println!(
            "  {:<18} {:<15} - {}",
            descriptor.id,
            descriptor.capability.as_str(),
            descriptor.description
        );
    }

    println!();
    println!("Use 'cadena analyze --analyzers <id,...>' to pick analyzers by id.");

    Ok(())
}

fn parse_capability(name: &str) -> anyhow::Result<Capability> {
    match name.to_lowercase().as_str() {
        "decoder" => Ok(Capability::Decoder),
        "effect" => Ok(Capability::Effect),
        "analyzer" => Ok(Capability::Analyzer),
        "value_analyzer" => Ok(Capability::ValueAnalyzer),
        "encoder" => Ok(Capability::Encoder),
        "grapher" => Ok(Capability::Grapher),
        _ => anyhow::bail!(
            "unknown capability '{name}' (expected decoder, effect, analyzer, value_analyzer, encoder, or grapher)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_names_parse_case_insensitively() {
        assert_eq!(parse_capability("decoder").unwrap(), Capability::Decoder);
        assert_eq!(parse_capability("Analyzer").unwrap(), Capability::Analyzer);
        assert_eq!(
            parse_capability("value_analyzer").unwrap(),
            Capability::ValueAnalyzer
        );
        assert!(parse_capability("mixer").is_err());
    }
}
