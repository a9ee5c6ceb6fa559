//! Kernel header generator.
//!
//! `simdgen <TARGET> [OUTPUT]` renders one header. Without OUTPUT the text
//! goes to stdout; with OUTPUT the file is replaced in full.

use clap::{Parser, ValueEnum};
use simdgen::{encodegen, BackendKind, Catalog, ComparisonPolicy, Family, GeneratorConfig};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    BinaryGeneric,
    BinarySse,
    TernaryGeneric,
    TernarySse,
}

impl Target {
    fn split(self) -> (BackendKind, Family) {
        match self {
            Target::BinaryGeneric => (BackendKind::Generic, Family::Binary),
            Target::BinarySse => (BackendKind::Sse, Family::Binary),
            Target::TernaryGeneric => (BackendKind::Generic, Family::Ternary),
            Target::TernarySse => (BackendKind::Sse, Family::Ternary),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Comparisons {
    /// SSE comparisons yield 1.0 or 0.0
    Normalize,
    /// SSE comparisons yield the raw lane mask
    Mask,
}

#[derive(Parser, Debug)]
#[command(name = "simdgen", about = "Generate elementwise SIMD kernel headers")]
struct Cli {
    /// Header to generate
    #[arg(value_enum)]
    target: Target,

    /// Output file; stdout when omitted
    output: Option<PathBuf>,

    /// Namespace wrapping the kernels
    #[arg(long, default_value = "nova")]
    namespace: String,

    /// Comparison result encoding for the SSE backend
    #[arg(long, value_enum, default_value_t = Comparisons::Normalize)]
    comparisons: Comparisons,
}

fn run(cli: &Cli) -> simdgen::GenResult<()> {
    let (backend, family) = cli.target.split();
    let comparisons = match cli.comparisons {
        Comparisons::Normalize => ComparisonPolicy::Normalize,
        Comparisons::Mask => ComparisonPolicy::Mask,
    };
    let config = GeneratorConfig::new(backend, family)
        .with_namespace(cli.namespace.clone())
        .with_comparisons(comparisons);

    let catalog = Catalog::builtin()?;
    let unit = encodegen::generate(&catalog, &config)?;
    log::debug!("{}", unit.stats);
    encodegen::write_unit(&unit, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        log::info!("Wrote {} ({} bytes)", path.display(), unit.text.len());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
