use anyhow::{Context, Result};
use clap::Parser;
use desire_paths::{GenerationConfig, PoiInput, ZoneInput, generate};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene file: `{"zones": [...], "pois": [...]}`.
    #[arg(long)]
    scene: PathBuf,
    /// Generation settings. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the seed from the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// Writes the result here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Deserialize, Debug)]
struct Scene {
    zones: Vec<ZoneInput>,
    #[serde(default)]
    pois: Vec<PoiInput>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let scene: Scene = read_json(&args.scene)?;
    let mut config: GenerationConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => GenerationConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let output = generate(&scene.zones, &scene.pois, &config)
        .inspect_err(|err| {
            if err.is_insufficient_input() {
                tracing::warn!(%err, "nothing to generate");
            }
        })
        .context("desire path generation failed")?;

    tracing::info!(
        points = output.points.len(),
        edges = output.edges.len(),
        routed = output.report.routed_pairs,
        unreachable = output.report.unreachable_pairs,
        "writing result"
    );

    let json = serde_json::to_string_pretty(&output)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}
