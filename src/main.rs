//! The `cantus` command: compile candidate JSON files against an instrument
//! profile and print or write the resulting part bundle.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cantus::compile::Compiler;
use cantus::event::{ChordSpan, Selection, Tq};
use cantus::profile::InstrumentProfile;

#[derive(Parser, Debug)]
#[command(name = "cantus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile loose musical sketches into playable parts", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a candidate JSON file into a part bundle
    Compile {
        /// Path to the candidate JSON file
        #[arg(value_name = "FILE")]
        candidate: PathBuf,

        /// Profile name (under ~/.cantus/profiles) or a YAML file path
        #[arg(short, long, value_name = "NAME_OR_PATH")]
        profile: Option<String>,

        /// Selection length in quarter notes
        #[arg(short, long, default_value_t = 16.0)]
        length: f64,

        /// Time signature, e.g. 4/4 or 6/8
        #[arg(short, long, default_value = "4/4")]
        meter: String,

        /// Chord map JSON file: a list of {time_q, tones, label} spans
        #[arg(short = 'c', long, value_name = "FILE")]
        chord_map: Option<PathBuf>,

        /// Write the bundle here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print a resolved instrument profile as YAML
    Profile {
        /// Profile name (under ~/.cantus/profiles) or a YAML file path
        #[arg(value_name = "NAME_OR_PATH")]
        name: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Compile {
            candidate,
            profile,
            length,
            meter,
            chord_map,
            output,
        } => run_compile(candidate, profile, length, &meter, chord_map, output),
        Commands::Profile { name } => run_profile(name),
    }
}

fn run_compile(
    candidate_path: PathBuf,
    profile: Option<String>,
    length: f64,
    meter: &str,
    chord_map: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let raw = fs::read_to_string(&candidate_path)
        .with_context(|| format!("failed to read {}", candidate_path.display()))?;
    let candidate: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", candidate_path.display()))?;

    let profile = resolve_profile(profile.as_deref())?;
    let selection = Selection::new(Tq::from_f64(length), parse_meter(meter)?);
    let spans = load_chord_map(chord_map)?;

    let bundle = Compiler::new(profile).compile(&candidate, selection, &spans);
    let json = serde_json::to_string_pretty(&bundle)?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_profile(name: Option<String>) -> Result<()> {
    let profile = resolve_profile(name.as_deref())?;
    print!("{}", serde_yaml::to_string(&profile)?);
    Ok(())
}

fn resolve_profile(spec: Option<&str>) -> Result<InstrumentProfile> {
    let Some(spec) = spec else {
        return Ok(InstrumentProfile::default());
    };
    let path = PathBuf::from(spec);
    if path.exists() {
        return InstrumentProfile::from_path(&path)
            .with_context(|| format!("failed to load profile {}", path.display()));
    }
    match InstrumentProfile::load(spec) {
        Some(profile) => Ok(profile),
        None => anyhow::bail!("no profile named {spec:?} under ~/.cantus/profiles"),
    }
}

fn load_chord_map(path: Option<PathBuf>) -> Result<Vec<ChordSpan>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spans: Vec<ChordSpan> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid chord map", path.display()))?;
    // re-wrap so tones arrive as deduplicated pitch classes
    Ok(spans
        .into_iter()
        .map(|s| ChordSpan::new(s.time_q, s.tones, s.label))
        .collect())
}

fn parse_meter(meter: &str) -> Result<(u8, u8)> {
    let (num, denom) = meter
        .split_once('/')
        .with_context(|| format!("meter must look like 4/4, got {meter:?}"))?;
    let num = num.trim().parse().context("meter numerator")?;
    let denom = denom.trim().parse().context("meter denominator")?;
    Ok((num, denom))
}
