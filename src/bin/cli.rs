// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipemesh CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pipemesh::geometry::analyze;
use pipemesh::{
    import_stl, CachedResult, CanonicalParameters, DuctParameters, Kernel, PipemeshConfig,
    ProductParameters, RackParameters,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipemesh")]
#[command(about = "Cached generator for circle-to-rectangle ventilation ducts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./pipemesh.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the result store directory
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug, Clone, Copy)]
struct DuctArgs {
    /// Wall thickness in mm
    #[arg(long, default_value_t = 1.0)]
    wall_thickness: f64,

    /// Outer radius of the circular end
    #[arg(long, default_value_t = 10.0)]
    circular_radius: f64,

    /// Outer width of the rectangular end
    #[arg(long, default_value_t = 50.0)]
    square_width: f64,

    /// Outer height of the rectangular end
    #[arg(long, default_value_t = 30.0)]
    square_height: f64,

    /// Distance between the two ends
    #[arg(long, default_value_t = 60.0)]
    length: f64,
}

impl From<DuctArgs> for DuctParameters {
    fn from(args: DuctArgs) -> Self {
        DuctParameters::new(
            args.wall_thickness,
            args.circular_radius,
            args.square_width,
            args.square_height,
            args.length,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a duct, or return the cached one
    Generate {
        #[command(flatten)]
        duct: DuctArgs,

        /// Print the result descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a duct without building it
    Lookup {
        #[command(flatten)]
        duct: DuctArgs,
    },

    /// Print the canonical cache key of a parameter set
    Key {
        #[command(flatten)]
        duct: DuctArgs,

        /// Key a server rack with this many servers instead of a duct
        #[arg(long, value_name = "N")]
        rack_servers: Option<u32>,
    },

    /// List cached results
    List,

    /// Summarise the result store
    Stats,

    /// Print geometry statistics of an STL file
    Inspect {
        /// STL file
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = PipemeshConfig::from_file(path)?;
            config.apply_overrides(|name| std::env::var(name).ok())?;
            config
        }
        None => PipemeshConfig::load()?,
    };
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Generate { duct, json } => generate_command(&config, duct.into(), json),
        Commands::Lookup { duct } => lookup_command(&config, duct.into()),
        Commands::Key { duct, rack_servers } => {
            let product = match rack_servers {
                Some(servers) => ProductParameters::from(RackParameters { servers }),
                None => ProductParameters::from(DuctParameters::from(duct)),
            };
            key_command(&product)
        }
        Commands::List => list_command(&config),
        Commands::Stats => stats_command(&config),
        Commands::Inspect { input } => inspect_command(&input),
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("pipemesh=warn"),
        1 => EnvFilter::new("pipemesh=info"),
        _ => EnvFilter::new("pipemesh=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn generate_command(
    config: &PipemeshConfig,
    params: DuctParameters,
    json: bool,
) -> Result<ExitCode> {
    let kernel = Kernel::open(config)?;
    let start = Instant::now();
    let result = kernel.generate(params);
    let elapsed = start.elapsed();
    let stats = kernel.stats();
    kernel.close().context("Failed to flush result store")?;

    let entry = match result {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!("{} {}", "❌".red(), e.to_string().red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let status = if stats.hits > 0 {
            "cached".green().bold()
        } else {
            "built".cyan().bold()
        };
        println!("{} {} in {:.2?}", "✅".green(), status, elapsed);
        print_entry(config, &entry);
    }
    Ok(ExitCode::SUCCESS)
}

fn lookup_command(config: &PipemeshConfig, params: DuctParameters) -> Result<ExitCode> {
    let kernel = Kernel::open(config)?;
    let key = params.cache_key();
    match kernel.lookup(&key) {
        Some(entry) => {
            print_entry(config, &entry);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("{} {}", "not cached:".yellow(), key);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn key_command(product: &ProductParameters) -> Result<ExitCode> {
    let key = product.cache_key();
    println!("{} {}", "Key:".bold(), key);
    println!("{} {}", "Id: ".bold(), key.result_id().cyan());
    Ok(ExitCode::SUCCESS)
}

fn list_command(config: &PipemeshConfig) -> Result<ExitCode> {
    let kernel = Kernel::open(config)?;
    let entries = kernel.store().entries();
    if entries.is_empty() {
        println!("{}", "No cached results".bright_black());
    }
    for entry in &entries {
        println!(
            "{}  {}  {}",
            entry.id[..12].cyan(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
            entry.key
        );
    }
    println!("\n{} {}", "Total:".bold(), entries.len());
    Ok(ExitCode::SUCCESS)
}

fn stats_command(config: &PipemeshConfig) -> Result<ExitCode> {
    let kernel = Kernel::open(config)?;
    let entries = kernel.store().entries();
    let artifacts: Vec<PathBuf> = entries
        .iter()
        .flat_map(|entry| entry.artifact_paths(kernel.store().root()))
        .collect();
    let bytes: u64 = artifacts
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum();
    let missing = artifacts.iter().filter(|path| !path.exists()).count();

    println!("{} {}", "Store:".bold(), config.store_dir.display());
    println!("{} {}", "Index:".bold(), config.index_path().display());
    println!("{} {}", "Entries:".bold(), entries.len());
    println!("{} {}", "Artifacts:".bold(), artifacts.len());
    println!("{} {:.2} MiB", "On disk:".bold(), bytes as f64 / (1024.0 * 1024.0));
    if missing > 0 {
        println!("{} {}", "Missing files:".yellow().bold(), missing);
    }
    Ok(ExitCode::SUCCESS)
}

fn inspect_command(input: &Path) -> Result<ExitCode> {
    let mesh = import_stl(input)?;
    analyze(&mesh).print();
    Ok(ExitCode::SUCCESS)
}

fn print_entry(config: &PipemeshConfig, entry: &CachedResult) {
    println!("{} {}", "Id:".bold(), entry.id.cyan());
    for path in entry.artifact_paths(&config.store_dir) {
        println!("{} {}", "File:".bold(), path.display());
    }
    if let Some(volume) = entry.metadata.get("volume").and_then(|v| v.as_f64()) {
        println!("{} {:.3} mm³", "Volume:".bold(), volume);
    }
}
