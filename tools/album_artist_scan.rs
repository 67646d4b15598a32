mod config;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use common::{MutationMode, MutationPolicy, PolicyError, RunMode};
use config::{default_config_path, load_config, ScanConfig};
use scanner::Scanner;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Report folders whose Album Artist is not the target value, or rewrite it.
#[derive(Parser, Debug)]
#[command(name = "album_artist_scan", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode").args(["update", "force", "release_type_only", "force_release_type"])
))]
struct Args {
    /// Music folder to scan
    path: PathBuf,

    /// Fill in Album Artist where it is missing
    #[arg(long)]
    update: bool,

    /// Overwrite Album Artist on every file
    #[arg(long)]
    force: bool,

    /// Write only the release type
    #[arg(long)]
    release_type_only: bool,

    /// Overwrite Album Artist and release type on every file
    #[arg(long)]
    force_release_type: bool,

    /// Album Artist value to look for and to write
    #[arg(long, env = "ALBUM_ARTIST_VALUE")]
    value: Option<String>,

    /// Release type value to write
    #[arg(long, env = "ALBUM_ARTIST_RELEASE_TYPE")]
    release_type: Option<String>,

    /// YAML config file
    #[arg(long, env = "ALBUM_ARTIST_CONFIG")]
    config: Option<PathBuf>,

    /// Follow symlinks while walking the tree
    #[arg(long)]
    follow_links: bool,

    /// Print one JSON object per folder instead of text lines
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn mutation_mode(&self) -> Option<MutationMode> {
        if self.update {
            Some(MutationMode::Update)
        } else if self.force {
            Some(MutationMode::Force)
        } else if self.release_type_only {
            Some(MutationMode::ReleaseTypeOnly)
        } else if self.force_release_type {
            Some(MutationMode::ForceWithReleaseType)
        } else {
            None
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    let (config, found) = load_config(&config_path, required)?;
    if found {
        info!("Loaded config from {:?}", config_path);
    }

    let mode = resolve_mode(args, &config)?;
    let scanner = Scanner::default().follow_links(args.follow_links || config.follow_links);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_err: Option<io::Error> = None;
    scanner.run(&args.path, &mode, |record| {
        if write_err.is_some() {
            return;
        }
        let line = if args.json {
            match serde_json::to_string(&record) {
                Ok(line) => line,
                Err(err) => {
                    write_err = Some(err.into());
                    return;
                }
            }
        } else {
            record.to_string()
        };
        if let Err(err) = writeln!(out, "{}", line) {
            write_err = Some(err);
        }
    })?;

    match write_err {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn resolve_mode(args: &Args, config: &ScanConfig) -> Result<RunMode, PolicyError> {
    let album_artist = args
        .value
        .clone()
        .unwrap_or_else(|| config.album_artist.clone());
    let mode = match args.mutation_mode() {
        Some(mode) => mode,
        None => return Ok(RunMode::Scan { target: album_artist }),
    };
    let release_type = args
        .release_type
        .clone()
        .unwrap_or_else(|| config.release_type.clone());
    let policy = MutationPolicy::new(mode, album_artist, Some(release_type))?;
    Ok(RunMode::Mutate(policy))
}
