//! circuit-to-kicad: convert circuit descriptions into KiCad files
//!
//! Reads circuit-description JSON and writes KiCad schematics, boards and
//! component libraries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use circuit_to_kicad::circuit::CircuitIndex;
use circuit_to_kicad::config::{self, Config};
use circuit_to_kicad::convert::{PcbConverter, SchematicConverter};
use circuit_to_kicad::kicad::to_file_text;
use circuit_to_kicad::library::source::{expand_patterns, gather_components};
use circuit_to_kicad::library::{JsonFileSource, LibraryConverter};

/// Convert circuit descriptions into KiCad schematics, boards and libraries.
#[derive(Parser, Debug)]
#[command(name = "circuit-to-kicad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a circuit description into a schematic
    Schematic {
        /// Circuit-description JSON file
        input: PathBuf,
        /// Output `.kicad_sch` file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Convert a circuit description into a board
    Pcb {
        /// Circuit-description JSON file
        input: PathBuf,
        /// Output `.kicad_pcb` file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build component libraries; each matching file is one component
    Library {
        /// Glob patterns of circuit-description JSON files
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads one circuit description.
fn read_circuit(path: &Path) -> Result<CircuitIndex, String> {
    let json = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    CircuitIndex::from_json(&json).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}

/// Project name for a file: its stem, or `circuit`.
fn project_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("circuit")
        .to_string()
}

fn write_text(path: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
    }
    fs::write(path, text).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

fn run(command: Command, cfg: &Config) -> Result<(), String> {
    match command {
        Command::Schematic { input, output } => {
            let circuit = read_circuit(&input)?;
            let tree = SchematicConverter::convert(circuit, cfg.convert_options(&project_name(&output)))
                .map_err(|e| e.to_string())?;
            write_text(&output, &to_file_text(&tree))?;
            info!(output = %output.display(), "Wrote schematic");
        }
        Command::Pcb { input, output } => {
            let circuit = read_circuit(&input)?;
            let tree = PcbConverter::convert(circuit, cfg.convert_options(&project_name(&output)))
                .map_err(|e| e.to_string())?;
            write_text(&output, &to_file_text(&tree))?;
            info!(output = %output.display(), "Wrote board");
        }
        Command::Library { patterns, output } => {
            let paths = expand_patterns(&patterns).map_err(|e| e.to_string())?;
            let components = gather_components(&paths, &JsonFileSource, &JsonFileSource);
            if components.is_empty() {
                return Err("no components to convert".to_string());
            }

            let mut library = LibraryConverter::convert(components, cfg.library_options())
                .map_err(|e| e.to_string())?;
            // Model sources are relative to the input files
            let base_dir = paths
                .first()
                .and_then(|p| p.parent())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            library.embed_local_models(&base_dir);
            for copy in library
                .model_copies
                .iter()
                .filter(|c| !library.files.contains_key(&c.destination))
            {
                warn!(source = %copy.source, destination = %copy.destination, "3D model not copied");
            }

            let written = library
                .write_to(&output)
                .map_err(|e| format!("cannot write library to {}: {e}", output.display()))?;
            info!(
                output = %output.display(),
                files = written,
                warnings = library.warnings.len(),
                "Wrote library"
            );
        }
    }
    Ok(())
}

/// Entry point for circuit-to-kicad.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting circuit-to-kicad");

    match run(args.command, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Conversion failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_from_flags_and_config() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "nonsense"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }

    #[test]
    fn project_name_from_output() {
        assert_eq!(project_name(Path::new("out/board.kicad_pcb")), "board");
    }
}
