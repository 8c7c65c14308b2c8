//! EmberScript driver CLI.
//!
//! `compile <input> [-o <output>]` lexes, parses and compiles a `.ember`
//! source file to a `.embc` bytecode file, unless `-o` names an
//! extensionless path or one ending in `.exe`, in which case a native
//! executable is built instead (see [`execstub`]); `run <input.embc>`
//! loads a previously compiled chunk and executes it. Built with
//! `ClapParser` / `Subcommand` derives, and `eprintln!` +
//! `process::exit(1)` on failure.

mod config;
mod execstub;

use clap::{Parser as ClapParser, Subcommand};
use config::DriverConfig;
use ember_compiler::{compile_source_with_limits, FsSourceLoader};
use ember_core::Chunk;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "emberc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run EmberScript programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .ember source file to a .embc bytecode file
    Compile {
        /// Input .ember source file
        input: PathBuf,

        /// Output bytecode path (defaults to "a.embc")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a previously compiled .embc bytecode file
    Run {
        /// Input .embc bytecode file
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "emberc=info"
                    .parse()
                    .expect("static directive always parses"),
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = Cli::parse_from(normalize_argv(args));

    match cli.command {
        Commands::Compile { input, output } => run_compile(&input, output.as_deref()),
        Commands::Run { input } => run_run(&input),
    }
}

/// Pre-dispatches a bare file argument to `compile`: if `argv[1]` is
/// neither `compile` nor `run`, it is taken as the input file and
/// `compile` is inserted ahead of it - clap's declarative subcommand
/// model has no way to express "default to a subcommand when the first
/// token isn't a known one".
fn normalize_argv(args: Vec<String>) -> Vec<String> {
    match args.get(1).map(String::as_str) {
        Some("compile") | Some("run") | Some("-h") | Some("--help") | Some("-V")
        | Some("--version") | None => args,
        _ => {
            let mut normalized = vec![args[0].clone(), "compile".to_string()];
            normalized.extend(args.into_iter().skip(1));
            normalized
        }
    }
}

fn run_compile(input: &Path, output: Option<&Path>) {
    tracing::info!(input = %input.display(), "compiling");

    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let config = match DriverConfig::load_from_dir(base_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    if config.verbose {
        eprintln!("using stack_capacity={}, max_constants={}", config.stack_capacity, config.max_constants);
    }

    let output_path = resolve_output_path(output);

    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: could not read '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let chunk = match compile_source_with_limits(&source, &FsSourceLoader, config.max_constants) {
        Ok(chunk) => chunk,
        Err(errors) => {
            for error in &errors {
                eprintln!("Error: {error}");
            }
            process::exit(1);
        }
    };

    if execstub::is_executable_target(&output_path) {
        if let Err(e) = execstub::build_executable(&chunk, &output_path) {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    } else {
        let file = match File::create(&output_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: could not create '{}': {e}", output_path.display());
                process::exit(1);
            }
        };
        let mut writer = BufWriter::new(file);
        if let Err(e) = chunk.write_to(&mut writer) {
            eprintln!("Error: could not write '{}': {e}", output_path.display());
            process::exit(1);
        }
    }

    println!("Compiled {} -> {}", input.display(), output_path.display());
}

fn run_run(input: &Path) {
    tracing::info!(input = %input.display(), "running");

    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let config = match DriverConfig::load_from_dir(base_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let file = match File::open(input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: could not open '{}': {e}", input.display());
            process::exit(1);
        }
    };
    let mut reader = std::io::BufReader::new(file);
    let chunk = match Chunk::read_from(&mut reader) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = ember_vm::execute_with_stack_capacity(&chunk, config.stack_capacity) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Defaults the output path to `a.embc` when `-o` is absent.
fn resolve_output_path(output: Option<&Path>) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("a.embc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_argument_is_dispatched_to_compile() {
        let args = vec!["emberc".to_string(), "script.ember".to_string()];
        assert_eq!(
            normalize_argv(args),
            vec!["emberc", "compile", "script.ember"]
        );
    }

    #[test]
    fn explicit_subcommands_pass_through_unchanged() {
        let args = vec!["emberc".to_string(), "run".to_string(), "a.embc".to_string()];
        assert_eq!(normalize_argv(args.clone()), args);
    }

    #[test]
    fn missing_output_defaults_to_a_embc() {
        assert_eq!(resolve_output_path(None), PathBuf::from("a.embc"));
    }
}
