//! korec CLI
//!
//! Command-line interface for generating the runtime support module of a
//! definition and for checking definition files.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "korec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "korec - generate runtime support routines as LLVM IR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the runtime support module for a definition
    Build {
        /// Input definition file (TOML)
        input: PathBuf,

        /// Output IR path (defaults to the input filename with a .ll extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compiler configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Target triple written into the module (defaults to the host)
        #[arg(long)]
        target: Option<String>,

        /// Module id written into the module header
        #[arg(long)]
        module_id: Option<String>,
    },

    /// Load and validate a definition file without writing any output
    Check {
        /// Input definition file (TOML)
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            config,
            target,
            module_id,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("ll"));
            run_build(&input, &output, config.as_deref(), target, module_id);
        }
        Commands::Check { input } => {
            run_check(&input);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "korec", &mut io::stdout());
}

fn run_build(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    target: Option<String>,
    module_id: Option<String>,
) {
    let mut config = match config_path {
        Some(path) => match korec::CompilerConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => korec::CompilerConfig::default(),
    };

    // Command-line flags override the config file
    if let Some(target) = target {
        config = config.with_target_triple(target);
    }
    if let Some(module_id) = module_id {
        config = config.with_module_id(module_id);
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match korec::compile_file(input, output, &config) {
        Ok(()) => {
            println!("Generated {} -> {}", input.display(), output.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_check(input: &Path) {
    let definition = match korec::load_definition(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Undeclared sorts and incomplete collection sorts only show up during generation
    if let Err(e) = korec::generate_ir(&definition, &korec::CompilerConfig::default()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let functions = definition.function_symbols().count();
    let leaves = definition.symbols().filter(|s| s.is_leaf()).count();
    println!(
        "{}: {} symbol(s) ({} function, {} without children), {} sort(s)",
        input.display(),
        definition.symbol_count(),
        functions,
        leaves,
        definition.sort_declarations().count()
    );
}
