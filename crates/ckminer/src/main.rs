//! ckminerc: CLI front end for the `ckernel-miner` library.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

use ckminer::ast::TranslationUnitProvider;
use ckminer::ast::json::JsonTranslationUnitProvider;
use ckminer::config::MiningConfig;
use ckminer::external::{CCompiler, Indenter};
use ckminer::mine_function;

#[derive(Parser)]
#[command(name = "ckminerc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mines compilable C loop kernels out of a translation unit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mine loop kernels out of one or more translation-unit JSON files.
    Mine {
        /// Translation unit JSON files produced by an external Clang adapter.
        inputs: Vec<PathBuf>,
        /// Optional TOML config (depth_min, binary names, timeouts, ...).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write JSON Lines kernel records; stdout if omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a shell completion script for this CLI.
    Completions {
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ckminer=info".parse().unwrap()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Mine { inputs, config, output } => run_mine(&inputs, config.as_deref(), output.as_deref()),
        Command::Completions { shell } => {
            run_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn run_mine(inputs: &[PathBuf], config_path: Option<&std::path::Path>, output: Option<&std::path::Path>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => {
            let toml_str = fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
            MiningConfig::from_toml(&toml_str).map_err(|e| e.to_string())?
        }
        None => MiningConfig::default(),
    };

    let indenter = Indenter::new(config.indenter_binary.clone(), config.subprocess_timeout());
    let compiler = CCompiler::new(config.compiler_binary.clone(), config.subprocess_timeout());
    let provider = JsonTranslationUnitProvider;

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(fs::File::create(path).map_err(|e| format!("creating {}: {e}", path.display()))?),
        None => Box::new(io::stdout()),
    };

    for input in inputs {
        let filename = input.display().to_string();
        let source = fs::read_to_string(input).map_err(|e| format!("reading {filename}: {e}"))?;
        let parse_options = config.to_parse_options(Some(filename.clone()));
        let translation_unit = provider
            .parse(&source, &parse_options)
            .map_err(|e| format!("{filename}: {e}"))?;

        for function in &translation_unit.functions {
            tracing::debug!(function = %function.name, file = %filename, "mining function");
            let records = mine_function(function, &config, &indenter, &compiler, &filename)
                .map_err(|e| format!("{filename}:{}: {e}", function.name))?;
            for record in records {
                let line = serde_json::to_string(&record).map_err(|e| e.to_string())?;
                writeln!(out, "{line}").map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}
