//! PLUTO CLI
//!
//! Command-line interface for the PLUTO procedure compiler

mod commands;
mod output;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use pluto_core::init_tracing_with;

#[derive(Parser)]
#[command(name = "pluto")]
#[command(about = "PLUTO: compile spacecraft operations procedures into Python")]
#[command(version = pluto_core::VERSION)]
#[command(
    long_about = "Compiles procedures written in PLUTO (ECSS-E-ST-70-32C) into Python modules\n\
for the procedure execution runtime.\n\
\n\
Examples:\n  \
pluto compile procedures/            # Compile every .pluto file below procedures/\n  \
pluto compile heater.pluto --stdout  # Print the generated module\n  \
pluto tree heater.pluto              # Show the syntax tree\n  \
pluto grammar check                  # Verify the internal grammars are up to date"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (.plutorc.json/.plutorc.toml/pluto.toml)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Number of threads to use for parallel compilation
    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Number of threads (default: number of CPU cores)"
    )]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile procedure files into Python modules
    Compile {
        /// Files or directories to compile
        #[arg(required = true, help = "Procedure files, or directories searched for *.pluto")]
        paths: Vec<PathBuf>,

        /// Output directory for generated modules
        #[arg(short, long, help = "Output directory (default: next to each source)")]
        output: Option<PathBuf>,

        /// Procedure name used for the generated class
        #[arg(short, long, help = "Procedure name (default: file stem)")]
        name: Option<String>,

        /// Print generated modules instead of writing files
        #[arg(long, help = "Write generated code to stdout", conflicts_with = "output")]
        stdout: bool,
    },

    /// Print the syntax tree of a procedure
    Tree {
        /// Procedure file to parse
        file: PathBuf,

        /// Grammar rule to start parsing from
        #[arg(long, help = "Start rule (default: procedure_definition)")]
        start: Option<String>,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Maintain the internal grammar files
    Grammar {
        #[command(subcommand)]
        action: GrammarAction,
    },
}

#[derive(Subcommand)]
enum GrammarAction {
    /// Rewrite the .grammar files from the ISO EBNF sources
    Regenerate {
        #[arg(long, default_value = "grammars", help = "Directory holding the grammar files")]
        dir: PathBuf,
    },

    /// Fail if the .grammar files differ from a fresh conversion
    Check {
        #[arg(long, default_value = "grammars", help = "Directory holding the grammar files")]
        dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize colored output
    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::set_override(true);
    } else {
        colored::control::set_override(false);
    }

    let log_filter = if cli.quiet {
        "pluto=error"
    } else {
        match cli.verbose {
            0 => "pluto=warn",
            1 => "pluto=debug",
            _ => "pluto=trace",
        }
    };
    init_tracing_with(log_filter);

    if let Some(threads) = cli.threads
        && let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
    {
        eprintln!("{} Failed to set thread pool size: {e}", "error:".red().bold());
        std::process::exit(1);
    }

    if let Err(e) = run_command(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Some(Commands::Compile {
            paths,
            output,
            name,
            stdout,
        }) => commands::compile::compile_command(
            paths,
            output,
            name,
            stdout,
            quiet,
            cli.config,
        ),

        Some(Commands::Tree { file, start, json }) => {
            commands::tree_command(file, start, json, cli.config)
        }

        Some(Commands::Grammar { action }) => match action {
            GrammarAction::Regenerate { dir } => commands::grammar::regenerate_command(dir, quiet),
            GrammarAction::Check { dir } => commands::grammar::check_command(dir, quiet),
        },

        None => {
            // No subcommand provided, show help
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
