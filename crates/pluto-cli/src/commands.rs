//! CLI command implementations
//!
//! Commands are organized hierarchically:
//! - `tree` is implemented in this file
//! - commands with more moving parts live in submodules:
//!   - commands/compile.rs - Procedure compilation
//!   - commands/grammar.rs - Grammar regeneration and checks

pub mod compile;
pub mod grammar;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pluto_core::{CompilerConfig, ConfigLoader, GrammarRegistry, PROCEDURE_ROOT, PlutoParser};
use tracing::debug;

/// Configuration plus the grammar registry it selects
pub struct Session {
    pub config: CompilerConfig,
    custom_registry: Option<GrammarRegistry>,
}

impl Session {
    /// Load configuration for work rooted at `start`
    pub fn load(config_path: Option<&Path>, start: &Path) -> anyhow::Result<Self> {
        let start_dir = match start.parent() {
            Some(parent) if start.is_file() && !parent.as_os_str().is_empty() => parent,
            _ if start.is_dir() => start,
            _ => Path::new("."),
        };

        let (config, source) = ConfigLoader::load(config_path, Some(start_dir))?;
        if let Some(path) = &source {
            debug!("Using configuration from {}", path.display());
        }

        // Grammar overrides are relative to the config file
        let base = source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let custom_registry = match config.grammar_sources(&base)? {
            Some(sources) => Some(
                GrammarRegistry::from_sources(&sources)
                    .context("Failed to build the configured grammars")?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            custom_registry,
        })
    }

    pub fn registry(&self) -> anyhow::Result<&GrammarRegistry> {
        match &self.custom_registry {
            Some(registry) => Ok(registry),
            None => Ok(GrammarRegistry::global()?),
        }
    }
}

/// Tree command implementation
pub fn tree_command(
    file: PathBuf,
    start: Option<String>,
    json: bool,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = Session::load(config_path.as_deref(), &file)?;
    let source = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let parser = PlutoParser::with_registry(session.registry()?);
    let start = start.as_deref().unwrap_or(PROCEDURE_ROOT);
    let tree = parser
        .parse_rule(&source, start)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", tree.pretty());
    }
    Ok(())
}
