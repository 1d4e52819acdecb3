//! Grammar maintenance commands
//!
//! The `.grammar` files next to the ISO EBNF sources are generated. These
//! commands regenerate them, or verify that the checked-in copies are
//! still what the converter produces.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use colored::Colorize;
use pluto_core::grammar::{GrammarSources, regenerate};
use tracing::info;

const PLUTO_EBNF_FILE: &str = "pluto.ebnf";
const PLUTO_GRAMMAR_FILE: &str = "pluto.grammar";
const UNITS_EBNF_FILE: &str = "engineering_units.ebnf";
const UNITS_GRAMMAR_FILE: &str = "engineering_units.grammar";

/// Regenerate both internal grammars in `dir`
pub fn regenerate_command(dir: PathBuf, quiet: bool) -> anyhow::Result<()> {
    let sources = convert(&dir)?;
    for (file, text) in outputs(&sources) {
        let path = dir.join(file);
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        if !quiet {
            println!("{} {}", "✓".green(), path.display());
        }
    }
    Ok(())
}

/// Fail if a checked-in grammar differs from a fresh conversion
pub fn check_command(dir: PathBuf, quiet: bool) -> anyhow::Result<()> {
    let sources = convert(&dir)?;
    let mut stale = Vec::new();
    for (file, expected) in outputs(&sources) {
        let path = dir.join(file);
        let current = fs::read_to_string(&path).unwrap_or_default();
        if current != expected {
            stale.push(path);
        }
    }

    if !stale.is_empty() {
        for path in &stale {
            eprintln!("{} {} is out of date", "✗".red(), path.display());
        }
        bail!("Run `pluto grammar regenerate` to update {} file(s)", stale.len());
    }
    if !quiet {
        println!("{} Grammars are up to date", "✓".green());
    }
    Ok(())
}

fn convert(dir: &Path) -> anyhow::Result<GrammarSources> {
    let read = |file: &str| {
        let path = dir.join(file);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    };
    let pluto = read(PLUTO_EBNF_FILE)?;
    let units = read(UNITS_EBNF_FILE)?;
    Ok(regenerate(&pluto, &units)?)
}

fn outputs(sources: &GrammarSources) -> [(&'static str, &str); 2] {
    [
        (PLUTO_GRAMMAR_FILE, sources.pluto.as_str()),
        (UNITS_GRAMMAR_FILE, sources.engineering_units.as_str()),
    ]
}
