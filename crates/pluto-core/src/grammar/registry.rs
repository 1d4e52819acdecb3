//! Process-wide grammar registry
//!
//! # Overview
//!
//! Both internal grammars are read and compiled once per process. The
//! engineering units grammar is imported into the procedure grammar under
//! the `engineering_units` namespace, with its root keeping the bare name so
//! `integer_constant` and friends can reference it directly.
//!
//! The registry is immutable after construction and shared by every parse,
//! including parses running on different threads.

use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::builder::GrammarOptions;
use super::ebnf::{GrammarCompiler, RewriteRules};
use super::loader::parse_grammar;
use super::model::Grammar;
use crate::error::{GrammarError, PlutoError};
use crate::result::Result;

/// Namespace prefix of symbols imported from the units grammar
pub const UNITS_NAMESPACE: &str = "engineering_units";
/// Root rule of the units grammar
pub const UNITS_ROOT: &str = "engineering_units";
/// Root rule of the procedure grammar
pub const PROCEDURE_ROOT: &str = "procedure_definition";

pub const PLUTO_EBNF: &str = include_str!("../../grammars/pluto.ebnf");
pub const PLUTO_GRAMMAR: &str = include_str!("../../grammars/pluto.grammar");
pub const UNITS_EBNF: &str = include_str!("../../grammars/engineering_units.ebnf");
pub const UNITS_GRAMMAR: &str = include_str!("../../grammars/engineering_units.grammar");

/// Skipped before every token: whitespace, block and line comments
const DEFAULT_IGNORE: &[&str] = &[r"\s+", r"/\*(?s:.*?)\*/", r"//[^\n]*"];

static GLOBAL: OnceCell<GrammarRegistry> = OnceCell::new();

impl GrammarOptions {
    /// Options for the procedure grammar
    pub fn pluto() -> Self {
        Self {
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            keyword_guarded: vec!["IDENTIFIER".to_string()],
            reserved: vec!["NOT".to_string()],
        }
    }

    /// Options for the standalone engineering units grammar
    pub fn engineering_units() -> Self {
        Self {
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            keyword_guarded: Vec::new(),
            reserved: Vec::new(),
        }
    }
}

/// Internal grammar texts the registry is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarSources {
    pub pluto: String,
    pub engineering_units: String,
}

impl Default for GrammarSources {
    fn default() -> Self {
        Self {
            pluto: PLUTO_GRAMMAR.to_string(),
            engineering_units: UNITS_GRAMMAR.to_string(),
        }
    }
}

impl GrammarSources {
    /// Read replacement grammar files from disk
    pub fn from_files(pluto: &Path, engineering_units: &Path) -> Result<Self> {
        let read = |path: &Path| fs::read_to_string(path).map_err(|e| PlutoError::io_error(path, e));
        Ok(Self {
            pluto: read(pluto)?,
            engineering_units: read(engineering_units)?,
        })
    }
}

/// Compiled grammars shared by all parses
#[derive(Debug)]
pub struct GrammarRegistry {
    procedure: Grammar,
    units: Grammar,
}

impl GrammarRegistry {
    /// Registry built from the embedded grammars, compiled on first use
    pub fn global() -> std::result::Result<&'static GrammarRegistry, GrammarError> {
        GLOBAL.get_or_try_init(|| {
            info!("Compiling embedded PLUTO grammars");
            Self::from_sources(&GrammarSources::default())
        })
    }

    pub fn from_sources(sources: &GrammarSources) -> std::result::Result<Self, GrammarError> {
        let units_definition = parse_grammar(&sources.engineering_units)?;
        let units = Grammar::build(&units_definition, &GrammarOptions::engineering_units())?;

        let mut definition = parse_grammar(&sources.pluto)?;
        definition.import(&units_definition, UNITS_NAMESPACE, UNITS_ROOT)?;
        let procedure = Grammar::build(&definition, &GrammarOptions::pluto())?;

        debug!(
            rules = procedure.rules().count(),
            terminals = procedure.terminals().count(),
            "Grammar registry ready"
        );
        Ok(Self { procedure, units })
    }

    /// Procedure grammar with the units grammar imported
    pub fn procedure_grammar(&self) -> &Grammar {
        &self.procedure
    }

    /// Engineering units grammar on its own
    pub fn units_grammar(&self) -> &Grammar {
        &self.units
    }
}

/// Regenerate the internal grammar text of both grammars from ISO EBNF
pub fn regenerate(pluto_ebnf: &str, units_ebnf: &str) -> Result<GrammarSources> {
    let pluto = GrammarCompiler::new(RewriteRules::pluto())?.convert(pluto_ebnf)?;
    let engineering_units =
        GrammarCompiler::new(RewriteRules::engineering_units())?.convert(units_ebnf)?;
    Ok(GrammarSources {
        pluto,
        engineering_units,
    })
}
