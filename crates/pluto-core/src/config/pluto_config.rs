//! Compiler configuration structure
//!
//! ## Example Configuration (pluto.toml)
//!
//! ```toml
//! [compiler]
//! procedureName = "heater_check"
//!
//! [output]
//! extension = "py"
//! directory = "generated"
//!
//! [grammar]
//! pluto = "grammars/pluto.grammar"
//! engineeringUnits = "grammars/engineering_units.grammar"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PlutoError;
use crate::grammar::GrammarSources;
use crate::result::Result;
use crate::semantic::DEFAULT_PROCEDURE_NAME;

const DEFAULT_EXTENSION: &str = "py";

/// Top-level configuration; every section is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSection>,

    /// Internal grammar files replacing the embedded ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<GrammarSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSection {
    /// Procedure name used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputSection {
    /// Extension of generated files, without the dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Directory for generated files; next to each source when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrammarSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pluto: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engineering_units: Option<PathBuf>,
}

impl CompilerConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PlutoError::io_error(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                PlutoError::config_error(format!("Invalid TOML in '{}': {e}", path.display()))
            }),
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                PlutoError::config_error(format!("Invalid JSON in '{}': {e}", path.display()))
            }),
            _ => Err(PlutoError::config_error(format!(
                "Unsupported config file '{}' (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    pub fn procedure_name(&self) -> &str {
        self.compiler
            .as_ref()
            .and_then(|c| c.procedure_name.as_deref())
            .unwrap_or(DEFAULT_PROCEDURE_NAME)
    }

    pub fn output_extension(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.extension.as_deref())
            .map(|ext| ext.trim_start_matches('.'))
            .unwrap_or(DEFAULT_EXTENSION)
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output.as_ref().and_then(|o| o.directory.as_deref())
    }

    /// Grammar sources, if this configuration overrides either grammar.
    /// Relative paths are resolved against `base`.
    pub fn grammar_sources(&self, base: &Path) -> Result<Option<GrammarSources>> {
        let Some(section) = &self.grammar else {
            return Ok(None);
        };
        if section.pluto.is_none() && section.engineering_units.is_none() {
            return Ok(None);
        }

        let mut sources = GrammarSources::default();
        if let Some(path) = &section.pluto {
            let path = base.join(path);
            sources.pluto = fs::read_to_string(&path).map_err(|e| PlutoError::io_error(&path, e))?;
        }
        if let Some(path) = &section.engineering_units {
            let path = base.join(path);
            sources.engineering_units =
                fs::read_to_string(&path).map_err(|e| PlutoError::io_error(&path, e))?;
        }
        Ok(Some(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.procedure_name(), "noname");
        assert_eq!(config.output_extension(), "py");
        assert_eq!(config.output_directory(), None);
        assert!(config.grammar_sources(Path::new(".")).unwrap().is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let config: CompilerConfig = serde_json::from_str(
            r#"{
                "compiler": { "procedureName": "heater" },
                "output": { "extension": ".pyw" },
                "grammar": { "engineeringUnits": "units.grammar" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.procedure_name(), "heater");
        assert_eq!(config.output_extension(), "pyw");
        assert_eq!(
            config.grammar.unwrap().engineering_units,
            Some(PathBuf::from("units.grammar"))
        );
    }
}
