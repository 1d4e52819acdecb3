//! Procedure parser
//!
//! Thin entry point over the shared [`GrammarRegistry`]. A parser holds no
//! per-parse state, so one instance can serve any number of threads.

use tracing::debug;

use crate::cst::{self, SyntaxNode};
use crate::error::ParseError;
use crate::grammar::{GrammarRegistry, PROCEDURE_ROOT};
use crate::result::Result;

#[derive(Debug, Clone, Copy)]
pub struct PlutoParser<'r> {
    registry: &'r GrammarRegistry,
}

impl PlutoParser<'static> {
    /// Parser over the embedded grammars
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: GrammarRegistry::global()?,
        })
    }
}

impl<'r> PlutoParser<'r> {
    pub fn with_registry(registry: &'r GrammarRegistry) -> Self {
        Self { registry }
    }

    /// Parse a complete procedure
    pub fn parse(&self, source: &str) -> std::result::Result<SyntaxNode, ParseError> {
        self.parse_rule(source, PROCEDURE_ROOT)
    }

    /// Parse `source` as a single instance of `start`
    pub fn parse_rule(
        &self,
        source: &str,
        start: &str,
    ) -> std::result::Result<SyntaxNode, ParseError> {
        debug!("Parsing {} characters as '{}'", source.chars().count(), start);
        cst::parse_with(self.registry.procedure_grammar(), source, start)
    }

    /// Parse an engineering units expression such as `km/h`
    pub fn parse_units(&self, source: &str) -> std::result::Result<SyntaxNode, ParseError> {
        cst::parse_with(
            self.registry.units_grammar(),
            source,
            crate::grammar::UNITS_ROOT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_start_rule() {
        let parser = PlutoParser::new().unwrap();
        let err = parser.parse_rule("x", "no_such_rule").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownStartRule {
                rule: "no_such_rule".to_string()
            }
        );
    }

    #[test]
    fn test_expression_start_rule() {
        let parser = PlutoParser::new().unwrap();
        let tree = parser.parse_rule("Pump Speed + 2", "expression").unwrap();
        assert_eq!(tree.rule, "expression");
        assert_eq!((tree.start, tree.end), (0, 14));
    }

    #[test]
    fn test_units_grammar() {
        let parser = PlutoParser::new().unwrap();
        let tree = parser.parse_units("km/h").unwrap();
        assert_eq!(tree.text(), "km/h");
    }
}
