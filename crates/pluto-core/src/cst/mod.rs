//! Concrete syntax tree and the engine that produces it

mod engine;
pub mod source;
pub mod tree;

pub use source::SourceIndex;
pub use tree::{SyntaxChild, SyntaxNode, Token};

use crate::error::ParseError;
use crate::grammar::Grammar;

/// Parse `text` with `grammar`, starting at rule `start`
pub fn parse_with(grammar: &Grammar, text: &str, start: &str) -> Result<SyntaxNode, ParseError> {
    let Some(rule) = grammar.rule_id(start) else {
        return Err(ParseError::UnknownStartRule {
            rule: start.to_string(),
        });
    };
    engine::Engine::new(grammar, text).parse(rule)
}
