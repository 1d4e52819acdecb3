//! Grammar toolchain
//!
//! [`ebnf`] rewrites the published ISO EBNF into internal grammar text,
//! [`loader`] reads that text and [`builder`] compiles it into the
//! [`Grammar`] the parsing engine runs on. [`registry`] ties the two
//! checked-in grammars together.

pub mod builder;
pub mod ebnf;
pub mod loader;
pub mod model;
pub mod registry;
mod rewrite;

pub use builder::GrammarOptions;
pub use ebnf::{GrammarCompiler, Replacement, RewriteRules};
pub use loader::parse_grammar;
pub use model::{
    Definition, Expr, Grammar, GrammarDefinition, Item, Rule, RuleId, Shaping, Terminal,
    TerminalId, TerminalPattern,
};
pub use registry::{
    GrammarRegistry, GrammarSources, PLUTO_EBNF, PLUTO_GRAMMAR, PROCEDURE_ROOT, UNITS_EBNF,
    UNITS_GRAMMAR, UNITS_NAMESPACE, UNITS_ROOT, regenerate,
};
