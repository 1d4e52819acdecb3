//! PLUTO Core
//!
//! Compiler for the PLUTO spacecraft procedure language (ECSS-E-ST-70-32C).
//! The pipeline is strictly linear:
//!
//! 1. [`grammar`]: the published ISO EBNF is rewritten into internal
//!    grammar syntax and built into immutable, process-wide grammars.
//! 2. [`parser`]: procedure text is parsed into a [`SyntaxNode`] tree with
//!    character offsets.
//! 3. [`semantic`]: the tree is translated bottom-up into a [`ProcedureIr`].
//! 4. [`export`]: the IR is serialized into Python for the procedure runtime.
//!
//! [`compile`] and [`parse_tree`] run the whole pipeline and touch no files.

pub mod config;
pub mod cst;
pub mod error;
pub mod export;
pub mod grammar;
pub mod parser;
pub mod result;
pub mod semantic;

// Re-export commonly used types
pub use config::{CompilerConfig, ConfigLoader};
pub use cst::{SyntaxChild, SyntaxNode, Token};
pub use error::{
    CompileError, ErrorKind, GrammarConversionError, GrammarError, ParseError, PlutoError,
};
pub use export::{ProcedureIr, PythonEmitter, TargetEmitter};
pub use grammar::{
    GrammarCompiler, GrammarOptions, GrammarRegistry, GrammarSources, PROCEDURE_ROOT,
    RewriteRules, UNITS_ROOT,
};
pub use parser::PlutoParser;
pub use result::Result;
pub use semantic::{DEFAULT_PROCEDURE_NAME, RuleKind, Transformer};

/// Compile procedure source into Python using the embedded grammars
pub fn compile(source: &str, procedure_name: &str) -> Result<String> {
    compile_with(GrammarRegistry::global()?, source, procedure_name)
}

/// Compile procedure source into Python using `registry`
pub fn compile_with(
    registry: &GrammarRegistry,
    source: &str,
    procedure_name: &str,
) -> Result<String> {
    let ir = compile_to_ir(registry, source, procedure_name)?;
    Ok(PythonEmitter.emit(&ir))
}

/// Parse and translate procedure source without serializing it
pub fn compile_to_ir(
    registry: &GrammarRegistry,
    source: &str,
    procedure_name: &str,
) -> Result<ProcedureIr> {
    let tree = PlutoParser::with_registry(registry).parse(source)?;
    let ir = Transformer::new(procedure_name).transform(&tree)?;
    tracing::debug!(
        procedure = procedure_name,
        declarations = ir.declarations.len(),
        "Compiled procedure"
    );
    Ok(ir)
}

/// Parse `source` as `start_rule` (default `procedure_definition`)
pub fn parse_tree(source: &str, start_rule: Option<&str>) -> Result<SyntaxNode> {
    let parser = PlutoParser::new()?;
    Ok(parser.parse_rule(source, start_rule.unwrap_or(PROCEDURE_ROOT))?)
}

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    init_tracing_with("pluto=info");
}

/// Initialize tracing with `default_filter` unless `RUST_LOG` is set
pub fn init_tracing_with(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
