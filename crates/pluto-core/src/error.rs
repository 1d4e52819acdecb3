//! Error types for grammar conversion, parsing and compilation
//!
//! Each pipeline stage owns one error family. They never overlap: a failure
//! is reported by the stage that detected it and nothing is recovered
//! internally. [`PlutoError`] wraps them for callers that drive the whole
//! pipeline (CLI, configuration loading, file output).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for PLUTO operations
#[derive(Debug, Error)]
pub enum PlutoError {
    /// The published EBNF could not be rewritten into internal syntax
    #[error(transparent)]
    GrammarConversion(#[from] GrammarConversionError),

    /// An internal grammar asset is malformed
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// Procedure text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The syntax tree could not be translated
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GrammarConversion,
    Grammar,
    Parse,
    Compile,
    Config,
    Io,
}

impl PlutoError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlutoError::GrammarConversion(_) => ErrorKind::GrammarConversion,
            PlutoError::Grammar(_) => ErrorKind::Grammar,
            PlutoError::Parse(_) => ErrorKind::Parse,
            PlutoError::Compile(_) => ErrorKind::Compile,
            PlutoError::ConfigError { .. } => ErrorKind::Config,
            PlutoError::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Failure while rewriting ISO EBNF into internal grammar syntax
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarConversionError {
    /// A caller supplied rewrite pattern is not a valid regex
    #[error("invalid rewrite pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Two distinct rule spellings fold to the same internal name
    #[error("rules '{first}' and '{second}' both fold to '{folded}'")]
    FoldCollision {
        first: String,
        second: String,
        folded: String,
    },

    /// A promoted terminal clashes with a definition that already uses its name
    #[error("promoting rule '{rule}' to terminal '{terminal}' collides with an existing definition")]
    TerminalCollision { rule: String, terminal: String },

    /// A terminal promotion names a rule the grammar does not define
    #[error("terminal promotion names unknown rule '{name}'")]
    UnknownTerminal { name: String },
}

impl GrammarConversionError {
    pub fn invalid_pattern(pattern: impl Into<String>, source: &regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: source.to_string(),
        }
    }
}

/// Malformed internal grammar text or an invalid grammar structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("symbol '{name}' is defined more than once")]
    DuplicateDefinition { name: String },

    #[error("undefined symbol '{name}' referenced by '{referenced_by}'")]
    UndefinedSymbol { name: String, referenced_by: String },

    #[error("terminal '{terminal}' references rule '{rule}'")]
    TerminalReferencesRule { terminal: String, rule: String },

    #[error("terminal '{terminal}' is defined in terms of itself")]
    TerminalCycle { terminal: String },

    #[error("terminal '{terminal}' does not compile to a valid pattern: {message}")]
    InvalidPattern { terminal: String, message: String },

    #[error("rule '{rule}' is left recursive")]
    LeftRecursion { rule: String },

    #[error("rule '{rule}' repeats an expression that can match nothing")]
    NullableRepeat { rule: String },
}

impl GrammarError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Unparseable or unresolvably ambiguous procedure text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(
        "syntax error at line {line}, column {column}: expected one of {}, found {found}",
        .expected.join(", ")
    )]
    Syntax {
        offset: usize,
        line: usize,
        column: usize,
        expected: Vec<String>,
        found: String,
    },

    #[error(
        "ambiguous parse of '{rule}' at {start}..{end}: {}",
        .derivations.join(" | ")
    )]
    Ambiguous {
        rule: String,
        start: usize,
        end: usize,
        derivations: Vec<String>,
    },

    #[error("unknown start rule '{rule}'")]
    UnknownStartRule { rule: String },
}

impl ParseError {
    /// Character offset the error refers to, if any
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { offset, .. } => Some(*offset),
            ParseError::Ambiguous { start, .. } => Some(*start),
            ParseError::UnknownStartRule { .. } => None,
        }
    }
}

/// Unsupported or malformed construct found during translation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("'{rule}' at offset {offset} is not supported")]
    Unsupported { rule: String, offset: usize },

    #[error("malformed '{rule}' at offset {offset}: {message}")]
    Malformed {
        rule: String,
        offset: usize,
        message: String,
    },

    #[error("unrecognized {rule} keyword '{keyword}' at offset {offset}")]
    UnknownKeyword {
        rule: String,
        keyword: String,
        offset: usize,
    },

    #[error("no action registered for rule '{rule}' at offset {offset}")]
    UnknownRule { rule: String, offset: usize },
}

impl CompileError {
    pub fn unsupported(rule: impl Into<String>, offset: usize) -> Self {
        Self::Unsupported {
            rule: rule.into(),
            offset,
        }
    }

    pub fn malformed(rule: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            rule: rule.into(),
            offset,
            message: message.into(),
        }
    }

    pub fn unknown_keyword(
        rule: impl Into<String>,
        keyword: impl Into<String>,
        offset: usize,
    ) -> Self {
        Self::UnknownKeyword {
            rule: rule.into(),
            keyword: keyword.into(),
            offset,
        }
    }

    /// Name of the grammar rule the error was raised for
    pub fn rule(&self) -> &str {
        match self {
            CompileError::Unsupported { rule, .. }
            | CompileError::Malformed { rule, .. }
            | CompileError::UnknownKeyword { rule, .. }
            | CompileError::UnknownRule { rule, .. } => rule,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            CompileError::Unsupported { offset, .. }
            | CompileError::Malformed { offset, .. }
            | CompileError::UnknownKeyword { offset, .. }
            | CompileError::UnknownRule { offset, .. } => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err: PlutoError = CompileError::unsupported("for_statement", 12).into();
        assert_eq!(err.kind(), ErrorKind::Compile);

        let err = PlutoError::config_error("bad");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_syntax_error_message_lists_expected() {
        let err = ParseError::Syntax {
            offset: 4,
            line: 1,
            column: 5,
            expected: vec!["\"main\"".to_string(), "\"declare\"".to_string()],
            found: "'foo'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error at line 1, column 5: expected one of \"main\", \"declare\", found 'foo'"
        );
    }

    #[test]
    fn test_compile_error_accessors() {
        let err = CompileError::unknown_keyword("continuation_action", "skip", 40);
        assert_eq!(err.rule(), "continuation_action");
        assert_eq!(err.offset(), 40);
    }
}
