//! Grammar data model
//!
//! Two layers:
//!
//! - [`GrammarDefinition`] is the name-based form read from internal grammar
//!   text. It can be merged with another definition through
//!   [`GrammarDefinition::import`].
//! - [`Grammar`] is the immutable, id-based form the parsing engine runs on.
//!   It is produced by [`Grammar::build`](super::builder) and shared
//!   read-only between concurrent parses.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::error::GrammarError;

/// Index of a rule inside a [`Grammar`]
pub type RuleId = usize;
/// Index of a terminal inside a [`Grammar`]
pub type TerminalId = usize;

/// Tree-shaping annotation attached to a rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shaping {
    /// `!` prefix: keep anonymous literal tokens as children
    pub keep_all_tokens: bool,
    /// `?` prefix: replace the node by its child when it has exactly one
    pub inline_single: bool,
}

/// Right-hand side expression of a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Reference to a rule or terminal by name
    Symbol(String),
    /// Quoted literal text
    Literal(String),
    /// `/regex/flags`
    Pattern { regex: String, flags: String },
    Seq(Vec<Expr>),
    Alt(Vec<Expr>),
    Optional(Box<Expr>),
    Repeat {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
    },
}

impl Expr {
    /// Visit every symbol name referenced by this expression
    pub fn for_each_symbol<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Symbol(name) => f(name),
            Expr::Literal(_) | Expr::Pattern { .. } => {}
            Expr::Seq(items) | Expr::Alt(items) => {
                for item in items {
                    item.for_each_symbol(f);
                }
            }
            Expr::Optional(inner) | Expr::Repeat { expr: inner, .. } => inner.for_each_symbol(f),
        }
    }

    fn rename_symbols(&self, rename: &impl Fn(&str) -> String) -> Expr {
        match self {
            Expr::Symbol(name) => Expr::Symbol(rename(name)),
            Expr::Literal(_) | Expr::Pattern { .. } => self.clone(),
            Expr::Seq(items) => Expr::Seq(items.iter().map(|i| i.rename_symbols(rename)).collect()),
            Expr::Alt(items) => Expr::Alt(items.iter().map(|i| i.rename_symbols(rename)).collect()),
            Expr::Optional(inner) => Expr::Optional(Box::new(inner.rename_symbols(rename))),
            Expr::Repeat { expr, min, max } => Expr::Repeat {
                expr: Box::new(expr.rename_symbols(rename)),
                min: *min,
                max: *max,
            },
        }
    }
}

/// One `name : body` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub shaping: Shaping,
    pub body: Expr,
    /// Line of the definition head in its source text
    pub line: usize,
}

/// Name-based grammar as read from internal grammar text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarDefinition {
    pub rules: Vec<Definition>,
    pub terminals: Vec<Definition>,
}

/// Terminal names have no lowercase letters in their last path segment
pub fn is_terminal_name(name: &str) -> bool {
    let local = local_name(name);
    local.chars().any(|c| c.is_ascii_uppercase()) && !local.chars().any(|c| c.is_ascii_lowercase())
}

/// Name without its `namespace.` prefix
pub fn local_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl GrammarDefinition {
    pub fn push(&mut self, definition: Definition) {
        if is_terminal_name(&definition.name) {
            self.terminals.push(definition);
        } else {
            self.rules.push(definition);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.rules
            .iter()
            .chain(&self.terminals)
            .find(|d| d.name == name)
    }

    /// Import `root` and everything it depends on from `other`.
    ///
    /// The root keeps its name so the importing grammar can reference it
    /// directly. Every other imported symbol is renamed
    /// `<namespace>.<name>` so it cannot clash with local definitions.
    pub fn import(
        &mut self,
        other: &GrammarDefinition,
        namespace: &str,
        root: &str,
    ) -> Result<(), GrammarError> {
        let reachable = other.reachable_from(root)?;
        let rename = |name: &str| {
            if name == root {
                name.to_string()
            } else {
                format!("{namespace}.{name}")
            }
        };

        for definition in other.rules.iter().chain(&other.terminals) {
            if !reachable.contains(definition.name.as_str()) {
                continue;
            }
            self.push(Definition {
                name: rename(&definition.name),
                shaping: definition.shaping,
                body: definition.body.rename_symbols(&rename),
                line: definition.line,
            });
        }
        Ok(())
    }

    fn reachable_from<'a>(&'a self, root: &'a str) -> Result<HashSet<&'a str>, GrammarError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack = vec![(root, root)];
        while let Some((name, referenced_by)) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let definition = self.get(name).ok_or_else(|| GrammarError::UndefinedSymbol {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;
            definition
                .body
                .for_each_symbol(&mut |symbol| stack.push((symbol, definition.name.as_str())));
        }
        Ok(seen)
    }
}

/// Matching strategy of a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalPattern {
    Literal(String),
    Regex(String),
}

/// A compiled terminal
#[derive(Debug, Clone)]
pub struct Terminal {
    pub name: String,
    /// Name used in diagnostics (`"end procedure"` for anonymous literals)
    pub display: String,
    pub pattern: TerminalPattern,
    /// Created from a literal or regex inside a rule body
    pub anonymous: bool,
    /// Never appears in the tree (`_NAME`)
    pub filtered: bool,
    /// Candidates containing a reserved keyword are rejected
    pub keyword_guarded: bool,
    pub(crate) prefix: Regex,
    pub(crate) exact: Regex,
}

/// Parsing expression over compiled ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Rule(RuleId),
    Terminal(TerminalId),
    Seq(Vec<Item>),
    Alt(Vec<Item>),
    Optional(Box<Item>),
    Repeat {
        item: Box<Item>,
        min: usize,
        max: Option<usize>,
    },
}

/// A compiled rule: ordered alternative productions
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub shaping: Shaping,
    pub alternatives: Vec<Item>,
}

impl Rule {
    /// Rules named `_x` are always spliced into their parent
    pub fn is_hidden(&self) -> bool {
        local_name(&self.name).starts_with('_')
    }
}

/// Immutable grammar ready for parsing
#[derive(Debug)]
pub struct Grammar {
    pub(crate) rules: Vec<Rule>,
    pub(crate) terminals: Vec<Terminal>,
    pub(crate) rule_index: HashMap<String, RuleId>,
    pub(crate) ignore: Vec<Regex>,
    pub(crate) keywords: HashSet<String>,
    /// Words of multi-word rule literals, e.g. `["absolute", "time"]`
    pub(crate) phrases: Vec<Vec<String>>,
}

impl Grammar {
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_index.get(name).copied()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id]
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.iter()
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rule_index.contains_key(name)
    }

    /// Words that may not appear inside a keyword guarded terminal
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    /// A keyword guarded candidate is rejected when one of its words is a
    /// keyword or a whole multi-word literal occurs in it at word boundaries
    pub fn is_reserved(&self, candidate: &str) -> bool {
        let words: Vec<&str> = candidate.split_whitespace().collect();
        words.iter().any(|word| self.is_keyword(word))
            || self.phrases.iter().any(|phrase| {
                words
                    .windows(phrase.len())
                    .any(|window| window.iter().zip(phrase).all(|(word, p)| *word == p))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, body: Expr) -> Definition {
        Definition {
            name: name.to_string(),
            shaping: Shaping::default(),
            body,
            line: 1,
        }
    }

    #[test]
    fn test_terminal_naming_convention() {
        assert!(is_terminal_name("DIGIT"));
        assert!(is_terminal_name("_WS"));
        assert!(is_terminal_name("engineering_units.DIGIT"));
        assert!(!is_terminal_name("unit_factor"));
        assert!(!is_terminal_name("engineering_units.unit_factor"));
        assert!(!is_terminal_name("_hidden"));
    }

    #[test]
    fn test_import_renames_dependencies_under_namespace() {
        let mut units = GrammarDefinition::default();
        units.push(def("units", Expr::Symbol("unit".into())));
        units.push(def("unit", Expr::Symbol("NAME".into())));
        units.push(def("NAME", Expr::Literal("m".into())));
        units.push(def("unused", Expr::Literal("x".into())));

        let mut main = GrammarDefinition::default();
        main.push(def("quantity", Expr::Symbol("units".into())));
        main.import(&units, "units", "units").unwrap();

        assert!(main.get("units").is_some());
        assert_eq!(
            main.get("units").unwrap().body,
            Expr::Symbol("units.unit".into())
        );
        assert_eq!(
            main.get("units.unit").unwrap().body,
            Expr::Symbol("units.NAME".into())
        );
        assert!(main.get("units.NAME").is_some());
        assert!(main.get("units.unused").is_none());
        assert_eq!(main.terminals.len(), 1);
    }

    #[test]
    fn test_import_of_missing_root_fails() {
        let units = GrammarDefinition::default();
        let mut main = GrammarDefinition::default();
        let err = main.import(&units, "units", "units").unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedSymbol { .. }));
    }
}
