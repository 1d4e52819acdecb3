//! Compilation of a [`GrammarDefinition`] into an immutable [`Grammar`]
//!
//! # Overview
//!
//! - Named terminals are flattened into a single regex each. Literals and
//!   patterns used inside rule bodies become anonymous terminals.
//! - Rule bodies are resolved to ids; the top-level alternation becomes the
//!   rule's ordered alternative list.
//! - Left recursion and repetition over nullable expressions are rejected,
//!   since the engine cannot terminate on either.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use super::model::{
    Definition, Expr, Grammar, GrammarDefinition, Item, Rule, RuleId, Terminal, TerminalId,
    TerminalPattern, local_name,
};
use crate::error::GrammarError;

/// Build options that are not part of the grammar text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarOptions {
    /// Patterns skipped before every token
    pub ignore: Vec<String>,
    /// Terminals whose matches may not contain a reserved keyword. Every
    /// terminal defined in terms of one of these is guarded as well.
    pub keyword_guarded: Vec<String>,
    /// Keywords in addition to the words of rule literals, for operators
    /// that are spelled as words but defined as terminals
    pub reserved: Vec<String>,
}

impl Grammar {
    /// Compile `definition` into a grammar ready for parsing
    pub fn build(
        definition: &GrammarDefinition,
        options: &GrammarOptions,
    ) -> Result<Grammar, GrammarError> {
        let mut builder = Builder::new(definition)?;
        builder.compile_terminals(options)?;
        let rules = builder.compile_rules()?;
        builder.keywords.extend(options.reserved.iter().cloned());
        let ignore = options
            .ignore
            .iter()
            .map(|pattern| anchored(pattern, "%ignore"))
            .collect::<Result<Vec<_>, _>>()?;

        let grammar = Grammar {
            rules,
            terminals: builder.terminals,
            rule_index: builder.rule_index,
            ignore,
            keywords: builder.keywords,
            phrases: builder.phrases,
        };
        validate(&grammar)?;

        debug!(
            rules = grammar.rules.len(),
            terminals = grammar.terminals.len(),
            keywords = grammar.keywords.len(),
            "Built grammar"
        );
        Ok(grammar)
    }
}

struct Builder<'d> {
    definition: &'d GrammarDefinition,
    terminal_defs: HashMap<&'d str, &'d Definition>,
    rule_index: HashMap<String, RuleId>,
    sources: HashMap<String, String>,
    terminals: Vec<Terminal>,
    terminal_index: HashMap<String, TerminalId>,
    keywords: HashSet<String>,
    phrases: Vec<Vec<String>>,
}

impl<'d> Builder<'d> {
    fn new(definition: &'d GrammarDefinition) -> Result<Self, GrammarError> {
        let mut seen = HashSet::new();
        for def in definition.rules.iter().chain(&definition.terminals) {
            if !seen.insert(def.name.as_str()) {
                return Err(GrammarError::DuplicateDefinition {
                    name: def.name.clone(),
                });
            }
        }

        Ok(Self {
            definition,
            terminal_defs: definition
                .terminals
                .iter()
                .map(|def| (def.name.as_str(), def))
                .collect(),
            rule_index: definition
                .rules
                .iter()
                .enumerate()
                .map(|(id, def)| (def.name.clone(), id))
                .collect(),
            sources: HashMap::new(),
            terminals: Vec::new(),
            terminal_index: HashMap::new(),
            keywords: HashSet::new(),
            phrases: Vec::new(),
        })
    }

    fn compile_terminals(&mut self, options: &GrammarOptions) -> Result<(), GrammarError> {
        let definition = self.definition;
        let mut guarded: HashSet<&str> = options
            .keyword_guarded
            .iter()
            .map(String::as_str)
            .collect();
        // Propagate guards through terminal references until stable
        loop {
            let before = guarded.len();
            for def in &definition.terminals {
                let mut references_guarded = false;
                def.body
                    .for_each_symbol(&mut |symbol| references_guarded |= guarded.contains(symbol));
                if references_guarded {
                    guarded.insert(def.name.as_str());
                }
            }
            if guarded.len() == before {
                break;
            }
        }

        for def in &definition.terminals {
            let source = self.terminal_source(&def.name, &mut Vec::new())?;
            let pattern = match &def.body {
                Expr::Literal(text) => TerminalPattern::Literal(text.clone()),
                _ => TerminalPattern::Regex(source.clone()),
            };
            let terminal = Terminal {
                name: def.name.clone(),
                display: def.name.clone(),
                pattern,
                anonymous: false,
                filtered: local_name(&def.name).starts_with('_'),
                keyword_guarded: guarded.contains(def.name.as_str()),
                prefix: anchored(&source, &def.name)?,
                exact: exact(&source, &def.name)?,
            };
            self.terminal_index
                .insert(def.name.clone(), self.terminals.len());
            self.terminals.push(terminal);
        }
        Ok(())
    }

    fn terminal_source(
        &mut self,
        name: &str,
        stack: &mut Vec<String>,
    ) -> Result<String, GrammarError> {
        if let Some(source) = self.sources.get(name) {
            return Ok(source.clone());
        }
        if stack.iter().any(|n| n == name) {
            return Err(GrammarError::TerminalCycle {
                terminal: name.to_string(),
            });
        }
        let Some(def) = self.terminal_defs.get(name).copied() else {
            return Err(GrammarError::UndefinedSymbol {
                name: name.to_string(),
                referenced_by: stack.last().cloned().unwrap_or_default(),
            });
        };

        stack.push(name.to_string());
        let source = self.regex_source(&def.body, stack)?;
        stack.pop();

        self.sources.insert(name.to_string(), source.clone());
        Ok(source)
    }

    fn regex_source(&mut self, expr: &Expr, stack: &mut Vec<String>) -> Result<String, GrammarError> {
        Ok(match expr {
            Expr::Symbol(name) => {
                if self.rule_index.contains_key(name) {
                    return Err(GrammarError::TerminalReferencesRule {
                        terminal: stack.last().cloned().unwrap_or_default(),
                        rule: name.clone(),
                    });
                }
                format!("(?:{})", self.terminal_source(name, stack)?)
            }
            Expr::Literal(text) => regex::escape(text),
            Expr::Pattern { regex, flags } => pattern_group(regex, flags),
            Expr::Seq(items) => items
                .iter()
                .map(|item| self.regex_source(item, stack))
                .collect::<Result<Vec<_>, _>>()?
                .concat(),
            Expr::Alt(items) => format!(
                "(?:{})",
                items
                    .iter()
                    .map(|item| self.regex_source(item, stack))
                    .collect::<Result<Vec<_>, _>>()?
                    .join("|")
            ),
            Expr::Optional(inner) => format!("(?:{})?", self.regex_source(inner, stack)?),
            Expr::Repeat { expr, min, max } => {
                let inner = self.regex_source(expr, stack)?;
                let quantifier = match (min, max) {
                    (0, None) => "*".to_string(),
                    (1, None) => "+".to_string(),
                    (n, None) => format!("{{{n},}}"),
                    (n, Some(m)) if n == m => format!("{{{n}}}"),
                    (n, Some(m)) => format!("{{{n},{m}}}"),
                };
                format!("(?:{inner}){quantifier}")
            }
        })
    }

    fn compile_rules(&mut self) -> Result<Vec<Rule>, GrammarError> {
        let definition = self.definition;
        let mut rules = Vec::with_capacity(definition.rules.len());
        for def in &definition.rules {
            let alternatives = match &def.body {
                Expr::Alt(items) => items
                    .iter()
                    .map(|item| self.compile_item(item, &def.name))
                    .collect::<Result<Vec<_>, _>>()?,
                body => vec![self.compile_item(body, &def.name)?],
            };
            rules.push(Rule {
                name: def.name.clone(),
                shaping: def.shaping,
                alternatives,
            });
        }
        Ok(rules)
    }

    fn compile_item(&mut self, expr: &Expr, owner: &str) -> Result<Item, GrammarError> {
        Ok(match expr {
            Expr::Symbol(name) => {
                if let Some(&id) = self.rule_index.get(name) {
                    Item::Rule(id)
                } else if let Some(&id) = self.terminal_index.get(name) {
                    Item::Terminal(id)
                } else {
                    return Err(GrammarError::UndefinedSymbol {
                        name: name.clone(),
                        referenced_by: owner.to_string(),
                    });
                }
            }
            Expr::Literal(text) => {
                let words: Vec<String> = text.split_whitespace().map(String::from).collect();
                if let [word] = words.as_slice() {
                    if word.chars().all(char::is_alphabetic) {
                        self.keywords.insert(word.clone());
                    }
                } else if !words.is_empty() && !self.phrases.contains(&words) {
                    self.phrases.push(words);
                }
                let key = format!("\"{text}\"");
                let source = literal_source(text);
                Item::Terminal(self.anonymous(key, TerminalPattern::Literal(text.clone()), &source)?)
            }
            Expr::Pattern { regex, flags } => {
                let key = format!("/{regex}/{flags}");
                let source = pattern_group(regex, flags);
                Item::Terminal(self.anonymous(key, TerminalPattern::Regex(source.clone()), &source)?)
            }
            Expr::Seq(items) => Item::Seq(
                items
                    .iter()
                    .map(|item| self.compile_item(item, owner))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Alt(items) => Item::Alt(
                items
                    .iter()
                    .map(|item| self.compile_item(item, owner))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Optional(inner) => Item::Optional(Box::new(self.compile_item(inner, owner)?)),
            Expr::Repeat { expr, min, max } => Item::Repeat {
                item: Box::new(self.compile_item(expr, owner)?),
                min: *min,
                max: *max,
            },
        })
    }

    fn anonymous(
        &mut self,
        key: String,
        pattern: TerminalPattern,
        source: &str,
    ) -> Result<TerminalId, GrammarError> {
        if let Some(&id) = self.terminal_index.get(&key) {
            return Ok(id);
        }
        let id = self.terminals.len();
        self.terminals.push(Terminal {
            name: key.clone(),
            display: key.clone(),
            pattern,
            anonymous: true,
            filtered: false,
            keyword_guarded: false,
            prefix: anchored(source, &key)?,
            exact: exact(source, &key)?,
        });
        self.terminal_index.insert(key, id);
        Ok(id)
    }
}

/// Literal inside a rule: words match across any whitespace run and a
/// trailing word character must end at a word boundary.
fn literal_source(text: &str) -> String {
    let words: Vec<String> = text.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return regex::escape(text);
    }
    let mut source = words.join(r"\s+");
    if text.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
        source.push_str(r"\b");
    }
    source
}

fn pattern_group(regex: &str, flags: &str) -> String {
    if flags.is_empty() {
        format!("(?:{regex})")
    } else {
        format!("(?{flags}:{regex})")
    }
}

fn anchored(source: &str, owner: &str) -> Result<Regex, GrammarError> {
    compile(&format!("^(?:{source})"), owner)
}

fn exact(source: &str, owner: &str) -> Result<Regex, GrammarError> {
    compile(&format!("^(?:{source})$"), owner)
}

fn compile(pattern: &str, owner: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|e| GrammarError::InvalidPattern {
        terminal: owner.to_string(),
        message: e.to_string(),
    })
}

fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    let nullable = nullable_rules(grammar);

    for rule in &grammar.rules {
        for alternative in &rule.alternatives {
            if has_nullable_repeat(alternative, &nullable) {
                return Err(GrammarError::NullableRepeat {
                    rule: rule.name.clone(),
                });
            }
        }
    }

    let leading: Vec<Vec<RuleId>> = grammar
        .rules
        .iter()
        .map(|rule| {
            let mut out = Vec::new();
            for alternative in &rule.alternatives {
                leading_rules(alternative, &nullable, &mut out);
            }
            out
        })
        .collect();

    // 0 = unvisited, 1 = on stack, 2 = done
    let mut state = vec![0u8; grammar.rules.len()];
    for start in 0..grammar.rules.len() {
        if let Some(id) = find_cycle(start, &leading, &mut state) {
            return Err(GrammarError::LeftRecursion {
                rule: grammar.rules[id].name.clone(),
            });
        }
    }
    Ok(())
}

fn nullable_rules(grammar: &Grammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.rules.len()];
    loop {
        let mut changed = false;
        for (id, rule) in grammar.rules.iter().enumerate() {
            if !nullable[id] && rule.alternatives.iter().any(|a| is_nullable(a, &nullable)) {
                nullable[id] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn is_nullable(item: &Item, nullable: &[bool]) -> bool {
    match item {
        Item::Rule(id) => nullable[*id],
        Item::Terminal(_) => false,
        Item::Seq(items) => items.iter().all(|i| is_nullable(i, nullable)),
        Item::Alt(items) => items.iter().any(|i| is_nullable(i, nullable)),
        Item::Optional(_) => true,
        Item::Repeat { item, min, .. } => *min == 0 || is_nullable(item, nullable),
    }
}

fn has_nullable_repeat(item: &Item, nullable: &[bool]) -> bool {
    match item {
        Item::Rule(_) | Item::Terminal(_) => false,
        Item::Seq(items) | Item::Alt(items) => {
            items.iter().any(|i| has_nullable_repeat(i, nullable))
        }
        Item::Optional(inner) => has_nullable_repeat(inner, nullable),
        Item::Repeat { item, .. } => {
            is_nullable(item, nullable) || has_nullable_repeat(item, nullable)
        }
    }
}

/// Rules reachable without consuming input
fn leading_rules(item: &Item, nullable: &[bool], out: &mut Vec<RuleId>) {
    match item {
        Item::Rule(id) => out.push(*id),
        Item::Terminal(_) => {}
        Item::Seq(items) => {
            for item in items {
                leading_rules(item, nullable, out);
                if !is_nullable(item, nullable) {
                    break;
                }
            }
        }
        Item::Alt(items) => {
            for item in items {
                leading_rules(item, nullable, out);
            }
        }
        Item::Optional(inner) | Item::Repeat { item: inner, .. } => {
            leading_rules(inner, nullable, out)
        }
    }
}

fn find_cycle(id: RuleId, leading: &[Vec<RuleId>], state: &mut [u8]) -> Option<RuleId> {
    match state[id] {
        1 => return Some(id),
        2 => return None,
        _ => {}
    }
    state[id] = 1;
    for &next in &leading[id] {
        if let Some(found) = find_cycle(next, leading, state) {
            return Some(found);
        }
    }
    state[id] = 2;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::loader::parse_grammar;

    fn build(text: &str) -> Result<Grammar, GrammarError> {
        Grammar::build(&parse_grammar(text).unwrap(), &GrammarOptions::default())
    }

    #[test]
    fn test_terminals_flatten_to_one_pattern() {
        let grammar = build("start : NUMBER\nNUMBER : [SIGN] (DIGIT)+\nSIGN : \"+\" | \"-\"\nDIGIT : /[0-9]/\n").unwrap();
        let number = grammar.terminals().find(|t| t.name == "NUMBER").unwrap();
        assert_eq!(
            number.pattern,
            TerminalPattern::Regex("(?:(?:(?:\\+|\\-)))?(?:(?:(?:[0-9])))+".to_string())
        );
        assert!(number.prefix.is_match("-42"));
        assert!(!number.exact.is_match("4a"));
    }

    #[test]
    fn test_rule_literals_become_keywords() {
        let grammar =
            build("start : \"end procedure\" \";\" \"x1\" \"procedure\" \"absolute time\"\n")
                .unwrap();
        assert!(grammar.is_keyword("procedure"));
        assert!(!grammar.is_keyword("end"));
        assert!(!grammar.is_keyword(";"));
        assert!(!grammar.is_keyword("x1"));
        assert!(grammar.is_reserved("Pump end procedure"));
        assert!(!grammar.is_reserved("Pump end"));
        assert!(!grammar.is_reserved("Weekend procedures"));
        assert!(grammar.is_reserved("Launch absolute time"));
        assert!(!grammar.is_reserved("Start time"));

        let literal = grammar
            .terminals()
            .find(|t| t.name == "\"end procedure\"")
            .unwrap();
        assert!(literal.anonymous);
        assert!(literal.prefix.is_match("end \n  procedure;"));
        assert!(!literal.prefix.is_match("end procedures"));
    }

    #[test]
    fn test_keyword_guard_propagates() {
        let definition = parse_grammar(
            "start : NAME\nNAME : IDENTIFIER\nIDENTIFIER : /[a-z]+/\nOTHER : /[0-9]/\n",
        )
        .unwrap();
        let options = GrammarOptions {
            keyword_guarded: vec!["IDENTIFIER".into()],
            ..Default::default()
        };
        let grammar = Grammar::build(&definition, &options).unwrap();
        let guarded: Vec<&str> = grammar
            .terminals()
            .filter(|t| t.keyword_guarded)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(guarded, vec!["NAME", "IDENTIFIER"]);
    }

    #[test]
    fn test_reserved_words_are_keywords() {
        let definition = parse_grammar("start : NOT NAME\nNOT : \"NOT\"\nNAME : /[A-Za-z]+/\n").unwrap();
        let options = GrammarOptions {
            reserved: vec!["NOT".into()],
            ..Default::default()
        };
        assert!(Grammar::build(&definition, &options).unwrap().is_keyword("NOT"));
        assert!(!Grammar::build(&definition, &GrammarOptions::default())
            .unwrap()
            .is_keyword("NOT"));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            build("a : b\n").unwrap_err(),
            GrammarError::UndefinedSymbol { .. }
        ));
        assert!(matches!(
            build("a : \"x\"\na : \"y\"\n").unwrap_err(),
            GrammarError::DuplicateDefinition { .. }
        ));
        assert!(matches!(
            build("a : X\nX : a\n").unwrap_err(),
            GrammarError::TerminalReferencesRule { .. }
        ));
        assert!(matches!(
            build("a : X\nX : Y\nY : X\n").unwrap_err(),
            GrammarError::TerminalCycle { .. }
        ));
        assert!(matches!(
            build("a : a \"x\" | \"y\"\n").unwrap_err(),
            GrammarError::LeftRecursion { .. }
        ));
        assert!(matches!(
            build("a : [\"p\"] b\nb : a \"x\" | \"y\"\n").unwrap_err(),
            GrammarError::LeftRecursion { .. }
        ));
        assert!(matches!(
            build("a : ([\"x\"])*\n").unwrap_err(),
            GrammarError::NullableRepeat { .. }
        ));
    }

    #[test]
    fn test_right_recursion_is_accepted() {
        let grammar = build("a : \"-\" a | \"x\"\n").unwrap();
        assert_eq!(grammar.rule(0).alternatives.len(), 2);
    }
}
