//! Generalized memoizing parser over a compiled [`Grammar`]
//!
//! # Overview
//!
//! Every rule invocation is evaluated once per input position and yields
//! the set of positions it can end at, so the enclosing sequence picks
//! whichever continuation leads to a complete parse. Ambiguity is resolved
//! with one fixed policy:
//!
//! - between alternatives (of a rule or of a nested group) the earliest
//!   alternative reaching a given end wins;
//! - when the same alternative reaches the same end through different
//!   splits, the match is marked as conflicting. That is only an error if
//!   the match ends up in the final tree.
//!
//! Ignorable text is skipped before every terminal. Keyword guarded
//! terminals also offer their shorter word-boundary prefixes, so an
//! identifier made of several words stops before a reserved word.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use super::source::SourceIndex;
use super::tree::{SyntaxChild, SyntaxNode, Token};
use crate::error::ParseError;
use crate::grammar::{Grammar, Item, RuleId, TerminalId, TerminalPattern};

/// Alternative derivations kept per match for error reporting
const MAX_CONFLICTS: usize = 3;
const END_OF_INPUT: &str = "end of input";

#[derive(Debug, Clone, Copy)]
struct TokenMatch {
    terminal: TerminalId,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
enum Child {
    Node(Rc<RuleMatch>),
    Token(TokenMatch),
}

impl Child {
    fn span(&self) -> Option<(usize, usize)> {
        match self {
            Child::Node(node) => node.span,
            Child::Token(token) => Some((token.start, token.end)),
        }
    }
}

#[derive(Debug)]
struct RuleMatch {
    rule: RuleId,
    start: usize,
    end: usize,
    /// First to last consumed token, `None` for an empty match
    span: Option<(usize, usize)>,
    children: Vec<Child>,
    conflicts: Vec<Vec<Child>>,
}

impl RuleMatch {
    fn new(rule: RuleId, start: usize, partial: Partial) -> Self {
        let first = partial.children.iter().find_map(Child::span);
        let last = partial.children.iter().rev().find_map(Child::span);
        let span = first.zip(last).map(|((start, _), (_, end))| (start, end));
        Self {
            rule,
            start,
            end: partial.end,
            span,
            children: partial.children,
            conflicts: partial.conflicts,
        }
    }
}

/// Match of an item inside one rule alternative
#[derive(Debug, Clone)]
struct Partial {
    end: usize,
    children: Vec<Child>,
    conflicts: Vec<Vec<Child>>,
}

impl Partial {
    fn empty(at: usize) -> Self {
        Self {
            end: at,
            children: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    fn single(end: usize, child: Child) -> Self {
        Self {
            end,
            children: vec![child],
            conflicts: Vec::new(),
        }
    }

    fn extend(&self, step: &Partial) -> Partial {
        let concat = |head: &[Child], tail: &[Child]| {
            let mut out = Vec::with_capacity(head.len() + tail.len());
            out.extend_from_slice(head);
            out.extend_from_slice(tail);
            out
        };
        let mut conflicts: Vec<Vec<Child>> = self
            .conflicts
            .iter()
            .map(|c| concat(c, &step.children))
            .chain(step.conflicts.iter().map(|c| concat(&self.children, c)))
            .collect();
        conflicts.truncate(MAX_CONFLICTS);
        Partial {
            end: step.end,
            children: concat(&self.children, &step.children),
            conflicts,
        }
    }
}

/// Add `candidate` unless a result with the same end exists. With
/// `conflict` set, the duplicate is recorded as a competing derivation.
fn merge(results: &mut Vec<Partial>, candidate: Partial, conflict: bool) {
    match results.iter_mut().find(|p| p.end == candidate.end) {
        Some(existing) => {
            if conflict && existing.conflicts.len() < MAX_CONFLICTS {
                existing.conflicts.push(candidate.children);
                existing.conflicts.extend(candidate.conflicts);
                existing.conflicts.truncate(MAX_CONFLICTS);
            }
        }
        None => results.push(candidate),
    }
}

pub(crate) struct Engine<'g, 's> {
    grammar: &'g Grammar,
    text: &'s str,
    index: SourceIndex,
    rules: HashMap<(RuleId, usize), Rc<[Rc<RuleMatch>]>>,
    tokens: HashMap<(TerminalId, usize), Rc<[TokenMatch]>>,
    in_progress: HashSet<(RuleId, usize)>,
    furthest: usize,
    expected: BTreeSet<String>,
}

impl<'g, 's> Engine<'g, 's> {
    pub(crate) fn new(grammar: &'g Grammar, text: &'s str) -> Self {
        Self {
            grammar,
            text,
            index: SourceIndex::new(text),
            rules: HashMap::new(),
            tokens: HashMap::new(),
            in_progress: HashSet::new(),
            furthest: 0,
            expected: BTreeSet::new(),
        }
    }

    /// Parse the whole text as `start`
    pub(crate) fn parse(mut self, start: RuleId) -> Result<SyntaxNode, ParseError> {
        let matches = self.rule(start, 0);
        for candidate in matches.iter() {
            let end = self.skip_ignored(candidate.end);
            if end == self.text.len() {
                trace!(
                    memo_entries = self.rules.len(),
                    "Parsed {} characters",
                    self.index.char_offset(end)
                );
                return self.build(candidate);
            }
            self.fail(end, END_OF_INPUT);
        }
        Err(self.syntax_error())
    }

    fn rule(&mut self, id: RuleId, pos: usize) -> Rc<[Rc<RuleMatch>]> {
        if let Some(hit) = self.rules.get(&(id, pos)) {
            return hit.clone();
        }
        if !self.in_progress.insert((id, pos)) {
            return Rc::from(Vec::new());
        }

        let grammar = self.grammar;
        let mut results = Vec::new();
        for alternative in &grammar.rule(id).alternatives {
            for partial in self.eval(alternative, pos) {
                merge(&mut results, partial, false);
            }
        }
        self.in_progress.remove(&(id, pos));

        let matches: Rc<[Rc<RuleMatch>]> = results
            .into_iter()
            .map(|partial| Rc::new(RuleMatch::new(id, pos, partial)))
            .collect();
        self.rules.insert((id, pos), matches.clone());
        matches
    }

    fn eval(&mut self, item: &Item, pos: usize) -> Vec<Partial> {
        match item {
            Item::Rule(id) => self
                .rule(*id, pos)
                .iter()
                .map(|m| Partial::single(m.end, Child::Node(m.clone())))
                .collect(),
            Item::Terminal(id) => self
                .terminal(*id, pos)
                .iter()
                .map(|t| Partial::single(t.end, Child::Token(*t)))
                .collect(),
            Item::Seq(items) => {
                let mut current = vec![Partial::empty(pos)];
                for item in items {
                    let mut next = Vec::new();
                    for partial in &current {
                        for step in self.eval(item, partial.end) {
                            merge(&mut next, partial.extend(&step), true);
                        }
                    }
                    if next.is_empty() {
                        return next;
                    }
                    current = next;
                }
                current
            }
            Item::Alt(items) => {
                let mut results = Vec::new();
                for item in items {
                    for partial in self.eval(item, pos) {
                        merge(&mut results, partial, false);
                    }
                }
                results
            }
            Item::Optional(inner) => {
                let mut results = self.eval(inner, pos);
                merge(&mut results, Partial::empty(pos), false);
                results
            }
            Item::Repeat { item, min, max } => self.repeat(item, *min, *max, pos),
        }
    }

    fn repeat(&mut self, item: &Item, min: usize, max: Option<usize>, pos: usize) -> Vec<Partial> {
        let mut results = Vec::new();
        let mut frontier = vec![Partial::empty(pos)];
        let mut count = 0;
        loop {
            if count >= min {
                for partial in &frontier {
                    merge(&mut results, partial.clone(), true);
                }
            }
            if frontier.is_empty() || max.is_some_and(|max| count >= max) {
                return results;
            }
            let mut next = Vec::new();
            for partial in &frontier {
                for step in self.eval(item, partial.end) {
                    merge(&mut next, partial.extend(&step), true);
                }
            }
            frontier = next;
            count += 1;
        }
    }

    fn terminal(&mut self, id: TerminalId, pos: usize) -> Rc<[TokenMatch]> {
        if let Some(hit) = self.tokens.get(&(id, pos)) {
            return hit.clone();
        }

        let start = self.skip_ignored(pos);
        let grammar = self.grammar;
        let terminal = grammar.terminal(id);
        let rest = &self.text[start..];
        let mut found = Vec::new();

        if let Some(m) = terminal.prefix.find(rest).filter(|m| m.end() > 0) {
            if terminal.keyword_guarded {
                let longest = &rest[..m.end()];
                let mut ends = vec![m.end()];
                let mut previous_is_space = true;
                let mut gaps = Vec::new();
                for (i, ch) in longest.char_indices() {
                    if ch.is_whitespace() && !previous_is_space {
                        gaps.push(i);
                    }
                    previous_is_space = ch.is_whitespace();
                }
                ends.extend(gaps.into_iter().rev());

                for end in ends {
                    let candidate = &longest[..end];
                    let reserved = grammar.is_reserved(candidate);
                    if !reserved && terminal.exact.is_match(candidate) {
                        found.push(TokenMatch {
                            terminal: id,
                            start,
                            end: start + end,
                        });
                    }
                }
            } else {
                found.push(TokenMatch {
                    terminal: id,
                    start,
                    end: start + m.end(),
                });
            }
        }

        if found.is_empty() {
            self.fail(start, &terminal.display);
        }
        let found: Rc<[TokenMatch]> = Rc::from(found);
        self.tokens.insert((id, pos), found.clone());
        found
    }

    fn skip_ignored(&self, mut pos: usize) -> usize {
        loop {
            let before = pos;
            for pattern in &self.grammar.ignore {
                if let Some(m) = pattern.find(&self.text[pos..]) {
                    pos += m.end();
                }
            }
            if pos == before {
                return pos;
            }
        }
    }

    fn fail(&mut self, at: usize, expected: &str) {
        if at > self.furthest {
            self.furthest = at;
            self.expected.clear();
        }
        if at == self.furthest {
            self.expected.insert(expected.to_string());
        }
    }

    fn syntax_error(&self) -> ParseError {
        let offset = self.index.char_offset(self.furthest);
        let (line, column) = self.index.line_col(offset);
        let found = if self.furthest >= self.text.len() {
            END_OF_INPUT.to_string()
        } else {
            let word: String = self.text[self.furthest..]
                .chars()
                .take_while(|c| !c.is_whitespace())
                .take(20)
                .collect();
            format!("'{word}'")
        };
        ParseError::Syntax {
            offset,
            line,
            column,
            expected: self.expected.iter().cloned().collect(),
            found,
        }
    }

    fn build(&self, m: &RuleMatch) -> Result<SyntaxNode, ParseError> {
        let rule = self.grammar.rule(m.rule);
        let (start, end) = m.span.unwrap_or((m.start, m.start));
        let start = self.index.char_offset(start);
        let end = self.index.char_offset(end);

        if !m.conflicts.is_empty() {
            let derivations = std::iter::once(&m.children)
                .chain(&m.conflicts)
                .map(|children| self.describe(children))
                .collect();
            return Err(ParseError::Ambiguous {
                rule: rule.name.clone(),
                start,
                end,
                derivations,
            });
        }

        let mut children = Vec::new();
        for child in &m.children {
            match child {
                Child::Token(token) => {
                    let terminal = self.grammar.terminal(token.terminal);
                    if terminal.filtered || (terminal.anonymous && !rule.shaping.keep_all_tokens) {
                        continue;
                    }
                    children.push(SyntaxChild::Token(self.token(token)));
                }
                Child::Node(sub) => {
                    let node = self.build(sub)?;
                    let sub_rule = self.grammar.rule(sub.rule);
                    if sub_rule.is_hidden()
                        || (sub_rule.shaping.inline_single && node.children.len() == 1)
                    {
                        children.extend(node.children);
                    } else {
                        children.push(SyntaxChild::Node(node));
                    }
                }
            }
        }

        Ok(SyntaxNode {
            rule: rule.name.clone(),
            start,
            end,
            children,
        })
    }

    fn token(&self, token: &TokenMatch) -> Token {
        let terminal = self.grammar.terminal(token.terminal);
        let name = match (&terminal.pattern, terminal.anonymous) {
            (TerminalPattern::Literal(text), true) => text.clone(),
            _ => terminal.name.clone(),
        };
        Token {
            terminal: name,
            text: self.text[token.start..token.end].to_string(),
            start: self.index.char_offset(token.start),
            end: self.index.char_offset(token.end),
        }
    }

    fn describe(&self, children: &[Child]) -> String {
        children
            .iter()
            .map(|child| match child {
                Child::Node(node) => self.grammar.rule(node.rule).name.clone(),
                Child::Token(token) => self.grammar.terminal(token.terminal).display.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarOptions, parse_grammar};

    fn grammar(text: &str) -> Grammar {
        let options = GrammarOptions {
            ignore: vec![r"\s+".to_string()],
            keyword_guarded: vec!["NAME".to_string()],
            ..Default::default()
        };
        Grammar::build(&parse_grammar(text).unwrap(), &options).unwrap()
    }

    fn parse(grammar: &Grammar, text: &str) -> Result<SyntaxNode, ParseError> {
        let start = grammar.rule_id("start").unwrap();
        Engine::new(grammar, text).parse(start)
    }

    #[test]
    fn test_multi_word_names_stop_before_keywords() {
        let g = grammar(
            "start : \"wait for\" NAME [\"timeout\" NUMBER]\nNAME : /[A-Za-z]+( [A-Za-z]+)*/\nNUMBER : /[0-9]+/\n",
        );
        let tree = parse(&g, "wait for Pump On timeout 5").unwrap();
        let names: Vec<&str> = tree.tokens().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec!["Pump On", "5"]);
        assert_eq!(tree.start, 0);
        assert_eq!(tree.end, 26);
    }

    #[test]
    fn test_earliest_alternative_wins() {
        let g = grammar("start : a | b\na : NAME\nb : NAME\nNAME : /[a-z]+/\n");
        let tree = parse(&g, "x").unwrap();
        assert_eq!(tree.nodes().next().unwrap().rule, "a");
    }

    #[test]
    fn test_same_alternative_ambiguity_is_reported() {
        let g = grammar("start : item item\n?item : \"x\" | \"x\" \"x\" | e\ne : \"y\"*\n");
        let err = parse(&g, "x x x").unwrap_err();
        assert!(matches!(err, ParseError::Ambiguous { ref rule, .. } if rule == "start"));
    }

    #[test]
    fn test_syntax_error_reports_furthest_failure() {
        let g = grammar("start : \"begin\" (\";\" | \",\")\n");
        match parse(&g, "begin\n  x").unwrap_err() {
            ParseError::Syntax {
                offset,
                line,
                column,
                expected,
                found,
            } => {
                assert_eq!(offset, 8);
                assert_eq!((line, column), (2, 3));
                assert_eq!(expected, vec!["\",\"".to_string(), "\";\"".to_string()]);
                assert_eq!(found, "'x'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_text_expects_end_of_input() {
        let g = grammar("start : \"a\"\n");
        match parse(&g, "a b").unwrap_err() {
            ParseError::Syntax { expected, .. } => {
                assert!(expected.contains(&END_OF_INPUT.to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tree_shaping() {
        let g = grammar(
            "start : _pair wrap keep\n_pair : \"(\" NUMBER \")\"\n?wrap : NUMBER\n!keep : \"k\" NUMBER\nNUMBER : /[0-9]+/\n",
        );
        let tree = parse(&g, "(1) 2 k 3").unwrap();
        assert_eq!(
            tree.pretty(),
            "start\n  1\n  2\n  keep\n    k\n    3\n"
        );
        let keep = tree.find("keep").unwrap();
        assert_eq!((keep.start, keep.end), (6, 9));
    }
}
