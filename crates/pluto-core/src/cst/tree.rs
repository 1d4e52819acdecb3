//! Syntax tree produced by the parser
//!
//! Nodes are labelled with grammar rule names and own their children.
//! Tokens carry the matched text. All offsets are character offsets into
//! the parsed source.

use std::fmt::Write;

use serde::Serialize;

/// A matched terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Terminal name; the literal text for anonymous literal tokens
    pub terminal: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A node or token inside a [`SyntaxNode`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SyntaxChild {
    Node(SyntaxNode),
    Token(Token),
}

impl SyntaxChild {
    pub fn start(&self) -> usize {
        match self {
            SyntaxChild::Node(node) => node.start,
            SyntaxChild::Token(token) => token.start,
        }
    }

    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            SyntaxChild::Node(node) => Some(node),
            SyntaxChild::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            SyntaxChild::Token(token) => Some(token),
            SyntaxChild::Node(_) => None,
        }
    }

    /// Concatenated text of every token below this child
    pub fn text(&self) -> String {
        match self {
            SyntaxChild::Node(node) => node.text(),
            SyntaxChild::Token(token) => token.text.clone(),
        }
    }
}

/// A rule match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxNode {
    pub rule: String,
    pub start: usize,
    pub end: usize,
    pub children: Vec<SyntaxChild>,
}

impl SyntaxNode {
    /// Child nodes, skipping tokens
    pub fn nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter_map(SyntaxChild::as_node)
    }

    /// Direct child tokens, skipping nodes
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(SyntaxChild::as_token)
    }

    /// First direct child node produced by `rule`
    pub fn find(&self, rule: &str) -> Option<&SyntaxNode> {
        self.nodes().find(|node| node.rule == rule)
    }

    pub fn text(&self) -> String {
        self.children.iter().map(SyntaxChild::text).collect()
    }

    /// Indented rendering, one node or token per line
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        if let [SyntaxChild::Token(token)] = self.children.as_slice() {
            let _ = writeln!(out, "{indent}{}\t{}", self.rule, token.text);
            return;
        }
        let _ = writeln!(out, "{indent}{}", self.rule);
        for child in &self.children {
            match child {
                SyntaxChild::Node(node) => node.pretty_into(out, depth + 1),
                SyntaxChild::Token(token) => {
                    let _ = writeln!(out, "{indent}  {}", token.text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(terminal: &str, text: &str, start: usize) -> SyntaxChild {
        SyntaxChild::Token(Token {
            terminal: terminal.to_string(),
            text: text.to_string(),
            start,
            end: start + text.chars().count(),
        })
    }

    #[test]
    fn test_pretty_rendering() {
        let tree = SyntaxNode {
            rule: "log_statement".into(),
            start: 0,
            end: 9,
            children: vec![
                token("log", "log", 0),
                SyntaxChild::Node(SyntaxNode {
                    rule: "constant".into(),
                    start: 4,
                    end: 9,
                    children: vec![token("STRING_CONSTANT", "\"hi\"", 4)],
                }),
            ],
        };
        assert_eq!(tree.pretty(), "log_statement\n  log\n  constant\t\"hi\"\n");
        assert_eq!(tree.text(), "log\"hi\"");
        assert_eq!(tree.find("constant").map(|n| n.start), Some(4));
    }
}
