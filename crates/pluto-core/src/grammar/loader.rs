//! Reader for the internal grammar syntax
//!
//! ```text
//! !?name : item item | item
//!        | item
//! ```
//!
//! Atoms are symbol names, `"literals"`, `/regex/flags`, `( )` groups and
//! `[ ]` optionals, followed by any of `*`, `+`, `?`, `~ n` or `~ n..m`.

use tracing::trace;

use super::model::{Definition, Expr, GrammarDefinition, Shaping};
use crate::error::GrammarError;

/// Parse internal grammar text into a [`GrammarDefinition`]
pub fn parse_grammar(text: &str) -> Result<GrammarDefinition, GrammarError> {
    let mut grammar = GrammarDefinition::default();
    for (line, source) in logical_lines(text)? {
        let definition = parse_definition(line, &source)?;
        trace!("Loaded definition '{}'", definition.name);
        grammar.push(definition);
    }
    Ok(grammar)
}

/// Join continuation lines onto their definition head
fn logical_lines(text: &str) -> Result<Vec<(usize, String)>, GrammarError> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let is_continuation = raw.starts_with(char::is_whitespace) && trimmed.starts_with('|');
        if is_continuation {
            let Some((_, current)) = lines.last_mut() else {
                return Err(GrammarError::syntax(number, "continuation without a definition"));
            };
            current.push(' ');
            current.push_str(trimmed);
        } else {
            lines.push((number, trimmed.to_string()));
        }
    }
    Ok(lines)
}

fn parse_definition(line: usize, source: &str) -> Result<Definition, GrammarError> {
    let mut shaping = Shaping::default();
    let mut rest = source;
    loop {
        if let Some(stripped) = rest.strip_prefix('!') {
            shaping.keep_all_tokens = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('?') {
            shaping.inline_single = true;
            rest = stripped;
        } else {
            break;
        }
    }

    let Some((name, body)) = rest.split_once(':') else {
        return Err(GrammarError::syntax(line, "expected 'name : expansion'"));
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(GrammarError::syntax(line, format!("invalid name '{name}'")));
    }

    let tokens = tokenize(line, body)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        line,
    };
    let body = parser.alternatives()?;
    if parser.pos < parser.tokens.len() {
        return Err(GrammarError::syntax(
            line,
            format!("unexpected {:?} in '{name}'", parser.tokens[parser.pos]),
        ));
    }

    Ok(Definition {
        name: name.to_string(),
        shaping,
        body,
        line,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Name(String),
    Literal(String),
    Pattern(String, String),
    Number(usize),
    Open,
    Close,
    OpenOptional,
    CloseOptional,
    Pipe,
    Star,
    Plus,
    Question,
    Tilde,
    Range,
}

fn tokenize(line: usize, body: &str) -> Result<Vec<Tok>, GrammarError> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(GrammarError::syntax(line, "unterminated literal")),
                        Some('"') => break,
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('n') => value.push('\n'),
                                Some('t') => value.push('\t'),
                                Some(&escaped) if escaped == '"' || escaped == '\\' => {
                                    value.push(escaped)
                                }
                                Some(&other) => {
                                    value.push('\\');
                                    value.push(other);
                                }
                                None => {
                                    return Err(GrammarError::syntax(line, "unterminated literal"));
                                }
                            }
                            i += 2;
                        }
                        Some(&other) => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                i += 1;
                tokens.push(Tok::Literal(value));
            }
            '/' => {
                let mut regex = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(GrammarError::syntax(line, "unterminated regex")),
                        Some('/') => break,
                        Some('\\') if chars.get(i + 1) == Some(&'/') => {
                            regex.push('/');
                            i += 2;
                        }
                        Some('\\') => {
                            regex.push('\\');
                            if let Some(&next) = chars.get(i + 1) {
                                regex.push(next);
                            }
                            i += 2;
                        }
                        Some(&other) => {
                            regex.push(other);
                            i += 1;
                        }
                    }
                }
                i += 1;
                let mut flags = String::new();
                while let Some(&flag) = chars.get(i).filter(|f| "imsux".contains(**f)) {
                    flags.push(flag);
                    i += 1;
                }
                tokens.push(Tok::Pattern(regex, flags));
            }
            '(' => {
                tokens.push(Tok::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::Close);
                i += 1;
            }
            '[' => {
                tokens.push(Tok::OpenOptional);
                i += 1;
            }
            ']' => {
                tokens.push(Tok::CloseOptional);
                i += 1;
            }
            '|' => {
                tokens.push(Tok::Pipe);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '?' => {
                tokens.push(Tok::Question);
                i += 1;
            }
            '~' => {
                tokens.push(Tok::Tilde);
                i += 1;
            }
            '.' if chars.get(i + 1) == Some(&'.') => {
                tokens.push(Tok::Range);
                i += 2;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while chars.get(i).is_some_and(char::is_ascii_digit) {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits
                    .parse()
                    .map_err(|_| GrammarError::syntax(line, format!("invalid count '{digits}'")))?;
                tokens.push(Tok::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                {
                    i += 1;
                }
                tokens.push(Tok::Name(chars[start..i].iter().collect()));
            }
            other => {
                return Err(GrammarError::syntax(line, format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
    line: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn alternatives(&mut self) -> Result<Expr, GrammarError> {
        let mut alternatives = vec![self.sequence()?];
        while self.eat(&Tok::Pipe) {
            alternatives.push(self.sequence()?);
        }
        Ok(if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Expr::Alt(alternatives)
        })
    }

    fn sequence(&mut self) -> Result<Expr, GrammarError> {
        let mut items = Vec::new();
        while let Some(item) = self.postfix()? {
            items.push(item);
        }
        match items.len() {
            0 => Err(GrammarError::syntax(self.line, "empty alternative")),
            1 => Ok(items.remove(0)),
            _ => Ok(Expr::Seq(items)),
        }
    }

    fn postfix(&mut self) -> Result<Option<Expr>, GrammarError> {
        let Some(mut expr) = self.atom()? else {
            return Ok(None);
        };
        loop {
            expr = if self.eat(&Tok::Star) {
                repeat(expr, 0, None)
            } else if self.eat(&Tok::Plus) {
                repeat(expr, 1, None)
            } else if self.eat(&Tok::Question) {
                Expr::Optional(Box::new(expr))
            } else if self.eat(&Tok::Tilde) {
                let min = self.number()?;
                let max = if self.eat(&Tok::Range) {
                    self.number()?
                } else {
                    min
                };
                repeat(expr, min, Some(max))
            } else {
                return Ok(Some(expr));
            };
        }
    }

    fn number(&mut self) -> Result<usize, GrammarError> {
        match self.peek() {
            Some(Tok::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(GrammarError::syntax(self.line, "expected a repetition count")),
        }
    }

    fn atom(&mut self) -> Result<Option<Expr>, GrammarError> {
        let Some(token) = self.peek().cloned() else {
            return Ok(None);
        };
        let expr = match token {
            Tok::Name(name) => Expr::Symbol(name),
            Tok::Literal(text) => Expr::Literal(text),
            Tok::Pattern(regex, flags) => Expr::Pattern { regex, flags },
            Tok::Open => {
                self.pos += 1;
                let inner = self.alternatives()?;
                if !self.eat(&Tok::Close) {
                    return Err(GrammarError::syntax(self.line, "expected ')'"));
                }
                return Ok(Some(inner));
            }
            Tok::OpenOptional => {
                self.pos += 1;
                let inner = self.alternatives()?;
                if !self.eat(&Tok::CloseOptional) {
                    return Err(GrammarError::syntax(self.line, "expected ']'"));
                }
                return Ok(Some(Expr::Optional(Box::new(inner))));
            }
            _ => return Ok(None),
        };
        self.pos += 1;
        Ok(Some(expr))
    }
}

fn repeat(expr: Expr, min: usize, max: Option<usize>) -> Expr {
    Expr::Repeat {
        expr: Box::new(expr),
        min,
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_definition_with_continuations() {
        let text = "!choice : \"a\" other\n       | [\"b\"] (X)+\n\nX : \"x\" ~ 2..3\n";
        let grammar = parse_grammar(text).unwrap();
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.terminals.len(), 1);

        let choice = &grammar.rules[0];
        assert!(choice.shaping.keep_all_tokens);
        assert!(!choice.shaping.inline_single);
        assert_eq!(
            choice.body,
            Expr::Alt(vec![
                Expr::Seq(vec![
                    Expr::Literal("a".into()),
                    Expr::Symbol("other".into()),
                ]),
                Expr::Seq(vec![
                    Expr::Optional(Box::new(Expr::Literal("b".into()))),
                    repeat(Expr::Symbol("X".into()), 1, None),
                ]),
            ])
        );
        assert_eq!(
            grammar.terminals[0].body,
            repeat(Expr::Literal("x".into()), 2, Some(3))
        );
    }

    #[test]
    fn test_literal_escapes_and_patterns() {
        let grammar = parse_grammar("S : \"\\\"\" /[^\"\\/]/i\n").unwrap();
        assert_eq!(
            grammar.terminals[0].body,
            Expr::Seq(vec![
                Expr::Literal("\"".into()),
                Expr::Pattern {
                    regex: "[^\"/]".into(),
                    flags: "i".into()
                },
            ])
        );
    }

    #[test]
    fn test_comments_and_prefixes() {
        let grammar = parse_grammar("// header\n?!wrapper : inner\n").unwrap();
        let wrapper = &grammar.rules[0];
        assert!(wrapper.shaping.inline_single);
        assert!(wrapper.shaping.keep_all_tokens);
        assert_eq!(wrapper.line, 2);
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse_grammar("ok : \"a\"\nbroken \"b\"\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 2, .. }));

        let err = parse_grammar("rule : (\"a\"\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));

        let err = parse_grammar("   | \"a\"\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }));
    }
}
