//! ISO EBNF to internal grammar syntax conversion
//!
//! # Overview
//!
//! The published PLUTO standard ships its grammar as ISO EBNF. The parsing
//! engine reads a compact internal syntax instead (see [`super::loader`]).
//! [`GrammarCompiler`] performs the rewrite so that the checked-in internal
//! grammars are always derived from the standard text and never edited by
//! hand.
//!
//! Rewrites run in a fixed order:
//!
//! 1. caller pre-replacements
//! 2. `Name =` heads become `Name :`
//! 3. sequencing commas become single spaces
//! 4. rule terminators `;` are dropped
//! 5. dangling `|` line breaks are joined
//! 6. `{x}-` becomes `(x)+` and `{x}` becomes `(x)*`
//! 7. rule names are folded to `lower_snake_case`
//! 8. caller designated rules are promoted to `UPPER_CASE` terminals
//! 9. caller post-replacements
//! 10. continuation lines are aligned under the previous separator
//!
//! Quoted strings, `/regex/` literals and `//` comments are opaque to the
//! structural passes. Running the compiler over its own output yields the
//! same text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use tracing::{debug, trace};

use crate::error::GrammarConversionError;

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([A-Za-z][\w ]*?)[ \t]*=[ \t]*(?:\n[ \t]*)?").expect("static pattern")
});
static TERMINATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m);[ \t]*$").expect("static pattern"));
static PIPE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\|[ \t]*\n\s*").expect("static pattern"));
static HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[!?]*([A-Za-z][\w ]*?) :").expect("static pattern"));
static TERMINAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static pattern"));

/// A single regex rewrite applied in multi-line mode.
///
/// The replacement uses `regex` template syntax (`${1}` for groups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

impl Replacement {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Caller supplied patches for discrepancies between a published grammar and
/// the grammar the parser actually needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteRules {
    /// Applied to the raw EBNF before any structural rewrite
    pub pre: Vec<Replacement>,
    /// Folded rule names to promote to terminals
    pub terminals: Vec<String>,
    /// Applied after folding and promotion
    pub post: Vec<Replacement>,
}

/// Converts ISO EBNF text into internal grammar syntax
#[derive(Debug)]
pub struct GrammarCompiler {
    pre: Vec<(Regex, String)>,
    terminals: Vec<String>,
    post: Vec<(Regex, String)>,
}

impl GrammarCompiler {
    /// Compile the rewrite rules. Fails if a pattern is not a valid regex.
    pub fn new(rules: RewriteRules) -> Result<Self, GrammarConversionError> {
        let mut terminals = rules.terminals;
        // Longest first so that `day_of_month` is promoted before `day`
        terminals.sort_by_key(|name| std::cmp::Reverse(name.len()));

        Ok(Self {
            pre: compile_replacements(&rules.pre)?,
            terminals,
            post: compile_replacements(&rules.post)?,
        })
    }

    /// Rewrite `ebnf` into internal grammar syntax
    pub fn convert(&self, ebnf: &str) -> Result<String, GrammarConversionError> {
        let mut text = ebnf.to_string();

        for (pattern, replacement) in &self.pre {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        text = DEFINITION.replace_all(&text, "${1} : ").into_owned();
        text = collapse_commas(&text);
        text = TERMINATOR.replace_all(&text, "").into_owned();
        text = PIPE_BREAK.replace_all(&text, "| ").into_owned();
        text = map_code(&text, |code| {
            code.replace("}-", ")+").replace('}', ")*").replace('{', "(")
        });

        let heads = collect_heads(&text);
        let folded = fold_names(&heads)?;

        let mut renames: Vec<(&String, &String)> = folded
            .iter()
            .filter(|(folded, original)| folded != original)
            .map(|(folded, original)| (original, folded))
            .collect();
        renames.sort_by_key(|(original, _)| std::cmp::Reverse(original.len()));

        for (original, folded) in &renames {
            text = replace_words(&text, original, folded);
        }
        debug!(rules = heads.len(), folded = renames.len(), "Folded rule names");

        for name in &self.terminals {
            let upper = name.to_uppercase();
            let has_rule = folded.contains_key(name.as_str());
            let has_terminal = heads.iter().any(|head| head == &upper);
            if has_rule && has_terminal {
                return Err(GrammarConversionError::TerminalCollision {
                    rule: name.clone(),
                    terminal: upper,
                });
            }
            if !has_rule && !has_terminal {
                return Err(GrammarConversionError::UnknownTerminal { name: name.clone() });
            }
            text = replace_words(&text, name, &upper);
        }

        for (pattern, replacement) in &self.post {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        Ok(align_continuations(&text))
    }
}

fn compile_replacements(
    replacements: &[Replacement],
) -> Result<Vec<(Regex, String)>, GrammarConversionError> {
    replacements
        .iter()
        .map(|r| {
            Regex::new(&format!("(?m){}", r.pattern))
                .map(|re| (re, r.replacement.clone()))
                .map_err(|e| GrammarConversionError::invalid_pattern(&r.pattern, &e))
        })
        .collect()
}

/// Rule heads in order of first appearance
fn collect_heads(text: &str) -> Vec<String> {
    let mut heads: Vec<String> = Vec::new();
    for caps in HEAD.captures_iter(text) {
        let head = &caps[1];
        if !heads.iter().any(|h| h == head) {
            heads.push(head.to_string());
        }
    }
    heads
}

/// Map folded name -> original spelling, rejecting collisions
fn fold_names(heads: &[String]) -> Result<IndexMap<String, String>, GrammarConversionError> {
    let mut folded: IndexMap<String, String> = IndexMap::new();
    for head in heads {
        if TERMINAL_NAME.is_match(head) {
            continue;
        }
        let name = head.to_lowercase().replace(' ', "_");
        if let Some(first) = folded.get(&name) {
            if first != head {
                return Err(GrammarConversionError::FoldCollision {
                    first: first.clone(),
                    second: head.clone(),
                    folded: name,
                });
            }
            continue;
        }
        trace!("Folding '{}' to '{}'", head, name);
        folded.insert(name, head.clone());
    }
    Ok(folded)
}

/// Replace whole-word occurrences outside literals
fn replace_words(text: &str, word: &str, replacement: &str) -> String {
    // Escaped identifier text between word boundaries is always valid
    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(word))) else {
        return text.to_string();
    };
    map_code(text, |code| {
        pattern.replace_all(code, NoExpand(replacement)).into_owned()
    })
}

fn collapse_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut skip_whitespace = false;

    for segment in segments(text) {
        if segment.literal {
            skip_whitespace = false;
            out.push_str(segment.text);
            continue;
        }
        for c in segment.text.chars() {
            if c == ',' {
                out.truncate(out.trim_end().len());
                out.push(' ');
                skip_whitespace = true;
            } else if skip_whitespace && c.is_whitespace() {
                continue;
            } else {
                skip_whitespace = false;
                out.push(c);
            }
        }
    }
    out
}

fn align_continuations(text: &str) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    for i in 1..lines.len() {
        let trimmed = lines[i].trim_start();
        if trimmed.starts_with('|') {
            let column = separator_column(&lines[i - 1]);
            lines[i] = format!("{}{}", " ".repeat(column), trimmed);
        }
    }
    lines.join("\n")
}

/// Column of the first `:` outside literals, else of the first `|`
fn separator_column(line: &str) -> usize {
    let mut pipe = None;
    let mut column = 0;
    for segment in segments(line) {
        if !segment.literal {
            if let Some(index) = segment.text.find(':') {
                return column + segment.text[..index].chars().count();
            }
            if pipe.is_none() {
                pipe = segment
                    .text
                    .find('|')
                    .map(|index| column + segment.text[..index].chars().count());
            }
        }
        column += segment.text.chars().count();
    }
    pipe.unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    literal: bool,
    text: &'a str,
}

/// Split text into code and literal segments.
///
/// Literals are `"..."` (backslash escapes), `'...'`, `/regex/flags` and
/// `// comment` up to the end of the line.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let n = bytes.len();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < n {
        let end = match bytes[i] {
            b'"' => Some(scan_escaped(bytes, i, b'"')),
            b'\'' => Some(
                bytes[i + 1..]
                    .iter()
                    .position(|&b| b == b'\'')
                    .map_or(n, |p| i + 1 + p + 1),
            ),
            b'/' if bytes.get(i + 1) == Some(&b'/') => Some(
                bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(n, |p| i + p),
            ),
            b'/' => {
                let mut j = scan_escaped(bytes, i, b'/');
                while j < n && b"imsux".contains(&bytes[j]) {
                    j += 1;
                }
                Some(j)
            }
            _ => None,
        };

        match end {
            Some(end) => {
                push_segment(&mut out, text, false, start, i);
                push_segment(&mut out, text, true, i, end);
                i = end;
                start = end;
            }
            None => i += 1,
        }
    }
    push_segment(&mut out, text, false, start, n);
    out
}

fn push_segment<'a>(
    out: &mut Vec<Segment<'a>>,
    text: &'a str,
    literal: bool,
    from: usize,
    to: usize,
) {
    if from < to {
        out.push(Segment {
            literal,
            text: &text[from..to],
        });
    }
}

/// End (exclusive) of a delimited literal starting at `open`
fn scan_escaped(bytes: &[u8], open: usize, delimiter: u8) -> usize {
    let mut j = open + 1;
    while j < bytes.len() && bytes[j] != delimiter {
        if bytes[j] == b'\\' {
            j += 1;
        }
        j += 1;
    }
    (j + 1).min(bytes.len())
}

/// Apply `f` to every code segment, leaving literals untouched
fn map_code(text: &str, f: impl Fn(&str) -> String) -> String {
    segments(text)
        .into_iter()
        .map(|segment| {
            if segment.literal {
                segment.text.to_string()
            } else {
                f(segment.text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(ebnf: &str, rules: RewriteRules) -> Result<String, GrammarConversionError> {
        GrammarCompiler::new(rules)?.convert(ebnf)
    }

    #[test]
    fn test_structural_rewrites() {
        let ebnf = "Foo Bar = \"a\", Baz Qux;\nBaz Qux = {\"b\"}-, [\"c\"], {\"d\"};\n";
        let out = convert(ebnf, RewriteRules::default()).unwrap();
        assert_eq!(
            out,
            "foo_bar : \"a\" baz_qux\nbaz_qux : (\"b\")+ [\"c\"] (\"d\")*\n"
        );
    }

    #[test]
    fn test_literals_are_opaque() {
        let ebnf = "Sep = \",\", \";\", \"{x}\", \"Sep\";\n";
        let out = convert(ebnf, RewriteRules::default()).unwrap();
        assert_eq!(out, "sep : \",\" \";\" \"{x}\" \"Sep\"\n");
    }

    #[test]
    fn test_multiline_definitions_are_joined_and_aligned() {
        let ebnf = "Choice =\n    \"a\", Other\n    | \"b\";\nOther = \"c\" |\n    \"d\";\n";
        let out = convert(ebnf, RewriteRules::default()).unwrap();
        assert_eq!(
            out,
            "choice : \"a\" other\n       | \"b\"\nother : \"c\" | \"d\"\n"
        );
    }

    #[test]
    fn test_terminal_promotion() {
        let ebnf = "Word = {Letter}-;\nLetter = \"a\" | \"b\";\n";
        let rules = RewriteRules {
            terminals: vec!["letter".into(), "word".into()],
            ..Default::default()
        };
        let out = convert(ebnf, rules).unwrap();
        assert_eq!(out, "WORD : (LETTER)+\nLETTER : \"a\" | \"b\"\n");
    }

    #[test]
    fn test_pre_and_post_replacements() {
        let ebnf = "Year = 4 * Digit;\nDigit = \"0\" | \"1\";\n";
        let rules = RewriteRules {
            pre: vec![Replacement::new(r"([0-9]) \* Digit", "Digit ~ ${1}")],
            terminals: vec!["year".into(), "digit".into()],
            post: vec![Replacement::new(r"^YEAR :", "!YEAR :")],
        };
        let out = convert(ebnf, rules).unwrap();
        assert_eq!(out, "!YEAR : DIGIT ~ 4\nDIGIT : \"0\" | \"1\"\n");
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let ebnf = "Choice =\n    \"a\", {Item}-\n    | \"b\";\nItem = Letter;\nLetter = \"x\";\n";
        let rules = RewriteRules {
            terminals: vec!["letter".into()],
            post: vec![Replacement::new(r"^item :", "?item :")],
            ..Default::default()
        };
        let compiler = GrammarCompiler::new(rules).unwrap();
        let once = compiler.convert(ebnf).unwrap();
        let twice = compiler.convert(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_promoted_terminal_collision() {
        let ebnf = "Digit = \"0\";\nDIGIT = \"1\";\n";
        let rules = RewriteRules {
            terminals: vec!["digit".into()],
            ..Default::default()
        };
        let err = convert(ebnf, rules).unwrap_err();
        assert_eq!(
            err,
            GrammarConversionError::TerminalCollision {
                rule: "digit".into(),
                terminal: "DIGIT".into(),
            }
        );
    }

    #[test]
    fn test_fold_collision() {
        let ebnf = "Event Name = \"a\";\nEvent name = \"b\";\n";
        let err = convert(ebnf, RewriteRules::default()).unwrap_err();
        assert!(matches!(
            err,
            GrammarConversionError::FoldCollision { ref folded, .. } if folded == "event_name"
        ));
    }

    #[test]
    fn test_unknown_terminal() {
        let rules = RewriteRules {
            terminals: vec!["missing".into()],
            ..Default::default()
        };
        let err = convert("Rule = \"a\";\n", rules).unwrap_err();
        assert!(matches!(err, GrammarConversionError::UnknownTerminal { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let rules = RewriteRules {
            pre: vec![Replacement::new("(unclosed", "")],
            ..Default::default()
        };
        let err = GrammarCompiler::new(rules).unwrap_err();
        assert!(matches!(err, GrammarConversionError::InvalidPattern { .. }));
    }

    #[test]
    fn test_segments_split_literals() {
        let parts: Vec<(bool, &str)> = segments(r#"a "b\"c" /d\/e/i 'f' // g"#)
            .into_iter()
            .map(|s| (s.literal, s.text))
            .collect();
        assert_eq!(
            parts,
            vec![
                (false, "a "),
                (true, r#""b\"c""#),
                (false, " "),
                (true, r"/d\/e/i"),
                (false, " "),
                (true, "'f'"),
                (false, " "),
                (true, "// g"),
            ]
        );
    }
}
