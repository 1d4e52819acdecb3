//! Values passed from child to parent during translation

use std::collections::VecDeque;

use super::rule_kind::RuleKind;
use crate::cst::Token;
use crate::error::CompileError;
use crate::export::ir::{
    ActivityCall, Argument, BinaryOp, Body, ClassDefinition, ContinuationAction,
    ContinuationTest, DataType, Expr, Timeout,
};

/// Translated form of one syntax tree child
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Expr(Expr),
    /// Identifier or `/`-joined object path
    Name(String),
    /// Unquoted string content, e.g. an event description
    Text(String),
    /// Key of a registered statement declaration
    Key(String),
    Token(Token),
    DataType(DataType),
    Body(Body),
    Bodies(Vec<Body>),
    Continuation(ContinuationTest),
    Action(ContinuationAction),
    Timeout(Timeout),
    Argument(Argument),
    Arguments(Vec<Argument>),
    Directive(String, Expr),
    Directives(Vec<(String, Expr)>),
    ActivityCall(ActivityCall),
    BooleanOperator(BinaryOp),
    CaseTag(CaseTag),
    Units(String),
    Procedure(ClassDefinition),
}

impl Value {
    fn describe(&self) -> &'static str {
        match self {
            Value::Expr(_) => "expression",
            Value::Name(_) => "name",
            Value::Text(_) => "text",
            Value::Key(_) => "statement",
            Value::Token(_) => "token",
            Value::DataType(_) => "data type",
            Value::Body(_) => "body",
            Value::Bodies(_) => "step definition",
            Value::Continuation(_) => "continuation test",
            Value::Action(_) => "continuation action",
            Value::Timeout(_) => "timeout",
            Value::Argument(_) => "argument",
            Value::Arguments(_) => "arguments",
            Value::Directive(..) => "directive",
            Value::Directives(_) => "directives",
            Value::ActivityCall(_) => "activity call",
            Value::BooleanOperator(_) => "boolean operator",
            Value::CaseTag(_) => "case tag",
            Value::Units(_) => "units",
            Value::Procedure(_) => "procedure",
        }
    }
}

/// One `is`/`or is` branch label of a case statement
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTag {
    pub start: usize,
    pub test: TagTest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagTest {
    /// `<op> value`
    Compare(BinaryOp, Expr),
    /// `between low and high`, inclusive
    Between(Expr, Expr),
    /// Bare value, compared for equality
    Equals(Expr),
}

impl TagTest {
    /// Condition selecting this branch for `subject`
    pub fn condition(self, subject: &Expr) -> Expr {
        match self {
            TagTest::Compare(op, value) => Expr::binary(subject.clone(), op, value),
            TagTest::Equals(value) => Expr::binary(subject.clone(), BinaryOp::Eq, value),
            TagTest::Between(low, high) => Expr::binary(
                Expr::binary(subject.clone(), BinaryOp::Ge, low),
                BinaryOp::And,
                Expr::binary(subject.clone(), BinaryOp::Le, high),
            ),
        }
    }
}

/// Whitespace-normalized text of a keyword token (`not   confirmed`)
pub fn keyword(token: &Token) -> String {
    token.text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content of a string constant without its surrounding quotes
pub fn string_content(text: &str) -> String {
    let inner = text.strip_prefix('"').unwrap_or(text);
    inner.strip_suffix('"').unwrap_or(inner).to_string()
}

/// Cursor over the translated children of one node
pub struct Args {
    rule: RuleKind,
    offset: usize,
    values: VecDeque<Value>,
}

impl Args {
    pub fn new(rule: RuleKind, offset: usize, values: Vec<Value>) -> Self {
        Self {
            rule,
            offset,
            values: values.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn malformed(&self, message: impl Into<String>) -> CompileError {
        CompileError::malformed(self.rule.name(), self.offset, message)
    }

    fn unexpected(&self, expected: &str, found: &Value) -> CompileError {
        self.malformed(format!("expected {expected}, found {}", found.describe()))
    }

    pub fn next(&mut self) -> Result<Value, CompileError> {
        self.values
            .pop_front()
            .ok_or_else(|| self.malformed("missing child"))
    }

    fn take<T>(
        &mut self,
        expected: &str,
        extract: fn(Value) -> Result<T, Value>,
    ) -> Result<T, CompileError> {
        extract(self.next()?).map_err(|other| self.unexpected(expected, &other))
    }

    fn take_if<T>(&mut self, extract: fn(Value) -> Result<T, Value>) -> Option<T> {
        let value = self.values.pop_front()?;
        match extract(value) {
            Ok(found) => Some(found),
            Err(value) => {
                self.values.push_front(value);
                None
            }
        }
    }

    /// The only child, passed through unchanged
    pub fn single(mut self) -> Result<Value, CompileError> {
        let value = self.next()?;
        self.finish()?;
        Ok(value)
    }

    /// Fails if children are left over
    pub fn finish(self) -> Result<(), CompileError> {
        match self.values.front() {
            None => Ok(()),
            Some(extra) => Err(self.malformed(format!("unexpected {}", extra.describe()))),
        }
    }

    pub fn rest(self) -> impl Iterator<Item = Value> {
        self.values.into_iter()
    }

    pub fn expr(&mut self) -> Result<Expr, CompileError> {
        self.take("an expression", |v| match v {
            Value::Expr(expr) => Ok(expr),
            other => Err(other),
        })
    }

    pub fn token(&mut self) -> Result<Token, CompileError> {
        self.take("a token", |v| match v {
            Value::Token(token) => Ok(token),
            other => Err(other),
        })
    }

    pub fn optional_token(&mut self) -> Option<Token> {
        self.take_if(|v| match v {
            Value::Token(token) => Ok(token),
            other => Err(other),
        })
    }

    /// Identifier from a name-valued rule or an identifier token
    pub fn name(&mut self) -> Result<String, CompileError> {
        self.take("a name", |v| match v {
            Value::Name(name) => Ok(name),
            Value::Token(token) => Ok(token.text),
            other => Err(other),
        })
    }

    pub fn optional_name(&mut self) -> Option<String> {
        self.take_if(|v| match v {
            Value::Name(name) => Ok(name),
            Value::Token(token) => Ok(token.text),
            other => Err(other),
        })
    }

    pub fn optional_text(&mut self) -> Option<String> {
        self.take_if(|v| match v {
            Value::Text(text) => Ok(text),
            other => Err(other),
        })
    }

    pub fn data_type(&mut self) -> Result<DataType, CompileError> {
        self.take("a data type", |v| match v {
            Value::DataType(data_type) => Ok(data_type),
            other => Err(other),
        })
    }

    pub fn bodies(&mut self) -> Result<Vec<Body>, CompileError> {
        self.take("a step definition", |v| match v {
            Value::Bodies(bodies) => Ok(bodies),
            other => Err(other),
        })
    }

    /// All remaining children, each a body
    pub fn remaining_bodies(mut self) -> Result<Vec<Body>, CompileError> {
        let mut bodies = Vec::new();
        while !self.is_empty() {
            bodies.push(self.take("a body", |v| match v {
                Value::Body(body) => Ok(body),
                other => Err(other),
            })?);
        }
        Ok(bodies)
    }

    /// All remaining statement keys
    pub fn remaining_keys(mut self) -> Result<Vec<String>, CompileError> {
        let mut keys = Vec::new();
        while !self.is_empty() {
            keys.push(self.take("a statement", |v| match v {
                Value::Key(key) => Ok(key),
                other => Err(other),
            })?);
        }
        Ok(keys)
    }

    /// All remaining expressions
    pub fn remaining_exprs(mut self) -> Result<Vec<Expr>, CompileError> {
        let mut exprs = Vec::new();
        while !self.is_empty() {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    pub fn optional_continuation(&mut self) -> Option<ContinuationTest> {
        self.take_if(|v| match v {
            Value::Continuation(test) => Ok(test),
            other => Err(other),
        })
    }

    pub fn action(&mut self) -> Result<ContinuationAction, CompileError> {
        self.take("a continuation action", |v| match v {
            Value::Action(action) => Ok(action),
            other => Err(other),
        })
    }

    pub fn optional_timeout(&mut self) -> Option<Timeout> {
        self.take_if(|v| match v {
            Value::Timeout(timeout) => Ok(timeout),
            other => Err(other),
        })
    }

    pub fn argument(&mut self) -> Result<Argument, CompileError> {
        self.take("an argument", |v| match v {
            Value::Argument(argument) => Ok(argument),
            other => Err(other),
        })
    }

    pub fn arguments(&mut self) -> Result<Vec<Argument>, CompileError> {
        self.take("arguments", |v| match v {
            Value::Arguments(arguments) => Ok(arguments),
            other => Err(other),
        })
    }

    pub fn optional_arguments(&mut self) -> Option<Vec<Argument>> {
        self.take_if(|v| match v {
            Value::Arguments(arguments) => Ok(arguments),
            other => Err(other),
        })
    }

    pub fn directive(&mut self) -> Result<(String, Expr), CompileError> {
        self.take("a directive", |v| match v {
            Value::Directive(name, value) => Ok((name, value)),
            other => Err(other),
        })
    }

    pub fn optional_directives(&mut self) -> Option<Vec<(String, Expr)>> {
        self.take_if(|v| match v {
            Value::Directives(directives) => Ok(directives),
            other => Err(other),
        })
    }

    pub fn activity_call(&mut self) -> Result<ActivityCall, CompileError> {
        self.take("an activity call", |v| match v {
            Value::ActivityCall(call) => Ok(call),
            other => Err(other),
        })
    }

    pub fn boolean_operator(&mut self) -> Result<BinaryOp, CompileError> {
        self.take("a boolean operator", |v| match v {
            Value::BooleanOperator(op) => Ok(op),
            other => Err(other),
        })
    }

    /// Concatenated text of the remaining tokens and unit values
    pub fn concat_text(mut self) -> Result<String, CompileError> {
        let mut text = String::new();
        while !self.is_empty() {
            text.push_str(&self.take("unit text", |v| match v {
                Value::Token(token) => Ok(token.text),
                Value::Units(units) => Ok(units),
                other => Err(other),
            })?);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(terminal: &str, text: &str) -> Value {
        Value::Token(Token {
            terminal: terminal.to_string(),
            text: text.to_string(),
            start: 0,
            end: text.len(),
        })
    }

    #[test]
    fn test_optional_extractors_leave_other_values() {
        let mut args = Args::new(
            RuleKind::Timeout,
            3,
            vec![Value::Expr(Expr::Bool(true)), token("EVENT_NAME", "Done")],
        );
        assert_eq!(args.optional_name(), None);
        assert_eq!(args.expr().unwrap(), Expr::Bool(true));
        assert_eq!(args.optional_name().as_deref(), Some("Done"));
        assert!(args.finish().is_ok());
    }

    #[test]
    fn test_mismatch_is_malformed() {
        let mut args = Args::new(RuleKind::Term, 7, vec![token("X", "x")]);
        let err = args.expr().unwrap_err();
        assert_eq!(
            err,
            CompileError::malformed("term", 7, "expected an expression, found token")
        );
    }

    #[test]
    fn test_between_tag_condition() {
        let subject = Expr::Variable("Level".into());
        let condition = TagTest::Between(Expr::Quantity("1".into()), Expr::Quantity("5".into()))
            .condition(&subject);
        assert_eq!(
            condition,
            Expr::binary(
                Expr::binary(subject.clone(), BinaryOp::Ge, Expr::Quantity("1".into())),
                BinaryOp::And,
                Expr::binary(subject, BinaryOp::Le, Expr::Quantity("5".into())),
            )
        );
    }

    #[test]
    fn test_string_content_strips_quotes() {
        assert_eq!(string_content("\"C:\\\""), "C:\\");
        assert_eq!(string_content("\"\""), "");
    }

    #[test]
    fn test_keyword_normalizes_whitespace() {
        let Value::Token(t) = token("CONFIRMATION_STATUS", "not \n  confirmed") else {
            unreachable!()
        };
        assert_eq!(keyword(&t), "not confirmed");
    }
}
