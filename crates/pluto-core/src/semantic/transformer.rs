//! Syntax-directed translation of a procedure syntax tree into IR
//!
//! # Overview
//!
//! [`Transformer::transform`] walks the tree once, children before parents.
//! Every node is dispatched on its [`RuleKind`]; the action for a kind sees
//! only the translated [`Value`]s of its direct children and the start
//! offset of its own span. Statements and steps are registered in the
//! [`DeclarationTable`] under keys derived from that offset, so the emitted
//! module lists them in the order the traversal completed them.
//!
//! Constructs outside the supported subset abort the translation with
//! [`CompileError::Unsupported`]; nothing is emitted for a procedure that
//! fails anywhere.

use tracing::{debug, trace};

use super::declarations::{DeclarationTable, statement_key, step_class_name};
use super::rule_kind::RuleKind;
use super::time::parse_absolute_time;
use super::values::{Args, CaseTag, TagTest, Value, keyword, string_content};
use crate::cst::{SyntaxChild, SyntaxNode, Token};
use crate::error::CompileError;
use crate::export::ir::{
    ActivityCall, Argument, BinaryOp, Body, BodyKind, ClassDefinition, ConfirmationStatus,
    ContinuationAction, ContinuationTest, DataType, Declaration, Expr, ProcedureIr, Statement,
    Timeout, UnaryOp,
};

/// Procedure name used when the caller has none
pub const DEFAULT_PROCEDURE_NAME: &str = "noname";

/// Translates one procedure; create a fresh transformer per compilation
#[derive(Debug)]
pub struct Transformer {
    procedure_name: String,
    declarations: DeclarationTable,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(DEFAULT_PROCEDURE_NAME)
    }
}

impl Transformer {
    pub fn new(procedure_name: impl Into<String>) -> Self {
        Self {
            procedure_name: procedure_name.into(),
            declarations: DeclarationTable::new(),
        }
    }

    /// Translate a `procedure_definition` tree
    pub fn transform(mut self, tree: &SyntaxNode) -> Result<ProcedureIr, CompileError> {
        debug!(procedure = %self.procedure_name, "Translating syntax tree");
        match self.visit(tree)? {
            Value::Procedure(procedure) => {
                let ir = self.declarations.finish(procedure);
                debug!(
                    declarations = ir.declarations.len(),
                    "Translation complete"
                );
                Ok(ir)
            }
            _ => Err(CompileError::malformed(
                tree.rule.as_str(),
                tree.start,
                "tree root is not a procedure definition",
            )),
        }
    }

    fn visit(&mut self, node: &SyntaxNode) -> Result<Value, CompileError> {
        let kind = RuleKind::from_name(&node.rule).ok_or_else(|| CompileError::UnknownRule {
            rule: node.rule.clone(),
            offset: node.start,
        })?;

        let mut values = Vec::with_capacity(node.children.len());
        for child in &node.children {
            values.push(match child {
                SyntaxChild::Node(child) => self.visit(child)?,
                SyntaxChild::Token(token) => Value::Token(token.clone()),
            });
        }

        trace!(rule = kind.name(), start = node.start, "Applying action");
        self.action(kind, node.start, Args::new(kind, node.start, values))
    }

    fn action(&mut self, kind: RuleKind, at: usize, mut args: Args) -> Result<Value, CompileError> {
        use RuleKind as K;

        let value = match kind {
            K::ProcedureDefinition => Value::Procedure(ClassDefinition {
                name: procedure_class_name(&self.procedure_name),
                bodies: args.remaining_bodies()?,
            }),
            K::ProcedureDeclarationBody | K::StepDeclarationBody => {
                body(BodyKind::Declaration, args)?
            }
            K::PreconditionsBody => body(BodyKind::Preconditions, args)?,
            K::ProcedureMainBody | K::StepMainBody => body(BodyKind::Main, args)?,
            K::WatchdogBody => {
                let statements = args.remaining_keys()?;
                for key in &statements {
                    if !self.declarations.mark_watchdog(key) {
                        return Err(CompileError::malformed(
                            kind.name(),
                            at,
                            format!("'{key}' is not a step statement"),
                        ));
                    }
                }
                Value::Body(Body {
                    kind: BodyKind::Watchdog,
                    statements,
                })
            }
            K::ConfirmationBody => body(BodyKind::Confirmation, args)?,

            // Single-child wrappers
            K::ProcedureStatement
            | K::StepStatement
            | K::FlowControlStatement
            | K::WaitStatement
            | K::Argument
            | K::ActivityReference => args.single()?,

            K::EventDeclaration => {
                let event = args.name()?;
                let description = args.optional_text();
                args.finish()?;
                self.statement(kind, at, Statement::EventDeclaration { event, description })?
            }
            K::Description => Value::Text(string_content(&args.token()?.text)),
            K::VariableDeclaration => {
                let variable = args.name()?;
                let data_type = args.data_type()?;
                args.finish()?;
                self.statement(kind, at, Statement::VariableDeclaration { variable, data_type })?
            }
            K::PredefinedType => {
                let token = args.token()?;
                Value::DataType(predefined_type(&token)?)
            }

            K::InitiateAndConfirmStepStatement => {
                // The step name has no runtime counterpart
                let _step_name = args.name()?;
                let bodies = args.bodies()?;
                let continuation = args.optional_continuation().unwrap_or_default();
                args.finish()?;

                let key = statement_key(at);
                let step_class = step_class_name(&key);
                let value = self.statement(
                    kind,
                    at,
                    Statement::InitiateAndConfirmStep {
                        step_class: step_class.clone(),
                        watchdog: false,
                        continuation,
                    },
                )?;
                self.declare(
                    kind,
                    at,
                    Declaration::Step(ClassDefinition {
                        name: step_class,
                        bodies,
                    }),
                )?;
                value
            }
            K::StepDefinition => Value::Bodies(args.remaining_bodies()?),
            K::ContinuationTest => {
                let mut test = ContinuationTest::default();
                while !args.is_empty() {
                    let status = confirmation_status(&args.token()?)?;
                    let action = args.action()?;
                    test.cases.push((status, action));
                }
                Value::Continuation(test)
            }
            K::ContinuationAction => match args.next()? {
                Value::Name(event) => Value::Action(ContinuationAction::RaiseEvent(event)),
                Value::Token(token) => Value::Action(continuation_action(&token)?),
                _ => return Err(args.malformed("expected a continuation keyword")),
            },
            K::RaiseEvent => Value::Name(args.name()?),

            K::InitiateAndConfirmActivityStatement => {
                let call = args.activity_call()?;
                let refer_by = args.optional_name();
                let continuation = args.optional_continuation().unwrap_or_default();
                args.finish()?;
                self.statement(
                    kind,
                    at,
                    Statement::InitiateAndConfirmActivity {
                        call,
                        refer_by,
                        continuation,
                    },
                )?
            }
            K::InitiateActivityStatement => {
                let call = args.activity_call()?;
                let refer_by = args.optional_name();
                args.finish()?;
                self.statement(kind, at, Statement::InitiateActivity { call, refer_by })?
            }
            K::ActivityCall => {
                let activity = args.name()?;
                let arguments = args.optional_arguments().unwrap_or_default();
                let directives = args.optional_directives().unwrap_or_default();
                args.finish()?;
                Value::ActivityCall(ActivityCall {
                    activity,
                    arguments,
                    directives,
                })
            }
            K::Arguments => {
                let mut arguments = Vec::new();
                while !args.is_empty() {
                    arguments.push(args.argument()?);
                }
                Value::Arguments(arguments)
            }
            K::SimpleArgument => {
                let name = args.name()?;
                let value = args.expr()?;
                Value::Argument(Argument::Simple { name, value })
            }
            K::RecordArgument => {
                let name = args.name()?;
                let fields = args.arguments()?;
                Value::Argument(Argument::Record { name, fields })
            }
            K::Directives => {
                let mut directives = Vec::new();
                while !args.is_empty() {
                    directives.push(args.directive()?);
                }
                Value::Directives(directives)
            }
            K::Directive => {
                let name = args.name()?;
                Value::Directive(name, args.expr()?)
            }

            K::LogStatement => {
                let values = args.remaining_exprs()?;
                self.statement(kind, at, Statement::Log { values })?
            }
            K::AssignmentStatement => {
                let variable = args.name()?;
                let value = args.expr()?;
                args.finish()?;
                self.statement(kind, at, Statement::Assignment { variable, value })?
            }
            K::IfStatement => self.if_statement(kind, at, args)?,
            K::CaseStatement => self.case_statement(kind, at, args)?,
            K::CaseTag => Value::CaseTag(CaseTag {
                start: at,
                test: case_tag(&mut args)?,
            }),

            K::WaitForEventStatement => {
                let event = args.name()?;
                let timeout = args.optional_timeout();
                args.finish()?;
                self.statement(kind, at, Statement::WaitForEvent { event, timeout })?
            }
            K::WaitUntilStatement => {
                let condition = args.expr()?;
                let timeout = args.optional_timeout();
                args.finish()?;
                self.statement(kind, at, Statement::WaitUntil { condition, timeout })?
            }
            K::WaitForStatement => {
                let duration = args.expr()?;
                args.finish()?;
                self.statement(kind, at, Statement::WaitForRelativeTime { duration })?
            }
            K::Timeout => {
                let duration = args.expr()?;
                let raise_event = args.optional_name();
                args.finish()?;
                Value::Timeout(Timeout {
                    duration,
                    raise_event,
                })
            }

            K::Expression => {
                let mut expr = args.expr()?;
                while !args.is_empty() {
                    let op = args.boolean_operator()?;
                    expr = Expr::binary(expr, op, args.expr()?);
                }
                Value::Expr(expr)
            }
            K::RelationalExpression => {
                let left = args.expr()?;
                match args.optional_token() {
                    None => Value::Expr(left),
                    Some(token) => {
                        let op = BinaryOp::relational(&token.text).ok_or_else(|| {
                            CompileError::unknown_keyword(kind.name(), &token.text, token.start)
                        })?;
                        Value::Expr(Expr::binary(left, op, args.expr()?))
                    }
                }
            }
            K::ComparativeExpression | K::Product => {
                let mut expr = args.expr()?;
                while !args.is_empty() {
                    let token = args.token()?;
                    let op = BinaryOp::arithmetic(&token.text).ok_or_else(|| {
                        CompileError::unknown_keyword(kind.name(), &token.text, token.start)
                    })?;
                    expr = Expr::binary(expr, op, args.expr()?);
                }
                Value::Expr(expr)
            }
            K::Term => {
                let base = args.expr()?;
                if args.is_empty() {
                    Value::Expr(base)
                } else {
                    Value::Expr(Expr::binary(base, BinaryOp::Pow, args.expr()?))
                }
            }
            K::Factor => match args.optional_token() {
                Some(_not) => Value::Expr(Expr::unary(UnaryOp::Not, args.expr()?)),
                None => Value::Expr(args.expr()?),
            },
            K::SimpleFactor => match args.next()? {
                Value::Token(sign) => {
                    let op = match sign.text.as_str() {
                        "+" => UnaryOp::Plus,
                        "-" => UnaryOp::Minus,
                        other => {
                            return Err(CompileError::unknown_keyword(
                                kind.name(),
                                other,
                                sign.start,
                            ));
                        }
                    };
                    Value::Expr(Expr::unary(op, args.expr()?))
                }
                Value::Name(variable) => Value::Expr(Expr::Variable(variable)),
                expr @ Value::Expr(_) => expr,
                _ => return Err(args.malformed("expected a factor")),
            },
            K::Function => {
                let name = args.token()?;
                // Mission specific functions have no runtime binding
                if name.terminal == "NONSTANDARD_FUNCTION_NAME" {
                    return Err(CompileError::unsupported(name.terminal, name.start));
                }
                Value::Expr(Expr::Call {
                    function: name.text,
                    args: args.remaining_exprs()?,
                })
            }
            K::ObjectPropertyRequest => {
                let property = args.name()?;
                let object = args.name()?;
                Value::Expr(Expr::ReportingData(format!("{object}/{property}")))
            }
            K::ObjectProperty => Value::Name(keyword(&args.token()?)),
            K::ObjectReference => {
                let mut path = Vec::new();
                while !args.is_empty() {
                    path.push(args.name()?);
                }
                // `child of parent` is addressed as `parent/child`
                path.reverse();
                Value::Name(path.join("/"))
            }
            K::ArgumentReference => Value::Expr(Expr::Variable(args.name()?)),
            K::VariableReference | K::EventReference => Value::Name(args.name()?),
            K::BooleanOperator => {
                let token = args.token()?;
                let op = BinaryOp::boolean(&token.text).ok_or_else(|| {
                    CompileError::unknown_keyword(kind.name(), &token.text, token.start)
                })?;
                Value::BooleanOperator(op)
            }

            K::Constant => match args.next()? {
                expr @ Value::Expr(_) => expr,
                Value::Token(token) => Value::Expr(constant_token(kind, token)?),
                _ => return Err(args.malformed("expected a constant")),
            },
            K::BooleanConstant => {
                let token = args.token()?;
                match token.text.as_str() {
                    "TRUE" => Value::Expr(Expr::Bool(true)),
                    "FALSE" => Value::Expr(Expr::Bool(false)),
                    other => {
                        return Err(CompileError::unknown_keyword(kind.name(), other, token.start));
                    }
                }
            }
            K::IntegerConstant => match args.optional_token() {
                Some(token) if token.terminal == "HEXADECIMAL_CONSTANT" => {
                    args.finish()?;
                    Value::Expr(Expr::Hex(token.text))
                }
                Some(token) => Value::Expr(Expr::Quantity(token.text + &args.concat_text()?)),
                None => return Err(args.malformed("missing integer digits")),
            },
            K::RealConstant => Value::Expr(Expr::Quantity(args.concat_text()?)),
            K::RelativeTimeConstant => {
                let mut terms = Vec::new();
                while !args.is_empty() {
                    let magnitude = args.token()?;
                    let unit = args.token()?;
                    terms.push(format!("{}{}", magnitude.text, unit.text));
                }
                Value::Expr(Expr::RelativeTime(terms))
            }

            K::EngineeringUnits
            | K::UnitReference
            | K::UnitProduct
            | K::UnitFactor
            | K::UnitSimpleFactor
            | K::UnitExponent => Value::Units(args.concat_text()?),

            K::PropertyDataType
            | K::PropertyValueSet
            | K::PredefinedValueSetReference
            | K::EnumeratedSetDeclaration
            | K::EnumeratedSetReference
            | K::SetProcedureContextStatement
            | K::SetStepContextStatement
            | K::SystemElementReference
            | K::InitiateInParallelStatement
            | K::ArrayArgument
            | K::InformUserStatement
            | K::SaveContextStatement
            | K::SaveContext
            | K::ObjectOperationRequestStatement
            | K::ObjectOperation
            | K::WhileStatement
            | K::ForStatement
            | K::RepeatStatement
            | K::ReportingDataReference => {
                return Err(CompileError::unsupported(kind.name(), at));
            }
        };
        Ok(value)
    }

    fn declare(
        &mut self,
        kind: RuleKind,
        at: usize,
        declaration: Declaration,
    ) -> Result<(), CompileError> {
        let key = declaration.key().to_string();
        if self.declarations.insert(declaration) {
            Ok(())
        } else {
            Err(CompileError::malformed(
                kind.name(),
                at,
                format!("declaration '{key}' is registered twice"),
            ))
        }
    }

    /// Register `statement` under the key minted from `at`
    fn statement(
        &mut self,
        kind: RuleKind,
        at: usize,
        statement: Statement,
    ) -> Result<Value, CompileError> {
        let key = statement_key(at);
        self.declare(
            kind,
            at,
            Declaration::Statement {
                key: key.clone(),
                statement,
            },
        )?;
        Ok(Value::Key(key))
    }

    fn if_statement(
        &mut self,
        kind: RuleKind,
        at: usize,
        args: Args,
    ) -> Result<Value, CompileError> {
        let mut condition = None;
        let mut then_branch = Vec::new();
        let mut else_branch = Vec::new();
        let mut in_else = false;

        for value in args.rest() {
            match value {
                Value::Expr(expr) if condition.is_none() => condition = Some(expr),
                Value::Key(key) if in_else => else_branch.push(key),
                Value::Key(key) => then_branch.push(key),
                Value::Token(token) if token.text == "else" => in_else = true,
                Value::Token(_) => {}
                _ => return Err(CompileError::malformed(kind.name(), at, "unexpected child")),
            }
        }

        let condition = condition
            .ok_or_else(|| CompileError::malformed(kind.name(), at, "missing condition"))?;
        self.statement(
            kind,
            at,
            Statement::Conditional {
                condition,
                then_branch,
                else_branch,
            },
        )
    }

    /// Lower a case statement to a chain of conditionals, one per branch.
    /// The first is keyed by the statement itself, the others by their tag.
    fn case_statement(
        &mut self,
        kind: RuleKind,
        at: usize,
        args: Args,
    ) -> Result<Value, CompileError> {
        let mut subject = None;
        let mut branches: Vec<(CaseTag, Vec<String>)> = Vec::new();
        let mut otherwise: Option<Vec<String>> = None;

        for value in args.rest() {
            match value {
                Value::Expr(expr) if subject.is_none() => subject = Some(expr),
                Value::CaseTag(tag) => branches.push((tag, Vec::new())),
                Value::Key(key) => match (&mut otherwise, branches.last_mut()) {
                    (Some(statements), _) | (None, Some((_, statements))) => statements.push(key),
                    (None, None) => {
                        return Err(CompileError::malformed(
                            kind.name(),
                            at,
                            "statement before the first case tag",
                        ));
                    }
                },
                Value::Token(token) if token.text == "otherwise" => otherwise = Some(Vec::new()),
                Value::Token(_) => {}
                _ => return Err(CompileError::malformed(kind.name(), at, "unexpected child")),
            }
        }

        let subject =
            subject.ok_or_else(|| CompileError::malformed(kind.name(), at, "missing subject"))?;
        let keys: Vec<String> = branches
            .iter()
            .enumerate()
            .map(|(i, (tag, _))| statement_key(if i == 0 { at } else { tag.start }))
            .collect();
        let mut otherwise = otherwise.unwrap_or_default();

        for (i, (tag, then_branch)) in branches.into_iter().enumerate() {
            let else_branch = match keys.get(i + 1) {
                Some(next) => vec![next.clone()],
                None => std::mem::take(&mut otherwise),
            };
            let start = if i == 0 { at } else { tag.start };
            self.statement(
                kind,
                start,
                Statement::Conditional {
                    condition: tag.test.condition(&subject),
                    then_branch,
                    else_branch,
                },
            )?;
        }

        keys.into_iter()
            .next()
            .map(Value::Key)
            .ok_or_else(|| CompileError::malformed(kind.name(), at, "missing case tag"))
    }
}

/// `Procedure_<name>` with every non-identifier character replaced by `_`
pub fn procedure_class_name(procedure_name: &str) -> String {
    let name = if procedure_name.is_empty() {
        DEFAULT_PROCEDURE_NAME
    } else {
        procedure_name
    };
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("Procedure_{sanitized}")
}

fn body(kind: BodyKind, args: Args) -> Result<Value, CompileError> {
    Ok(Value::Body(Body {
        kind,
        statements: args.remaining_keys()?,
    }))
}

fn predefined_type(token: &Token) -> Result<DataType, CompileError> {
    Ok(match keyword(token).as_str() {
        "Boolean" => DataType::Boolean,
        "signed integer" | "unsigned integer" => DataType::Integer,
        "real" => DataType::Real,
        "string" => DataType::String,
        "absolute time" => DataType::AbsoluteTime,
        "relative time" => DataType::RelativeTime,
        other => {
            return Err(CompileError::unknown_keyword(
                RuleKind::PredefinedType.name(),
                other,
                token.start,
            ));
        }
    })
}

fn confirmation_status(token: &Token) -> Result<ConfirmationStatus, CompileError> {
    Ok(match keyword(token).as_str() {
        "confirmed" => ConfirmationStatus::Confirmed,
        "not confirmed" => ConfirmationStatus::NotConfirmed,
        "aborted" => ConfirmationStatus::Aborted,
        other => {
            return Err(CompileError::unknown_keyword(
                RuleKind::ContinuationTest.name(),
                other,
                token.start,
            ));
        }
    })
}

fn continuation_action(token: &Token) -> Result<ContinuationAction, CompileError> {
    Ok(match keyword(token).as_str() {
        "resume" => ContinuationAction::Resume,
        "abort" => ContinuationAction::Abort,
        "restart" => ContinuationAction::Restart,
        "ask user" => ContinuationAction::AskUser,
        "continue" => ContinuationAction::Continue,
        "terminate" => ContinuationAction::Terminate,
        other => {
            return Err(CompileError::unknown_keyword(
                RuleKind::ContinuationAction.name(),
                other,
                token.start,
            ));
        }
    })
}

fn case_tag(args: &mut Args) -> Result<TagTest, CompileError> {
    match args.next()? {
        Value::Expr(value) => Ok(TagTest::Equals(value)),
        Value::Token(token) if token.text == "between" => {
            let low = args.expr()?;
            args.token()?;
            let high = args.expr()?;
            Ok(TagTest::Between(low, high))
        }
        Value::Token(token) => {
            let op = BinaryOp::relational(&token.text).ok_or_else(|| {
                CompileError::unknown_keyword(RuleKind::CaseTag.name(), &token.text, token.start)
            })?;
            Ok(TagTest::Compare(op, args.expr()?))
        }
        _ => Err(args.malformed("expected a case tag")),
    }
}

fn constant_token(kind: RuleKind, token: Token) -> Result<Expr, CompileError> {
    match token.terminal.as_str() {
        "ABSOLUTE_TIME_CONSTANT" => parse_absolute_time(&token.text)
            .map(Expr::Timestamp)
            .map_err(|message| CompileError::malformed(kind.name(), token.start, message)),
        "STRING_CONSTANT" => Ok(Expr::Str(string_content(&token.text))),
        "ENUMERATED_CONSTANT" => Err(CompileError::unsupported("ENUMERATED_CONSTANT", token.start)),
        other => Err(CompileError::malformed(
            kind.name(),
            token.start,
            format!("unexpected constant terminal {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PlutoParser;

    fn translate(source: &str) -> Result<ProcedureIr, CompileError> {
        let tree = PlutoParser::new().unwrap().parse(source).unwrap();
        Transformer::new("test").transform(&tree)
    }

    fn expression(source: &str) -> Expr {
        let tree = PlutoParser::new()
            .unwrap()
            .parse_rule(source, "expression")
            .unwrap();
        match Transformer::default().visit(&tree).unwrap() {
            Value::Expr(expr) => expr,
            other => panic!("not an expression: {other:?}"),
        }
    }

    fn statement<'a>(ir: &'a ProcedureIr, key: &str) -> &'a Statement {
        ir.declarations
            .iter()
            .find_map(|declaration| match declaration {
                Declaration::Statement { key: k, statement } if k == key => Some(statement),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no statement {key}"))
    }

    #[test]
    fn test_procedure_class_name() {
        assert_eq!(procedure_class_name("noname"), "Procedure_noname");
        assert_eq!(procedure_class_name("heater-check 2"), "Procedure_heater_check_2");
        assert_eq!(procedure_class_name(""), "Procedure_noname");
    }

    #[test]
    fn test_expression_folding() {
        let Expr::Binary { op, left, .. } = expression("1 + 2 * 3 - 4") else {
            panic!("not binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Add, .. }));

        assert!(matches!(
            expression("Level > 2 XOR Flag = TRUE"),
            Expr::Binary { op: BinaryOp::Xor, .. }
        ));
        assert!(matches!(
            expression("NOT Flag"),
            Expr::Unary { op: UnaryOp::Not, .. }
        ));
    }

    #[test]
    fn test_object_property_path() {
        assert_eq!(
            expression("value of Temperature of Heater"),
            Expr::ReportingData("Heater/Temperature/value".into())
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(expression("-5 km/h"), Expr::Quantity("-5km/h".into()));
        assert_eq!(expression("0x1F"), Expr::Hex("0x1F".into()));
        assert_eq!(
            expression("1 h 30 min"),
            Expr::RelativeTime(vec!["1h".into(), "30min".into()])
        );
        assert!(matches!(expression("2024-03-04T10:11:12Z"), Expr::Timestamp(_)));
    }

    #[test]
    fn test_statements_are_keyed_by_offset() {
        let ir = translate("procedure main Count := 1; log Count; end main end procedure").unwrap();
        let keys: Vec<&str> = ir.declarations.iter().map(Declaration::key).collect();
        assert_eq!(keys, vec!["stmt_pos_15", "stmt_pos_27"]);
        assert_eq!(ir.procedure.name, "Procedure_test");
        assert_eq!(ir.procedure.bodies[0].statements, keys);
    }

    #[test]
    fn test_case_statement_becomes_conditional_chain() {
        let source = "procedure main \
            in case Level \
            is < 2: log 1; \
            or is between 2 and 5: log 2; \
            otherwise: log 3; \
            end case; \
            end main end procedure";
        let ir = translate(source).unwrap();
        let Statement::Conditional { else_branch, .. } = statement(&ir, "stmt_pos_15") else {
            panic!("first branch is not a conditional");
        };
        assert_eq!(else_branch.len(), 1);
        let Statement::Conditional {
            condition,
            else_branch,
            ..
        } = statement(&ir, &else_branch[0])
        else {
            panic!("second branch is not a conditional");
        };
        assert!(matches!(condition, Expr::Binary { op: BinaryOp::And, .. }));
        assert_eq!(else_branch.len(), 1);
        assert!(matches!(statement(&ir, &else_branch[0]), Statement::Log { .. }));
    }

    #[test]
    fn test_watchdog_steps_are_flagged() {
        let source = "procedure main log 1; end main \
            watchdog initiate and confirm step Guard main log 2; end main end step; end watchdog \
            end procedure";
        let ir = translate(source).unwrap();
        let flagged = ir.declarations.iter().any(|declaration| {
            matches!(
                declaration,
                Declaration::Statement {
                    statement: Statement::InitiateAndConfirmStep { watchdog: true, .. },
                    ..
                }
            )
        });
        assert!(flagged);
        assert!(ir
            .declarations
            .iter()
            .any(|declaration| matches!(declaration, Declaration::Step(step) if step.name.starts_with("Step_stmt_pos_"))));
    }

    #[test]
    fn test_unsupported_constructs() {
        let err = translate(
            "procedure main for Count := 1 to 3 do log Count; end for; end main end procedure",
        )
        .unwrap_err();
        assert_eq!(err, CompileError::unsupported("for_statement", 15));

        let err = translate("procedure main inform user \"hi\"; end main end procedure").unwrap_err();
        assert_eq!(err.rule(), "inform_user_statement");
    }

    #[test]
    fn test_unknown_rule() {
        let tree = SyntaxNode {
            rule: "mystery".into(),
            start: 0,
            end: 0,
            children: vec![],
        };
        assert_eq!(
            Transformer::default().transform(&tree).unwrap_err(),
            CompileError::UnknownRule {
                rule: "mystery".into(),
                offset: 0
            }
        );
    }
}
