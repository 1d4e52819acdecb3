//! Python target emitter
//!
//! Renders a [`ProcedureIr`] as a Python module for the procedure runtime.
//! Every statement becomes a top-level `def stmt_pos_N(caller)` function,
//! every step a `Step` subclass and the procedure a `Procedure` subclass
//! listing statement functions per body. Expressions are passed to the
//! runtime as `lambda x: ...` so it decides when to evaluate them.

use std::fmt::Write;

use super::TargetEmitter;
use super::ir::{
    ActivityCall, Argument, BinaryOp, Body, BodyKind, ClassDefinition, ConfirmationStatus,
    ContinuationAction, ContinuationTest, DataType, Declaration, Expr, ProcedureIr, Statement,
    Timeout, UnaryOp,
};

pub const PREAMBLE: &str = "# This is auto-generated code from the source Pluto file. Do not modify!\n";

const INDENT: &str = "    ";

/// Emits Python source; stateless
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonEmitter;

impl TargetEmitter for PythonEmitter {
    fn emit(&self, ir: &ProcedureIr) -> String {
        let mut items = Vec::with_capacity(ir.declarations.len() + 2);
        items.push(PREAMBLE.to_string());
        for declaration in &ir.declarations {
            items.push(match declaration {
                Declaration::Statement { key, statement } => statement_function(key, statement),
                Declaration::Step(step) => class(step, "Step", "caller", "caller"),
            });
        }
        items.push(class(&ir.procedure, "Procedure", "**kwargs", "**kwargs"));
        items.join("\n\n")
    }
}

fn statement_function(key: &str, statement: &Statement) -> String {
    let mut lines = Vec::new();
    match statement {
        Statement::Assignment { variable, value } => {
            lines.push(format!("caller.assignment('{variable}', {})", lambda(value)));
        }
        Statement::EventDeclaration { event, description } => match description {
            Some(description) => {
                lines.push(format!(
                    "caller.event_declaration('{event}', {})",
                    string_literal(description)
                ))
            }
            None => lines.push(format!("caller.event_declaration('{event}')")),
        },
        Statement::VariableDeclaration {
            variable,
            data_type,
        } => {
            lines.push(format!(
                "caller.variable_declaration('{variable}', {})",
                constructor(*data_type)
            ));
        }
        Statement::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            lines.push(format!("expression = {}", lambda(condition)));
            lines.push(format!("if_stmts = [{}]", then_branch.join(", ")));
            lines.push(format!("else_stmts = [{}]", else_branch.join(", ")));
            lines.push("caller.if_statement(expression, if_stmts, else_stmts)".to_string());
        }
        Statement::Log { values } => {
            let values: Vec<String> = values.iter().map(lambda).collect();
            lines.push(format!("caller.log({})", values.join(", ")));
        }
        Statement::WaitForRelativeTime { duration } => {
            lines.push(format!("caller.wait_for_relative_time({})", lambda(duration)));
        }
        Statement::WaitForEvent { event, timeout } => {
            lines.push(format!(
                "caller.wait_for_event(get_event(caller, '{event}'), {})",
                timeout_argument(timeout.as_ref())
            ));
        }
        Statement::WaitUntil { condition, timeout } => {
            lines.push(format!(
                "caller.wait_until_expression({}, {})",
                lambda(condition),
                timeout_argument(timeout.as_ref())
            ));
        }
        Statement::InitiateActivity { call, refer_by } => {
            activity_call(call, &mut lines);
            lines.push(refer_by_call(
                refer_by.as_deref(),
                "caller.initiate_activity(activity_call)",
            ));
        }
        Statement::InitiateAndConfirmActivity {
            call,
            refer_by,
            continuation,
        } => {
            activity_call(call, &mut lines);
            continuation_test(continuation, &mut lines);
            lines.push(refer_by_call(
                refer_by.as_deref(),
                "caller.initiate_and_confirm_activity(activity_call, continuation, raise_event)",
            ));
        }
        Statement::InitiateAndConfirmStep {
            step_class,
            watchdog,
            continuation,
        } => {
            lines.push(format!("step = {step_class}(caller)"));
            if *watchdog {
                lines.push(format!("caller.watchdogs['{step_class}'] = step"));
            }
            continuation_test(continuation, &mut lines);
            lines.push("caller.initiate_and_confirm_step(step, continuation, raise_event)".to_string());
        }
    }

    let mut out = format!("def {key}(caller):\n");
    for line in lines {
        let _ = writeln!(out, "{INDENT}{line}");
    }
    out
}

fn class(definition: &ClassDefinition, base: &str, params: &str, args: &str) -> String {
    let mut out = format!(
        "class {}({base}):\n\n{INDENT}def __init__(self, {params}):\n{INDENT}{INDENT}super().__init__({args})\n",
        definition.name
    );
    for Body { kind, statements } in &definition.bodies {
        for key in statements {
            let _ = writeln!(out, "{INDENT}{INDENT}self.{}.append({key})", attribute(*kind));
        }
    }
    out
}

fn attribute(kind: BodyKind) -> &'static str {
    match kind {
        BodyKind::Declaration => "declaration",
        BodyKind::Preconditions => "preconditions",
        BodyKind::Main => "main_body",
        BodyKind::Watchdog => "watchdog_body",
        BodyKind::Confirmation => "confirmation",
    }
}

fn constructor(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Boolean => "bool()",
        DataType::Integer => "int()",
        DataType::Real => "float()",
        DataType::String => "str()",
        DataType::AbsoluteTime => "datetime.utcnow()",
        DataType::RelativeTime => "timedelta()",
    }
}

fn refer_by_call(refer_by: Option<&str>, call: &str) -> String {
    match refer_by {
        Some(name) => format!("caller.refer_by['{name}'] = {call}"),
        None => call.to_string(),
    }
}

fn timeout_argument(timeout: Option<&Timeout>) -> String {
    match timeout {
        None => "timeout=None".to_string(),
        Some(Timeout {
            duration,
            raise_event: None,
        }) => format!("timeout={}", lambda(duration)),
        Some(Timeout {
            duration,
            raise_event: Some(event),
        }) => format!("timeout={}, raise_event='{event}'", lambda(duration)),
    }
}

fn activity_call(call: &ActivityCall, lines: &mut Vec<String>) {
    lines.push("arguments = OrderedDict()".to_string());
    lines.push("directives = OrderedDict()".to_string());
    arguments("arguments", &call.arguments, lines);
    for (name, value) in &call.directives {
        lines.push(format!("directives['{name}'] = {}", lambda(value)));
    }
    lines.push(format!(
        "activity_call = create_activity_call(caller, '{}', arguments, directives)",
        call.activity
    ));
}

fn arguments(path: &str, items: &[Argument], lines: &mut Vec<String>) {
    for argument in items {
        match argument {
            Argument::Simple { name, value } => {
                lines.push(format!("{path}['{name}'] = {}", lambda(value)));
            }
            Argument::Record { name, fields } => {
                let nested = format!("{path}['{name}']");
                lines.push(format!("{nested} = OrderedDict()"));
                arguments(&nested, fields, lines);
            }
        }
    }
}

fn continuation_test(test: &ContinuationTest, lines: &mut Vec<String>) {
    lines.push("continuation = OrderedDict()".to_string());
    lines.push("raise_event = None".to_string());
    for (status, action) in &test.cases {
        let status = match status {
            ConfirmationStatus::Confirmed => "ConfirmationStatus.CONFIRMED",
            ConfirmationStatus::NotConfirmed => "ConfirmationStatus.NOT_CONFIRMED",
            ConfirmationStatus::Aborted => "ConfirmationStatus.ABORTED",
        };
        let action = match action {
            ContinuationAction::Resume => "RESUME",
            ContinuationAction::Abort => "ABORT",
            ContinuationAction::Restart => "RESTART",
            ContinuationAction::AskUser => "ASK_USER",
            ContinuationAction::Continue => "CONTINUE",
            ContinuationAction::Terminate => "TERMINATE",
            ContinuationAction::RaiseEvent(event) => {
                lines.push(format!("raise_event = '{event}'"));
                "RAISE_EVENT"
            }
        };
        lines.push(format!("continuation[{status}] = ContinuationAction.{action}"));
    }
}

fn lambda(expr: &Expr) -> String {
    format!("lambda x: {}", expression(expr))
}

/// Python binding strength; higher binds tighter
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => operator_precedence(*op),
        Expr::Unary { op: UnaryOp::Not, .. } => 3,
        Expr::Unary { .. } => 10,
        Expr::RelativeTime(terms) if terms.len() > 1 => 8,
        _ => 12,
    }
}

fn operator_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
        BinaryOp::Xor => 6,
        BinaryOp::Add | BinaryOp::Sub => 8,
        BinaryOp::Mul | BinaryOp::Div => 9,
        BinaryOp::Pow => 11,
    }
}

fn symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::Xor => "^",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Pow => "**",
    }
}

fn operand(expr: &Expr, min: u8) -> String {
    if precedence(expr) < min {
        format!("({})", expression(expr))
    } else {
        expression(expr)
    }
}

/// Double-quoted Python literal; PLUTO strings have no escapes of their own
fn string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            other => literal.push(other),
        }
    }
    literal.push('"');
    literal
}

fn expression(expr: &Expr) -> String {
    match expr {
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::Quantity(text) => format!("ureg('{text}')"),
        Expr::Hex(text) => format!("int('{text}', 16)"),
        Expr::Str(text) => string_literal(text),
        Expr::Timestamp(t) => format!(
            "datetime({}, {}, {}, {}, {}, {}, {})",
            t.year, t.month, t.day, t.hour, t.minute, t.second, t.microsecond
        ),
        Expr::RelativeTime(terms) => terms
            .iter()
            .map(|term| format!("ureg('{term}')"))
            .collect::<Vec<_>>()
            .join(" + "),
        Expr::Variable(name) => format!("get_variable(caller, '{name}').value"),
        Expr::ReportingData(path) => format!("get_reporting_data(caller, '{path}')"),
        Expr::Call { function, args } => {
            let args: Vec<String> = args.iter().map(expression).collect();
            format!("{function}({})", args.join(", "))
        }
        Expr::Unary { op, operand } => {
            let prefix = match op {
                UnaryOp::Not => "not ",
                UnaryOp::Plus => "+",
                UnaryOp::Minus => "-",
            };
            if matches!(**operand, Expr::Binary { .. }) {
                format!("{prefix}({})", expression(operand))
            } else {
                format!("{prefix}{}", expression(operand))
            }
        }
        Expr::Binary { left, op, right } => {
            let p = operator_precedence(*op);
            // Comparisons must not chain; power is right associative
            let (left_min, right_min) = match op {
                BinaryOp::Pow => (p + 1, p),
                _ if p == 4 => (p + 1, p + 1),
                _ => (p, p + 1),
            };
            format!(
                "{} {} {}",
                operand(left, left_min),
                symbol(*op),
                operand(right, right_min)
            )
        }
    }
}
