//! Procedure intermediate representation
//!
//! # Overview
//!
//! The transformer never builds target text directly. It produces the
//! structures below, which a [`TargetEmitter`](super::TargetEmitter)
//! serializes in one final pass.
//!
//! - [`Expr`] is an expression tree. Parentheses are not stored; emitters
//!   derive them from operator precedence.
//! - [`Statement`] is one independently schedulable procedure statement.
//! - [`Declaration`] is an entry of the ordered declaration table:
//!   a statement or a step class.
//! - [`ProcedureIr`] is the complete, ordered output of one compilation.

use serde::Serialize;

/// Binary operators, in source terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn relational(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            _ => return None,
        })
    }

    pub fn arithmetic(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            _ => return None,
        })
    }

    pub fn boolean(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "AND" => BinaryOp::And,
            "OR" => BinaryOp::Or,
            "XOR" => BinaryOp::Xor,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

/// Structured timestamp of an absolute time literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Bool(bool),
    /// Numeric literal with optional sign and units, e.g. `-2.5km/h`
    Quantity(String),
    /// Hexadecimal integer including its `0x` prefix
    Hex(String),
    /// String literal content without its quotes
    Str(String),
    Timestamp(Timestamp),
    /// One `<magnitude><unit>` term per relative time component
    RelativeTime(Vec<String>),
    /// Procedure variable or activity argument lookup
    Variable(String),
    /// Reporting data lookup by `object/.../property` path
    ReportingData(String),
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Boolean,
    Integer,
    Real,
    String,
    AbsoluteTime,
    RelativeTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfirmationStatus {
    Confirmed,
    NotConfirmed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContinuationAction {
    Resume,
    Abort,
    Restart,
    AskUser,
    Continue,
    Terminate,
    RaiseEvent(String),
}

/// Ordered mapping from confirmation outcome to follow-up action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContinuationTest {
    pub cases: Vec<(ConfirmationStatus, ContinuationAction)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeout {
    pub duration: Expr,
    pub raise_event: Option<String>,
}

/// Activity argument; records nest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Argument {
    Simple { name: String, value: Expr },
    Record { name: String, fields: Vec<Argument> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityCall {
    /// `parent/child` path of the activity object
    pub activity: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Assignment {
        variable: String,
        value: Expr,
    },
    EventDeclaration {
        event: String,
        description: Option<String>,
    },
    VariableDeclaration {
        variable: String,
        data_type: DataType,
    },
    /// Declarative branch: the runtime evaluates the condition and
    /// schedules one of the two statement lists
    Conditional {
        condition: Expr,
        then_branch: Vec<String>,
        else_branch: Vec<String>,
    },
    Log {
        values: Vec<Expr>,
    },
    WaitForRelativeTime {
        duration: Expr,
    },
    WaitForEvent {
        event: String,
        timeout: Option<Timeout>,
    },
    WaitUntil {
        condition: Expr,
        timeout: Option<Timeout>,
    },
    InitiateActivity {
        call: ActivityCall,
        refer_by: Option<String>,
    },
    InitiateAndConfirmActivity {
        call: ActivityCall,
        refer_by: Option<String>,
        continuation: ContinuationTest,
    },
    InitiateAndConfirmStep {
        step_class: String,
        watchdog: bool,
        continuation: ContinuationTest,
    },
}

/// Attribute list of a procedure or step that statements are appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyKind {
    Declaration,
    Preconditions,
    Main,
    Watchdog,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Body {
    pub kind: BodyKind,
    /// Statement keys in source order
    pub statements: Vec<String>,
}

/// Procedure or step class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDefinition {
    pub name: String,
    pub bodies: Vec<Body>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Declaration {
    Statement { key: String, statement: Statement },
    Step(ClassDefinition),
}

impl Declaration {
    pub fn key(&self) -> &str {
        match self {
            Declaration::Statement { key, .. } => key,
            Declaration::Step(class) => &class.name,
        }
    }
}

/// Ordered output of one compilation; the procedure class comes last
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureIr {
    pub declarations: Vec<Declaration>,
    pub procedure: ClassDefinition,
}
