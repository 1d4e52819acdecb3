//! Closed set of grammar rules the transformer dispatches on
//!
//! Every rule of the procedure grammar, including the rules imported from
//! the engineering units grammar under their namespaced names, maps to
//! exactly one [`RuleKind`]. The transformer matches on it exhaustively, so
//! a new kind cannot be added without deciding how it is translated.

use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    // Procedure structure
    ProcedureDefinition,
    ProcedureDeclarationBody,
    PreconditionsBody,
    ProcedureMainBody,
    ProcedureStatement,
    WatchdogBody,
    ConfirmationBody,

    // Declarations
    EventDeclaration,
    Description,
    VariableDeclaration,
    PredefinedType,
    PropertyDataType,
    PropertyValueSet,
    PredefinedValueSetReference,
    EnumeratedSetDeclaration,
    EnumeratedSetReference,

    // Context and parallelism
    SetProcedureContextStatement,
    SetStepContextStatement,
    SystemElementReference,
    InitiateInParallelStatement,

    // Steps
    InitiateAndConfirmStepStatement,
    StepDefinition,
    StepDeclarationBody,
    StepMainBody,
    StepStatement,
    ContinuationTest,
    ContinuationAction,
    RaiseEvent,

    // Activities
    InitiateAndConfirmActivityStatement,
    InitiateActivityStatement,
    ActivityCall,
    ActivityReference,
    Arguments,
    Argument,
    SimpleArgument,
    RecordArgument,
    ArrayArgument,
    Directives,
    Directive,

    // Simple statements
    InformUserStatement,
    LogStatement,
    AssignmentStatement,
    SaveContextStatement,
    SaveContext,
    ObjectOperationRequestStatement,
    ObjectOperation,

    // Flow control
    FlowControlStatement,
    IfStatement,
    CaseStatement,
    CaseTag,
    WhileStatement,
    ForStatement,
    RepeatStatement,

    // Waits
    WaitStatement,
    WaitForEventStatement,
    WaitUntilStatement,
    WaitForStatement,
    Timeout,

    // Expressions
    Expression,
    RelationalExpression,
    ComparativeExpression,
    Product,
    Term,
    Factor,
    SimpleFactor,
    Function,
    ObjectPropertyRequest,
    ObjectProperty,
    ObjectReference,
    ReportingDataReference,
    ArgumentReference,
    VariableReference,
    EventReference,
    BooleanOperator,

    // Constants
    Constant,
    BooleanConstant,
    IntegerConstant,
    RealConstant,
    RelativeTimeConstant,

    // Engineering units
    EngineeringUnits,
    UnitReference,
    UnitProduct,
    UnitFactor,
    UnitSimpleFactor,
    UnitExponent,
}

const RULE_NAMES: &[(&str, RuleKind)] = &[
    ("procedure_definition", RuleKind::ProcedureDefinition),
    ("procedure_declaration_body", RuleKind::ProcedureDeclarationBody),
    ("preconditions_body", RuleKind::PreconditionsBody),
    ("procedure_main_body", RuleKind::ProcedureMainBody),
    ("procedure_statement", RuleKind::ProcedureStatement),
    ("watchdog_body", RuleKind::WatchdogBody),
    ("confirmation_body", RuleKind::ConfirmationBody),
    ("event_declaration", RuleKind::EventDeclaration),
    ("description", RuleKind::Description),
    ("variable_declaration", RuleKind::VariableDeclaration),
    ("predefined_type", RuleKind::PredefinedType),
    ("property_data_type", RuleKind::PropertyDataType),
    ("property_value_set", RuleKind::PropertyValueSet),
    ("predefined_value_set_reference", RuleKind::PredefinedValueSetReference),
    ("enumerated_set_declaration", RuleKind::EnumeratedSetDeclaration),
    ("enumerated_set_reference", RuleKind::EnumeratedSetReference),
    ("set_procedure_context_statement", RuleKind::SetProcedureContextStatement),
    ("set_step_context_statement", RuleKind::SetStepContextStatement),
    ("system_element_reference", RuleKind::SystemElementReference),
    ("initiate_in_parallel_statement", RuleKind::InitiateInParallelStatement),
    ("initiate_and_confirm_step_statement", RuleKind::InitiateAndConfirmStepStatement),
    ("step_definition", RuleKind::StepDefinition),
    ("step_declaration_body", RuleKind::StepDeclarationBody),
    ("step_main_body", RuleKind::StepMainBody),
    ("step_statement", RuleKind::StepStatement),
    ("continuation_test", RuleKind::ContinuationTest),
    ("continuation_action", RuleKind::ContinuationAction),
    ("raise_event", RuleKind::RaiseEvent),
    ("initiate_and_confirm_activity_statement", RuleKind::InitiateAndConfirmActivityStatement),
    ("initiate_activity_statement", RuleKind::InitiateActivityStatement),
    ("activity_call", RuleKind::ActivityCall),
    ("activity_reference", RuleKind::ActivityReference),
    ("arguments", RuleKind::Arguments),
    ("argument", RuleKind::Argument),
    ("simple_argument", RuleKind::SimpleArgument),
    ("record_argument", RuleKind::RecordArgument),
    ("array_argument", RuleKind::ArrayArgument),
    ("directives", RuleKind::Directives),
    ("directive", RuleKind::Directive),
    ("inform_user_statement", RuleKind::InformUserStatement),
    ("log_statement", RuleKind::LogStatement),
    ("assignment_statement", RuleKind::AssignmentStatement),
    ("save_context_statement", RuleKind::SaveContextStatement),
    ("save_context", RuleKind::SaveContext),
    ("object_operation_request_statement", RuleKind::ObjectOperationRequestStatement),
    ("object_operation", RuleKind::ObjectOperation),
    ("flow_control_statement", RuleKind::FlowControlStatement),
    ("if_statement", RuleKind::IfStatement),
    ("case_statement", RuleKind::CaseStatement),
    ("case_tag", RuleKind::CaseTag),
    ("while_statement", RuleKind::WhileStatement),
    ("for_statement", RuleKind::ForStatement),
    ("repeat_statement", RuleKind::RepeatStatement),
    ("wait_statement", RuleKind::WaitStatement),
    ("wait_for_event_statement", RuleKind::WaitForEventStatement),
    ("wait_until_statement", RuleKind::WaitUntilStatement),
    ("wait_for_statement", RuleKind::WaitForStatement),
    ("timeout", RuleKind::Timeout),
    ("expression", RuleKind::Expression),
    ("relational_expression", RuleKind::RelationalExpression),
    ("comparative_expression", RuleKind::ComparativeExpression),
    ("product", RuleKind::Product),
    ("term", RuleKind::Term),
    ("factor", RuleKind::Factor),
    ("simple_factor", RuleKind::SimpleFactor),
    ("function", RuleKind::Function),
    ("object_property_request", RuleKind::ObjectPropertyRequest),
    ("object_property", RuleKind::ObjectProperty),
    ("object_reference", RuleKind::ObjectReference),
    ("reporting_data_reference", RuleKind::ReportingDataReference),
    ("argument_reference", RuleKind::ArgumentReference),
    ("variable_reference", RuleKind::VariableReference),
    ("event_reference", RuleKind::EventReference),
    ("boolean_operator", RuleKind::BooleanOperator),
    ("constant", RuleKind::Constant),
    ("boolean_constant", RuleKind::BooleanConstant),
    ("integer_constant", RuleKind::IntegerConstant),
    ("real_constant", RuleKind::RealConstant),
    ("relative_time_constant", RuleKind::RelativeTimeConstant),
    ("engineering_units", RuleKind::EngineeringUnits),
    ("engineering_units.unit_reference", RuleKind::UnitReference),
    ("engineering_units.unit_product", RuleKind::UnitProduct),
    ("engineering_units.unit_factor", RuleKind::UnitFactor),
    ("engineering_units.unit_simple_factor", RuleKind::UnitSimpleFactor),
    ("engineering_units.unit_exponent", RuleKind::UnitExponent),
];

static BY_NAME: Lazy<HashMap<&'static str, RuleKind>> =
    Lazy::new(|| RULE_NAMES.iter().copied().collect());

impl RuleKind {
    /// Kind of the rule named `name`, if the transformer knows it
    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        RULE_NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Every known rule name
    pub fn names() -> impl Iterator<Item = &'static str> {
        RULE_NAMES.iter().map(|(name, _)| *name)
    }
}
