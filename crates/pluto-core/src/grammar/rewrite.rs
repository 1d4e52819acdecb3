//! Rewrite presets for the two checked-in grammars
//!
//! The published grammar and its railroad diagrams disagree in a handful of
//! places, and a few constructs need tree-shaping marks the standard cannot
//! express. These patches are the only place such knowledge lives.

use super::ebnf::{Replacement, RewriteRules};

impl RewriteRules {
    /// Patches for the PLUTO procedure grammar
    pub fn pluto() -> Self {
        Self {
            pre: vec![
                Replacement::new(r"\? Engineering Units \?", "engineering_units"),
                Replacement::new(r"\? all characters except double quote \?", r#"/[^"]/"#),
                Replacement::new(r#"'"'"#, r#""\"""#),
                // Missing comma after the first case branch
                Replacement::new(
                    r#"("is", Case Tag, ":", \{Step Statement, ";"\}-)$"#,
                    "${1},",
                ),
                Replacement::new(r"([0-9]) \* Digit", "Digit ~ ${1}"),
            ],
            terminals: [
                "absolute_time_constant",
                "year",
                "month",
                "day_of_month",
                "day",
                "hour",
                "minute",
                "second",
                "fraction_of_second",
                "string_constant",
                "characters",
                "hexadecimal_constant",
                "hexadecimal_symbol",
                "hexadecimal_digit",
                "unsigned_integer",
                "unsigned_real",
                "days",
                "hours",
                "minutes",
                "seconds",
                "sign",
                "addition_operator",
                "multiplication_operator",
                "relational_operator",
                "negation_boolean_operator",
                "standard_function_name",
                "standard_object_property_name",
                "confirmation_status",
                "enumerated_constant",
                "event_name",
                "variable_name",
                "step_name",
                "object_name",
                "object_type",
                "argument_name",
                "directive_name",
                "set_name",
                "activity_statement",
                "reporting_data_name",
                "nonstandard_object_property_name",
                "nonstandard_object_operation_name",
                "nonstandard_function_name",
                "identifier",
                "identifier_first_word",
                "identifier_subsequent_word",
                "letter",
                "digit",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            post: vec![
                Replacement::new(r"\(LETTER \| DIGIT\)([*+])", r#"(LETTER | DIGIT | "_")${1}"#),
                // Longer operators must be tried first
                Replacement::new(r#""<" \| ">" \| "<=" \| ">=""#, r#""<=" | ">=" | "<" | ">""#),
                Replacement::new(r"^boolean_constant :", "!boolean_constant :"),
                Replacement::new(r"^boolean_operator :", "!boolean_operator :"),
                Replacement::new(r"^predefined_type :", "!predefined_type :"),
                Replacement::new(r"^relative_time_constant :", "!relative_time_constant :"),
                Replacement::new(r"^continuation_action :", "!continuation_action :"),
                Replacement::new(r"^if_statement :", "!if_statement :"),
                Replacement::new(r"^case_statement :", "!case_statement :"),
                Replacement::new(r"^case_tag :", "!case_tag :"),
                Replacement::new(r"^procedure_statement :", "?procedure_statement :"),
                Replacement::new(r"^step_statement :", "?step_statement :"),
                Replacement::new(r"^flow_control_statement :", "?flow_control_statement :"),
                Replacement::new(r"^wait_statement :", "?wait_statement :"),
                Replacement::new(r"^argument :", "?argument :"),
            ],
        }
    }

    /// Patches for the engineering units sub-grammar
    pub fn engineering_units() -> Self {
        Self {
            pre: vec![Replacement::new(
                r"\? Engineering Units \?",
                "Engineering Units",
            )],
            terminals: [
                "decimal_prefix",
                "decimal_multiple_prefix",
                "decimal_submultiple_prefix",
                "binary_prefix",
                "multiple_and_submultiple_simple_unit",
                "submultiple_only_simple_unit",
                "multiple_only_simple_unit",
                "unsigned_integer",
                "digit",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            post: vec![
                // Extra simple factor in the published unit factor rule
                Replacement::new(r"unit_simple_factor \(unit_simple_factor", "(unit_simple_factor"),
                // Units sharing a prefix with a shorter unit must come first
                Replacement::new(
                    r#""m" \| "g" \| "s" \| "A" \| "K" \| "mol""#,
                    r#""mol" | "sr" | "Sv" | "Wb" | "m" | "g" | "s" | "A" | "K""#,
                ),
                Replacement::new(r#""rad" \| "sr""#, r#""rad""#),
                Replacement::new(r#""S" \| "Wb" \| "T""#, r#""S" | "T""#),
                Replacement::new(r#""Gy" \| "Sv""#, r#""Gy""#),
                Replacement::new(r#""B" \| "Bd""#, r#""Bd" | "B""#),
                Replacement::new(r"^unit_reference :", "!?unit_reference :"),
                Replacement::new(r"^unit_product :", "!?unit_product :"),
                Replacement::new(r"^unit_factor :", "!?unit_factor :"),
                Replacement::new(r"^unit_simple_factor :", "!?unit_simple_factor :"),
                Replacement::new(r"^unit_exponent :", "!?unit_exponent :"),
            ],
        }
    }
}
