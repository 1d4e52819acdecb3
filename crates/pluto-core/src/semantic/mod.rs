//! Translation of syntax trees into the procedure IR

pub mod declarations;
pub mod rule_kind;
pub mod time;
pub mod transformer;
pub mod values;

pub use declarations::{DeclarationTable, statement_key, step_class_name};
pub use rule_kind::RuleKind;
pub use time::parse_absolute_time;
pub use transformer::{DEFAULT_PROCEDURE_NAME, Transformer, procedure_class_name};
pub use values::Value;
