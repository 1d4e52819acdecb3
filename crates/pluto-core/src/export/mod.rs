//! Procedure IR and target emitters

pub mod ir;
pub mod python;

pub use ir::ProcedureIr;
pub use python::{PREAMBLE, PythonEmitter};

/// Serializes a compiled procedure into target source text
pub trait TargetEmitter {
    fn emit(&self, ir: &ProcedureIr) -> String;
}
