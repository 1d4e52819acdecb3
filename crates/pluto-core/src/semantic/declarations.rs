//! Procedure-scoped declaration table
//!
//! Statements and steps are registered as they are translated. Insertion
//! order is preserved so the emitted module lists them exactly as the
//! traversal produced them; the procedure class is appended by
//! [`DeclarationTable::finish`].

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::export::ir::{ClassDefinition, Declaration, ProcedureIr, Statement};

/// Key of the statement whose syntax node starts at `start`
pub fn statement_key(start: usize) -> String {
    format!("stmt_pos_{start}")
}

/// Name of the step class generated for the statement keyed `key`
pub fn step_class_name(key: &str) -> String {
    format!("Step_{key}")
}

#[derive(Debug, Default)]
pub struct DeclarationTable {
    entries: IndexMap<String, Declaration>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration; returns `false` if its key is already taken
    pub fn insert(&mut self, declaration: Declaration) -> bool {
        match self.entries.entry(declaration.key().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(declaration);
                true
            }
        }
    }

    /// Flag the step statement keyed `key` as a watchdog
    pub fn mark_watchdog(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(Declaration::Statement {
                statement: Statement::InitiateAndConfirmStep { watchdog, .. },
                ..
            }) => {
                *watchdog = true;
                true
            }
            _ => false,
        }
    }

    /// Close the table with the root procedure class
    pub fn finish(self, procedure: ClassDefinition) -> ProcedureIr {
        ProcedureIr {
            declarations: self.entries.into_values().collect(),
            procedure,
        }
    }
}
