//! Aperture macros: `%AM…%` definitions compiled to a small stack machine.
//!
//! A macro is compiled the first time an AD statement references it and the
//! instruction list is cached on the definition. Instantiating a macro runs
//! the VM with the AD modifiers bound to `$1…$n`, then builds geometry from
//! the emitted descriptors.

pub mod builder;
pub mod compiler;
pub mod vm;

use std::collections::HashMap;

use log::debug;

use crate::error::GerberError;
use crate::primitives::AmGroup;
use crate::settings::Units;

pub use compiler::{compile, Instruction};
pub use vm::{PrimitiveDescriptor, SubtractSemantics, Vm};

/// A named macro: its source text and, once used, its compiled form.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub name: String,
    pub source: String,
    compiled: Option<Vec<Instruction>>,
}

impl MacroDefinition {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            compiled: None,
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compiled instructions, compiling on first call.
    pub fn instructions(&mut self) -> Result<&[Instruction], GerberError> {
        if self.compiled.is_none() {
            debug!("Gerber: compiling aperture macro '{}'", self.name);
            self.compiled = Some(compile(&self.source)?);
        }
        Ok(self.compiled.as_deref().unwrap_or_default())
    }
}

/// Macro definitions keyed by name.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, MacroDefinition>,
    vm: Vm,
}

impl MacroTable {
    pub fn new(semantics: SubtractSemantics) -> Self {
        Self {
            macros: HashMap::new(),
            vm: Vm::new(semantics),
        }
    }

    /// Add or replace a definition. A redefinition discards any compiled form.
    pub fn define(&mut self, name: &str, source: &str) {
        self.macros
            .insert(name.to_string(), MacroDefinition::new(name, source));
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Evaluate macro `name` with `modifiers` bound to `$1…$n` and build the
    /// resulting geometry as one group at the origin.
    pub fn instantiate(
        &mut self,
        name: &str,
        modifiers: &[f64],
        units: Units,
    ) -> Result<AmGroup, GerberError> {
        let definition = self
            .macros
            .get_mut(name)
            .ok_or_else(|| GerberError::UndefinedMacro(name.to_string()))?;
        let descriptors = self.vm.evaluate(definition.instructions()?, modifiers)?;
        builder::build_group(&descriptors, units)
    }
}
