//! Stack machine that evaluates compiled aperture macros.
//!
//! Evaluation is a fold over the instruction list. The accumulator owns the
//! operand stack, the `$n` variable bindings and the descriptors emitted so
//! far, so separate evaluations share nothing.

use std::collections::HashMap;
use std::fmt;

use log::warn;
use serde::Serialize;

use super::compiler::Instruction;
use crate::error::GerberError;

/// How `Sub` combines its operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtractSemantics {
    /// Second popped minus first popped: `5 - 3` is 2.
    #[default]
    Conventional,
    /// Subtracts the first operand from itself, always yielding zero.
    /// Matches output of older tools that shipped with this behaviour.
    Legacy,
}

/// One evaluated macro primitive: its code and numeric modifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveDescriptor {
    pub code: u32,
    pub modifiers: Vec<f64>,
}

impl fmt::Display for PrimitiveDescriptor {
    /// `code,m1,m2,…`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        for m in &self.modifiers {
            write!(f, ",{m}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Machine {
    stack: Vec<f64>,
    bindings: HashMap<u32, f64>,
    descriptors: Vec<PrimitiveDescriptor>,
}

impl Machine {
    fn pop(&mut self, at: &Instruction) -> Result<f64, GerberError> {
        self.stack
            .pop()
            .ok_or_else(|| GerberError::Syntax(format!("AM: stack underflow at {at:?}")))
    }

    fn binary(
        mut self,
        at: &Instruction,
        f: impl FnOnce(f64, f64) -> f64,
    ) -> Result<Self, GerberError> {
        let rhs = self.pop(at)?;
        let lhs = self.pop(at)?;
        self.stack.push(f(lhs, rhs));
        Ok(self)
    }

    fn step(mut self, ins: &Instruction, semantics: SubtractSemantics) -> Result<Self, GerberError> {
        match *ins {
            Instruction::Push(v) => {
                self.stack.push(v);
                Ok(self)
            }
            Instruction::Load(n) => {
                let v = self.bindings.get(&n).copied().unwrap_or(0.0);
                self.stack.push(v);
                Ok(self)
            }
            Instruction::Store(n) => {
                let v = self.pop(ins)?;
                self.bindings.insert(n, v);
                Ok(self)
            }
            Instruction::Add => self.binary(ins, |a, b| a + b),
            Instruction::Sub => match semantics {
                SubtractSemantics::Conventional => self.binary(ins, |a, b| a - b),
                SubtractSemantics::Legacy => self.binary(ins, |_, b| b - b),
            },
            Instruction::Mul => self.binary(ins, |a, b| a * b),
            Instruction::Div => self.binary(ins, |a, b| {
                if b == 0.0 {
                    warn!("Gerber: division by zero in aperture macro, using 0");
                    0.0
                } else {
                    a / b
                }
            }),
            Instruction::Prim(code) => {
                let modifiers = std::mem::take(&mut self.stack);
                self.descriptors.push(PrimitiveDescriptor { code, modifiers });
                Ok(self)
            }
        }
    }
}

/// Evaluates instruction lists. Holds only configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vm {
    semantics: SubtractSemantics,
}

impl Vm {
    pub fn new(semantics: SubtractSemantics) -> Self {
        Self { semantics }
    }

    /// Run `instructions` with `$1…$n` bound to `parameters`.
    pub fn evaluate(
        &self,
        instructions: &[Instruction],
        parameters: &[f64],
    ) -> Result<Vec<PrimitiveDescriptor>, GerberError> {
        let machine = Machine {
            bindings: (1..)
                .zip(parameters.iter().copied())
                .collect(),
            ..Machine::default()
        };
        let machine = instructions
            .iter()
            .try_fold(machine, |m, ins| m.step(ins, self.semantics))?;
        Ok(machine.descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn test_push_add_prim() {
        let out = Vm::default()
            .evaluate(&[Push(5.0), Push(3.0), Add, Prim(1)], &[])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_string(), "1,8");
    }

    #[test]
    fn test_sub_semantics() {
        let program = [Push(5.0), Push(3.0), Sub, Prim(1)];
        let conventional = Vm::new(SubtractSemantics::Conventional)
            .evaluate(&program, &[])
            .unwrap();
        assert_eq!(conventional[0].modifiers, vec![2.0]);
        let legacy = Vm::new(SubtractSemantics::Legacy)
            .evaluate(&program, &[])
            .unwrap();
        assert_eq!(legacy[0].modifiers, vec![0.0]);
    }

    #[test]
    fn test_parameters_and_store() {
        let program = [Load(1), Push(2.0), Div, Store(3), Load(3), Load(2), Load(9), Prim(21)];
        let out = Vm::default().evaluate(&program, &[4.0, 7.0]).unwrap();
        assert_eq!(out[0].modifiers, vec![2.0, 7.0, 0.0]);
        assert_eq!(out[0].to_string(), "21,2,7,0");
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        let out = Vm::default()
            .evaluate(&[Push(1.0), Push(0.0), Div, Prim(1)], &[])
            .unwrap();
        assert_eq!(out[0].modifiers, vec![0.0]);
    }

    #[test]
    fn test_prim_clears_stack() {
        let out = Vm::default()
            .evaluate(&[Push(1.0), Push(2.0), Prim(1), Push(3.0), Prim(5)], &[])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].to_string(), "5,3");
    }

    #[test]
    fn test_stack_underflow() {
        match Vm::default().evaluate(&[Push(1.0), Add], &[]) {
            Err(GerberError::Syntax(msg)) => assert!(msg.contains("underflow")),
            other => panic!("expected Syntax error, got: {other:?}"),
        }
    }

    #[test]
    fn test_fractional_descriptor_display() {
        let d = PrimitiveDescriptor {
            code: 1,
            modifiers: vec![1.0, 1.5, -0.25],
        };
        assert_eq!(d.to_string(), "1,1,1.5,-0.25");
    }
}
