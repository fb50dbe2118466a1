// This module is a pure-Rust backend for the test suite: instead of LLVM IR it
// records every emission as an event and folds constants so tests can assert on
// both the exact emission sequence (at-most-once, ordering) and the computed
// values, without linking LLVM. Values are indices into a side table of folded
// constants; stack slots fold through a small memory map keyed by slot index.
// The recorded module derives equality, so two runs over the same input can be
// compared wholesale.

//! A recording backend for tests.

use std::collections::HashMap;

use crate::backend::{ArithOp, Backend, BackendError, BitOp, Predicate, ValueTy};

/// One recorded emission. Operand values are indices into the value table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConstInt(i32),
    ConstBool(bool),
    AllOnes(usize),
    Arith(ArithOp, usize, usize),
    Bitwise(BitOp, usize, usize),
    Compare(Predicate, usize, usize),
    AllocSlot(ValueTy),
    Load(usize),
    Store { value: usize, slot: usize },
    BeginFunction(String),
    EndFunction,
    Call(String),
    Print(usize),
}

/// Everything a finished recording run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedModule {
    pub events: Vec<Event>,
    /// Folded constant per value index; `None` for values with no compile-time
    /// constant (slots, functions, call results).
    pub values: Vec<Option<i64>>,
    /// Folded constant of the designated result value, when it has one.
    pub result: Option<i64>,
}

/// Records emissions and folds constants. `Value` is an index into the value
/// table.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    events: Vec<Event>,
    values: Vec<Option<i64>>,
    memory: HashMap<usize, Option<i64>>,
    open_functions: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, event: Event, folded: Option<i64>) -> usize {
        self.events.push(event);
        self.values.push(folded);
        self.values.len() - 1
    }

    fn note(&mut self, event: Event) {
        self.events.push(event);
    }

    fn folded(&self, value: usize) -> Option<i64> {
        self.values.get(value).copied().flatten()
    }
}

impl Backend for RecordingBackend {
    type Value = usize;
    type Output = RecordedModule;

    fn const_int(&mut self, value: i32) -> usize {
        self.push(Event::ConstInt(value), Some(i64::from(value)))
    }

    fn const_bool(&mut self, value: bool) -> usize {
        self.push(Event::ConstBool(value), Some(i64::from(value)))
    }

    fn all_ones_like(&mut self, value: usize) -> Result<usize, BackendError> {
        Ok(self.push(Event::AllOnes(value), Some(-1)))
    }

    fn arith(&mut self, op: ArithOp, lhs: usize, rhs: usize) -> Result<usize, BackendError> {
        let folded = match (self.folded(lhs), self.folded(rhs)) {
            (Some(a), Some(b)) => match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Sub => a.checked_sub(b),
                ArithOp::Mul => a.checked_mul(b),
                ArithOp::SDiv => a.checked_div(b),
                ArithOp::SRem => a.checked_rem(b),
            },
            _ => None,
        };
        Ok(self.push(Event::Arith(op, lhs, rhs), folded))
    }

    fn bitwise(&mut self, op: BitOp, lhs: usize, rhs: usize) -> Result<usize, BackendError> {
        let folded = match (self.folded(lhs), self.folded(rhs)) {
            (Some(a), Some(b)) => Some(match op {
                BitOp::And => a & b,
                BitOp::Or => a | b,
                BitOp::Xor => a ^ b,
            }),
            _ => None,
        };
        Ok(self.push(Event::Bitwise(op, lhs, rhs), folded))
    }

    fn compare(&mut self, pred: Predicate, lhs: usize, rhs: usize) -> Result<usize, BackendError> {
        let folded = match (self.folded(lhs), self.folded(rhs)) {
            (Some(a), Some(b)) => Some(i64::from(match pred {
                Predicate::Eq => a == b,
                Predicate::Ne => a != b,
                Predicate::Slt => a < b,
                Predicate::Sle => a <= b,
                Predicate::Sgt => a > b,
                Predicate::Sge => a >= b,
            })),
            _ => None,
        };
        Ok(self.push(Event::Compare(pred, lhs, rhs), folded))
    }

    fn alloc_slot(&mut self, ty: ValueTy) -> Result<usize, BackendError> {
        let slot = self.push(Event::AllocSlot(ty), None);
        self.memory.insert(slot, None);
        Ok(slot)
    }

    fn load(&mut self, slot: usize, _ty: ValueTy) -> Result<usize, BackendError> {
        let folded = match self.memory.get(&slot) {
            Some(stored) => *stored,
            None => {
                return Err(BackendError::Builder(format!(
                    "load from value {slot}, which is not a slot"
                )))
            }
        };
        Ok(self.push(Event::Load(slot), folded))
    }

    fn store(&mut self, value: usize, slot: usize) -> Result<(), BackendError> {
        if !self.memory.contains_key(&slot) {
            return Err(BackendError::Builder(format!(
                "store to value {slot}, which is not a slot"
            )));
        }
        let folded = self.folded(value);
        self.memory.insert(slot, folded);
        self.note(Event::Store { value, slot });
        Ok(())
    }

    fn begin_function(&mut self, name: &str) -> Result<usize, BackendError> {
        self.open_functions += 1;
        Ok(self.push(Event::BeginFunction(name.to_string()), None))
    }

    fn end_function(&mut self) -> Result<(), BackendError> {
        if self.open_functions == 0 {
            return Err(BackendError::Builder("no open function to seal".to_string()));
        }
        self.open_functions -= 1;
        self.note(Event::EndFunction);
        Ok(())
    }

    fn call_named(&mut self, name: &str) -> Result<usize, BackendError> {
        Ok(self.push(Event::Call(name.to_string()), None))
    }

    fn print(&mut self, value: usize) -> Result<(), BackendError> {
        self.note(Event::Print(value));
        Ok(())
    }

    fn finish(self, result: Option<usize>) -> Result<RecordedModule, BackendError> {
        let result = result.and_then(|value| self.folded(value));
        Ok(RecordedModule {
            events: self.events,
            values: self.values,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_arithmetic() {
        let mut backend = RecordingBackend::new();
        let a = backend.const_int(6);
        let b = backend.const_int(7);
        let prod = backend.arith(ArithOp::Mul, a, b).unwrap();
        let module = backend.finish(Some(prod)).unwrap();
        assert_eq!(module.result, Some(42));
        assert_eq!(module.events.len(), 3);
    }

    #[test]
    fn test_division_by_zero_does_not_fold() {
        let mut backend = RecordingBackend::new();
        let a = backend.const_int(1);
        let b = backend.const_int(0);
        let q = backend.arith(ArithOp::SDiv, a, b).unwrap();
        let module = backend.finish(Some(q)).unwrap();
        assert_eq!(module.result, None);
    }

    #[test]
    fn test_memory_round_trip() {
        let mut backend = RecordingBackend::new();
        let slot = backend.alloc_slot(ValueTy::Int).unwrap();
        let v = backend.const_int(9);
        backend.store(v, slot).unwrap();
        let loaded = backend.load(slot, ValueTy::Int).unwrap();
        let module = backend.finish(Some(loaded)).unwrap();
        assert_eq!(module.result, Some(9));
    }

    #[test]
    fn test_load_from_non_slot_fails() {
        let mut backend = RecordingBackend::new();
        let v = backend.const_int(1);
        assert!(backend.load(v, ValueTy::Int).is_err());
    }

    #[test]
    fn test_unbalanced_end_function_fails() {
        let mut backend = RecordingBackend::new();
        assert!(backend.end_function().is_err());
    }
}
