// This module is the translation driver: a single in-order pass over the instruction
// table that resolves operand references through the memoized value cache, keeps the
// scope tracker in step with scope-opening and scope-closing opcodes, and dispatches
// every instruction to the backend through an exhaustive opcode match. The value
// cache is a slot vector parallel to the table; each slot is written exactly once,
// which gives the at-most-once emission guarantee. Instructions with no defined
// lowering (Power, string ops, array ops, conditional and loop bodies, unknown
// commands) do not abort the pass: they taint their slot and are reported as
// diagnostics at the end, and anything depending on them inherits the taint instead
// of silently substituting a value. Structural problems (scope mismatches, backend
// failures) are fatal. The operator-to-primitive mapping is fixed here: arithmetic is
// signed add/sub/mul/div/rem, boolean and/or reuse the bitwise primitives, BoolNot is
// xor against true, BitNot is xor against all-ones of the operand width.

//! The translation driver and value cache.

use crate::backend::{ArithOp, Backend, BitOp, Predicate, ValueTy};
use crate::error::{Diagnostic, TranslateError, TranslateResult, Unsupported};
use crate::ir::{Opcode, Program};
use crate::translate::context::TranslationContext;
use crate::translate::scope::{ScopeKind, ScopeTracker};

/// One value cache entry. Written exactly once per instruction.
#[derive(Debug)]
enum Slot<V> {
    /// Not yet materialized.
    Pending,
    /// The backend value this instruction produced.
    Ready(V),
    /// Translated, but the opcode produces no value (Print, Store, control).
    NoValue,
    /// Could not be translated; dependents inherit the taint.
    Failed(Unsupported),
}

/// Result of a completed sweep.
#[derive(Debug)]
pub struct Translation<O> {
    pub output: O,
    /// Ids that could not be translated, in encounter order. Empty means the
    /// whole unit lowered cleanly.
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks the instruction table in order and emits each instruction once.
pub struct Translator<'a, B: Backend> {
    program: &'a Program,
    ctx: &'a TranslationContext,
    backend: B,
    scopes: ScopeTracker,
    slots: Vec<Slot<B::Value>>,
    diagnostics: Vec<Diagnostic>,
    /// Last value materialized outside any function body; the default program
    /// result when the context does not designate one.
    last_top_level: Option<B::Value>,
}

impl<'a, B: Backend> Translator<'a, B> {
    pub fn new(program: &'a Program, ctx: &'a TranslationContext, backend: B) -> Self {
        let slots = (0..program.len()).map(|_| Slot::Pending).collect();
        Self {
            program,
            ctx,
            backend,
            scopes: ScopeTracker::new(),
            slots,
            diagnostics: Vec::new(),
            last_top_level: None,
        }
    }

    /// The single top-level pass.
    pub fn run(mut self) -> TranslateResult<Translation<B::Output>> {
        for id in 0..self.program.len() {
            if matches!(self.slots[id], Slot::Pending) {
                self.step(id)?;
            }
        }
        self.scopes.finish()?;

        let result = self.select_result();
        let output = self.backend.finish(result)?;
        if !self.diagnostics.is_empty() {
            log::warn!(
                "{} of {} instructions had no translation",
                self.diagnostics.len(),
                self.program.len()
            );
        }
        Ok(Translation {
            output,
            diagnostics: self.diagnostics,
        })
    }

    /// Resolve the backend value of instruction `id` for a dependent.
    ///
    /// The in-order sweep has already visited every smaller id, so the
    /// materialize-on-demand branch is a safety net for out-of-order use of
    /// the resolver, not something the sweep relies on.
    fn resolve(&mut self, id: usize) -> TranslateResult<Result<B::Value, Unsupported>> {
        if matches!(self.slots[id], Slot::Pending) {
            self.step(id)?;
        }
        Ok(match &self.slots[id] {
            Slot::Ready(value) => Ok(*value),
            Slot::NoValue => Err(Unsupported::NoResult(id)),
            Slot::Failed(_) => Err(Unsupported::DependsOn(id)),
            Slot::Pending => unreachable!("step always fills the slot"),
        })
    }

    /// Resolve all operands of `id`, checking arity.
    fn operand_values(
        &mut self,
        id: usize,
        expected: usize,
    ) -> TranslateResult<Result<Vec<B::Value>, Unsupported>> {
        let operands = self.program.instruction(id).operands.clone();
        if operands.len() != expected {
            return Ok(Err(Unsupported::OperandCount {
                expected,
                found: operands.len(),
            }));
        }
        let mut values = Vec::with_capacity(expected);
        for operand in operands {
            match self.resolve(operand)? {
                Ok(value) => values.push(value),
                Err(unsupported) => return Ok(Err(unsupported)),
            }
        }
        Ok(Ok(values))
    }

    fn ready(&mut self, id: usize, value: B::Value) {
        if !self.scopes.in_function() {
            self.last_top_level = Some(value);
        }
        self.slots[id] = Slot::Ready(value);
    }

    fn fail(&mut self, id: usize, reason: Unsupported) {
        let opcode = self.program.instruction(id).opcode;
        log::debug!("instruction {id} ({opcode}) not translated: {reason}");
        self.diagnostics.push(Diagnostic {
            id,
            opcode,
            reason: reason.clone(),
        });
        self.slots[id] = Slot::Failed(reason);
    }

    fn backend_err(id: usize) -> impl FnOnce(crate::backend::BackendError) -> TranslateError {
        move |source| TranslateError::Backend { id, source }
    }

    /// Translate instruction `id`. Exactly one backend emission per id.
    fn step(&mut self, id: usize) -> TranslateResult<()> {
        let inst = self.program.instruction(id);
        let opcode = inst.opcode;
        log::trace!("instruction {id}: {opcode}");

        match opcode {
            Opcode::Given => self.emit_given(id)?,

            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Divide | Opcode::Modulo => {
                let op = match opcode {
                    Opcode::Add => ArithOp::Add,
                    Opcode::Sub => ArithOp::Sub,
                    Opcode::Mult => ArithOp::Mul,
                    Opcode::Divide => ArithOp::SDiv,
                    _ => ArithOp::SRem,
                };
                match self.operand_values(id, 2)? {
                    Ok(vals) => {
                        let out = self
                            .backend
                            .arith(op, vals[0], vals[1])
                            .map_err(Self::backend_err(id))?;
                        self.ready(id, out);
                    }
                    Err(unsupported) => self.fail(id, unsupported),
                }
            }

            Opcode::BoolAnd | Opcode::BitAnd => self.emit_bitwise(id, BitOp::And)?,
            Opcode::BoolOr | Opcode::BitOr => self.emit_bitwise(id, BitOp::Or)?,
            Opcode::BoolNot => self.emit_bool_not(id)?,
            Opcode::BitNot => self.emit_bit_not(id)?,

            Opcode::Equal | Opcode::RefEqual => self.emit_compare(id, Predicate::Eq)?,
            Opcode::NotEqual | Opcode::RefNotEqual => self.emit_compare(id, Predicate::Ne)?,
            Opcode::Less => self.emit_compare(id, Predicate::Slt)?,
            Opcode::LessEqual => self.emit_compare(id, Predicate::Sle)?,
            Opcode::Greater => self.emit_compare(id, Predicate::Sgt)?,
            Opcode::GreaterEqual => self.emit_compare(id, Predicate::Sge)?,

            Opcode::AllocVar => self.emit_alloc(id)?,
            Opcode::Load => self.emit_load(id)?,
            Opcode::Store => self.emit_store(id)?,

            Opcode::Identity => match self.operand_values(id, 1)? {
                Ok(vals) => self.ready(id, vals[0]),
                Err(unsupported) => self.fail(id, unsupported),
            },

            Opcode::Print => match self.operand_values(id, 1)? {
                Ok(vals) => {
                    self.backend
                        .print(vals[0])
                        .map_err(Self::backend_err(id))?;
                    self.slots[id] = Slot::NoValue;
                }
                Err(unsupported) => self.fail(id, unsupported),
            },

            Opcode::FunctionDef => self.emit_function_def(id)?,
            Opcode::FunctionCall => self.emit_function_call(id)?,

            Opcode::StartBlock => {
                self.scopes.enter(ScopeKind::Block, id);
                self.slots[id] = Slot::NoValue;
            }
            Opcode::EndBlock => {
                let opener = inst.parent_id;
                let frame = self.scopes.leave(id, opener)?;
                if frame.kind == ScopeKind::Function {
                    self.backend.end_function().map_err(Self::backend_err(id))?;
                }
                self.slots[id] = Slot::NoValue;
            }
            Opcode::If => {
                self.scopes.enter(ScopeKind::Conditional, id);
                self.fail(id, Unsupported::Unimplemented(opcode));
            }
            Opcode::Else => {
                self.scopes.else_branch(id, inst.parent_id)?;
                self.fail(id, Unsupported::Unimplemented(opcode));
            }
            Opcode::Loop => {
                self.scopes.enter(ScopeKind::Loop, id);
                self.fail(id, Unsupported::Unimplemented(opcode));
            }
            Opcode::Break | Opcode::Continue => {
                // The loop frame stays open; only the lowering is missing.
                let target = self.scopes.require_loop(id)?;
                log::trace!("instruction {id} targets loop {target}");
                self.fail(id, Unsupported::Unimplemented(opcode));
            }

            Opcode::Power
            | Opcode::Concat
            | Opcode::ToString
            | Opcode::GetElement
            | Opcode::AllocArr
            | Opcode::ArrLength => self.fail(id, Unsupported::Unimplemented(opcode)),

            Opcode::Unknown => self.fail(id, Unsupported::UnknownOpcode),
        }

        debug_assert!(!matches!(self.slots[id], Slot::Pending));
        Ok(())
    }

    fn emit_given(&mut self, id: usize) -> TranslateResult<()> {
        let inst = self.program.instruction(id);
        let ty = inst.result_type.clone().unwrap_or_default();
        let text = inst.literal.clone().unwrap_or_default();
        match ty.as_str() {
            "int" => match text.parse::<i32>() {
                Ok(value) => {
                    let out = self.backend.const_int(value);
                    self.ready(id, out);
                }
                Err(_) => self.fail(id, Unsupported::BadLiteral { ty, text }),
            },
            "bool" => match text.as_str() {
                "true" => {
                    let out = self.backend.const_bool(true);
                    self.ready(id, out);
                }
                "false" => {
                    let out = self.backend.const_bool(false);
                    self.ready(id, out);
                }
                _ => self.fail(id, Unsupported::BadLiteral { ty, text }),
            },
            // String literals have no defined encoding yet.
            _ => self.fail(id, Unsupported::LiteralType(ty)),
        }
        Ok(())
    }

    fn emit_bitwise(&mut self, id: usize, op: BitOp) -> TranslateResult<()> {
        match self.operand_values(id, 2)? {
            Ok(vals) => {
                let out = self
                    .backend
                    .bitwise(op, vals[0], vals[1])
                    .map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_bool_not(&mut self, id: usize) -> TranslateResult<()> {
        match self.operand_values(id, 1)? {
            Ok(vals) => {
                let truth = self.backend.const_bool(true);
                let out = self
                    .backend
                    .bitwise(BitOp::Xor, vals[0], truth)
                    .map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_bit_not(&mut self, id: usize) -> TranslateResult<()> {
        match self.operand_values(id, 1)? {
            Ok(vals) => {
                let ones = self
                    .backend
                    .all_ones_like(vals[0])
                    .map_err(Self::backend_err(id))?;
                let out = self
                    .backend
                    .bitwise(BitOp::Xor, vals[0], ones)
                    .map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_compare(&mut self, id: usize, pred: Predicate) -> TranslateResult<()> {
        match self.operand_values(id, 2)? {
            Ok(vals) => {
                let out = self
                    .backend
                    .compare(pred, vals[0], vals[1])
                    .map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_alloc(&mut self, id: usize) -> TranslateResult<()> {
        let ty_name = self
            .program
            .instruction(id)
            .result_type
            .clone()
            .unwrap_or_default();
        match ValueTy::parse(&ty_name) {
            Some(ty) => {
                let out = self.backend.alloc_slot(ty).map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            None => self.fail(id, Unsupported::ValueType(ty_name)),
        }
        Ok(())
    }

    fn emit_load(&mut self, id: usize) -> TranslateResult<()> {
        let ty_name = self
            .program
            .instruction(id)
            .result_type
            .clone()
            .unwrap_or_default();
        let ty = match ValueTy::parse(&ty_name) {
            Some(ty) => ty,
            None => {
                self.fail(id, Unsupported::ValueType(ty_name));
                return Ok(());
            }
        };
        match self.operand_values(id, 1)? {
            Ok(vals) => {
                let out = self
                    .backend
                    .load(vals[0], ty)
                    .map_err(Self::backend_err(id))?;
                self.ready(id, out);
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_store(&mut self, id: usize) -> TranslateResult<()> {
        // Operand order on the wire is (value, location).
        match self.operand_values(id, 2)? {
            Ok(vals) => {
                self.backend
                    .store(vals[0], vals[1])
                    .map_err(Self::backend_err(id))?;
                self.slots[id] = Slot::NoValue;
            }
            Err(unsupported) => self.fail(id, unsupported),
        }
        Ok(())
    }

    fn emit_function_def(&mut self, id: usize) -> TranslateResult<()> {
        let name = self
            .program
            .instruction(id)
            .callee
            .clone()
            .unwrap_or_default();
        self.scopes.enter(ScopeKind::Function, id);
        let out = self
            .backend
            .begin_function(&name)
            .map_err(Self::backend_err(id))?;
        self.slots[id] = Slot::Ready(out);
        Ok(())
    }

    fn emit_function_call(&mut self, id: usize) -> TranslateResult<()> {
        let inst = self.program.instruction(id);
        let name = inst.callee.clone().unwrap_or_default();
        if !inst.operands.is_empty() {
            // Arguments would need multi-type signatures, which are not
            // specified yet.
            self.fail(id, Unsupported::CallOperands);
            return Ok(());
        }
        let out = self
            .backend
            .call_named(&name)
            .map_err(Self::backend_err(id))?;
        self.ready(id, out);
        Ok(())
    }

    /// Pick the value returned from the top-level entry function.
    fn select_result(&self) -> Option<B::Value> {
        match self.ctx.result_id {
            Some(id) => match self.slots.get(id) {
                Some(Slot::Ready(value)) => Some(*value),
                _ => {
                    log::warn!("designated result instruction {id} produced no value");
                    None
                }
            },
            None => self.last_top_level,
        }
    }
}
