// This module lowers the primitive emission operations onto LLVM IR through
// inkwell. One module per run, with an implicit i32 `main` entry function whose
// entry block receives all top-level emission. Integers are i32, booleans are i1.
// Function definitions opened mid-stream get their own i32() function and entry
// block; the insertion point that was active before the definition is saved and
// restored when the function is sealed, and a function falling off its end returns
// zero. Print lowers to a call of the C variadic printf, declared on first use.
// Sealing the module returns the designated result (widened to i32 when narrower)
// from the entry function, then runs the LLVM verifier before handing the module
// out for printing or bitcode serialization.

//! LLVM IR emission via inkwell.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue};
use inkwell::IntPredicate;

use crate::backend::{ArithOp, Backend, BackendError, BitOp, Predicate, ValueTy};

/// The finished LLVM module, ready for printing or serialization.
pub struct EmittedModule<'ctx> {
    module: Module<'ctx>,
}

impl<'ctx> EmittedModule<'ctx> {
    /// Textual LLVM IR of the whole module.
    pub fn to_ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Bitcode serialization of the whole module.
    pub fn bitcode(&self) -> Vec<u8> {
        self.module
            .write_bitcode_to_memory()
            .as_slice()
            .to_vec()
    }
}

/// Emits into one LLVM module with an i32 `main` entry function.
pub struct LlvmBackend<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    print_fn: Option<FunctionValue<'ctx>>,
    /// Insertion points saved while a mid-stream function body is open,
    /// innermost last.
    saved_blocks: Vec<BasicBlock<'ctx>>,
}

impl<'ctx> LlvmBackend<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        let i32_type = context.i32_type();
        let main = module.add_function("main", i32_type.fn_type(&[], false), None);
        let entry = context.append_basic_block(main, "entry");
        builder.position_at_end(entry);

        Self {
            context,
            module,
            builder,
            print_fn: None,
            saved_blocks: Vec::new(),
        }
    }

    fn as_int(value: BasicValueEnum<'ctx>) -> Result<IntValue<'ctx>, BackendError> {
        match value {
            BasicValueEnum::IntValue(int) => Ok(int),
            other => Err(BackendError::Builder(format!(
                "expected an integer value, got {other:?}"
            ))),
        }
    }

    fn builder_err(err: inkwell::builder::BuilderError) -> BackendError {
        BackendError::Builder(err.to_string())
    }

    fn printf(&mut self) -> FunctionValue<'ctx> {
        if let Some(f) = self.print_fn {
            return f;
        }
        let fn_type = self.context.i32_type().fn_type(&[], true);
        let f = self
            .module
            .add_function("printf", fn_type, Some(Linkage::External));
        self.print_fn = Some(f);
        f
    }

    /// Return `result` from the block the builder currently points at, unless
    /// that block already ends in a terminator.
    fn seal_current_block(
        &self,
        result: Option<BasicValueEnum<'ctx>>,
    ) -> Result<(), BackendError> {
        let block = match self.builder.get_insert_block() {
            Some(block) => block,
            None => return Ok(()),
        };
        if block.get_terminator().is_some() {
            return Ok(());
        }
        let i32_type = self.context.i32_type();
        let ret: IntValue<'ctx> = match result {
            Some(value) => {
                let int = Self::as_int(value)?;
                if int.get_type().get_bit_width() < 32 {
                    self.builder
                        .build_int_z_extend(int, i32_type, "ret_ext")
                        .map_err(Self::builder_err)?
                } else {
                    int
                }
            }
            None => i32_type.const_zero(),
        };
        self.builder
            .build_return(Some(&ret))
            .map_err(Self::builder_err)?;
        Ok(())
    }
}

impl<'ctx> Backend for LlvmBackend<'ctx> {
    type Value = BasicValueEnum<'ctx>;
    type Output = EmittedModule<'ctx>;

    fn const_int(&mut self, value: i32) -> Self::Value {
        self.context
            .i32_type()
            .const_int(value as u64, true)
            .into()
    }

    fn const_bool(&mut self, value: bool) -> Self::Value {
        self.context
            .bool_type()
            .const_int(u64::from(value), false)
            .into()
    }

    fn all_ones_like(&mut self, value: Self::Value) -> Result<Self::Value, BackendError> {
        let int = Self::as_int(value)?;
        Ok(int.get_type().const_all_ones().into())
    }

    fn arith(
        &mut self,
        op: ArithOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError> {
        let lhs = Self::as_int(lhs)?;
        let rhs = Self::as_int(rhs)?;
        let out = match op {
            ArithOp::Add => self.builder.build_int_add(lhs, rhs, "add"),
            ArithOp::Sub => self.builder.build_int_sub(lhs, rhs, "sub"),
            ArithOp::Mul => self.builder.build_int_mul(lhs, rhs, "mul"),
            ArithOp::SDiv => self.builder.build_int_signed_div(lhs, rhs, "div"),
            ArithOp::SRem => self.builder.build_int_signed_rem(lhs, rhs, "rem"),
        }
        .map_err(Self::builder_err)?;
        Ok(out.into())
    }

    fn bitwise(
        &mut self,
        op: BitOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError> {
        let lhs = Self::as_int(lhs)?;
        let rhs = Self::as_int(rhs)?;
        let out = match op {
            BitOp::And => self.builder.build_and(lhs, rhs, "and"),
            BitOp::Or => self.builder.build_or(lhs, rhs, "or"),
            BitOp::Xor => self.builder.build_xor(lhs, rhs, "xor"),
        }
        .map_err(Self::builder_err)?;
        Ok(out.into())
    }

    fn compare(
        &mut self,
        pred: Predicate,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError> {
        let lhs = Self::as_int(lhs)?;
        let rhs = Self::as_int(rhs)?;
        let pred = match pred {
            Predicate::Eq => IntPredicate::EQ,
            Predicate::Ne => IntPredicate::NE,
            Predicate::Slt => IntPredicate::SLT,
            Predicate::Sle => IntPredicate::SLE,
            Predicate::Sgt => IntPredicate::SGT,
            Predicate::Sge => IntPredicate::SGE,
        };
        let out = self
            .builder
            .build_int_compare(pred, lhs, rhs, "cmp")
            .map_err(Self::builder_err)?;
        Ok(out.into())
    }

    fn alloc_slot(&mut self, ty: ValueTy) -> Result<Self::Value, BackendError> {
        let slot = match ty {
            ValueTy::Int => self.builder.build_alloca(self.context.i32_type(), "var"),
            ValueTy::Bool => self.builder.build_alloca(self.context.bool_type(), "var"),
        }
        .map_err(Self::builder_err)?;
        Ok(slot.into())
    }

    fn load(&mut self, slot: Self::Value, ty: ValueTy) -> Result<Self::Value, BackendError> {
        let ptr = match slot {
            BasicValueEnum::PointerValue(ptr) => ptr,
            other => {
                return Err(BackendError::Builder(format!(
                    "load target is not a stack slot: {other:?}"
                )))
            }
        };
        // LLVM 14 uses typed pointers, so build_load derives the pointee type
        // from the pointer itself and `ty` is not consulted here.
        let _ = ty;
        self.builder
            .build_load(ptr, "load")
            .map_err(Self::builder_err)
    }

    fn store(&mut self, value: Self::Value, slot: Self::Value) -> Result<(), BackendError> {
        let ptr = match slot {
            BasicValueEnum::PointerValue(ptr) => ptr,
            other => {
                return Err(BackendError::Builder(format!(
                    "store target is not a stack slot: {other:?}"
                )))
            }
        };
        self.builder
            .build_store(ptr, value)
            .map_err(Self::builder_err)?;
        Ok(())
    }

    fn begin_function(&mut self, name: &str) -> Result<Self::Value, BackendError> {
        let block = match self.builder.get_insert_block() {
            Some(block) => block,
            None => {
                return Err(BackendError::Builder(
                    "no insertion point to resume after the function body".to_string(),
                ))
            }
        };
        self.saved_blocks.push(block);

        let fn_type = self.context.i32_type().fn_type(&[], false);
        let function = self.module.add_function(name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        Ok(function.as_global_value().as_pointer_value().into())
    }

    fn end_function(&mut self) -> Result<(), BackendError> {
        let resume = match self.saved_blocks.pop() {
            Some(block) => block,
            None => {
                return Err(BackendError::Builder(
                    "no open function to seal".to_string(),
                ))
            }
        };
        // A body falling off its end returns zero.
        self.seal_current_block(None)?;
        self.builder.position_at_end(resume);
        Ok(())
    }

    fn call_named(&mut self, name: &str) -> Result<Self::Value, BackendError> {
        let function = match self.module.get_function(name) {
            Some(function) => function,
            None => {
                let fn_type = self.context.i32_type().fn_type(&[], false);
                self.module
                    .add_function(name, fn_type, Some(Linkage::External))
            }
        };
        let site = self
            .builder
            .build_call(function, &[], "call")
            .map_err(Self::builder_err)?;
        site.try_as_basic_value().left().ok_or_else(|| {
            BackendError::Builder(format!("call to {name} produced no value"))
        })
    }

    fn print(&mut self, value: Self::Value) -> Result<(), BackendError> {
        let printf = self.printf();
        let arg: BasicMetadataValueEnum<'ctx> = value.into();
        self.builder
            .build_call(printf, &[arg], "print")
            .map_err(Self::builder_err)?;
        Ok(())
    }

    fn finish(self, result: Option<Self::Value>) -> Result<Self::Output, BackendError> {
        self.seal_current_block(result)?;
        self.module
            .verify()
            .map_err(|msg| BackendError::Verify(msg.to_string()))?;
        Ok(EmittedModule {
            module: self.module,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_module_returns_zero() {
        let context = Context::create();
        let backend = LlvmBackend::new(&context, "empty");
        let emitted = backend.finish(None).unwrap();
        let ir = emitted.to_ir_string();
        assert!(ir.contains("define i32 @main()"), "got: {ir}");
        assert!(ir.contains("ret i32 0"), "got: {ir}");
    }

    #[test]
    fn test_arith_chain_and_result() {
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, "arith");
        let a = backend.const_int(3);
        let b = backend.const_int(4);
        let sum = backend.arith(ArithOp::Add, a, b).unwrap();
        let emitted = backend.finish(Some(sum)).unwrap();
        let ir = emitted.to_ir_string();
        assert!(ir.contains("ret i32 7"), "got: {ir}");
    }

    #[test]
    fn test_bool_result_is_widened() {
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, "widen");
        let t = backend.const_bool(true);
        let emitted = backend.finish(Some(t)).unwrap();
        let ir = emitted.to_ir_string();
        assert!(ir.contains("ret i32 1"), "got: {ir}");
    }

    #[test]
    fn test_print_declares_printf_once() {
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, "print");
        let v = backend.const_int(42);
        backend.print(v).unwrap();
        backend.print(v).unwrap();
        let emitted = backend.finish(None).unwrap();
        let ir = emitted.to_ir_string();
        assert_eq!(ir.matches("declare i32 @printf").count(), 1, "got: {ir}");
    }

    #[test]
    fn test_function_body_resumes_main() {
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, "funcs");
        backend.begin_function("helper").unwrap();
        let inner = backend.const_int(9);
        backend.print(inner).unwrap();
        backend.end_function().unwrap();
        let outer = backend.const_int(1);
        let emitted = backend.finish(Some(outer)).unwrap();
        let ir = emitted.to_ir_string();
        assert!(ir.contains("define i32 @helper()"), "got: {ir}");
        assert!(ir.contains("ret i32 1"), "got: {ir}");
    }

    #[test]
    fn test_store_load_round_trip_verifies() {
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, "mem");
        let slot = backend.alloc_slot(ValueTy::Int).unwrap();
        let v = backend.const_int(5);
        backend.store(v, slot).unwrap();
        let loaded = backend.load(slot, ValueTy::Int).unwrap();
        let emitted = backend.finish(Some(loaded)).unwrap();
        assert!(!emitted.bitcode().is_empty());
    }
}
