// This module defines the emission interface the translation driver talks to. The
// backend exposes primitive operations returning opaque typed values: integer and
// boolean constants, signed arithmetic, bitwise logic, signed comparisons, stack
// slots with load/store, function open/close, calls by name, and the shared variadic
// print primitive. Keeping the driver generic over this trait is what lets the test
// suite run the full translation sweep against a recording backend while the binary
// runs the same sweep against LLVM.

//! The backend emission interface and its implementations.

pub mod llvm;
pub mod recording;

pub use llvm::{EmittedModule, LlvmBackend};
pub use recording::{Event, RecordedModule, RecordingBackend};

use thiserror::Error;

/// Errors surfaced by a backend. The driver treats these as fatal.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{0}")]
    Builder(String),

    #[error("module verification failed: {0}")]
    Verify(String),
}

/// Arithmetic primitives. The driver maps operators 1:1 onto these; all are
/// signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOp {
    And,
    Or,
    Xor,
}

/// Signed ordered comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

/// The value types with a defined encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTy {
    Int,
    Bool,
}

impl ValueTy {
    /// Map a declared result-type name to an encodable type.
    pub fn parse(name: &str) -> Option<ValueTy> {
        match name {
            "int" => Some(ValueTy::Int),
            "bool" => Some(ValueTy::Bool),
            _ => None,
        }
    }
}

/// Primitive emission operations.
///
/// `Value` is the backend's opaque result handle; the driver caches one per
/// instruction and never inspects it.
pub trait Backend {
    type Value: Copy + std::fmt::Debug;
    type Output;

    fn const_int(&mut self, value: i32) -> Self::Value;

    fn const_bool(&mut self, value: bool) -> Self::Value;

    /// All-ones constant of the operand's bit width (for bitwise not).
    fn all_ones_like(&mut self, value: Self::Value) -> Result<Self::Value, BackendError>;

    fn arith(
        &mut self,
        op: ArithOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError>;

    fn bitwise(
        &mut self,
        op: BitOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError>;

    fn compare(
        &mut self,
        pred: Predicate,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, BackendError>;

    /// Allocate a stack slot for one value of the given type.
    fn alloc_slot(&mut self, ty: ValueTy) -> Result<Self::Value, BackendError>;

    fn load(&mut self, slot: Self::Value, ty: ValueTy) -> Result<Self::Value, BackendError>;

    fn store(&mut self, value: Self::Value, slot: Self::Value) -> Result<(), BackendError>;

    /// Open a new function with the default integer-returning signature and
    /// repoint emission into its entry block. Returns the function's address.
    fn begin_function(&mut self, name: &str) -> Result<Self::Value, BackendError>;

    /// Seal the innermost open function and repoint emission back to where it
    /// was before [`Backend::begin_function`].
    fn end_function(&mut self) -> Result<(), BackendError>;

    /// Call the named zero-argument function, declaring it on first use.
    fn call_named(&mut self, name: &str) -> Result<Self::Value, BackendError>;

    /// Call the shared variadic print primitive with one operand, creating the
    /// primitive on first use.
    fn print(&mut self, value: Self::Value) -> Result<(), BackendError>;

    /// Seal the module, returning `result` (or a default zero) from the
    /// top-level entry function.
    fn finish(self, result: Option<Self::Value>) -> Result<Self::Output, BackendError>;
}
