//! lir2llvm - Linear IR to LLVM translation.
//!
//! Translates a flat textual instruction stream (one instruction record per
//! line, operands referring back to earlier lines by index) into an LLVM
//! module. The translation is a single in-order sweep: each record is emitted
//! at most once, its value memoized so later references reuse it, and records
//! without a defined lowering are collected as diagnostics instead of aborting
//! the run.
//!
//! # Primary Usage
//!
//! ```ignore
//! use lir2llvm::{LlvmBackend, Program, TranslationContext, Translator};
//! use inkwell::context::Context;
//!
//! let program = Program::parse(&source)?;
//! let ctx = TranslationContext::new("unit");
//! let context = Context::create();
//! let backend = LlvmBackend::new(&context, &ctx.module_name);
//! let translation = Translator::new(&program, &ctx, backend).run()?;
//! println!("{}", translation.output.to_ir_string());
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - Instruction records, opcode tables, and the line parser
//! - [`translate`] - The driver sweep, value cache, and scope tracking
//! - [`backend`] - The emission interface, its LLVM implementation, and a
//!   recording implementation for tests

pub mod backend;
pub mod error;
pub mod ir;
pub mod translate;

pub use backend::{Backend, BackendError, LlvmBackend, RecordingBackend};
pub use error::{Diagnostic, TranslateError, TranslateResult, Unsupported};
pub use ir::{Instruction, Opcode, Program};
pub use translate::{Translation, TranslationContext, Translator};
