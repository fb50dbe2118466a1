// This module defines error types for the IR translator using the thiserror crate for
// idiomatic Rust error handling. TranslateError covers the fatal failure scenarios:
// malformed input lines (bad operand lists, missing Parent= suffixes, unterminated
// payload brackets), scope mismatches discovered during translation (EndBlock without
// an opener, Break outside a loop), and backend failures. Unsupported is the non-fatal
// side of the taxonomy: per-instruction conditions such as unknown opcodes, opcodes
// with no defined lowering, or literal types without an encoding. Those are collected
// as Diagnostic values and reported at the end of a run instead of aborting it, so a
// partially translatable unit still produces a module. Each variant carries relevant
// context (line numbers, instruction ids, opcode names) for debugging.

//! Error types for the IR translator.
//!
//! Fatal conditions are [`TranslateError`] values propagated with `?`;
//! per-instruction [`Unsupported`] conditions become [`Diagnostic`]s and the
//! translation sweep continues past them.

use thiserror::Error;

use crate::backend::BackendError;
use crate::ir::Opcode;

/// Fatal errors: any of these aborts the current run.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The textual IR line could not be parsed. No partial table is used.
    #[error("line {line}: malformed instruction: {reason}")]
    MalformedInstruction { line: usize, reason: String },

    /// Block/loop/function nesting derived from the input is inconsistent.
    /// Emitted code after a broken scope is meaningless, so this is fatal.
    #[error("scope mismatch at instruction {id}: {reason}")]
    ScopeMismatch { id: usize, reason: String },

    /// The emission backend rejected a primitive operation.
    #[error("backend failure at instruction {id}: {source}")]
    Backend {
        id: usize,
        #[source]
        source: BackendError,
    },

    /// The emission backend failed while sealing the module.
    #[error("backend failure while finalizing module: {0}")]
    Finalize(#[from] BackendError),
}

/// Result type alias for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Why a single instruction could not be translated.
///
/// These never abort the sweep; they taint the instruction's value slot so
/// that dependents inherit a [`Unsupported::DependsOn`] diagnostic instead of
/// silently substituting a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
    #[error("unknown opcode")]
    UnknownOpcode,

    #[error("no lowering defined for {0}")]
    Unimplemented(Opcode),

    #[error("literal type {0:?} has no defined encoding")]
    LiteralType(String),

    #[error("malformed {ty} literal {text:?}")]
    BadLiteral { ty: String, text: String },

    #[error("result type {0:?} has no defined encoding")]
    ValueType(String),

    #[error("expected {expected} operands, found {found}")]
    OperandCount { expected: usize, found: usize },

    #[error("calls with operands need typed signatures")]
    CallOperands,

    #[error("operand {0} produces no value")]
    NoResult(usize),

    #[error("depends on untranslated instruction {0}")]
    DependsOn(usize),
}

/// One untranslated instruction, reported at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: usize,
    pub opcode: Opcode,
    pub reason: Unsupported,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "instruction {} ({}): {}", self.id, self.opcode, self.reason)
    }
}
