// This module groups the pieces of the translation pass proper: the per-run
// settings, the scope tracker derived from flat parent links, and the driver that
// sweeps the instruction table and talks to the backend. The parser and the
// backends live in their own top-level modules; everything here is backend
// agnostic.

//! The translation pass: context, scope tracking, and the driver.

pub mod context;
pub mod driver;
pub mod scope;

pub use context::TranslationContext;
pub use driver::{Translation, Translator};
pub use scope::{ScopeFrame, ScopeKind, ScopeTracker};
