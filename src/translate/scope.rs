// This module derives block/loop/function nesting from the flat parent-link metadata
// of the instruction stream. There is no nested-block syntax in the wire format;
// scope boundaries are discovered by opcode, so the tracker is an explicit stack of
// tagged frames rather than recursive descent. EndBlock pops the innermost frame and
// checks it against the EndBlock's own parent link (the opener's id); Else keeps the
// conditional frame open but flips it to the alternate branch; Break and Continue
// walk the stack to the nearest Loop frame. Any inconsistency is a fatal scope
// mismatch, as is a frame still open at end of input.

//! Scope tracking from flat parent links.

use crate::error::{TranslateError, TranslateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Block,
    Conditional,
    Loop,
    Function,
}

/// One open scope: a block, conditional, loop, or function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFrame {
    /// Id of the instruction that opened the scope.
    pub id: usize,
    pub kind: ScopeKind,
    /// A conditional that has switched to its else branch.
    pub in_else: bool,
}

/// Explicit stack of open scopes. At most one scope is open per nesting depth.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    stack: Vec<ScopeFrame>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for a scope-opening instruction.
    pub fn enter(&mut self, kind: ScopeKind, id: usize) {
        log::trace!("scope enter {kind:?} at {id} (depth {})", self.stack.len());
        self.stack.push(ScopeFrame {
            id,
            kind,
            in_else: false,
        });
    }

    /// Pop the innermost frame for an EndBlock at `at` that names `opener`.
    /// A root-sentinel parent link (`None`) never matches an open frame.
    pub fn leave(&mut self, at: usize, opener: Option<usize>) -> TranslateResult<ScopeFrame> {
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => {
                return Err(TranslateError::ScopeMismatch {
                    id: at,
                    reason: "EndBlock without an open scope".to_string(),
                })
            }
        };
        if opener != Some(frame.id) {
            return Err(TranslateError::ScopeMismatch {
                id: at,
                reason: format!(
                    "EndBlock names opener {} but the innermost open scope is {} ({:?})",
                    display_opener(opener),
                    frame.id,
                    frame.kind
                ),
            });
        }
        log::trace!("scope leave {:?} at {at} (depth {})", frame.kind, self.stack.len());
        Ok(frame)
    }

    /// Switch the innermost conditional (which must be `opener`) to its else
    /// branch. The If frame stays open; subsequent emission is redirected.
    pub fn else_branch(&mut self, at: usize, opener: Option<usize>) -> TranslateResult<()> {
        let frame = match self.stack.last_mut() {
            Some(frame) => frame,
            None => {
                return Err(TranslateError::ScopeMismatch {
                    id: at,
                    reason: "Else outside any scope".to_string(),
                })
            }
        };
        if frame.kind != ScopeKind::Conditional || opener != Some(frame.id) {
            return Err(TranslateError::ScopeMismatch {
                id: at,
                reason: format!(
                    "Else names conditional {} but the innermost open scope is {} ({:?})",
                    display_opener(opener),
                    frame.id,
                    frame.kind
                ),
            });
        }
        if frame.in_else {
            return Err(TranslateError::ScopeMismatch {
                id: at,
                reason: format!("conditional {} already switched to its else branch", frame.id),
            });
        }
        frame.in_else = true;
        Ok(())
    }

    /// Nearest enclosing loop frame, for Break/Continue. Loop frames stay open
    /// across these, so this only walks, never pops.
    pub fn require_loop(&self, at: usize) -> TranslateResult<usize> {
        self.stack
            .iter()
            .rev()
            .find(|frame| frame.kind == ScopeKind::Loop)
            .map(|frame| frame.id)
            .ok_or_else(|| TranslateError::ScopeMismatch {
                id: at,
                reason: "Break/Continue outside of a loop".to_string(),
            })
    }

    /// The innermost open scope, or `None` at the root.
    pub fn current(&self) -> Option<&ScopeFrame> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether emission currently targets a function body opened mid-stream.
    pub fn in_function(&self) -> bool {
        self.stack
            .iter()
            .any(|frame| frame.kind == ScopeKind::Function)
    }

    /// End-of-input check: every opened scope must have been closed.
    pub fn finish(&self) -> TranslateResult<()> {
        match self.stack.last() {
            Some(frame) => Err(TranslateError::ScopeMismatch {
                id: frame.id,
                reason: format!(
                    "scope opened at instruction {} ({:?}) never closed",
                    frame.id, frame.kind
                ),
            }),
            None => Ok(()),
        }
    }
}

/// Wire spelling of a parent link: the id, or `-1` for the root sentinel.
fn display_opener(opener: Option<usize>) -> String {
    match opener {
        Some(id) => id.to_string(),
        None => "-1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_nesting() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Block, 0);
        scopes.enter(ScopeKind::Loop, 1);
        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.current().unwrap().id, 1);

        scopes.leave(2, Some(1)).unwrap();
        scopes.leave(3, Some(0)).unwrap();
        scopes.finish().unwrap();
    }

    #[test]
    fn test_end_without_opener() {
        let mut scopes = ScopeTracker::new();
        assert!(matches!(
            scopes.leave(0, Some(0)),
            Err(TranslateError::ScopeMismatch { id: 0, .. })
        ));
    }

    #[test]
    fn test_end_names_wrong_opener() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Block, 0);
        scopes.enter(ScopeKind::Block, 1);
        assert!(scopes.leave(2, Some(0)).is_err());
    }

    #[test]
    fn test_end_with_root_sentinel_never_matches() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Block, 0);
        assert!(scopes.leave(1, None).is_err());
    }

    #[test]
    fn test_unclosed_scope_at_eof() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Function, 4);
        assert!(matches!(
            scopes.finish(),
            Err(TranslateError::ScopeMismatch { id: 4, .. })
        ));
    }

    #[test]
    fn test_loop_lookup_walks_past_inner_scopes() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Loop, 0);
        scopes.enter(ScopeKind::Conditional, 1);
        scopes.enter(ScopeKind::Block, 2);
        assert_eq!(scopes.require_loop(3).unwrap(), 0);
    }

    #[test]
    fn test_break_outside_loop() {
        let scopes = ScopeTracker::new();
        assert!(scopes.require_loop(0).is_err());
    }

    #[test]
    fn test_else_flips_once() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Conditional, 0);
        scopes.else_branch(1, Some(0)).unwrap();
        assert!(scopes.current().unwrap().in_else);
        assert!(scopes.else_branch(2, Some(0)).is_err());
    }

    #[test]
    fn test_else_requires_conditional() {
        let mut scopes = ScopeTracker::new();
        scopes.enter(ScopeKind::Loop, 0);
        assert!(scopes.else_branch(1, Some(0)).is_err());
    }
}
