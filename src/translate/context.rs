// This module replaces the process-wide mutable translation state of earlier drafts
// (module handle, translated-unit registry held in globals) with an explicit value
// owned by the top-level run call and handed to the driver. Nothing in this crate
// keeps per-run state in statics.

//! Per-run translation settings.

/// Settings for one translation run.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    /// Name given to the emitted module.
    pub module_name: String,
    /// Id of the instruction whose value becomes the program result. `None`
    /// selects the last top-level instruction that materialized a value.
    pub result_id: Option<usize>,
}

impl TranslationContext {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            result_id: None,
        }
    }

    pub fn with_result_id(mut self, id: usize) -> Self {
        self.result_id = Some(id);
        self
    }
}

impl Default for TranslationContext {
    fn default() -> Self {
        Self::new("module")
    }
}
