use serde::{Deserialize, Serialize};

/// Per-call policy flags for a batch update.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    /// Skip change classification and SET every qualifying column on every row.
    #[serde(default)]
    pub update_unchanged_fields: bool,

    /// For records without change tracking, write nulls instead of inferring
    /// "unchanged" from them.
    #[serde(default)]
    pub update_null_fields: bool,
}

impl Hints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_unchanged_fields(mut self) -> Self {
        self.update_unchanged_fields = true;
        self
    }

    pub fn update_null_fields(mut self) -> Self {
        self.update_null_fields = true;
        self
    }
}
