use serde::{Deserialize, Serialize};

/// A parking level (subsuelo) grouping a set of spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Unique id, `SUB<N>` for generated levels
    pub id: String,
    pub label: String,
}

impl Level {
    pub fn numbered(n: u32) -> Self {
        Self {
            id: format!("SUB{n}"),
            label: format!("Subsuelo {n}"),
        }
    }
}
