use serde::{Deserialize, Serialize};

use super::client::ClientPatch;

/// A single parking slot.
///
/// An occupied space always carries both `client_id` and `start_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub key: String,
    pub subsuelo_id: String,
    #[serde(default)]
    pub occupied: bool,
    /// Reservation flag, blocks edits and deletion
    #[serde(default)]
    pub hold: bool,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Occupancy start, Unix epoch milliseconds
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Space {
    pub fn new(key: impl Into<String>, subsuelo_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            subsuelo_id: subsuelo_id.into(),
            occupied: false,
            hold: false,
            client_id: None,
            start_time: None,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name shown to staff: the display name when set, the key otherwise.
    pub fn effective_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.key,
        }
    }

    pub(crate) fn clear_occupancy(&mut self) {
        self.occupied = false;
        self.client_id = None;
        self.start_time = None;
        self.hold = false;
    }
}

/// Editable fields of a space. Empty strings are treated as "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacePatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub subsuelo_id: Option<String>,
    #[serde(default)]
    pub client: Option<ClientPatch>,
}
