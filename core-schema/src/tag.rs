//! Connected tag description

use serde::{Deserialize, Serialize};

/// Snapshot of a tag taken when it connects. Never updated afterwards; a
/// reconnect produces a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInfo {
    /// Opaque identifier reported by the hardware service.
    pub tag_id: String,
    pub can_measure_temperature: bool,
    pub can_measure_humidity: bool,
    pub can_measure_acceleration: bool,
}

impl TagInfo {
    /// A tag without any declared capability.
    pub fn new(tag_id: impl Into<String>) -> Self {
        Self {
            tag_id: tag_id.into(),
            can_measure_temperature: false,
            can_measure_humidity: false,
            can_measure_acceleration: false,
        }
    }

    pub fn with_temperature(mut self) -> Self {
        self.can_measure_temperature = true;
        self
    }

    pub fn with_humidity(mut self) -> Self {
        self.can_measure_humidity = true;
        self
    }

    pub fn with_acceleration(mut self) -> Self {
        self.can_measure_acceleration = true;
        self
    }
}
