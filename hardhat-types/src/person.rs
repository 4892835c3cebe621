//! Monitored personnel.

/// A person wearing a sensor-equipped hard hat.
///
/// `gear_id` is the stable identifier burned into the wearable and is the key
/// everything else is indexed by. `record_id` is the durable record the
/// person's recordings are stored under; it is assigned once, on the first
/// successful recording save, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Person {
    pub gear_id: String,
    pub name: String,
    pub position: String,
    #[cfg_attr(feature = "serde", serde(default, alias = "autoGeneratedId"))]
    pub record_id: Option<String>,
}

impl Person {
    /// Create a person with no durable record yet.
    pub fn new(
        gear_id: impl Into<String>,
        name: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            gear_id: gear_id.into(),
            name: name.into(),
            position: position.into(),
            record_id: None,
        }
    }

    /// Attach an existing durable record id.
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Name plus gear id, as shown in alerts.
    pub fn display_name(&self) -> String {
        format!("{} (gear {})", self.name, self.gear_id)
    }
}
