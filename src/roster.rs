//! Loading the personnel roster.

use std::path::Path;

use anyhow::{Context, Result};
use hardhat_types::Person;

/// Read a JSON array of personnel.
///
/// ```json
/// [{"gearId": "HH-01", "name": "Ana Reyes", "position": "Nozzle"}]
/// ```
///
/// Entries repeating an earlier gear id are dropped with a warning.
pub fn load_roster(path: &Path) -> Result<Vec<Person>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    parse_roster(&text).with_context(|| format!("invalid roster {}", path.display()))
}

pub fn parse_roster(text: &str) -> Result<Vec<Person>> {
    let people: Vec<Person> = serde_json::from_str(text)?;

    let mut roster: Vec<Person> = Vec::with_capacity(people.len());
    for person in people {
        if roster.iter().any(|p| p.gear_id == person.gear_id) {
            tracing::warn!(gear_id = %person.gear_id, "duplicate roster entry ignored");
            continue;
        }
        roster.push(person);
    }
    Ok(roster)
}
