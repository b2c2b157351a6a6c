//! The tourism outing schema: tours, guides, qualification tests, locations,
//! itineraries, scheduled outings and the tourists attending them.

pub mod itinerary;
pub mod records;

use crate::config::FullConfig;
use crate::error::ConfigError;

pub use records::*;

const TOURISM_JSON: &str = include_str!("../../schema/tourism.json");

/// Declarations for every tourism table, in the `public` schema.
pub fn registry() -> Result<FullConfig, ConfigError> {
    FullConfig::from_json(TOURISM_JSON)
}

/// Same declarations placed in another PostgreSQL schema.
pub fn registry_in_schema(schema: &str) -> Result<FullConfig, ConfigError> {
    let mut config = registry()?;
    for s in &mut config.schemas {
        s.name = schema.to_string();
    }
    Ok(config)
}
