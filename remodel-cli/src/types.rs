//! Common types used across CLI modules

use std::str::FromStr;
use uuid::Uuid;

/// Job identifier as typed on the command line
///
/// Either a full UUID or a prefix of one; prefixes are resolved against the
/// backend's job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRef {
    Full(Uuid),
    Prefix(String),
}

impl FromStr for JobRef {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if let Ok(uuid) = Uuid::parse_str(input) {
            return Ok(JobRef::Full(uuid));
        }

        if input.is_empty() {
            return Err("job ID must not be empty".to_string());
        }
        if !input.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(format!("'{}' is not a job ID or ID prefix", input));
        }
        Ok(JobRef::Prefix(input.to_lowercase()))
    }
}
