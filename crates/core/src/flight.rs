//! Flight key parsing and the lookup record derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An object-store key prefix grouping every artifact of one flight's upload.
///
/// Keys follow a `date/flight-code/` hierarchy. A key denotes a flight only
/// if its last path segment (excluding the trailing separator) is non-empty
/// and entirely alphabetic; anything else is ignored by every pipeline stage.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightKey(String);

impl FlightKey {
    /// Parse a raw object key prefix, validating the flight-code invariant.
    pub fn parse(key: impl Into<String>) -> crate::Result<Self> {
        let key = key.into();
        let trimmed = key.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidFlightKey("empty key".to_string()));
        }

        let code = trimmed.rsplit('/').next().unwrap_or("");
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(crate::Error::InvalidFlightKey(format!(
                "last segment {code:?} is not an alphabetic flight code"
            )));
        }

        // Normalize to a trailing separator so `key + name` forms object keys.
        let normalized = if key.ends_with('/') {
            key
        } else {
            format!("{key}/")
        };
        Ok(Self(normalized))
    }

    /// The prefix string, always with a trailing separator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the key (separator-split, empty tail dropped).
    pub fn segments(&self) -> Vec<&str> {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// The flight date: the first path segment.
    pub fn flight_date(&self) -> &str {
        self.segments().first().copied().unwrap_or("")
    }

    /// The flight code: the last path segment.
    pub fn flight_code(&self) -> &str {
        self.segments().last().copied().unwrap_or("")
    }

    /// The full object key for an artifact name under this prefix.
    pub fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Derive the lookup record, pointing the two locators at this key.
    pub fn lookup_record(
        &self,
        raw_base: Option<&str>,
        processed_base: Option<&str>,
    ) -> FlightLookupRecord {
        FlightLookupRecord {
            locator_1: locator(raw_base, &self.0),
            locator_2: locator(processed_base, &self.0),
            flight_date: self.flight_date().to_string(),
            flight_code: self.flight_code().to_string(),
        }
    }
}

fn locator(base: Option<&str>, key: &str) -> String {
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

impl fmt::Debug for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlightKey({})", self.0)
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row per successfully ingested flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLookupRecord {
    /// Locator of the raw upload (base URI + flight key).
    pub locator_1: String,
    /// Locator of the processed copy.
    pub locator_2: String,
    pub flight_date: String,
    pub flight_code: String,
}
