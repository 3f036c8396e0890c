use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Source-assigned identifier of a location.
///
/// PV-Output hands out integer system ids; locations that only come from a
/// coordinate list get their row index instead. Both are kept as their
/// canonical text so that ids read back from a file compare equal to ids
/// produced in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self(id.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for LocationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<usize> for LocationId {
    fn from(index: usize) -> Self {
        Self(index.to_string())
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LocationId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Accepts both `66991` and `"66991"`.
impl<'de> Deserialize<'de> for LocationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::from(n),
            Raw::Text(s) => Self::new(s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_text_ids_compare_equal() {
        assert_eq!(LocationId::new(" 5242"), LocationId::from(5242u64));
        let parsed: Vec<LocationId> = serde_json::from_str(r#"[5242, "5242"]"#).unwrap();
        assert_eq!(parsed[0], parsed[1]);
    }
}
