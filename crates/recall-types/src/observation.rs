use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};

/// Closed set of observation kinds. Anything the generator emits that does
/// not match one of these six strings coerces to `Change` rather than being
/// rejected; see the parser rules in `recall-runtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    Decision,
    Bugfix,
    Feature,
    Refactor,
    Discovery,
    Change,
}

impl ObservationType {
    /// Parses the generator's `<type>` text, coercing anything unrecognized
    /// (including empty/whitespace) to `Change`. This function never fails.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "decision" => ObservationType::Decision,
            "bugfix" => ObservationType::Bugfix,
            "feature" => ObservationType::Feature,
            "refactor" => ObservationType::Refactor,
            "discovery" => ObservationType::Discovery,
            _ => ObservationType::Change,
        }
    }

    /// Parses a query-surface `type` filter, rejecting anything outside the
    /// six known values instead of coercing. Unlike `coerce`, this is for
    /// caller-supplied filters, not the generator's lenient output parsing.
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "decision" => Some(ObservationType::Decision),
            "bugfix" => Some(ObservationType::Bugfix),
            "feature" => Some(ObservationType::Feature),
            "refactor" => Some(ObservationType::Refactor),
            "discovery" => Some(ObservationType::Discovery),
            "change" => Some(ObservationType::Change),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::Decision => "decision",
            ObservationType::Bugfix => "bugfix",
            ObservationType::Feature => "feature",
            ObservationType::Refactor => "refactor",
            ObservationType::Discovery => "discovery",
            ObservationType::Change => "change",
        }
    }
}

impl std::fmt::Display for ObservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// A hand-written `Deserialize` so that JSON/row values containing an
// unexpected `type` string coerce to `Change` instead of failing, rather
// than rejecting the whole record over one unrecognized field.
impl<'de> Deserialize<'de> for ObservationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer).map_err(|_| {
            de::Error::invalid_type(Unexpected::Other("non-string"), &"a type string")
        })?;
        Ok(ObservationType::coerce(&raw))
    }
}

/// A compressed, structured artifact derived from one or more tool events.
/// Every field but `id`, `sdk_session_id`, `type`, and `created_at` is
/// optional by design: the generator is never rejected for leaving a field
/// blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub sdk_session_id: String,
    pub project: String,
    #[serde(rename = "type")]
    pub kind: ObservationType,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub narrative: Option<String>,
    pub facts: Vec<String>,
    pub concepts: Vec<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub prompt_number: Option<i64>,
    pub discovery_tokens: i64,
    pub created_at: DateTime<Utc>,
}

/// The subset of `Observation` fields the parser in `recall-runtime`
/// produces from generator XML, before a row id / timestamp exist.
#[derive(Debug, Clone, Default)]
pub struct ObservationFields {
    pub kind: Option<ObservationType>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub narrative: Option<String>,
    pub facts: Vec<String>,
    pub concepts: Vec<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
}

impl ObservationFields {
    /// Resolves the closed `type`: absent coerces to `Change`, same as an
    /// unrecognized value.
    pub fn resolved_kind(&self) -> ObservationType {
        self.kind.unwrap_or(ObservationType::Change)
    }

    /// `concepts` must never contain the type string (P8); this is applied
    /// defensively here as well as at parse time.
    pub fn purified_concepts(&self) -> Vec<String> {
        let kind_str = self.resolved_kind().as_str();
        self.concepts
            .iter()
            .filter(|c| c.as_str() != kind_str)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_coerces_to_change() {
        assert_eq!(ObservationType::coerce("xyz"), ObservationType::Change);
        assert_eq!(ObservationType::coerce(""), ObservationType::Change);
        assert_eq!(ObservationType::coerce("   "), ObservationType::Change);
    }

    #[test]
    fn recognized_types_round_trip() {
        for (raw, expected) in [
            ("decision", ObservationType::Decision),
            ("Bugfix", ObservationType::Bugfix),
            ("FEATURE", ObservationType::Feature),
            ("refactor", ObservationType::Refactor),
            ("discovery", ObservationType::Discovery),
            ("change", ObservationType::Change),
        ] {
            assert_eq!(ObservationType::coerce(raw), expected);
        }
    }

    #[test]
    fn concepts_never_contain_type_string() {
        let fields = ObservationFields {
            kind: Some(ObservationType::Bugfix),
            concepts: vec!["bugfix".into(), "auth".into()],
            ..Default::default()
        };
        assert_eq!(fields.purified_concepts(), vec!["auth".to_string()]);
    }
}
