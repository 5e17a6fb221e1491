use chrono::{DateTime, Utc};

use crate::ObservationType;

/// Metadata filters shared by `VectorIndex::query` and `Store`'s
/// filter-only retrieval path. All fields are optional; `QueryEngine`
/// requires that at least one of `text` or a non-empty `Filters` be
/// present.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub project: Option<String>,
    pub kind: Option<ObservationType>,
    pub concepts: Vec<String>,
    pub files: Vec<String>,
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.kind.is_none()
            && self.concepts.is_empty()
            && self.files.is_empty()
            && self.date_range.is_none()
    }
}

/// Shape of the result set requested by a caller: `Index` is the compact
/// listing view, `Full` includes every field. Default is `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    Index,
    #[default]
    Full,
}

impl ResultFormat {
    pub fn from_str_lenient(raw: &str) -> Self {
        match raw {
            "index" => ResultFormat::Index,
            _ => ResultFormat::Full,
        }
    }
}
