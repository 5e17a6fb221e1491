//! The streaming XML parser and lenient field extraction, generalized from
//! `agentreplay`'s `SessionSummaryParser::extract_tag` in two directions:
//! incremental scanning over a growing buffer (so an element is shipped the
//! instant its closing tag is seen, never waiting for a "done" signal from
//! the generator) and list-shaped sub-fields (`facts`, `concepts`,
//! `files_read`, `files_modified`).

use recall_types::{ObservationFields, ObservationType, SummaryFields};

/// One complete top-level element recognized in the generator's output
/// stream, with its raw inner XML (or nothing, for the self-closing
/// skip marker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawElement {
    Observation(String),
    Summary(String),
    SkipSummary,
}

/// Incremental scanner: accumulates streamed text and yields whole elements
/// as their closing tag appears. Never buffers a "done" signal; each
/// `push` may immediately make one or more elements available.
#[derive(Debug, Default)]
pub struct ElementScanner {
    buffer: String,
}

impl ElementScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Drains every element complete as of right now, left-to-right in the
    /// order their closing tags appear.
    pub fn drain(&mut self) -> Vec<RawElement> {
        let mut out = Vec::new();
        while let Some(element) = self.next_element() {
            out.push(element);
        }
        out
    }

    fn next_element(&mut self) -> Option<RawElement> {
        const CANDIDATES: [(&str, &str, bool); 3] = [
            ("<observation>", "</observation>", false),
            ("<summary>", "</summary>", false),
            ("<skip_summary", "/>", true),
        ];

        let mut best: Option<(usize, usize, usize)> = None; // (start, end, candidate idx)
        for (idx, (open, close, _)) in CANDIDATES.iter().enumerate() {
            let Some(start) = self.buffer.find(open) else {
                continue;
            };
            let search_from = start + open.len();
            let Some(rel_end) = self.buffer[search_from..].find(close) else {
                continue;
            };
            let end = search_from + rel_end + close.len();
            if best.map(|(best_start, ..)| start < best_start).unwrap_or(true) {
                best = Some((start, end, idx));
            }
        }

        let (start, end, idx) = best?;
        let raw = self.buffer[start..end].to_string();
        self.buffer.replace_range(..end, "");

        Some(match idx {
            0 => RawElement::Observation(raw),
            1 => RawElement::Summary(raw),
            _ => RawElement::SkipSummary,
        })
    }
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    let inner = xml[start..start + end].trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

fn extract_list(xml: &str, container: &str, item: &str) -> Vec<String> {
    let Some(inner) = extract_container(xml, container) else {
        return Vec::new();
    };
    let item_open = format!("<{item}>");
    let item_close = format!("</{item}>");
    let mut out = Vec::new();
    let mut rest = inner.as_str();
    while let Some(s) = rest.find(&item_open) {
        let value_start = s + item_open.len();
        let Some(rel_end) = rest[value_start..].find(&item_close) else {
            break;
        };
        let value = rest[value_start..value_start + rel_end].trim();
        if !value.is_empty() {
            out.push(value.to_string());
        }
        rest = &rest[value_start + rel_end + item_close.len()..];
    }
    out
}

/// Like `extract_tag` but returns the raw (untrimmed emptiness check only)
/// inner text of a container tag whether or not it holds list items, used
/// internally by `extract_list`.
fn extract_container(xml: &str, container: &str) -> Option<String> {
    let open = format!("<{container}>");
    let close = format!("</{container}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}

/// Parses the inner XML of a `<observation>` element into `ObservationFields`:
/// every sub-field is independently optional, an unrecognized or absent
/// `<type>` resolves to `Change` later via `resolved_kind`, and `type` is
/// stripped from `concepts` via `purified_concepts`; this function only
/// extracts, the closed-variant coercion and concept purification live on
/// `ObservationFields` itself so every caller gets them for free.
pub fn parse_observation(raw: &str) -> ObservationFields {
    ObservationFields {
        kind: extract_tag(raw, "type").map(|t| ObservationType::coerce(&t)),
        title: extract_tag(raw, "title"),
        subtitle: extract_tag(raw, "subtitle"),
        narrative: extract_tag(raw, "narrative"),
        facts: extract_list(raw, "facts", "fact"),
        concepts: extract_list(raw, "concepts", "concept"),
        files_read: extract_list(raw, "files_read", "file"),
        files_modified: extract_list(raw, "files_modified", "file"),
    }
}

/// Parses the inner XML of a `<summary>` element. Every field optional; a
/// summary with none set is still valid.
pub fn parse_summary(raw: &str) -> SummaryFields {
    SummaryFields {
        request: extract_tag(raw, "request"),
        investigated: extract_tag(raw, "investigated"),
        learned: extract_tag(raw, "learned"),
        completed: extract_tag(raw, "completed"),
        next_steps: extract_tag(raw, "next_steps"),
        notes: extract_tag(raw, "notes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_yields_element_as_soon_as_it_closes() {
        let mut scanner = ElementScanner::new();
        scanner.push("some chatter <observation><type>bugfix</type>");
        assert!(scanner.drain().is_empty());
        scanner.push("</observation> trailing");
        let elements = scanner.drain();
        assert_eq!(elements.len(), 1);
        assert!(matches!(elements[0], RawElement::Observation(_)));
    }

    #[test]
    fn scanner_yields_multiple_sibling_elements_in_one_drain() {
        let mut scanner = ElementScanner::new();
        scanner.push(
            "<observation><type>decision</type></observation>\
             <observation><type>bugfix</type></observation>",
        );
        let elements = scanner.drain();
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn scanner_recognizes_self_closing_skip_summary() {
        let mut scanner = ElementScanner::new();
        scanner.push("<skip_summary reason=\"nothing happened\"/>");
        let elements = scanner.drain();
        assert_eq!(elements, vec![RawElement::SkipSummary]);
    }

    #[test]
    fn missing_type_resolves_to_change_via_resolved_kind() {
        let fields = parse_observation("<observation><subtitle>x</subtitle></observation>");
        assert!(fields.kind.is_none());
        assert_eq!(fields.resolved_kind(), ObservationType::Change);
        assert_eq!(fields.subtitle.as_deref(), Some("x"));
        assert!(fields.title.is_none());
    }

    #[test]
    fn unknown_type_string_coerces_to_change() {
        let fields = parse_observation("<observation><type>xyz</type></observation>");
        assert_eq!(fields.resolved_kind(), ObservationType::Change);
    }

    #[test]
    fn whitespace_only_field_counts_as_empty() {
        let fields = parse_observation("<observation><title>   </title></observation>");
        assert!(fields.title.is_none());
    }

    #[test]
    fn facts_and_concepts_lists_parse() {
        let fields = parse_observation(
            "<observation><facts><fact>a</fact><fact>b</fact></facts>\
             <concepts><concept>auth</concept></concepts></observation>",
        );
        assert_eq!(fields.facts, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fields.concepts, vec!["auth".to_string()]);
    }

    #[test]
    fn summary_with_every_field_absent_is_still_valid() {
        let fields = parse_summary("<summary></summary>");
        assert!(fields.request.is_none());
        assert!(fields.notes.is_none());
    }
}
