//! Server-side tool-name skip-set for `POST /api/observations`: tool names
//! in this set never produce a durable observation. The canonical list is
//! not fixed across host platforms, so this resolves to a small built-in
//! default of test-only/meta tools, overridable via configuration rather
//! than guessed at (see DESIGN.md).

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SkipList {
    tools: HashSet<String>,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SkipList {
    pub fn with_defaults() -> Self {
        Self::from_names(["TodoWrite", "Task", "SlashCommand"])
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tools: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated override list (`RECALL_SKIP_TOOLS`),
    /// falling back to the built-in default when empty/unset.
    pub fn from_env_value(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Self::from_names(value.split(',').map(|s| s.trim().to_string())),
            None => Self::with_defaults(),
        }
    }

    pub fn should_skip(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_skip_list_filters_todo_write() {
        let list = SkipList::with_defaults();
        assert!(list.should_skip("TodoWrite"));
        assert!(!list.should_skip("Read"));
    }

    #[test]
    fn env_override_replaces_defaults() {
        let list = SkipList::from_env_value(Some("Foo, Bar"));
        assert!(list.should_skip("Foo"));
        assert!(list.should_skip("Bar"));
        assert!(!list.should_skip("TodoWrite"));
    }

    #[test]
    fn empty_env_value_falls_back_to_defaults() {
        let list = SkipList::from_env_value(Some("   "));
        assert!(list.should_skip("TodoWrite"));
    }
}
