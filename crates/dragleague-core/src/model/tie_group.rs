// Tie-groups: the queens sharing one elimination or weekly-win slot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ranking::format_names;

/// An ordered set of queen names that share a single slot. An empty group is
/// a placeholder ("nothing recorded yet" / "no winner this week").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TieGroup(Vec<String>);

impl TieGroup {
    /// Build a group from names, dropping blanks and repeated names while
    /// keeping first-seen order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            let name = name.trim();
            if name.is_empty() || out.iter().any(|n| n == name) {
                continue;
            }
            out.push(name.to_string());
        }
        TieGroup(out)
    }

    pub fn empty() -> Self {
        TieGroup(Vec::new())
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new([name.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for TieGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_names(self.0.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_drops_blanks_and_repeats() {
        let group = TieGroup::new(["A", "", "B", "A", "  "]);
        assert_eq!(group.names(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn membership_is_case_sensitive() {
        let group = TieGroup::single("Bianca");
        assert!(group.contains("Bianca"));
        assert!(!group.contains("bianca"));
    }

    #[test]
    fn display_uses_human_list() {
        assert_eq!(TieGroup::new(["A", "B", "C"]).to_string(), "A, B, & C");
        assert_eq!(TieGroup::empty().to_string(), "");
    }
}
