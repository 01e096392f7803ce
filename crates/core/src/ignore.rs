use crate::ids::normalize_id;
use std::collections::HashSet;

/// User-configured identifiers to suppress from query results.
///
/// Entries are free-form strings (they do not need to be valid title ids) and
/// are compared case-insensitively: both the stored entries and the probes
/// pass through [`normalize_id`]. Blank entries are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IgnoreSet(HashSet<String>);

impl IgnoreSet {
    pub fn contains(&self, id: impl AsRef<str>) -> bool {
        self.0.contains(&normalize_id(id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(normalize_id).filter(|id| !id.is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TitleId;

    #[test]
    fn test_case_insensitive_membership() {
        let set: IgnoreSet = ["0100ABCD12340000", " abc123 "].into_iter().collect();
        assert!(set.contains("0100abcd12340000"));
        assert!(set.contains("ABC123"));
        assert!(set.contains(TitleId::parse("0100abcd12340000").unwrap()));
        assert!(!set.contains("0100abcd12340800"));
    }

    #[test]
    fn test_blank_entries_are_dropped() {
        let set: IgnoreSet = ["", "   ", "x"].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(!set.contains(""));
    }
}
