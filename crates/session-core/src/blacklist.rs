use std::collections::HashSet;

/// Static deny-list of subscriber identifiers.
///
/// Entries are kept exactly as configured and compared by exact string
/// equality, so an entry that contains non-digit characters can never match
/// a normalized identifier.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: HashSet<String>,
}

impl Blacklist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let bl = Blacklist::new(["123456789012345", "12-34"]);
        assert!(bl.contains("123456789012345"));
        assert!(!bl.contains("12345678901234"));
        assert!(!bl.contains("1234"));
        assert!(bl.contains("12-34"));
        assert_eq!(bl.len(), 2);
    }

    #[test]
    fn duplicates_collapse() {
        let bl = Blacklist::new(vec!["1".to_string(), "1".to_string()]);
        assert_eq!(bl.len(), 1);
    }

    #[test]
    fn default_is_empty() {
        let bl = Blacklist::default();
        assert!(bl.is_empty());
        assert!(!bl.contains(""));
    }
}
