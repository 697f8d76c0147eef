use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// A set of user-supplied regular expressions matched against URLs
///
/// Patterns are compiled case-insensitively and match anywhere in the
/// URL (search semantics, not full-match).
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles a list of patterns
    ///
    /// # Arguments
    ///
    /// * `patterns` - The regular expressions to compile
    ///
    /// # Returns
    ///
    /// * `Ok(PatternSet)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - The first pattern that failed to compile
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConfigError::InvalidPattern(format!("'{}': {}", pattern.as_ref(), e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches somewhere in the candidate
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = PatternSet::default();
        assert!(set.is_empty());
        assert!(!set.matches("http://example.com/"));
    }

    #[test]
    fn test_search_semantics() {
        let set = PatternSet::new(&["/private/"]).unwrap();
        assert!(set.matches("http://example.com/private/page"));
        assert!(!set.matches("http://example.com/public/page"));
    }

    #[test]
    fn test_case_insensitive() {
        let set = PatternSet::new(&["\\.PDF$"]).unwrap();
        assert!(set.matches("http://example.com/doc.pdf"));
    }

    #[test]
    fn test_any_pattern_matches() {
        let set = PatternSet::new(&["^mailto:", "logout"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("mailto:someone@example.com"));
        assert!(set.matches("http://example.com/logout?x=1"));
        assert!(!set.matches("http://example.com/login"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = PatternSet::new(&["valid", "(unclosed"]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }
}
