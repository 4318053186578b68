//! URL ignore-pattern matching.
//!
//! Mirrors the teacher's `ScopeMatcher` (literal substrings via
//! `wildmatch::WildMatch`, escape-hatched to regex) but adapted to the tap's
//! single-list `ignore_patterns` semantics: a URL is captured unless any
//! pattern matches it. Entries wrapped as `/pattern/` are regex; everything
//! else is a literal substring (matched via wildcard glob, so a bare pattern
//! with no `*`/`?` behaves as a plain substring-style match on the whole
//! string it's compared against).

use regex::Regex;
use wildmatch::WildMatch;

enum CompiledPattern {
    Literal(String),
    Regex(Regex),
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Self {
        match pattern.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
            Some(inner) => match Regex::new(inner) {
                Ok(re) => CompiledPattern::Regex(re),
                Err(_) => CompiledPattern::Literal(pattern.to_string()),
            },
            None => CompiledPattern::Literal(pattern.to_string()),
        }
    }

    fn matches(&self, url: &str) -> bool {
        match self {
            CompiledPattern::Literal(lit) => {
                url.contains(lit.as_str()) || WildMatch::new(lit).matches(url)
            }
            CompiledPattern::Regex(re) => re.is_match(url),
        }
    }
}

/// Matches a URL against a tap's `ignore_patterns` list.
pub struct IgnoreMatcher {
    patterns: Vec<CompiledPattern>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Self {
        Self { patterns: patterns.iter().map(|p| CompiledPattern::compile(p)).collect() }
    }

    /// `true` iff the URL matches none of the configured patterns, i.e. it
    /// should be captured.
    pub fn should_capture(&self, url: &str) -> bool {
        !self.patterns.iter().any(|p| p.matches(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_substring_match() {
        let matcher = IgnoreMatcher::new(&["google-analytics.com".to_string()]);
        assert!(!matcher.should_capture("https://www.google-analytics.com/collect"));
        assert!(matcher.should_capture("https://api.example.com/users"));
    }

    #[test]
    fn regex_pattern_match() {
        let matcher = IgnoreMatcher::new(&["/^chrome-extension:\\/\\//".to_string()]);
        assert!(!matcher.should_capture("chrome-extension://abc123/page.html"));
        assert!(matcher.should_capture("https://example.com"));
    }

    #[test]
    fn empty_pattern_list_captures_everything() {
        let matcher = IgnoreMatcher::new(&[]);
        assert!(matcher.should_capture("https://anything.example.com"));
    }
}
