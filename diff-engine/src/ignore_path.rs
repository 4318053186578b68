//! Dot-path ignore matching shared by the API and DOM differs.
//!
//! Adapted from the teacher's regex + wildmatch pattern-matching idiom
//! (`proxy-core::policy::RuleCondition`, `proxy-core::filter::ScopeMatcher`)
//! applied to dotted diff-change paths instead of URLs: a path is covered by
//! a pattern if it equals the pattern, is a descendant of it, or matches the
//! pattern once `*` is expanded to a full-match regex wildcard.

use regex::Regex;

pub struct IgnorePathMatcher {
    patterns: Vec<String>,
    globs: Vec<Regex>,
}

fn glob_to_regex(pattern: &str) -> Regex {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

impl IgnorePathMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let globs = patterns.iter().filter(|p| p.contains('*')).map(|p| glob_to_regex(p)).collect();
        Self { patterns: patterns.to_vec(), globs }
    }

    /// `true` if `path` (dot-joined) is covered by any configured pattern:
    /// exact match, a descendant (`pattern` is a prefix ending at a `.`
    /// boundary), or a glob match.
    pub fn is_ignored(&self, path: &str) -> bool {
        for pattern in &self.patterns {
            if pattern == path {
                return true;
            }
            if !pattern.contains('*') {
                if let Some(rest) = path.strip_prefix(pattern.as_str()) {
                    if rest.starts_with('.') {
                        return true;
                    }
                }
            }
        }
        self.globs.iter().any(|re| re.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let m = IgnorePathMatcher::new(&["response.body".to_string()]);
        assert!(m.is_ignored("response.body"));
        assert!(!m.is_ignored("response.bodyx"));
    }

    #[test]
    fn descendant_prefix_match() {
        let m = IgnorePathMatcher::new(&["request.headers".to_string()]);
        assert!(m.is_ignored("request.headers.authorization"));
        assert!(!m.is_ignored("request.headersx"));
    }

    #[test]
    fn glob_match() {
        let m = IgnorePathMatcher::new(&["response.body.*.id".to_string()]);
        assert!(m.is_ignored("response.body.user.id"));
        assert!(!m.is_ignored("response.body.user.name"));
    }
}
