//! `LIKE` pattern matching
//!
//! `%` matches any run of characters (including none), `_` matches exactly one
//! character. Everything else matches itself.

/// Pattern matcher for `like` / `i_like` leaves
pub struct PatternMatcher;

impl PatternMatcher {
    /// Match a value against a `LIKE` pattern
    ///
    /// Examples:
    /// - "Foo%" matches "Foobar"
    /// - "%ar" matches "Foobar"
    /// - "F_o%" matches "Foobar"
    pub fn like(pattern: &str, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            Self::matches_wildcard(pattern, value)
        } else {
            Self::matches_wildcard(&pattern.to_lowercase(), &value.to_lowercase())
        }
    }

    /// Greedy wildcard matching with backtracking on the last `%` seen.
    fn matches_wildcard(pattern: &str, value: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let value: Vec<char> = value.chars().collect();

        let (mut p, mut v) = (0, 0);
        // Position of the last '%' in the pattern and where the value was when we met it
        let mut backtrack: Option<(usize, usize)> = None;

        while v < value.len() {
            match pattern.get(p) {
                Some('%') => {
                    backtrack = Some((p, v));
                    p += 1;
                }
                Some('_') => {
                    p += 1;
                    v += 1;
                }
                Some(c) if *c == value[v] => {
                    p += 1;
                    v += 1;
                }
                _ => match backtrack {
                    Some((star, matched)) => {
                        p = star + 1;
                        v = matched + 1;
                        backtrack = Some((star, matched + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|c| *c == '%')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(PatternMatcher::like("Foundation", "Foundation", true));
        assert!(!PatternMatcher::like("Foundation", "Dune", true));
    }

    #[test]
    fn test_percent_wildcard() {
        assert!(PatternMatcher::like("Found%", "Foundation", true));
        assert!(PatternMatcher::like("%tion", "Foundation", true));
        assert!(PatternMatcher::like("%und%", "Foundation", true));
        assert!(PatternMatcher::like("%", "", true));
        assert!(PatternMatcher::like("F%d%n", "Foundation", true));
        assert!(!PatternMatcher::like("F%x%n", "Foundation", true));
    }

    #[test]
    fn test_underscore_wildcard() {
        assert!(PatternMatcher::like("D_ne", "Dune", true));
        assert!(!PatternMatcher::like("D_ne", "Dne", true));
        assert!(!PatternMatcher::like("D_", "Dune", true));
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(!PatternMatcher::like("found%", "Foundation", true));
        assert!(PatternMatcher::like("found%", "Foundation", false));
    }
}
