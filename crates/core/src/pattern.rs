use std::fmt;

use crate::normalize::normalize;

/// Case- and accent-insensitive `LIKE` pattern; `%` is the only wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LikePattern {
    raw: String,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            raw: normalize(pattern),
        }
    }

    pub fn contains(fragment: &str) -> Self {
        Self::new(&format!("%{}%", fragment.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches against text that is already normalized.
    pub fn matches_normalized(&self, haystack: &str) -> bool {
        let segments = self.raw.split('%').collect::<Vec<_>>();
        let anchored_start = !self.raw.starts_with('%');
        let anchored_end = !self.raw.ends_with('%');

        if segments.len() == 1 {
            return haystack == self.raw;
        }

        let mut cursor = 0usize;
        let last = segments.len() - 1;
        for (idx, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                continue;
            }

            if idx == 0 && anchored_start {
                if !haystack.starts_with(segment) {
                    return false;
                }
                cursor = segment.len();
                continue;
            }

            if idx == last && anchored_end {
                return haystack.len() >= cursor + segment.len() && haystack[cursor..].ends_with(segment);
            }

            match haystack[cursor..].find(segment) {
                Some(found) => cursor += found + segment.len(),
                None => return false,
            }
        }

        true
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.matches_normalized(&normalize(haystack))
    }

    /// SQL form with `_` and `\` escaped, to be used with `ESCAPE '\'`.
    pub fn to_sql(&self) -> String {
        self.raw.replace('\\', "\\\\").replace('_', "\\_")
    }
}

impl fmt::Display for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_wildcards() {
        let pattern = LikePattern::new("%Certificação%Sustentabilidade%");
        assert!(pattern.matches("Art. 81 - Certificação em Sustentabilidade Ambiental"));
        assert!(!pattern.matches("Sustentabilidade e certificação"));
    }

    #[test]
    fn anchored_pattern_is_exact() {
        let pattern = LikePattern::new("PETRÓPOLIS");
        assert!(pattern.matches("petropolis"));
        assert!(!pattern.matches("petropolis norte"));
    }

    #[test]
    fn anchored_prefix() {
        let pattern = LikePattern::new("zot 07%");
        assert!(pattern.matches("ZOT 07"));
        assert!(pattern.matches("zot 07.1"));
        assert!(!pattern.matches("a zot 07"));
    }

    #[test]
    fn sql_form_escapes_underscore() {
        assert_eq!(LikePattern::contains("zot_7").to_sql(), "%zot\\_7%");
    }
}
