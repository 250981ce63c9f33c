//! Key segmentation
//!
//! Splits a flat key such as `user:123:profile` into the path segments the
//! prefix tree is built from. Empty segments are never produced: repeated,
//! leading and trailing separators are dropped, so `":a::b:"` walks the same
//! path as `"a:b"`.

/// Separator used when none is configured.
pub const DEFAULT_SEPARATORS: &str = ":";

/// Splits keys on any of a fixed set of separator characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmenter {
    separators: Vec<char>,
}

impl Segmenter {
    /// Create a segmenter. An empty separator set never splits.
    pub fn new(separators: impl IntoIterator<Item = char>) -> Self {
        let mut separators: Vec<char> = separators.into_iter().collect();
        separators.sort_unstable();
        separators.dedup();
        Self { separators }
    }

    /// Build from a string where every character is a separator (`":/."`).
    pub fn from_chars(separators: &str) -> Self {
        Self::new(separators.chars())
    }

    pub fn separators(&self) -> &[char] {
        &self.separators
    }

    /// Split `key` into its non-empty segments.
    pub fn split<'a>(&self, key: &'a str) -> Vec<&'a str> {
        key.split(|c: char| self.separators.contains(&c))
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::from_chars(DEFAULT_SEPARATORS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_on_single_separator() {
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.split("user:123:profile"), vec!["user", "123", "profile"]);
    }

    #[test]
    fn test_no_separator_yields_whole_key() {
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.split("session"), vec!["session"]);
    }

    #[test]
    fn test_any_configured_separator_splits() {
        let segmenter = Segmenter::from_chars(":/.");
        assert_eq!(segmenter.split("a:b/c.d"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_repeated_and_boundary_separators_are_dropped() {
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.split("a::b"), segmenter.split("a:b"));
        assert_eq!(segmenter.split(":a:b:"), vec!["a", "b"]);
        assert!(segmenter.split(":::").is_empty());
        assert!(segmenter.split("").is_empty());
    }

    #[test]
    fn test_empty_separator_set_never_splits() {
        let segmenter = Segmenter::new(std::iter::empty());
        assert_eq!(segmenter.split("a:b"), vec!["a:b"]);
    }

    #[test]
    fn test_multibyte_separator() {
        let segmenter = Segmenter::from_chars("→");
        assert_eq!(segmenter.split("a→b→c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_separators_collapsed() {
        let segmenter = Segmenter::from_chars("::/");
        assert_eq!(segmenter.separators(), &['/', ':']);
    }

    proptest! {
        #[test]
        fn test_split_join_split_is_stable(key in "[a-z:]{0,40}") {
            let segmenter = Segmenter::default();
            let first = segmenter.split(&key);
            let rejoined = first.join(":");
            prop_assert_eq!(segmenter.split(&rejoined), first);
        }

        #[test]
        fn test_segments_never_empty_or_contain_separator(key in "[a-c:/]{0,40}") {
            let segmenter = Segmenter::from_chars(":/");
            for segment in segmenter.split(&key) {
                prop_assert!(!segment.is_empty());
                prop_assert!(!segment.contains(':') && !segment.contains('/'));
            }
        }
    }
}
