/// Combine the text shown so far with a newly decoded fragment.
///
/// The API may send the whole response on every chunk (cumulative) or only
/// the newly generated part (delta); both converge to one growing string.
pub fn merge_text(current: &str, incoming: &str) -> String {
    if incoming == current {
        return current.to_string();
    }
    if incoming.starts_with(current) {
        return incoming.to_string();
    }
    if current.starts_with(incoming) {
        return current.to_string();
    }

    let mut merged = String::with_capacity(current.len() + incoming.len());
    merged.push_str(current);
    merged.push_str(incoming);
    merged
}

/// Fold several fragments into one string, left to right.
pub fn merge_all<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    fragments
        .into_iter()
        .fold(String::new(), |acc, fragment| merge_text(&acc, fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_unchanged() {
        assert_eq!(merge_text("Hello", "Hello"), "Hello");
        assert_eq!(merge_text("", ""), "");
    }

    #[test]
    fn test_cumulative_growth_adopts_incoming() {
        assert_eq!(merge_text("Hel", "Hello"), "Hello");
        assert_eq!(merge_text("", "Hi"), "Hi");
    }

    #[test]
    fn test_shorter_duplicate_keeps_current() {
        assert_eq!(merge_text("Hello", "Hel"), "Hello");
        assert_eq!(merge_text("Hello", ""), "Hello");
    }

    #[test]
    fn test_delta_is_appended() {
        assert_eq!(merge_text("Hello", " world"), "Hello world");
        assert_eq!(merge_text("abc", "xbc"), "abcxbc");
    }

    #[test]
    fn test_merge_all_mixes_conventions() {
        assert_eq!(merge_all(["Hel", "Hello", "lo", ", there"]), "Hello, there");
    }

    #[test]
    fn test_merge_laws_over_samples() {
        let samples = ["", "a", "ab", "abc", "b", "bc", "héllo", "hé", "\n"];
        for a in samples {
            for b in samples {
                let merged = merge_text(a, b);
                if a == b {
                    assert_eq!(merged, a);
                } else if b.starts_with(a) {
                    assert_eq!(merged, b);
                } else if a.starts_with(b) {
                    assert_eq!(merged, a);
                } else {
                    assert_eq!(merged, format!("{a}{b}"));
                }
            }
        }
    }
}
