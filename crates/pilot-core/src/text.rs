//! Small text helpers shared across crates.

/// Truncate a string to at most `max` characters, appending `…` when cut.
///
/// Used for log previews of wire lines so a huge malformed payload never
/// floods the error callback or the logs.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn long_string_truncated() {
        assert_eq!(truncate_str("hello world", 5), "hello…");
    }

    #[test]
    fn exact_length_unchanged() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn multibyte_safe() {
        // Truncation counts characters, not bytes
        assert_eq!(truncate_str("héllo wörld", 5), "héllo…");
    }
}
