//! Slash trimming helpers shared by path rewriting and URL reconstruction.

/// Remove every leading `/`, so `///a` becomes `a`.
pub fn remove_all_leading_slashes(s: &str) -> &str {
    s.trim_start_matches('/')
}

/// Remove every trailing `/`.
pub fn remove_all_trailing_slashes(s: &str) -> &str {
    s.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading() {
        assert_eq!(remove_all_leading_slashes("///a/b"), "a/b");
        assert_eq!(remove_all_leading_slashes("///"), "");
        assert_eq!(remove_all_leading_slashes("a/"), "a/");
    }

    #[test]
    fn test_trailing() {
        assert_eq!(remove_all_trailing_slashes("http://x.com///"), "http://x.com");
        assert_eq!(remove_all_trailing_slashes("/a/b"), "/a/b");
        assert_eq!(remove_all_trailing_slashes("/"), "");
    }
}
