// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/// Find the largest valid UTF-8 char boundary at or before `index` in `s`.
/// This prevents panics when slicing strings at arbitrary byte offsets.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// At most `max_bytes` of `s`, cut on a char boundary, for log lines
#[inline]
pub fn preview(s: &str, max_bytes: usize) -> &str {
    &s[..floor_char_boundary(s, max_bytes)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("hello", 3), "hel");
        // 'ä' is two bytes; cutting inside it backs off
        assert_eq!(preview("aä", 2), "a");
        assert_eq!(floor_char_boundary("aä", 3), 3);
    }
}
