//! History windowing

use crate::db::Turn;

/// The last `size` turns, in chronological order
///
/// Logs shorter than `size` are returned whole.
#[must_use]
pub fn window(turns: &[Turn], size: usize) -> &[Turn] {
    let start = turns.len().saturating_sub(size);
    &turns[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> Vec<Turn> {
        (1..=count).map(|i| Turn::user(i.to_string())).collect()
    }

    #[test]
    fn test_short_log_is_returned_whole() {
        let turns = vec![Turn::user("hi"), Turn::bot("hello"), Turn::user("bye")];
        assert_eq!(window(&turns, 5), turns.as_slice());
    }

    #[test]
    fn test_exact_size() {
        let turns = numbered(5);
        assert_eq!(window(&turns, 5), turns.as_slice());
    }

    #[test]
    fn test_long_log_keeps_last_turns() {
        let turns = numbered(7);
        let texts: Vec<&str> = window(&turns, 5).iter().map(Turn::text).collect();
        assert_eq!(texts, ["3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_every_length_keeps_suffix() {
        for len in 0..12 {
            let turns = numbered(len);
            let got = window(&turns, 5);
            assert_eq!(got.len(), len.min(5));
            assert_eq!(got, &turns[len - got.len()..]);
        }
    }

    #[test]
    fn test_empty_log() {
        assert!(window(&[], 5).is_empty());
    }
}
