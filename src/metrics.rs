//! String distance measures shared by alignment and variant analysis.

use std::collections::BTreeSet;

/// Character-level Levenshtein distance.
///
/// Two-row DP over `char`s, so multi-byte scripts count one edit per letter.
pub fn compute_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        let ca = a[i - 1];
        for j in 1..=b.len() {
            let cost = if ca == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Levenshtein distance divided by the longer string's length (0.0 to 1.0).
pub fn normalized_distance(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    compute_levenshtein(a, b) as f32 / longest as f32
}

/// Letters present in exactly one of the two strings.
pub fn compute_letter_difference(a: &str, b: &str) -> BTreeSet<char> {
    let left: BTreeSet<char> = a.chars().collect();
    let right: BTreeSet<char> = b.chars().collect();
    left.symmetric_difference(&right).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(compute_levenshtein("reading_1", "reading_2"), 1);
        assert_eq!(compute_levenshtein("", ""), 0);
        assert_eq!(compute_levenshtein("abc", ""), 3);
        assert_eq!(compute_levenshtein("", "abc"), 3);
        assert_eq!(compute_levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_levenshtein_counts_letters_not_bytes() {
        assert_eq!(compute_levenshtein("אלהים", "אלוהים"), 1);
        assert_eq!(compute_levenshtein("φ", "ברא"), 3);
    }

    #[test]
    fn test_letter_difference() {
        let diff = compute_letter_difference("reading_1", "reading_2");
        assert_eq!(diff, BTreeSet::from(['1', '2']));
        assert!(compute_letter_difference("abc", "cab").is_empty());
        assert_eq!(compute_letter_difference("", "aab"), BTreeSet::from(['a', 'b']));
    }

    #[test]
    fn test_normalized_distance() {
        assert_eq!(normalized_distance("", ""), 0.0);
        assert_eq!(normalized_distance("abcd", "abce"), 0.25);
        assert_eq!(normalized_distance("ab", ""), 1.0);
    }
}
