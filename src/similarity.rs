//! Fuzzy task name matching
//!
//! Implements the Ratcliff/Obershelp "gestalt pattern matching" ratio:
//! twice the number of matching characters divided by the total length of
//! both strings, where matches are found by recursively taking the longest
//! common substring and repeating on the unmatched pieces to either side.

/// Similarity ratio in `0.0..=1.0` between two strings
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();

    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_match(a, b);
    if size == 0 {
        return 0;
    }

    size + matching_characters(&a[..i], &b[..j])
        + matching_characters(&a[i + size..], &b[j + size..])
}

/// Longest common substring as `(start in a, start in b, length)`.
///
/// Ties resolve to the earliest start in `a`, then the earliest in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // lengths[j + 1] is the length of the common run ending at a[i], b[j]
    let mut lengths = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        let mut next = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = lengths[j] + 1;
                next[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        lengths = next;
    }

    best
}
