//! Levenshtein (edit) distance
//!
//! The ranker computes a distance at every matching trie node, so this is
//! the hottest function in a search. Phrases are short (1-5 characters),
//! which keeps the Myers bit-parallel path in a single 64-bit block for
//! effectively every call; key terms longer than 64 characters fall back to
//! single-row DP.

use ahash::AHashMap;
use smallvec::SmallVec;

/// Pattern length limit for the single-block Myers algorithm.
const MYERS_BLOCK_SIZE: usize = 64;

/// Compute the Levenshtein distance between two strings.
///
/// Unicode-aware: operands are compared per code point.
#[inline]
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_chars: SmallVec<[char; 64]> = a.chars().collect();
    let b_chars: SmallVec<[char; 64]> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Myers runs in O(⌈m/64⌉·n) for pattern length m; use the shorter
    // operand as the pattern.
    let (pattern, text) = if a_chars.len() <= b_chars.len() {
        (&a_chars[..], &b_chars[..])
    } else {
        (&b_chars[..], &a_chars[..])
    };

    myers_64(pattern, text)
}

/// Myers bit-parallel distance for patterns up to 64 characters.
///
/// Based on: Myers, G. (1999). "A fast bit-vector algorithm for approximate
/// string matching".
#[inline]
fn myers_64(pattern: &[char], text: &[char]) -> usize {
    let m = pattern.len();
    if m > MYERS_BLOCK_SIZE {
        return dp_distance(pattern, text);
    }

    // Peq[c] has bit i set iff pattern[i] == c
    let mut peq: AHashMap<char, u64> = AHashMap::with_capacity(m.min(26));
    for (i, &c) in pattern.iter().enumerate() {
        *peq.entry(c).or_insert(0) |= 1u64 << i;
    }

    let mut vp: u64 = !0u64;
    let mut vn: u64 = 0u64;
    let mut score = m;
    let mask = 1u64 << (m - 1);

    for &tc in text.iter() {
        let eq = peq.get(&tc).copied().unwrap_or(0);

        let xv = eq | vn;
        let xh = (((eq & vp).wrapping_add(vp)) ^ vp) | eq;

        let hp = vn | !(xh | vp);
        let hn = vp & xh;

        if (hp & mask) != 0 {
            score += 1;
        } else if (hn & mask) != 0 {
            score -= 1;
        }

        // Bit 0 of the shifted horizontal deltas encodes the first row,
        // which always increases by one per text character.
        let hp_shifted = (hp << 1) | 1;
        let hn_shifted = hn << 1;

        vp = hn_shifted | !(xv | hp_shifted);
        vn = hp_shifted & xv;
    }

    score
}

/// Single-row DP fallback for patterns longer than one Myers block.
fn dp_distance(a: &[char], b: &[char]) -> usize {
    // Keep the shorter operand on the row axis
    let (target, source) = if a.len() < b.len() { (a, b) } else { (b, a) };
    let n_target = target.len();

    let mut row: SmallVec<[usize; 64]> = (0..=n_target).collect();

    for (i, &sc) in source.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;

        for j in 0..n_target {
            let cost = usize::from(sc != target[j]);
            let deletion = row[j + 1] + 1;
            let insertion = row[j] + 1;
            let substitution = prev + cost;

            prev = row[j + 1];
            row[j + 1] = substitution.min(deletion).min(insertion);
        }
    }

    row[n_target]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("saturday", "sunday"), 3);
    }

    #[test]
    fn test_levenshtein_unicode() {
        assert_eq!(levenshtein("café", "cafe"), 1);
        assert_eq!(levenshtein("日本語", "日本"), 1);
    }

    #[test]
    fn test_levenshtein_short_phrases() {
        // the shapes the ranker actually produces
        assert_eq!(levenshtein("CAT", "CAT"), 0);
        assert_eq!(levenshtein("CAT", "WILDCAT"), 4);
        assert_eq!(levenshtein("CAT", "CATERPILLAR"), 8);
        assert_eq!(levenshtein("WOL", "WOLF"), 1);
        assert_eq!(levenshtein("WOL", "WOLVERINE"), 6);
    }

    #[test]
    fn test_levenshtein_myers_agrees_with_dp() {
        let pairs = [
            ("algorithm", "altruistic"),
            ("intention", "execution"),
            ("a", "b"),
            ("ab", "ba"),
        ];
        for (a, b) in pairs {
            let a_chars: Vec<char> = a.chars().collect();
            let b_chars: Vec<char> = b.chars().collect();
            assert_eq!(levenshtein(a, b), dp_distance(&a_chars, &b_chars));
        }
    }

    #[test]
    fn test_levenshtein_long_pattern_falls_back() {
        let long_a = "x".repeat(70);
        let long_b = format!("{}yy", "x".repeat(70));
        assert_eq!(levenshtein(&long_a, &long_b), 2);
    }
}
