use std::collections::HashMap;

/// Longest matching block between `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)` where `a[i..i+size] == b[j..j+size]` and `size` is
/// maximal. Among equally long blocks the earliest in `a` (then `b`) wins,
/// which keeps the overall ratio deterministic.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best_i = alo;
    let mut best_j = blo;
    let mut best_size = 0usize;

    // j2len[j] = length of the longest run of matches ending at a[i], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if b[j] == a[i] {
                let k = if j > blo {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                new_j2len.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = new_j2len;
    }

    (best_i, best_j, best_size)
}

/// Total number of matching characters across all matching blocks, found by
/// recursively splitting around the longest common block (Ratcliff/Obershelp).
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0usize;
    let mut pending = vec![(0usize, a.len(), 0usize, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, size) = longest_block(a, b, alo, ahi, blo, bhi);
        if size > 0 {
            total += size;
            pending.push((alo, i, blo, j));
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Similarity ratio of two strings in [0, 1].
///
/// `2 * M / T` where `M` is the number of matched characters across all
/// matching blocks and `T` is the total length of both inputs. Two empty
/// strings are considered identical.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let matched = matched_chars(&a_chars, &b_chars);
    (2.0 * matched as f64) / total as f64
}
