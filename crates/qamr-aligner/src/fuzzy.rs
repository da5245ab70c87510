//! Fuzzy string similarity
//!
//! Scores are integers on a 0-100 scale. Matching is case-sensitive and the
//! only preprocessing is trimming surrounding whitespace: annotators copy
//! spans verbatim, so casing and punctuation are kept as signal.

/// Strip-only preprocessing
pub fn semi_process(s: &str) -> &str {
    s.trim()
}

/// Length of the longest common subsequence of two char slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Similarity as twice the matched characters over the total length
pub fn ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b).round() as u32
}

/// Best ratio of the shorter string against equally long windows of the longer one
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.is_empty() {
        return 0;
    }

    let mut best = 0.0f64;
    for window in longer.windows(shorter.len()) {
        best = best.max(ratio_chars(&shorter, window));
        if best >= 100.0 {
            break;
        }
    }
    best.round() as u32
}

/// Weighted similarity: plain ratio for strings of similar length,
/// otherwise the better of the plain ratio and a scaled partial ratio.
pub fn weighted_ratio(a: &str, b: &str) -> u32 {
    let a = semi_process(a);
    let b = semi_process(b);
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return 0;
    }

    let base = ratio(a, b);
    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
    if len_ratio < 1.5 {
        return base;
    }

    let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = (partial_ratio(a, b) as f64 * scale).round() as u32;
    base.max(partial)
}

/// Score every choice against the query and keep the `limit` best, highest
/// first. Equal scores keep their input order.
pub fn extract<'a>(query: &str, choices: &[&'a str], limit: usize) -> Vec<(&'a str, u32)> {
    let mut scored: Vec<(&'a str, u32)> = choices
        .iter()
        .map(|choice| (*choice, weighted_ratio(query, choice)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(limit);
    scored
}
