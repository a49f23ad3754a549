//! Natural-order string comparison.
//!
//! The connection picker sorts by display name, and plain lexicographic
//! order puts `Port10` before `Port2`. This comparison treats runs of
//! digits as numbers and everything else case-insensitively, so
//! `Port1 < Port2 < Port10`.

use std::cmp::Ordering;

/// Compare two strings in case-insensitive natural order.
///
/// Digit runs are compared by numeric value (longer run of significant
/// digits wins; leading zeros are skipped). Non-digit bytes are compared
/// after ASCII lowercasing.
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut ai = 0;
    let mut bi = 0;

    loop {
        match (a.get(ai), b.get(bi)) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let (ord, next_a, next_b) = compare_digit_runs(a, ai, b, bi);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ai = next_a;
                    bi = next_b;
                } else {
                    let la = ca.to_ascii_lowercase();
                    let lb = cb.to_ascii_lowercase();
                    if la != lb {
                        return la.cmp(&lb);
                    }
                    ai += 1;
                    bi += 1;
                }
            },
        }
    }
}

/// Compare the digit runs starting at `ai`/`bi` numerically.
///
/// Returns the ordering plus the indices just past each run.
fn compare_digit_runs(a: &[u8], ai: usize, b: &[u8], bi: usize) -> (Ordering, usize, usize) {
    let (a_run, a_end) = digit_run(a, ai);
    let (b_run, b_end) = digit_run(b, bi);

    // More significant digits means a bigger number
    let ord = match a_run.len().cmp(&b_run.len()) {
        Ordering::Equal => a_run.cmp(b_run),
        unequal => unequal,
    };
    (ord, a_end, b_end)
}

/// Digit run at `start` with leading zeros stripped.
fn digit_run(s: &[u8], start: usize) -> (&[u8], usize) {
    let mut end = start;
    while end < s.len() && s[end].is_ascii_digit() {
        end += 1;
    }
    let mut first = start;
    while first + 1 < end && s[first] == b'0' {
        first += 1;
    }
    (&s[first..end], end)
}
