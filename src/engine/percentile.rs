//! Tie-aware rank percentiles.

use std::collections::HashMap;

use crate::models::finite_or_zero;

/// Average-rank percentile over an arbitrary key→value map.
///
/// Entries are sorted ascending; a contiguous run of tied values spanning
/// sorted indices `[i, j)` all receive `((i + j - 1) / 2) / (n - 1)`, which
/// removes tie-breaking bias. A singleton map yields percentile 1.0.
/// Non-finite values degrade to 0 before ranking.
pub fn rank_percentiles(values: &HashMap<String, f64>) -> HashMap<String, f64> {
    let n = values.len();
    let mut out = HashMap::with_capacity(n);
    if n == 0 {
        return out;
    }
    if n == 1 {
        let key = values.keys().next().unwrap().clone();
        out.insert(key, 1.0);
        return out;
    }

    let mut sorted: Vec<(&String, f64)> = values
        .iter()
        .map(|(k, v)| (k, finite_or_zero(*v)))
        .collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let denom = (n - 1) as f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && sorted[j].1 == sorted[i].1 {
            j += 1;
        }
        let pct = ((i + j - 1) as f64 / 2.0) / denom;
        for entry in &sorted[i..j] {
            out.insert(entry.0.clone(), pct);
        }
        i = j;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_distinct_values_linear_ranks() {
        let pct = rank_percentiles(&map(&[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]));
        assert_eq!(pct["a"], 0.0);
        assert_eq!(pct["b"], 1.0 / 3.0);
        assert_eq!(pct["c"], 2.0 / 3.0);
        assert_eq!(pct["d"], 1.0);
    }

    #[test]
    fn test_ties_share_average_rank() {
        // Tied run spans sorted indices [1, 3): ((1 + 2) / 2) / 3 = 0.5
        let pct = rank_percentiles(&map(&[("a", 1.0), ("b", 5.0), ("c", 5.0), ("d", 9.0)]));
        assert_eq!(pct["b"], 0.5);
        assert_eq!(pct["c"], 0.5);
        assert_eq!(pct["a"], 0.0);
        assert_eq!(pct["d"], 1.0);
    }

    #[test]
    fn test_all_tied() {
        let pct = rank_percentiles(&map(&[("a", 7.0), ("b", 7.0), ("c", 7.0)]));
        for p in pct.values() {
            assert_eq!(*p, 0.5);
        }
    }

    #[test]
    fn test_singleton_is_one() {
        let pct = rank_percentiles(&map(&[("only", 42.0)]));
        assert_eq!(pct["only"], 1.0);
    }

    #[test]
    fn test_empty_map() {
        assert!(rank_percentiles(&HashMap::new()).is_empty());
    }

    #[test]
    fn test_non_finite_degrades_to_zero() {
        let pct = rank_percentiles(&map(&[("nan", f64::NAN), ("zero", 0.0), ("one", 1.0)]));
        // NaN collapses to 0 and ties with the real zero
        assert_eq!(pct["nan"], pct["zero"]);
        assert_eq!(pct["one"], 1.0);
    }

    #[test]
    fn test_bounds() {
        let pct = rank_percentiles(&map(&[("a", -5.0), ("b", 0.0), ("c", 5.0), ("d", 5.0)]));
        for p in pct.values() {
            assert!((0.0..=1.0).contains(p));
        }
    }
}
