//! Phase-setting search for pipelines and feedback loops

/// Every ordering of `first..first + count`
///
/// Orderings are produced with Heap's algorithm, iteratively.
pub fn phase_permutations(first: i64, count: usize) -> Vec<Vec<i64>> {
    let mut current: Vec<i64> = (first..).take(count).collect();
    let mut result = vec![current.clone()];
    let mut counters = vec![0usize; count];

    let mut i = 1;
    while i < count {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            current.swap(j, i);
            result.push(current.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permutations_are_distinct_and_complete() {
        let all = phase_permutations(5, 5);
        assert_eq!(all.len(), 120);

        let unique: HashSet<Vec<i64>> = all.iter().cloned().collect();
        assert_eq!(unique.len(), 120);

        for phases in &all {
            let mut sorted = phases.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![5, 6, 7, 8, 9]);
        }
    }

    #[test]
    fn test_small_counts() {
        assert_eq!(phase_permutations(0, 0), vec![Vec::<i64>::new()]);
        assert_eq!(phase_permutations(3, 1), vec![vec![3]]);
        assert_eq!(phase_permutations(0, 2).len(), 2);
    }
}
