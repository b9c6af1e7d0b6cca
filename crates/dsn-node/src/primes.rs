//! Prime-domain partitioning: generate a shared table of primes and slice
//! it into disjoint, contiguous ranges so a fixed-size network can divide
//! up specialization without coordination beyond knowing `network_size`
//! and one's own index.

use dsn_types::term::is_prime;

/// Builds the first `count` primes in ascending order, starting at 3 (2 is
/// excluded everywhere in this system: see [`dsn_types::term::Term::fuse`]'s
/// odd-prime requirement).
pub fn first_n_primes(count: usize) -> Vec<u64> {
    let mut primes = Vec::with_capacity(count);
    let mut candidate = 3u64;
    while primes.len() < count {
        if is_prime(candidate) {
            primes.push(candidate);
        }
        candidate += 2;
    }
    primes
}

/// Splits `primes` into `network_size` disjoint, contiguous slices and
/// returns the one belonging to `node_index`. Slices are as even as
/// possible; any remainder is distributed one-per-slice starting from
/// index 0. Returns an empty slice if `node_index >= network_size` or
/// `network_size` is zero.
pub fn partition_for(primes: &[u64], network_size: usize, node_index: usize) -> Vec<u64> {
    if network_size == 0 || node_index >= network_size {
        return Vec::new();
    }
    let base = primes.len() / network_size;
    let remainder = primes.len() % network_size;

    let start = node_index * base + node_index.min(remainder);
    let this_slice_len = base + usize::from(node_index < remainder);
    let end = (start + this_slice_len).min(primes.len());

    primes.get(start.min(primes.len())..end).unwrap_or(&[]).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_n_primes_skips_two_and_starts_at_three() {
        assert_eq!(first_n_primes(5), vec![3, 5, 7, 11, 13]);
    }

    #[test]
    fn partition_covers_every_prime_exactly_once() {
        let primes = first_n_primes(10);
        let mut seen = Vec::new();
        for i in 0..4 {
            seen.extend(partition_for(&primes, 4, i));
        }
        seen.sort_unstable();
        assert_eq!(seen, primes);
    }

    #[test]
    fn partition_distributes_remainder_to_early_slices() {
        let primes = first_n_primes(5);
        assert_eq!(partition_for(&primes, 2, 0).len(), 3);
        assert_eq!(partition_for(&primes, 2, 1).len(), 2);
    }

    #[test]
    fn out_of_range_index_yields_empty_slice() {
        let primes = first_n_primes(5);
        assert!(partition_for(&primes, 2, 5).is_empty());
    }
}
