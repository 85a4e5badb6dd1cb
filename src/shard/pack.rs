//! First-fit-decreasing bin packing.

/// A group of items whose sizes sum to at most the target, unless it holds
/// a single oversized item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin<T> {
    pub items: Vec<T>,
    pub size: u64,
}

impl<T> Bin<T> {
    fn with_item(item: T, size: u64) -> Self {
        Self {
            items: vec![item],
            size,
        }
    }
}

/// Pack `(item, size)` pairs into bins of at most `target` bytes.
///
/// Items are taken largest first (ties keep input order) and placed into the
/// first bin with room, opening a new bin when none fits. An item larger than
/// the target gets a bin of its own.
pub fn pack_first_fit_decreasing<T>(mut items: Vec<(T, u64)>, target: u64) -> Vec<Bin<T>> {
    items.sort_by(|a, b| b.1.cmp(&a.1));

    let mut bins: Vec<Bin<T>> = Vec::new();
    for (item, size) in items {
        let slot = bins
            .iter_mut()
            .find(|bin| bin.size.saturating_add(size) <= target);
        match slot {
            Some(bin) => {
                bin.items.push(item);
                bin.size += size;
            }
            None => bins.push(Bin::with_item(item, size)),
        }
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;

    #[test]
    fn test_first_fit_decreasing() {
        let items: Vec<(u64, u64)> = [1, 2, 3, 4, 5, 6].iter().map(|&g| (g, g * GIB)).collect();
        let bins = pack_first_fit_decreasing(items, 10 * GIB);
        let groups: Vec<Vec<u64>> = bins.iter().map(|b| b.items.clone()).collect();

        assert_eq!(groups, vec![vec![6, 4], vec![5, 3, 2], vec![1]]);
        assert!(bins.iter().all(|b| b.size <= 10 * GIB));
    }

    #[test]
    fn test_oversized_item_gets_own_bin() {
        let bins = pack_first_fit_decreasing(vec![("big", 15), ("a", 4), ("b", 6)], 10);
        let groups: Vec<Vec<&str>> = bins.iter().map(|b| b.items.clone()).collect();
        assert_eq!(groups, vec![vec!["big"], vec!["b", "a"]]);
        assert_eq!(bins[0].size, 15);
    }

    #[test]
    fn test_empty_input() {
        let bins: Vec<Bin<()>> = pack_first_fit_decreasing(Vec::new(), 10);
        assert!(bins.is_empty());
    }
}
