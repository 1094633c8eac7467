/// Closed interval `[start, end]` on a contig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start <= end && self.end >= start
    }
}

/// Sorted set of pairwise non-overlapping closed intervals of one contig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Build the set from intervals that are pairwise non-overlapping.
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort();
        debug_assert!(
            intervals.windows(2).all(|w| w[0].end < w[1].start),
            "bug: intervals of an IntervalSet must not overlap"
        );
        IntervalSet { intervals }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    /// Return the first interval (in sort order) overlapping the closed query `[start, end]`.
    ///
    /// The search locates the first interval starting after `start`, walks backwards over
    /// predecessors reaching into the query and then forward over successors starting
    /// inside it. This is O(log n) for the sparse sets used here.
    pub fn first_overlap(&self, start: i64, end: i64) -> Option<&Interval> {
        if start > end {
            return None;
        }
        let upper = self.intervals.partition_point(|iv| iv.start <= start);

        let mut low = upper;
        while low > 0 && self.intervals[low - 1].end >= start {
            low -= 1;
        }
        if low < upper {
            return Some(&self.intervals[low]);
        }

        match self.intervals.get(upper) {
            Some(iv) if iv.start <= end => Some(iv),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> IntervalSet {
        IntervalSet::new(vec![
            Interval::new(50, 60),
            Interval::new(10, 20),
            Interval::new(80, 90),
        ])
    }

    fn brute_force(set: &IntervalSet, start: i64, end: i64) -> Option<Interval> {
        set.iter().find(|iv| iv.overlaps(start, end)).cloned()
    }

    #[test]
    fn test_first_overlap_backward() {
        let set = set();
        assert_eq!(set.first_overlap(15, 30), Some(&Interval::new(10, 20)));
        assert_eq!(set.first_overlap(20, 20), Some(&Interval::new(10, 20)));
        assert_eq!(set.first_overlap(10, 10), Some(&Interval::new(10, 20)));
    }

    #[test]
    fn test_first_overlap_forward() {
        let set = set();
        assert_eq!(set.first_overlap(0, 10), Some(&Interval::new(10, 20)));
        assert_eq!(set.first_overlap(25, 85), Some(&Interval::new(50, 60)));
        assert_eq!(set.first_overlap(0, 100), Some(&Interval::new(10, 20)));
    }

    #[test]
    fn test_first_overlap_none() {
        let set = set();
        assert_eq!(set.first_overlap(21, 49), None);
        assert_eq!(set.first_overlap(91, 200), None);
        assert_eq!(set.first_overlap(0, 9), None);
        assert_eq!(set.first_overlap(30, 29), None);
        assert_eq!(IntervalSet::default().first_overlap(0, 100), None);
    }

    #[test]
    fn test_first_overlap_matches_brute_force() {
        let set = set();
        for start in 0..100 {
            for end in start..100 {
                assert_eq!(
                    set.first_overlap(start, end).cloned(),
                    brute_force(&set, start, end),
                    "query [{}, {}]",
                    start,
                    end
                );
            }
        }
    }
}
