// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Evidence accumulators of SV candidates and their genome-wide reduction.

use std::ops::AddAssign;

use crate::variants::SvCandidate;

pub mod flank;
pub mod pairs;
pub mod worker;

pub use worker::{collect_contig_stats, ContigStatsWorker};

/// Read depth of the core region of an SV and its two control regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCount {
    pub total: u64,
    pub left: u64,
    pub right: u64,
}

impl AddAssign<&ReadCount> for ReadCount {
    fn add_assign(&mut self, other: &ReadCount) {
        self.total += other.total;
        self.left += other.left;
        self.right += other.right;
    }
}

/// Reads or pairs supporting the reference or the alternative allele of an SV, split by
/// haplotype tag, together with their qualities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleCount {
    pub alt_h1: u64,
    pub alt_h2: u64,
    pub ref_h1: u64,
    pub ref_h2: u64,
    pub alt_quals: Vec<u8>,
    pub ref_quals: Vec<u8>,
}

impl AlleleCount {
    /// Record a reference supporting observation.
    pub(crate) fn push_ref(&mut self, qual: u8, haplotype: Option<Haplotype>) {
        self.ref_quals.push(qual);
        match haplotype {
            Some(Haplotype::First) => self.ref_h1 += 1,
            Some(Haplotype::Second) => self.ref_h2 += 1,
            None => (),
        }
    }

    /// Record an alternative allele supporting observation.
    pub(crate) fn push_alt(&mut self, qual: u8, haplotype: Option<Haplotype>) {
        self.alt_quals.push(qual);
        match haplotype {
            Some(Haplotype::First) => self.alt_h1 += 1,
            Some(Haplotype::Second) => self.alt_h2 += 1,
            None => (),
        }
    }
}

impl AddAssign<&AlleleCount> for AlleleCount {
    fn add_assign(&mut self, other: &AlleleCount) {
        self.alt_h1 += other.alt_h1;
        self.alt_h2 += other.alt_h2;
        self.ref_h1 += other.ref_h1;
        self.ref_h2 += other.ref_h2;
        self.alt_quals.extend_from_slice(&other.alt_quals);
        self.ref_quals.extend_from_slice(&other.ref_quals);
    }
}

/// Evidence from reads crossing a breakpoint.
pub type JunctionCount = AlleleCount;
/// Evidence from read pairs spanning a breakpoint.
pub type SpanningCount = AlleleCount;

/// Base pair and fragment counts of one coverage region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCount {
    pub bases: u64,
    pub fragments: u64,
}

impl AddAssign<&CoverageCount> for CoverageCount {
    fn add_assign(&mut self, other: &CoverageCount) {
        self.bases += other.bases;
        self.fragments += other.fragments;
    }
}

/// Parental haplotype of a read as given by its HP tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haplotype {
    First,
    Second,
}

/// Evidence of all SVs, either of a single contig or of the whole genome.
///
/// Everything is indexed by SV id, except `coverage_counts` which uses the `3N` coverage
/// region id space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub read_counts: Vec<ReadCount>,
    pub junction_counts: Vec<JunctionCount>,
    pub spanning_counts: Vec<SpanningCount>,
    pub coverage_counts: Vec<CoverageCount>,
    pub ref_aligned_read_count: Vec<u64>,
    pub ref_aligned_span_count: Vec<u64>,
}

impl Stats {
    /// Create empty accumulators for `n` SVs.
    pub fn new(n: usize) -> Self {
        Stats {
            read_counts: vec![ReadCount::default(); n],
            junction_counts: vec![JunctionCount::default(); n],
            spanning_counts: vec![SpanningCount::default(); n],
            coverage_counts: vec![CoverageCount::default(); 3 * n],
            ref_aligned_read_count: vec![0; n],
            ref_aligned_span_count: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.read_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_counts.is_empty()
    }

    /// Merge per-contig evidence into one result by summing counters and concatenating
    /// quality lists index-wise. The result does not depend on the order of `parts`
    /// (up to the order of quality values).
    pub fn merge<I: IntoIterator<Item = Stats>>(parts: I, n: usize) -> Self {
        parts.into_iter().fold(Stats::new(n), |mut merged, part| {
            merged += &part;
            merged
        })
    }

    /// Count a reference supporting observation for the given SV. Only every second one
    /// (the 1st, 3rd, ...) is accepted, compensating the excess of reads confirming the
    /// reference.
    pub(crate) fn accept_ref_read(&mut self, sv_id: usize) -> bool {
        self.ref_aligned_read_count[sv_id] += 1;
        self.ref_aligned_read_count[sv_id] % 2 == 1
    }

    /// Same as `accept_ref_read`, for spanning pairs.
    pub(crate) fn accept_ref_span(&mut self, sv_id: usize) -> bool {
        self.ref_aligned_span_count[sv_id] += 1;
        self.ref_aligned_span_count[sv_id] % 2 == 1
    }

    /// Derive the read counts of each SV from base pair coverage (small SVs) or fragment
    /// coverage (large SVs) of its core and control regions.
    pub(crate) fn compute_read_counts(&mut self, svs: &[SvCandidate], min_indel_size: i64) {
        let n = svs.len();
        for sv in svs {
            let id = sv.id();
            let count = |coverage: &CoverageCount| {
                if sv.size() <= min_indel_size {
                    coverage.bases
                } else {
                    coverage.fragments
                }
            };
            self.read_counts[id] = ReadCount {
                total: count(&self.coverage_counts[id]),
                left: count(&self.coverage_counts[n + id]),
                right: count(&self.coverage_counts[2 * n + id]),
            };
        }
    }
}

impl AddAssign<&Stats> for Stats {
    fn add_assign(&mut self, other: &Stats) {
        assert_eq!(
            self.len(),
            other.len(),
            "bug: merged evidence has to cover the same SVs"
        );
        for (a, b) in self.read_counts.iter_mut().zip(&other.read_counts) {
            *a += b;
        }
        for (a, b) in self.junction_counts.iter_mut().zip(&other.junction_counts) {
            *a += b;
        }
        for (a, b) in self.spanning_counts.iter_mut().zip(&other.spanning_counts) {
            *a += b;
        }
        for (a, b) in self.coverage_counts.iter_mut().zip(&other.coverage_counts) {
            *a += b;
        }
        for (a, b) in self
            .ref_aligned_read_count
            .iter_mut()
            .zip(&other.ref_aligned_read_count)
        {
            *a += b;
        }
        for (a, b) in self
            .ref_aligned_span_count
            .iter_mut()
            .zip(&other.ref_aligned_span_count)
        {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use itertools::Itertools;

    use crate::variants::SvType;

    fn part(seed: u64) -> Stats {
        let mut stats = Stats::new(2);
        stats.read_counts[0].total = seed;
        stats.read_counts[1].left = seed * 2;
        stats.junction_counts[1].push_alt(seed as u8, Some(Haplotype::First));
        stats.junction_counts[0].push_ref(seed as u8 + 1, None);
        stats.spanning_counts[1].push_ref(seed as u8 + 2, Some(Haplotype::Second));
        stats.coverage_counts[5].bases = seed * 3;
        stats.coverage_counts[2].fragments = seed;
        stats.ref_aligned_read_count[0] = seed;
        stats.ref_aligned_span_count[1] = seed + 1;
        stats
    }

    fn normalized(mut stats: Stats) -> Stats {
        for count in stats
            .junction_counts
            .iter_mut()
            .chain(stats.spanning_counts.iter_mut())
        {
            count.alt_quals.sort();
            count.ref_quals.sort();
        }
        stats
    }

    #[test]
    fn test_merge_is_order_independent() {
        let parts = vec![part(1), part(5), part(11)];
        let expected = normalized(Stats::merge(parts.clone(), 2));

        for permutation in parts.iter().cloned().permutations(3) {
            assert_eq!(normalized(Stats::merge(permutation, 2)), expected);
        }

        // grouping
        let ab = Stats::merge(vec![part(1), part(5)], 2);
        let grouped = Stats::merge(vec![ab, part(11)], 2);
        assert_eq!(normalized(grouped), expected);

        assert_eq!(expected.read_counts[0].total, 17);
        assert_eq!(expected.read_counts[1].left, 34);
        assert_eq!(expected.junction_counts[1].alt_h1, 3);
        assert_eq!(expected.junction_counts[1].alt_quals, vec![1, 5, 11]);
        assert_eq!(expected.spanning_counts[1].ref_h2, 3);
        assert_eq!(expected.coverage_counts[5].bases, 51);
        assert_eq!(expected.ref_aligned_span_count[1], 20);
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(Stats::merge(Vec::new(), 3), Stats::new(3));
    }

    #[test]
    fn test_ref_bias_alternation() {
        let mut stats = Stats::new(1);
        let accepted: Vec<_> = (0..7).map(|_| stats.accept_ref_read(0)).collect();
        assert_eq!(
            accepted,
            vec![true, false, true, false, true, false, true]
        );
        assert_eq!(accepted.iter().filter(|a| **a).count(), 4);

        let accepted = (0..6).filter(|_| stats.accept_ref_span(0)).count();
        assert_eq!(accepted, 3);
    }

    #[test]
    fn test_compute_read_counts() {
        let mut svs = vec![
            SvCandidate::new(0, 0, 0, 100, 300, SvType::Deletion, true, 1, vec![], vec![], vec![], vec![]),
            SvCandidate::new(1, 0, 0, 100, 5100, SvType::Deletion, true, 1, vec![], vec![], vec![], vec![]),
        ];
        for sv in &mut svs {
            sv.annotate_size();
        }
        let mut stats = Stats::new(2);
        for (i, coverage) in stats.coverage_counts.iter_mut().enumerate() {
            coverage.bases = 100 + i as u64;
            coverage.fragments = i as u64;
        }
        stats.compute_read_counts(&svs, 500);

        assert_eq!(
            stats.read_counts[0],
            ReadCount {
                total: 100,
                left: 102,
                right: 104
            }
        );
        assert_eq!(
            stats.read_counts[1],
            ReadCount {
                total: 1,
                left: 3,
                right: 5
            }
        );
    }
}
