// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Coverage regions, breakpoint flanks and spanning anchors of SV candidates.

use crate::variants::SvType;

pub mod builder;
pub mod interval;

pub use builder::{find_n_regions, RegionBuilder};
pub use interval::{Interval, IntervalSet};

/// Half-open window `[start, end)` accumulating base pair and fragment counts.
///
/// Ids live in a `3N` space: `id` is the core region of SV `id`, `N + id` its left and
/// `2N + id` its right control region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, new)]
pub struct CoverageRegion {
    pub start: i64,
    pub end: i64,
    pub id: usize,
}

impl CoverageRegion {
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// Window of `2 × min_flank_size` around one breakpoint of a precise SV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct BreakpointFlank {
    pub sv_id: usize,
    pub is_end_side: bool,
    pub bp_pos: i64,
    pub start: i64,
    pub end: i64,
    pub svtype: SvType,
}

/// Breakpoint of an SV with paired-end support, used for spanning pair attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct SpanAnchor {
    pub bp_pos: i64,
    pub svtype: SvType,
    pub sv_id: usize,
}

/// All sorted evidence windows of one contig.
#[derive(Debug, Clone, Default)]
pub struct ContigRegions {
    pub(crate) len: i64,
    pub(crate) coverage: Vec<CoverageRegion>,
    pub(crate) max_coverage_len: i64,
    pub(crate) flanks: Vec<BreakpointFlank>,
    pub(crate) anchors: Vec<SpanAnchor>,
    pub(crate) n_regions: IntervalSet,
}

impl ContigRegions {
    pub fn len(&self) -> i64 {
        self.len
    }

    pub fn coverage(&self) -> &[CoverageRegion] {
        &self.coverage
    }

    pub fn flanks(&self) -> &[BreakpointFlank] {
        &self.flanks
    }

    pub fn anchors(&self) -> &[SpanAnchor] {
        &self.anchors
    }

    pub fn n_regions(&self) -> &IntervalSet {
        &self.n_regions
    }

    /// Whether this contig carries any evidence window.
    pub fn has_evidence(&self) -> bool {
        !self.coverage.is_empty() || !self.flanks.is_empty() || !self.anchors.is_empty()
    }

    /// Coverage regions overlapping the half-open interval `[start, end)`.
    pub(crate) fn coverage_overlapping(
        &self,
        start: i64,
        end: i64,
    ) -> impl Iterator<Item = &CoverageRegion> {
        let first = self
            .coverage
            .partition_point(|region| region.start < start - self.max_coverage_len);
        self.coverage[first..]
            .iter()
            .take_while(move |region| region.start < end)
            .filter(move |region| region.end > start)
    }

    /// First coverage region (in sort order) containing `pos`.
    pub(crate) fn first_coverage_containing(&self, pos: i64) -> Option<&CoverageRegion> {
        let first = self
            .coverage
            .partition_point(|region| region.start < pos - self.max_coverage_len);
        self.coverage[first..]
            .iter()
            .take_while(|region| region.start <= pos)
            .find(|region| region.contains(pos))
    }

    /// Flanks with breakpoint in `[start, end]`, ordered by breakpoint.
    pub(crate) fn flanks_between(&self, start: i64, end: i64) -> &[BreakpointFlank] {
        let first = self.flanks.partition_point(|flank| flank.bp_pos < start);
        let last = self.flanks.partition_point(|flank| flank.bp_pos <= end);
        &self.flanks[first..last.max(first)]
    }

    /// Spanning anchors with breakpoint in `[start, end]`, ordered by breakpoint.
    pub(crate) fn anchors_between(&self, start: i64, end: i64) -> &[SpanAnchor] {
        let first = self.anchors.partition_point(|anchor| anchor.bp_pos < start);
        let last = self.anchors.partition_point(|anchor| anchor.bp_pos <= end);
        &self.anchors[first..last.max(first)]
    }
}

/// Evidence windows of the whole genome, indexed by target id. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct EvidenceRegions {
    pub(crate) contigs: Vec<ContigRegions>,
}

impl EvidenceRegions {
    pub fn contig(&self, tid: usize) -> &ContigRegions {
        &self.contigs[tid]
    }

    pub fn contigs(&self) -> &[ContigRegions] {
        &self.contigs
    }

    /// Target ids of contigs that carry evidence windows.
    pub fn evidence_contigs(&self) -> Vec<usize> {
        self.contigs
            .iter()
            .enumerate()
            .filter(|(_, contig)| contig.has_evidence())
            .map(|(tid, _)| tid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contig() -> ContigRegions {
        ContigRegions {
            len: 1000,
            coverage: vec![
                CoverageRegion::new(0, 100, 3),
                CoverageRegion::new(50, 60, 1),
                CoverageRegion::new(100, 400, 0),
                CoverageRegion::new(400, 500, 6),
            ],
            max_coverage_len: 300,
            flanks: vec![
                BreakpointFlank::new(0, false, 100, 87, 113, SvType::Deletion),
                BreakpointFlank::new(0, true, 400, 387, 413, SvType::Deletion),
            ],
            anchors: vec![
                SpanAnchor::new(100, SvType::Deletion, 0),
                SpanAnchor::new(400, SvType::Deletion, 0),
            ],
            n_regions: IntervalSet::default(),
        }
    }

    #[test]
    fn test_coverage_overlapping() {
        let contig = contig();
        let ids: Vec<_> = contig.coverage_overlapping(55, 120).map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 0]);
        let ids: Vec<_> = contig.coverage_overlapping(450, 460).map(|r| r.id).collect();
        assert_eq!(ids, vec![6]);
        assert_eq!(contig.coverage_overlapping(500, 600).count(), 0);
    }

    #[test]
    fn test_first_coverage_containing() {
        let contig = contig();
        assert_eq!(contig.first_coverage_containing(55).map(|r| r.id), Some(3));
        assert_eq!(contig.first_coverage_containing(100).map(|r| r.id), Some(0));
        assert_eq!(contig.first_coverage_containing(499).map(|r| r.id), Some(6));
        assert_eq!(contig.first_coverage_containing(500), None);
    }

    #[test]
    fn test_breakpoint_lookup() {
        let contig = contig();
        assert_eq!(contig.flanks_between(90, 150).len(), 1);
        assert_eq!(contig.flanks_between(100, 400).len(), 2);
        assert!(contig.flanks_between(101, 399).is_empty());
        assert_eq!(contig.anchors_between(400, 400)[0].bp_pos, 400);
    }
}
