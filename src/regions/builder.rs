use std::cmp;

use crate::regions::{
    BreakpointFlank, ContigRegions, CoverageRegion, EvidenceRegions, Interval, IntervalSet,
    SpanAnchor,
};
use crate::variants::SvCandidate;

/// Find maximal runs of masked (`N`/`n`) bases in a reference sequence.
pub fn find_n_regions(seq: &[u8]) -> IntervalSet {
    let mut intervals = Vec::new();
    let mut run_start = None;
    for (i, base) in seq.iter().enumerate() {
        match (run_start, *base == b'N' || *base == b'n') {
            (None, true) => run_start = Some(i as i64),
            (Some(start), false) => {
                intervals.push(Interval::new(start, i as i64 - 1));
                run_start = None;
            }
            _ => (),
        }
    }
    if let Some(start) = run_start {
        intervals.push(Interval::new(start, seq.len() as i64 - 1));
    }

    IntervalSet::new(intervals)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlSide {
    Left,
    Right,
}

/// Shift a control window `[start, end)` away from masked reference runs until it no longer
/// overlaps any of them. Left windows are moved to end where the run starts, right windows to
/// start right after the run ends, each keeping the given half size.
fn avoid_n_regions(
    mut start: i64,
    mut end: i64,
    half_size: i64,
    side: ControlSide,
    n_regions: &IntervalSet,
    contig_len: i64,
) -> (i64, i64) {
    // Every shift passes at least one distinct run, hence this bound is never exceeded
    // for a valid set.
    for _ in 0..=n_regions.len() {
        if end <= start {
            return (start, end);
        }
        match n_regions.first_overlap(start, end - 1) {
            None => return (start, end),
            Some(n_region) => match side {
                ControlSide::Left => {
                    end = n_region.start;
                    start = cmp::max(0, n_region.start - half_size);
                }
                ControlSide::Right => {
                    start = cmp::min(n_region.end + 1, contig_len);
                    end = cmp::min(contig_len, start + half_size);
                }
            },
        }
    }
    warn!(
        "Unable to place control window outside of masked reference bases after {} shifts, \
         using an empty window at {}.",
        n_regions.len() + 1,
        start
    );
    (start, start)
}

fn clip(start: i64, end: i64, contig_len: i64) -> (i64, i64) {
    let start = start.max(0).min(contig_len);
    let end = end.max(start).min(contig_len);
    (start, end)
}

/// Derives the coverage regions, breakpoint flanks and spanning anchors of all SVs.
#[derive(Debug)]
pub struct RegionBuilder {
    contigs: Vec<ContigRegions>,
    min_flank_size: i64,
}

impl RegionBuilder {
    /// Create a builder for contigs of the given lengths (indexed by target id).
    pub fn new(contig_lens: &[u64], min_flank_size: i64) -> Self {
        RegionBuilder {
            contigs: contig_lens
                .iter()
                .map(|len| ContigRegions {
                    len: *len as i64,
                    ..Default::default()
                })
                .collect(),
            min_flank_size,
        }
    }

    /// Register the masked reference runs of a contig.
    pub fn n_regions(mut self, tid: usize, n_regions: IntervalSet) -> Self {
        self.contigs[tid].n_regions = n_regions;
        self
    }

    fn add_coverage_regions(&mut self, sv: &SvCandidate, n_svs: usize) {
        let half_size = sv.half_size();
        let (len1, len2) = (self.contigs[sv.chr1()].len, self.contigs[sv.chr2()].len);

        let (start, end) = clip(sv.start() - half_size, sv.start(), len1);
        let (start, end) = avoid_n_regions(
            start,
            end,
            half_size,
            ControlSide::Left,
            &self.contigs[sv.chr1()].n_regions,
            len1,
        );
        self.contigs[sv.chr1()]
            .coverage
            .push(CoverageRegion::new(start, end, n_svs + sv.id()));

        let (start, end) = if sv.svtype().is_long_range() {
            clip(sv.start() - half_size, sv.start() + half_size, len1)
        } else {
            clip(sv.start(), sv.end(), len1)
        };
        self.contigs[sv.chr1()]
            .coverage
            .push(CoverageRegion::new(start, end, sv.id()));

        let (start, end) = clip(sv.end(), sv.end() + half_size, len2);
        let (start, end) = avoid_n_regions(
            start,
            end,
            half_size,
            ControlSide::Right,
            &self.contigs[sv.chr2()].n_regions,
            len2,
        );
        self.contigs[sv.chr2()]
            .coverage
            .push(CoverageRegion::new(start, end, 2 * n_svs + sv.id()));
    }

    fn add_flanks(&mut self, sv: &SvCandidate) {
        for &is_end_side in &[false, true] {
            let (tid, bp_pos) = if is_end_side {
                (sv.chr2(), sv.end())
            } else {
                (sv.chr1(), sv.start())
            };
            let contig = &mut self.contigs[tid];
            let (start, end) = clip(
                bp_pos - self.min_flank_size,
                bp_pos + self.min_flank_size,
                contig.len,
            );
            contig.flanks.push(BreakpointFlank::new(
                sv.id(),
                is_end_side,
                bp_pos,
                start,
                end,
                sv.svtype(),
            ));
        }
    }

    fn add_anchors(&mut self, sv: &SvCandidate) {
        self.contigs[sv.chr1()]
            .anchors
            .push(SpanAnchor::new(sv.start(), sv.svtype(), sv.id()));
        self.contigs[sv.chr2()]
            .anchors
            .push(SpanAnchor::new(sv.end(), sv.svtype(), sv.id()));
    }

    /// Build all evidence windows. Annotates the size of each SV on the way.
    pub fn build(mut self, svs: &mut [SvCandidate]) -> EvidenceRegions {
        let n_svs = svs.len();

        info!("Start extracting left/middle/right regions for each SV");
        for sv in svs.iter_mut() {
            sv.annotate_size();
            self.add_coverage_regions(sv, n_svs);
        }
        info!("Finish extracting left/middle/right regions for each SV");

        info!("Start extracting breakpoint regions of each precisely classified SV");
        for sv in svs.iter().filter(|sv| sv.precise()) {
            self.add_flanks(sv);
        }
        info!("Finish extracting breakpoint regions of each precisely classified SV");

        info!("Start extracting PE supported breakpoints of each SV");
        for sv in svs.iter().filter(|sv| sv.pe_support() > 0) {
            self.add_anchors(sv);
        }
        info!("Finish extracting PE supported breakpoints of each SV");

        for contig in &mut self.contigs {
            contig.coverage.sort();
            contig.max_coverage_len = contig
                .coverage
                .iter()
                .map(|region| region.len())
                .max()
                .unwrap_or(0);
            contig
                .flanks
                .sort_by_key(|flank| (flank.bp_pos, flank.sv_id, flank.is_end_side));
            contig
                .anchors
                .sort_by_key(|anchor| (anchor.bp_pos, anchor.sv_id));
        }

        EvidenceRegions {
            contigs: self.contigs,
        }
    }
}
