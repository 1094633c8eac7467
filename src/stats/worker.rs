// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp;
use std::collections::HashMap;

use anyhow::{Context, Result};
use bv::BitVec;
use rust_htslib::bam::record::Cigar;
use rust_htslib::bam::{self, FetchDefinition, Read};

use crate::options::Options;
use crate::regions::{BreakpointFlank, ContigRegions, EvidenceRegions};
use crate::stats::flank::{Allele, ProbeAligner};
use crate::stats::pairs::{self, PairState, PositionDedup, SharedPairStates};
use crate::stats::{Haplotype, Stats};
use crate::variants::{adjust_orientation, SvCandidate, SvType};

/// Clipping of a read alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Clipping {
    has_soft_clip: bool,
    has_clip: bool,
    leading_soft_clip: i64,
}

/// Whether a read may be used to score a breakpoint. Soft clipped reads are always
/// considered, unclipped reads only if they cover `min_flank_size` bases on both sides.
pub(crate) fn covers_flank(
    pos: i64,
    query_len: i64,
    bp_pos: i64,
    min_flank_size: i64,
    has_soft_clip: bool,
    has_clip: bool,
) -> bool {
    has_soft_clip
        || (!has_clip && pos + min_flank_size <= bp_pos && pos + query_len >= bp_pos + min_flank_size)
}

fn any_flagged(mask: &BitVec, start: i64, end: i64) -> bool {
    let end = cmp::min(end, mask.len() as i64);
    (cmp::max(start, 0)..end).any(|i| mask.get(i as u64))
}

/// Collects the evidence of all SVs from the alignments of one contig.
///
/// Apart from `SharedPairStates`, all state is owned by the worker.
pub struct ContigStatsWorker<'a> {
    options: &'a Options,
    svs: &'a [SvCandidate],
    contig: &'a ContigRegions,
    regions: &'a EvidenceRegions,
    shared_pairs: &'a SharedPairStates,
    aligner: ProbeAligner,
    breakpoint_mask: BitVec,
    span_mask: BitVec,
    local_pairs: HashMap<u64, PairState>,
    dedup: PositionDedup,
    stats: Stats,
}

impl<'a> ContigStatsWorker<'a> {
    pub fn new(
        tid: usize,
        options: &'a Options,
        svs: &'a [SvCandidate],
        regions: &'a EvidenceRegions,
        shared_pairs: &'a SharedPairStates,
    ) -> Self {
        let contig = regions.contig(tid);
        let len = cmp::max(contig.len(), 0) as u64;

        let mut breakpoint_mask: BitVec = BitVec::new_fill(false, len);
        for flank in contig.flanks() {
            for i in cmp::max(flank.start, 0)..cmp::min(flank.end, len as i64) {
                breakpoint_mask.set(i as u64, true);
            }
        }
        let mut span_mask: BitVec = BitVec::new_fill(false, len);
        for anchor in contig.anchors() {
            if anchor.bp_pos >= 0 && anchor.bp_pos < len as i64 {
                span_mask.set(anchor.bp_pos as u64, true);
            }
        }

        ContigStatsWorker {
            options,
            svs,
            contig,
            regions,
            shared_pairs,
            aligner: ProbeAligner::new(&options.flank_scoring, options.filter.flank_quality),
            breakpoint_mask,
            span_mask,
            local_pairs: HashMap::new(),
            dedup: PositionDedup::default(),
            stats: Stats::new(svs.len()),
        }
    }

    fn is_skipped(&self, record: &bam::Record) -> bool {
        record.is_secondary()
            || record.is_quality_check_failed()
            || record.is_duplicate()
            || record.is_supplementary()
            || record.is_unmapped()
            || record.is_mate_unmapped()
            || record.mapq() < self.options.filter.min_geno_qual
    }

    /// Haplotype of the read, flagging the library as haplotagged if a tag is present.
    fn haplotype(&self, record: &bam::Record) -> Option<Haplotype> {
        let haplotype = pairs::haplotype_tag(record);
        if haplotype.is_some() {
            self.options.library.mark_haplotagged();
        }
        haplotype
    }

    /// Add the aligned blocks of the read to all overlapping coverage regions.
    fn count_bases(&mut self, record: &bam::Record) -> Clipping {
        let mut clipping = Clipping::default();
        let mut ref_pos = record.pos();
        for op in record.cigar().iter() {
            match *op {
                Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                    let block_end = ref_pos + len as i64;
                    for region in self.contig.coverage_overlapping(ref_pos, block_end) {
                        self.stats.coverage_counts[region.id].bases += len as u64;
                    }
                    ref_pos = block_end;
                }
                Cigar::Del(len) | Cigar::RefSkip(len) => ref_pos += len as i64,
                Cigar::SoftClip(len) => {
                    clipping.has_soft_clip = true;
                    clipping.has_clip = true;
                    // clipped before any reference base, e.g. 5H10S30M
                    if ref_pos == record.pos() {
                        clipping.leading_soft_clip += len as i64;
                    }
                }
                Cigar::HardClip(_) => clipping.has_clip = true,
                Cigar::Ins(_) | Cigar::Pad(_) => (),
            }
        }
        clipping
    }

    fn score_junctions(&mut self, record: &bam::Record, clipping: Clipping) {
        let min_flank_size = self.options.filter.min_flank_size;
        let query_len = record.seq_len() as i64;
        if query_len <= 2 * min_flank_size {
            return;
        }
        let pos = record.pos();
        let read_start = cmp::max(0, pos - clipping.leading_soft_clip);
        let read_end = pos + query_len;
        if !any_flagged(&self.breakpoint_mask, read_start, read_end) {
            return;
        }

        let contig = self.contig;
        let flanks = contig
            .flanks_between(read_start, read_end)
            .iter()
            .filter(|flank| {
                covers_flank(
                    pos,
                    query_len,
                    flank.bp_pos,
                    min_flank_size,
                    clipping.has_soft_clip,
                    clipping.has_clip,
                )
            });
        let seq = record.seq().as_bytes();
        for flank in flanks {
            let (read_seq, read_qual) = adjust_orientation(
                seq.clone(),
                record.qual().to_vec(),
                flank.is_end_side,
                flank.svtype,
            );
            self.score_junction(record, flank, &read_seq, &read_qual);
        }
    }

    fn score_junction(
        &mut self,
        record: &bam::Record,
        flank: &BreakpointFlank,
        read_seq: &[u8],
        read_qual: &[u8],
    ) {
        let svs = self.svs;
        let sv = &svs[flank.sv_id];
        let (ref_probe, alt_probe) = sv.probes(flank.is_end_side);
        let (allele, alignment) = match self.aligner.classify(ref_probe, alt_probe, read_seq) {
            Some(result) => result,
            None => return,
        };
        if allele == Allele::Ref && !self.stats.accept_ref_read(flank.sv_id) {
            return;
        }
        let qual = match alignment.quality(read_qual) {
            Some(qual) if qual >= self.options.filter.min_geno_qual => cmp::min(qual, record.mapq()),
            _ => return,
        };
        let haplotype = self.haplotype(record);
        let count = &mut self.stats.junction_counts[flank.sv_id];
        match allele {
            Allele::Ref => count.push_ref(qual, haplotype),
            Allele::Alt => count.push_alt(qual, haplotype),
        }
    }

    fn count_pair(&mut self, record: &bam::Record, clipping: Clipping) {
        if !record.is_paired() || record.mtid() < 0 {
            return;
        }
        let mate_has_coverage = self
            .regions
            .contigs()
            .get(record.mtid() as usize)
            .map_or(false, |contig| !contig.coverage().is_empty());
        if !mate_has_coverage {
            return;
        }

        let same_contig = record.tid() == record.mtid();
        if self.dedup.is_first_in_pair(record) {
            let state = PairState::new(record.mapq(), clipping.has_soft_clip);
            let key = pairs::pair_key(record);
            if same_contig {
                self.local_pairs.insert(key, state);
            } else {
                self.shared_pairs.insert(key, state);
            }
            return;
        }

        let key = pairs::mate_pair_key(record);
        let mate = if same_contig {
            self.local_pairs.remove(&key)
        } else {
            self.shared_pairs.take(key)
        };
        let mate = match mate {
            Some(mate) => mate,
            None => return,
        };
        let pair_qual = cmp::min(mate.mapq, record.mapq());
        let pair_clip = mate.has_soft_clip || clipping.has_soft_clip;
        if pair_qual < self.options.filter.min_geno_qual {
            return;
        }

        if same_contig {
            let midpoint = record.pos() + (record.cigar().end_pos() - record.pos()) / 2;
            if let Some(region) = self.contig.first_coverage_containing(midpoint) {
                self.stats.coverage_counts[region.id].fragments += 1;
            }
        }

        let outer_isize = record.pos() + record.seq_len() as i64 - record.mpos();
        let is_normal = pairs::pair_sv_type(record) == SvType::Deletion
            && self.options.library.is_normal_isize(outer_isize)
            && same_contig;
        if is_normal {
            if !pair_clip {
                self.count_normal_span(record, outer_isize, pair_qual);
            }
        } else {
            self.count_discordant_span(record, outer_isize, pair_qual);
        }
    }

    /// A normal pair supports the reference at every anchor within the inner 80% of its span.
    fn count_normal_span(&mut self, record: &bam::Record, outer_isize: i64, pair_qual: u8) {
        let start = record.mpos() + (0.1 * outer_isize as f64) as i64;
        let end = start + (0.8 * outer_isize as f64) as i64;
        if !any_flagged(&self.span_mask, start, end) {
            return;
        }
        let contig = self.contig;
        for anchor in contig.anchors_between(start, end) {
            if self.stats.accept_ref_span(anchor.sv_id) {
                let haplotype = self.haplotype(record);
                self.stats.spanning_counts[anchor.sv_id].push_ref(pair_qual, haplotype);
            }
        }
    }

    /// A discordant pair supports the alternative allele at anchors of its SV type that lie
    /// in the direction of the mate, at most one normal insert size away.
    fn count_discordant_span(&mut self, record: &bam::Record, outer_isize: i64, pair_qual: u8) {
        let svtype = match pairs::classify_discordant(record, pair_qual, outer_isize, self.options)
        {
            Some(svtype) => svtype,
            None => return,
        };
        let max_normal = self.options.library.max_normal_isize;
        let len = self.contig.len();
        let (start, end) = if record.is_reverse() {
            let read_end = record.pos() + record.seq_len() as i64;
            (cmp::max(0, read_end - max_normal), cmp::min(read_end, len))
        } else {
            (record.pos(), cmp::min(record.pos() + max_normal, len))
        };
        if !any_flagged(&self.span_mask, start, end) {
            return;
        }
        let contig = self.contig;
        for anchor in contig
            .anchors_between(start, end)
            .iter()
            .filter(|anchor| anchor.svtype == svtype)
        {
            let haplotype = self.haplotype(record);
            self.stats.spanning_counts[anchor.sv_id].push_alt(pair_qual, haplotype);
        }
    }

    /// Account a single alignment record of this contig.
    pub fn process(&mut self, record: &bam::Record) {
        if self.is_skipped(record) {
            return;
        }
        let clipping = self.count_bases(record);
        self.score_junctions(record, clipping);
        self.count_pair(record, clipping);
    }

    /// Finish the scan and derive the read counts of all SVs.
    pub fn finish(mut self) -> Stats {
        self.stats
            .compute_read_counts(self.svs, self.options.filter.min_indel_size);
        self.stats
    }
}

/// Collect the evidence of all SVs from the alignments of contig `tid`, using a BAM reader
/// of its own.
pub fn collect_contig_stats(
    options: &Options,
    svs: &[SvCandidate],
    regions: &EvidenceRegions,
    shared_pairs: &SharedPairStates,
    tid: usize,
) -> Result<Stats> {
    let mut bam =
        bam::IndexedReader::from_path(&options.bam).context("Unable to read BAM/CRAM file.")?;
    let contig_name = String::from_utf8_lossy(bam.header().tid2name(tid as u32)).into_owned();
    info!(
        "Start gathering coverage information on contig: {}",
        contig_name
    );
    bam.fetch(FetchDefinition::CompleteTid(tid as i32))
        .with_context(|| format!("Unable to fetch contig {} from BAM/CRAM file.", contig_name))?;

    let mut worker = ContigStatsWorker::new(tid, options, svs, regions, shared_pairs);
    let mut record = bam::Record::new();
    while let Some(result) = bam.read(&mut record) {
        result.with_context(|| format!("Error reading BAM/CRAM record on contig {}.", contig_name))?;
        worker.process(&record);
    }
    info!(
        "Finish gathering coverage information on contig: {}",
        contig_name
    );

    Ok(worker.finish())
}
