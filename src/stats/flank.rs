// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Scoring of reads against the reference and alternative haplotype probes of a breakpoint.

use bio::alignment::pairwise::{Aligner, MatchParams, Scoring};
use bio::alignment::AlignmentOperation;

use crate::options::FlankScoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Allele {
    Ref,
    Alt,
}

/// Alignment of a read against one probe, with its score normalized by the score expected
/// for a read matching the probe at the configured flank quality.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProbeAlignment {
    pub(crate) score: f64,
    operations: Vec<AlignmentOperation>,
}

impl ProbeAlignment {
    /// Mean base quality of the read bases aligned to probe bases (gaps excluded).
    /// Returns `None` if no read base is aligned.
    pub(crate) fn quality(&self, read_quals: &[u8]) -> Option<u8> {
        let mut read_pos = 0;
        let mut qual_sum = 0u64;
        let mut aligned = 0u64;
        for op in &self.operations {
            match *op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    qual_sum += *read_quals.get(read_pos)? as u64;
                    aligned += 1;
                    read_pos += 1;
                }
                AlignmentOperation::Del => read_pos += 1,
                AlignmentOperation::Yclip(len) => read_pos += len,
                AlignmentOperation::Ins | AlignmentOperation::Xclip(_) => (),
            }
        }
        if aligned == 0 {
            None
        } else {
            Some((qual_sum / aligned) as u8)
        }
    }
}

/// Aligns reads (y) against breakpoint probes (x). The aligner owns its dynamic programming
/// matrices, hence each worker keeps its own instance.
pub(crate) struct ProbeAligner {
    aligner: Aligner<MatchParams>,
    match_score: i32,
    mismatch_score: i32,
    flank_quality: f64,
}

impl ProbeAligner {
    pub(crate) fn new(scoring: &FlankScoring, flank_quality: f64) -> Self {
        // bio scores a gap of length k as gap_open + k * gap_extend
        let mut bio_scoring = Scoring::from_scores(
            (scoring.gap_open - scoring.gap_extend).min(0),
            scoring.gap_extend.min(0),
            scoring.match_score,
            scoring.mismatch_score,
        );
        if scoring.read_end_gaps_free {
            bio_scoring = bio_scoring.yclip(0);
        }
        if scoring.probe_end_gaps_free {
            bio_scoring = bio_scoring.xclip(0);
        }
        ProbeAligner {
            aligner: Aligner::with_scoring(bio_scoring),
            match_score: scoring.match_score,
            mismatch_score: scoring.mismatch_score,
            flank_quality,
        }
    }

    /// Score expected for a read matching a probe of the given length at the flank quality.
    pub(crate) fn match_threshold(&self, probe_len: usize) -> i32 {
        let len = probe_len as f64;
        (self.flank_quality * len * self.match_score as f64
            + (1.0 - self.flank_quality) * len * self.mismatch_score as f64) as i32
    }

    /// Align a read against a probe. Returns `None` for probes that cannot be scored.
    pub(crate) fn align(&mut self, probe: &[u8], read: &[u8]) -> Option<ProbeAlignment> {
        let threshold = self.match_threshold(probe.len());
        if probe.is_empty() || read.is_empty() || threshold <= 0 {
            return None;
        }
        let alignment = self.aligner.custom(probe, read);
        Some(ProbeAlignment {
            score: alignment.score as f64 / threshold as f64,
            operations: alignment.operations,
        })
    }

    /// Decide which haplotype a read supports. Returns `None` if neither alignment reaches
    /// the expected score. Ties go to the reference.
    pub(crate) fn classify(
        &mut self,
        ref_probe: &[u8],
        alt_probe: &[u8],
        read: &[u8],
    ) -> Option<(Allele, ProbeAlignment)> {
        let alt = self.align(alt_probe, read);
        let reference = self.align(ref_probe, read);
        let score = |alignment: &Option<ProbeAlignment>| {
            alignment.as_ref().map_or(f64::NEG_INFINITY, |aln| aln.score)
        };
        let (score_alt, score_ref) = (score(&alt), score(&reference));

        if score_ref <= 1.0 && score_alt <= 1.0 {
            None
        } else if score_ref >= score_alt {
            reference.map(|aln| (Allele::Ref, aln))
        } else {
            alt.map(|aln| (Allele::Alt, aln))
        }
    }
}
