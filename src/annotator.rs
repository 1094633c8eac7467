// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Genome-wide evidence collection: setup, one worker per contig and reduction.

use std::cmp;
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rust_htslib::bam::{self, Read};

use crate::errors::Error;
use crate::options::Options;
use crate::reference;
use crate::regions::{find_n_regions, EvidenceRegions, RegionBuilder};
use crate::stats::pairs::SharedPairStates;
use crate::stats::{collect_contig_stats, Stats};
use crate::variants::SvCandidate;

/// Names and lengths of the contigs of an alignment file, indexed by target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contigs {
    pub names: Vec<String>,
    pub lens: Vec<u64>,
}

impl Contigs {
    pub fn from_bam_header(header: &bam::HeaderView) -> Self {
        let names = header
            .target_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        let lens = (0..header.target_count())
            .map(|tid| header.target_len(tid).unwrap_or(0))
            .collect();
        Contigs { names, lens }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn name(&self, tid: usize) -> String {
        self.names
            .get(tid)
            .cloned()
            .unwrap_or_else(|| tid.to_string())
    }
}

/// Check that SV ids are dense, that all contigs exist and that breakpoints are ordered.
pub fn validate_candidates(svs: &[SvCandidate], contigs: &Contigs) -> Result<(), Error> {
    for (index, sv) in svs.iter().enumerate() {
        if sv.id() != index {
            return Err(Error::NonDenseSvId { index, id: sv.id() });
        }
        for &tid in &[sv.chr1(), sv.chr2()] {
            if tid >= contigs.len() {
                return Err(Error::UnknownContig {
                    id: sv.id(),
                    contig: contigs.name(tid),
                });
            }
        }
        if !sv.svtype().is_long_range() && (sv.chr1() != sv.chr2() || sv.end() < sv.start()) {
            return Err(Error::InvalidSvInterval {
                id: sv.id(),
                start: sv.start(),
                end: sv.end(),
            });
        }
    }
    Ok(())
}

/// Build the evidence windows of all SVs, avoiding masked reference bases.
fn build_regions(
    options: &Options,
    svs: &mut [SvCandidate],
    contigs: &Contigs,
) -> Result<EvidenceRegions> {
    let sv_contigs: BTreeSet<usize> = svs
        .iter()
        .flat_map(|sv| vec![sv.chr1(), sv.chr2()])
        .collect();

    let mut builder = RegionBuilder::new(&contigs.lens, options.filter.min_flank_size);
    {
        let mut reference = reference::Buffer::from_path(&options.genome, 1)?;
        info!("Start gathering N regions of the reference genome");
        for tid in sv_contigs {
            let name = &contigs.names[tid];
            let expected = contigs.lens[tid];
            match reference.contig_len(name) {
                Some(found) if found != expected => {
                    return Err(Error::ReferenceLengthMismatch {
                        contig: name.clone(),
                        expected,
                        found,
                    }
                    .into());
                }
                _ => (),
            }
            let seq = reference.seq(name)?;
            let n_regions = find_n_regions(&seq);
            debug!("Found {} N regions on contig {}", n_regions.len(), name);
            builder = builder.n_regions(tid, n_regions);
        }
        info!("Finish gathering N regions of the reference genome");
    }

    Ok(builder.build(svs))
}

/// Collect read depth, junction and spanning evidence of all SV candidates.
///
/// Sizes of the candidates are annotated on the way. The haplotagged flag of the library in
/// `options` is set if any read carries a haplotype tag. Fails if any input can not be
/// read or if the candidates are inconsistent with the alignment file.
pub fn annotate_coverage(options: &Options, svs: &mut [SvCandidate]) -> Result<Stats> {
    if options.threads == 0 {
        return Err(Error::InvalidThreads.into());
    }
    let contigs = {
        let bam = bam::IndexedReader::from_path(&options.bam)
            .context("Unable to read BAM/CRAM file.")?;
        Contigs::from_bam_header(bam.header())
    };
    validate_candidates(svs, &contigs)?;

    let regions = build_regions(options, svs, &contigs)?;
    let tids = regions.evidence_contigs();
    let threads = cmp::max(1, cmp::min(options.threads, tids.len()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Unable to create thread pool.")?;
    info!(
        "Collecting evidence of {} SVs on {} contigs with {} threads",
        svs.len(),
        tids.len(),
        threads
    );

    let shared_pairs = SharedPairStates::default();
    let svs: &[SvCandidate] = svs;
    let parts = pool.install(|| {
        tids.par_iter()
            .map(|&tid| collect_contig_stats(options, svs, &regions, &shared_pairs, tid))
            .collect::<Result<Vec<_>>>()
    })?;
    debug!(
        "{} pairs with unseen mates on other contigs",
        shared_pairs.len()
    );

    Ok(Stats::merge(parts, svs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::variants::SvType;

    fn contigs() -> Contigs {
        Contigs {
            names: vec!["chr1".to_owned(), "chr2".to_owned()],
            lens: vec![1000, 500],
        }
    }

    fn sv(id: usize, chr2: usize, start: i64, end: i64, svtype: SvType) -> SvCandidate {
        SvCandidate::new(id, 0, chr2, start, end, svtype, false, 0, vec![], vec![], vec![], vec![])
    }

    #[test]
    fn test_validate_candidates() {
        let contigs = contigs();
        let svs = vec![
            sv(0, 0, 100, 200, SvType::Deletion),
            sv(1, 1, 100, 50, SvType::Translocation3to5),
        ];
        assert!(validate_candidates(&svs, &contigs).is_ok());

        let svs = vec![sv(1, 0, 100, 200, SvType::Deletion)];
        assert_eq!(
            validate_candidates(&svs, &contigs),
            Err(Error::NonDenseSvId { index: 0, id: 1 })
        );

        let svs = vec![sv(0, 2, 100, 200, SvType::Translocation3to3)];
        assert_eq!(
            validate_candidates(&svs, &contigs),
            Err(Error::UnknownContig {
                id: 0,
                contig: "2".to_owned()
            })
        );

        let svs = vec![sv(0, 0, 300, 200, SvType::Duplication)];
        assert_eq!(
            validate_candidates(&svs, &contigs),
            Err(Error::InvalidSvInterval {
                id: 0,
                start: 300,
                end: 200
            })
        );
    }
}
