// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use strum::IntoEnumIterator;

use crate::variants::{SvClass, SvType};

/// Thresholds applied to reads, pairs and breakpoint flanks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Minimal mapping quality of reads and pairs used for genotyping.
    pub min_geno_qual: u8,
    /// Minimal number of aligned bases required on each side of a breakpoint.
    pub min_flank_size: i64,
    /// Expected identity of a read aligned against a breakpoint probe.
    pub flank_quality: f64,
    /// SVs up to this size are genotyped from base pair coverage, larger ones from fragments.
    pub min_indel_size: i64,
    /// Minimal pair quality of discordant pairs between contigs.
    pub min_tra_qual: u8,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            min_geno_qual: 5,
            min_flank_size: 13,
            flank_quality: 0.95,
            min_indel_size: 500,
            min_tra_qual: 20,
        }
    }
}

/// Scoring of read against breakpoint probe alignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlankScoring {
    pub match_score: i32,
    pub mismatch_score: i32,
    /// Score of the first base of a gap.
    pub gap_open: i32,
    /// Score of each further base of a gap.
    pub gap_extend: i32,
    /// Do not penalize leading and trailing read bases that overhang the probe.
    pub read_end_gaps_free: bool,
    /// Do not penalize leading and trailing probe bases not covered by the read.
    pub probe_end_gaps_free: bool,
}

impl Default for FlankScoring {
    fn default() -> Self {
        FlankScoring {
            match_score: 5,
            mismatch_score: -4,
            gap_open: -4,
            gap_extend: -4,
            read_end_gaps_free: true,
            probe_end_gaps_free: false,
        }
    }
}

/// Insert size properties of the sequencing library.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryInfo {
    pub read_len: i64,
    pub median: i64,
    /// Median absolute deviation of the insert size.
    pub mad: i64,
    pub min_normal_isize: i64,
    pub max_normal_isize: i64,
    pub max_isize_cutoff: i64,
    /// Set by any worker that encounters a haplotype (HP) tag.
    #[serde(skip)]
    haplotagged: AtomicBool,
}

impl LibraryInfo {
    pub fn new(
        read_len: i64,
        median: i64,
        mad: i64,
        min_normal_isize: i64,
        max_normal_isize: i64,
        max_isize_cutoff: i64,
    ) -> Self {
        LibraryInfo {
            read_len,
            median,
            mad,
            min_normal_isize,
            max_normal_isize,
            max_isize_cutoff,
            haplotagged: AtomicBool::new(false),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = File::open(path.as_ref()).with_context(|| {
            format!("Unable to read library properties from {}.", path.as_ref().display())
        })?;
        Ok(serde_json::from_reader(reader)?)
    }

    pub(crate) fn mark_haplotagged(&self) {
        self.haplotagged.store(true, Ordering::Relaxed);
    }

    /// Whether any read carrying a haplotype tag has been seen.
    pub fn is_haplotagged(&self) -> bool {
        self.haplotagged.load(Ordering::Relaxed)
    }

    pub(crate) fn is_normal_isize(&self, isize: i64) -> bool {
        isize >= self.min_normal_isize && isize <= self.max_normal_isize
    }
}

/// All settings of a coverage annotation run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub bam: PathBuf,
    pub genome: PathBuf,
    pub threads: usize,
    pub sv_classes: BTreeSet<SvClass>,
    pub filter: FilterOptions,
    pub flank_scoring: FlankScoring,
    pub library: LibraryInfo,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bam: PathBuf::new(),
            genome: PathBuf::new(),
            threads: 1,
            sv_classes: SvClass::iter().collect(),
            filter: FilterOptions::default(),
            flank_scoring: FlankScoring::default(),
            library: LibraryInfo::default(),
        }
    }
}

impl Options {
    /// Load options from a YAML (or JSON) file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = File::open(path.as_ref())
            .with_context(|| format!("Unable to read options from {}.", path.as_ref().display()))?;
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Invalid options in {}.", path.as_ref().display()))
    }

    pub(crate) fn is_enabled(&self, svtype: SvType) -> bool {
        self.sv_classes.contains(&svtype.class())
    }
}
