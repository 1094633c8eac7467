// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Estimation of the insert size distribution of a paired-end library.

use std::cmp;
use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};
use statrs::statistics::{Data, OrderStatistics};

use crate::errors::Error;
use crate::options::LibraryInfo;
use crate::stats::pairs::pair_sv_type;
use crate::variants::SvType;

/// Number of MADs around the median that are considered a normal insert size.
pub const NORMAL_ISIZE_MADS: f64 = 5.0;
pub const DEFAULT_MAD_CUTOFF: f64 = 9.0;
pub const DEFAULT_NUM_PAIRS: usize = 1_000_000;
const MIN_ISIZE_CUTOFF: i64 = 500;

/// Whether the record is the first mate of a properly oriented pair on one contig.
fn is_usable(record: &bam::Record) -> bool {
    record.is_paired()
        && record.is_first_in_template()
        && !(record.is_secondary()
            || record.is_supplementary()
            || record.is_duplicate()
            || record.is_quality_check_failed()
            || record.is_unmapped()
            || record.is_mate_unmapped())
        && record.mapq() > 0
        && record.tid() == record.mtid()
        && record.insert_size() != 0
        && pair_sv_type(record) == SvType::Deletion
}

fn median(values: Vec<f64>) -> f64 {
    Data::new(values).median()
}

impl LibraryInfo {
    /// Derive library properties from the given insert sizes. Returns `None` if there are
    /// no insert sizes.
    pub(crate) fn from_insert_sizes(
        read_len: i64,
        insert_sizes: Vec<f64>,
        mad_cutoff: f64,
    ) -> Option<Self> {
        if insert_sizes.is_empty() {
            return None;
        }
        let m = median(insert_sizes.clone());
        let mad = median(insert_sizes.iter().map(|isize| (isize - m).abs()).collect());

        let min_normal = cmp::max(0, (m - NORMAL_ISIZE_MADS * mad) as i64);
        let max_normal = (m + NORMAL_ISIZE_MADS * mad) as i64;
        let max_cutoff = *[(m + mad_cutoff * mad) as i64, 2 * read_len, MIN_ISIZE_CUTOFF]
            .iter()
            .max()
            .unwrap_or(&MIN_ISIZE_CUTOFF);

        Some(LibraryInfo::new(
            read_len,
            m as i64,
            mad as i64,
            min_normal,
            max_normal,
            max_cutoff,
        ))
    }

    /// Estimate library properties from the first `num_pairs` usable pairs of a BAM file.
    pub fn estimate<P: AsRef<Path>>(path: P, num_pairs: usize, mad_cutoff: f64) -> Result<Self> {
        let mut bam = bam::Reader::from_path(path.as_ref()).context("Unable to read BAM/CRAM file.")?;
        let mut read_len = 0;
        let mut insert_sizes = Vec::new();
        let mut record = bam::Record::new();
        while insert_sizes.len() < num_pairs {
            match bam.read(&mut record) {
                None => break,
                Some(result) => result.context("Error reading BAM/CRAM record.")?,
            }
            read_len = cmp::max(read_len, record.seq_len() as i64);
            if is_usable(&record) {
                insert_sizes.push(record.insert_size().abs() as f64);
            }
        }
        debug!(
            "Estimating library properties from {} pairs.",
            insert_sizes.len()
        );

        let library = LibraryInfo::from_insert_sizes(read_len, insert_sizes, mad_cutoff)
            .ok_or_else(|| Error::NoProperPairs {
                path: path.as_ref().to_owned(),
            })?;
        info!(
            "Library: read length {}, median insert size {}, MAD {}, normal range [{}, {}], cutoff {}.",
            library.read_len,
            library.median,
            library.mad,
            library.min_normal_isize,
            library.max_normal_isize,
            library.max_isize_cutoff
        );
        Ok(library)
    }
}
