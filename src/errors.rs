// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid SV type code {code}, must be in 0..=8")]
    InvalidSvType { code: u8 },
    #[error("invalid SV class '{value}', must be one of INV, DEL, DUP, INS, BND")]
    InvalidSvClass { value: String },
    #[error("SV candidate at index {index} has id {id}; ids must be dense and ordered (0..N)")]
    NonDenseSvId { index: usize, id: usize },
    #[error("SV candidate {id} refers to contig {contig} that is not present in the BAM header")]
    UnknownContig { id: usize, contig: String },
    #[error("SV candidate {id} has end {end} before start {start}")]
    InvalidSvInterval { id: usize, start: i64, end: i64 },
    #[error("reference sequence {contig} has length {found}, but the BAM header states {expected}")]
    ReferenceLengthMismatch {
        contig: String,
        expected: u64,
        found: u64,
    },
    #[error("unable to estimate library properties: no proper pairs found in {path}")]
    NoProperPairs { path: PathBuf },
    #[error("number of threads must be at least 1")]
    InvalidThreads,
}
