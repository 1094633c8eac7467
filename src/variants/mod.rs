// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use bio::alphabets::dna;

use crate::errors::Error;

pub mod candidates;

/// Size assigned to SVs whose second breakpoint is unresolved (breakends).
/// Such SVs are always genotyped from fragment counts.
pub const UNBOUNDED_SV_SIZE: i64 = i64::MAX;

/// Half width of the coverage windows of long-range SVs.
pub const LONG_RANGE_HALF_SIZE: i64 = 500;

/// Orientation-aware SV type, encoded with the numeric codes 0..=8.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SvType {
    #[strum(serialize = "INV3to3")]
    Inversion3to3,
    #[strum(serialize = "INV5to5")]
    Inversion5to5,
    #[strum(serialize = "DEL")]
    Deletion,
    #[strum(serialize = "DUP")]
    Duplication,
    #[strum(serialize = "INS")]
    Insertion,
    #[strum(serialize = "BND3to3")]
    Translocation3to3,
    #[strum(serialize = "BND5to5")]
    Translocation5to5,
    #[strum(serialize = "BND3to5")]
    Translocation3to5,
    #[strum(serialize = "BND5to3")]
    Translocation5to3,
}

impl SvType {
    pub fn code(self) -> u8 {
        match self {
            SvType::Inversion3to3 => 0,
            SvType::Inversion5to5 => 1,
            SvType::Deletion => 2,
            SvType::Duplication => 3,
            SvType::Insertion => 4,
            SvType::Translocation3to3 => 5,
            SvType::Translocation5to5 => 6,
            SvType::Translocation3to5 => 7,
            SvType::Translocation5to3 => 8,
        }
    }

    /// Long-range types get a fixed-size coverage window around their start breakpoint,
    /// because their end is either on another contig or not resolved.
    pub fn is_long_range(self) -> bool {
        self.code() >= 4
    }

    pub fn is_unresolved(self) -> bool {
        self.code() >= 5
    }

    pub fn class(self) -> SvClass {
        match self {
            SvType::Inversion3to3 | SvType::Inversion5to5 => SvClass::Inversion,
            SvType::Deletion => SvClass::Deletion,
            SvType::Duplication => SvClass::Duplication,
            SvType::Insertion => SvClass::Insertion,
            _ => SvClass::Translocation,
        }
    }

    /// Whether a read covering the given breakpoint side has to be reverse complemented to
    /// restore the sequence of the sample. Only 3'-to-3' and 5'-to-5' joins flip a strand.
    pub fn flips_orientation(self, is_end_side: bool) -> bool {
        match self {
            SvType::Inversion3to3 | SvType::Translocation3to3 => is_end_side,
            SvType::Inversion5to5 | SvType::Translocation5to5 => !is_end_side,
            _ => false,
        }
    }
}

impl TryFrom<u8> for SvType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0 => SvType::Inversion3to3,
            1 => SvType::Inversion5to5,
            2 => SvType::Deletion,
            3 => SvType::Duplication,
            4 => SvType::Insertion,
            5 => SvType::Translocation3to3,
            6 => SvType::Translocation5to5,
            7 => SvType::Translocation3to5,
            8 => SvType::Translocation5to3,
            _ => return Err(Error::InvalidSvType { code }),
        })
    }
}

impl From<SvType> for u8 {
    fn from(svtype: SvType) -> u8 {
        svtype.code()
    }
}

/// Coarse SV classes that can be switched on or off.
#[derive(
    Display,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
)]
pub enum SvClass {
    #[strum(serialize = "INV")]
    #[serde(rename = "INV")]
    Inversion,
    #[strum(serialize = "DEL")]
    #[serde(rename = "DEL")]
    Deletion,
    #[strum(serialize = "DUP")]
    #[serde(rename = "DUP")]
    Duplication,
    #[strum(serialize = "INS")]
    #[serde(rename = "INS")]
    Insertion,
    #[strum(serialize = "BND")]
    #[serde(rename = "BND")]
    Translocation,
}

/// A previously detected SV candidate. Contigs are given as target ids of the BAM header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters, new)]
pub struct SvCandidate {
    #[getset(get_copy = "pub")]
    id: usize,
    #[getset(get_copy = "pub")]
    chr1: usize,
    #[getset(get_copy = "pub")]
    chr2: usize,
    #[getset(get_copy = "pub")]
    start: i64,
    #[getset(get_copy = "pub")]
    end: i64,
    #[getset(get_copy = "pub")]
    svtype: SvType,
    #[getset(get_copy = "pub")]
    precise: bool,
    /// Number of discordant pairs that support the candidate.
    #[getset(get_copy = "pub")]
    pe_support: u32,
    #[getset(get = "pub")]
    probe_start_ref: Vec<u8>,
    #[getset(get = "pub")]
    probe_start_alt: Vec<u8>,
    #[getset(get = "pub")]
    probe_end_ref: Vec<u8>,
    #[getset(get = "pub")]
    probe_end_alt: Vec<u8>,
    #[new(value = "0")]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    size: i64,
}

impl SvCandidate {
    /// Determine and store the size used to choose between base pair and fragment counting.
    pub(crate) fn annotate_size(&mut self) -> i64 {
        self.size = if self.svtype.is_unresolved() {
            UNBOUNDED_SV_SIZE
        } else {
            self.end - self.start
        };
        self.size
    }

    /// Half width of the left and right control windows.
    pub(crate) fn half_size(&self) -> i64 {
        if self.svtype.is_long_range() {
            LONG_RANGE_HALF_SIZE
        } else {
            (self.end - self.start) / 2
        }
    }

    /// Reference and alternative haplotype probes of the given breakpoint side.
    pub(crate) fn probes(&self, is_end_side: bool) -> (&[u8], &[u8]) {
        if is_end_side {
            (&self.probe_end_ref, &self.probe_end_alt)
        } else {
            (&self.probe_start_ref, &self.probe_start_alt)
        }
    }
}

/// Restore the sample orientation of a read covering a breakpoint, reverse complementing the
/// sequence and reversing the base qualities if the join flips a strand.
pub(crate) fn adjust_orientation(
    seq: Vec<u8>,
    qual: Vec<u8>,
    is_end_side: bool,
    svtype: SvType,
) -> (Vec<u8>, Vec<u8>) {
    if svtype.flips_orientation(is_end_side) {
        (dna::revcomp(seq), qual.into_iter().rev().collect())
    } else {
        (seq, qual)
    }
}
