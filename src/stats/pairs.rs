// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Read pair bookkeeping: pair identities, mate state and pair orientation.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use rust_htslib::bam;
use rust_htslib::bam::record::Aux;

use crate::options::Options;
use crate::stats::Haplotype;
use crate::variants::SvType;

/// What is remembered of the first-seen read of a pair until its mate shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub(crate) struct PairState {
    pub(crate) mapq: u8,
    pub(crate) has_soft_clip: bool,
}

/// Mate state of pairs whose reads lie on different contigs, shared by all workers.
#[derive(Debug, Default)]
pub struct SharedPairStates {
    states: Mutex<HashMap<u64, PairState>>,
}

impl SharedPairStates {
    pub(crate) fn insert(&self, key: u64, state: PairState) {
        self.states
            .lock()
            .expect("bug: pair state lock poisoned")
            .insert(key, state);
    }

    /// Remove and return the state stored for a pair.
    pub(crate) fn take(&self, key: u64) -> Option<PairState> {
        self.states
            .lock()
            .expect("bug: pair state lock poisoned")
            .remove(&key)
    }

    pub fn len(&self) -> usize {
        self.states
            .lock()
            .expect("bug: pair state lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn qname_hash(record: &bam::Record) -> u64 {
    let mut hasher = DefaultHasher::new();
    record.qname().hash(&mut hasher);
    hasher.finish()
}

fn pair_hash(qname: &[u8], tid: i32, pos: i64, mtid: i32, mpos: i64) -> u64 {
    let mut hasher = DefaultHasher::new();
    qname.hash(&mut hasher);
    (tid, pos, mtid, mpos).hash(&mut hasher);
    hasher.finish()
}

/// Identity of the pair as seen from the given read.
pub(crate) fn pair_key(record: &bam::Record) -> u64 {
    pair_hash(
        record.qname(),
        record.tid(),
        record.pos(),
        record.mtid(),
        record.mpos(),
    )
}

/// Identity of the pair as it was stored by the mate of the given read.
pub(crate) fn mate_pair_key(record: &bam::Record) -> u64 {
    pair_hash(
        record.qname(),
        record.mtid(),
        record.mpos(),
        record.tid(),
        record.pos(),
    )
}

/// Reads seen at the current alignment start, used to tell apart the mates of pairs
/// where both reads start at the same position.
#[derive(Debug, Default)]
pub(crate) struct PositionDedup {
    pos: i64,
    seen: HashSet<u64>,
}

impl PositionDedup {
    /// Decide whether the given read is the first of its pair in coordinate order and,
    /// if so, remember it.
    pub(crate) fn is_first_in_pair(&mut self, record: &bam::Record) -> bool {
        if record.pos() > self.pos {
            self.seen.clear();
            self.pos = record.pos();
        }
        let name = qname_hash(record);
        let is_first = if record.tid() != record.mtid() {
            record.tid() < record.mtid()
        } else {
            record.pos() < record.mpos()
                || (record.pos() == record.mpos() && !self.seen.contains(&name))
        };
        if is_first {
            self.seen.insert(name);
        }
        is_first
    }
}

/// SV type implied by the relative orientation and placement of a read and its mate.
/// Proper forward-reverse pairs on one contig yield `SvType::Deletion`.
pub(crate) fn pair_sv_type(record: &bam::Record) -> SvType {
    let reverse = record.is_reverse();
    let same_strand = reverse == record.is_mate_reverse();
    if record.tid() == record.mtid() {
        if same_strand {
            if reverse {
                SvType::Inversion5to5
            } else {
                SvType::Inversion3to3
            }
        } else if (record.pos() < record.mpos()) != reverse {
            SvType::Deletion
        } else {
            SvType::Duplication
        }
    } else if same_strand {
        if reverse {
            SvType::Translocation5to5
        } else {
            SvType::Translocation3to3
        }
    } else if (record.tid() > record.mtid()) == reverse {
        SvType::Translocation3to5
    } else {
        SvType::Translocation5to3
    }
}

/// SV type of a discordant pair, or `None` if the pair does not qualify as evidence under
/// the given options.
pub(crate) fn classify_discordant(
    record: &bam::Record,
    pair_qual: u8,
    outer_isize: i64,
    options: &Options,
) -> Option<SvType> {
    let svtype = pair_sv_type(record);
    if !options.is_enabled(svtype) {
        return None;
    }
    if svtype == SvType::Deletion && outer_isize <= options.library.max_normal_isize {
        return None;
    }
    if record.tid() != record.mtid() && pair_qual < options.filter.min_tra_qual {
        return None;
    }
    Some(svtype)
}

/// Haplotype given by the `HP` tag. Returns `None` if the read carries no such tag.
pub(crate) fn haplotype_tag(record: &bam::Record) -> Option<Haplotype> {
    let value = match record.aux(b"HP").ok()? {
        Aux::I8(value) => value as i64,
        Aux::U8(value) => value as i64,
        Aux::I16(value) => value as i64,
        Aux::U16(value) => value as i64,
        Aux::I32(value) => value as i64,
        Aux::U32(value) => value as i64,
        _ => 0,
    };
    Some(if value == 1 {
        Haplotype::First
    } else {
        Haplotype::Second
    })
}
