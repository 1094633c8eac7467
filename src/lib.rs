// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Collection of read depth, junction and spanning pair evidence for previously detected
//! structural variant (SV) candidates from a coordinate sorted, indexed BAM file.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate strum_macros;

pub mod annotator;
pub mod cli;
pub mod errors;
pub mod estimation;
pub mod options;
pub(crate) mod reference;
pub mod regions;
pub mod stats;
pub mod variants;

pub use crate::annotator::annotate_coverage;
pub use crate::options::{LibraryInfo, Options};
pub use crate::stats::Stats;
pub use crate::variants::{SvCandidate, SvClass, SvType};
