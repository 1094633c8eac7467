// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use structopt::StructOpt;

use svstats::cli::{self, SvStats};

pub fn main() -> Result<()> {
    let opt = SvStats::from_args();
    cli::setup_logger(opt.verbose)?;
    cli::run(opt)
}
