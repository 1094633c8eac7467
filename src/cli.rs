// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};
use structopt::StructOpt;

use crate::annotator::{annotate_coverage, Contigs};
use crate::estimation::insert_size::{DEFAULT_MAD_CUTOFF, DEFAULT_NUM_PAIRS};
use crate::options::{LibraryInfo, Options};
use crate::stats::Stats;
use crate::variants::candidates::read_candidates;
use crate::variants::{SvCandidate, SvClass};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "svstats",
    about = "Collect read depth, junction and spanning pair evidence of SV candidates."
)]
pub struct SvStats {
    #[structopt(
        long,
        parse(from_os_str),
        help = "Coordinate sorted and indexed BAM/CRAM file with the reads of the sample."
    )]
    pub bam: PathBuf,
    #[structopt(
        long,
        parse(from_os_str),
        help = "FASTA file with reference genome. Has to be indexed with samtools faidx."
    )]
    pub reference: PathBuf,
    #[structopt(
        long,
        parse(from_os_str),
        help = "Tab separated table of SV candidates (id, chr1, chr2, start, end, svtype, precise, \
                pe_support and the four breakpoint probes)."
    )]
    pub candidates: PathBuf,
    #[structopt(
        long,
        parse(from_os_str),
        help = "YAML or JSON file with options (thresholds, flank scoring, library)."
    )]
    pub options: Option<PathBuf>,
    #[structopt(
        long,
        parse(from_os_str),
        help = "JSON file with library properties (if omitted and not given in the options, \
                they are estimated from the BAM file)."
    )]
    pub library: Option<PathBuf>,
    #[structopt(short, long, help = "Number of threads to use.")]
    pub threads: Option<usize>,
    #[structopt(
        long = "sv-types",
        possible_values = &["INV", "DEL", "DUP", "INS", "BND"],
        help = "SV classes to consider for discordant pairs (default: all)."
    )]
    pub sv_types: Vec<SvClass>,
    #[structopt(
        long,
        parse(from_os_str),
        help = "JSON file that shall contain the results (if omitted, write to STDOUT)."
    )]
    pub output: Option<PathBuf>,
    #[structopt(short, long, help = "Print debug messages.")]
    pub verbose: bool,
}

/// Evidence of all SV candidates, as written by the command line front-end.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub haplotagged: bool,
    pub library: &'a LibraryInfo,
    pub svs: &'a [SvCandidate],
    pub stats: &'a Stats,
}

pub fn setup_logger(verbose: bool) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .chain(io::stderr())
        .apply()
        .context("Unable to set up logging.")?;
    Ok(())
}

/// Combine the options file with the command line arguments. Library properties are taken
/// from `--library`, then from the options file, and otherwise estimated from the reads.
pub fn build_options(opt: &SvStats) -> Result<Options> {
    let mut options = match opt.options {
        Some(ref path) => Options::from_path(path)?,
        None => Options::default(),
    };
    options.bam = opt.bam.clone();
    options.genome = opt.reference.clone();
    if let Some(threads) = opt.threads {
        options.threads = threads;
    }
    if !opt.sv_types.is_empty() {
        options.sv_classes = opt.sv_types.iter().cloned().collect();
    }

    if let Some(ref path) = opt.library {
        options.library = LibraryInfo::from_path(path)?;
    } else if options.library.max_normal_isize == 0 {
        info!("Estimating library properties from {}", opt.bam.display());
        options.library = LibraryInfo::estimate(&opt.bam, DEFAULT_NUM_PAIRS, DEFAULT_MAD_CUTOFF)?;
    }
    Ok(options)
}

pub fn run(opt: SvStats) -> Result<()> {
    let options = build_options(&opt)?;

    let contigs = {
        let bam = bam::IndexedReader::from_path(&options.bam)
            .context("Unable to read BAM/CRAM file.")?;
        Contigs::from_bam_header(bam.header())
    };
    let mut svs = read_candidates(&opt.candidates, &contigs.names)?;
    info!("Loaded {} SV candidates", svs.len());

    let stats = annotate_coverage(&options, &mut svs)?;

    let report = Report {
        haplotagged: options.library.is_haplotagged(),
        library: &options.library,
        svs: &svs,
        stats: &stats,
    };
    match opt.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("Unable to write results to {}.", path.display()))?;
            serde_json::to_writer_pretty(file, &report)?;
        }
        None => serde_json::to_writer_pretty(io::stdout(), &report)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_build_options() {
        let tmp = tempfile::tempdir().unwrap();
        let options_path = tmp.path().join("options.yaml");
        File::create(&options_path)
            .unwrap()
            .write_all(b"threads: 2\nfilter:\n  min_geno_qual: 20\n")
            .unwrap();
        let library_path = tmp.path().join("library.json");
        File::create(&library_path)
            .unwrap()
            .write_all(
                br#"{"read_len": 150, "median": 400, "mad": 30, "min_normal_isize": 250,
                     "max_normal_isize": 550, "max_isize_cutoff": 670}"#,
            )
            .unwrap();

        let opt = SvStats::from_iter_safe(&[
            "svstats",
            "--bam",
            "sample.bam",
            "--reference",
            "ref.fa",
            "--candidates",
            "svs.tsv",
            "--options",
            options_path.to_str().unwrap(),
            "--library",
            library_path.to_str().unwrap(),
            "--threads",
            "8",
            "--sv-types",
            "DEL",
            "BND",
        ])
        .unwrap();
        let options = build_options(&opt).unwrap();

        assert_eq!(options.threads, 8);
        assert_eq!(options.filter.min_geno_qual, 20);
        assert_eq!(options.bam, PathBuf::from("sample.bam"));
        assert_eq!(options.library.max_normal_isize, 550);
        assert_eq!(
            options.sv_classes.into_iter().collect::<Vec<_>>(),
            vec![SvClass::Deletion, SvClass::Translocation]
        );
    }

    #[test]
    fn test_invalid_sv_type() {
        assert!(SvStats::from_iter_safe(&[
            "svstats",
            "--bam",
            "a.bam",
            "--reference",
            "ref.fa",
            "--candidates",
            "svs.tsv",
            "--sv-types",
            "CNV",
        ])
        .is_err());
    }
}
