use std::collections::HashMap;
use std::convert::TryFrom;
use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::Error;
use crate::variants::{SvCandidate, SvType};

/// One row of a candidate table. Contigs are given by name.
#[derive(Debug, Clone, Deserialize)]
struct CandidateRow {
    id: usize,
    chr1: String,
    chr2: String,
    start: i64,
    end: i64,
    svtype: u8,
    precise: bool,
    pe_support: u32,
    #[serde(default)]
    probe_start_ref: String,
    #[serde(default)]
    probe_start_alt: String,
    #[serde(default)]
    probe_end_ref: String,
    #[serde(default)]
    probe_end_alt: String,
}

/// Read SV candidates from a tab separated table with header, resolving contig names
/// against the given target names (index = target id).
pub fn read_candidates<P: AsRef<Path>>(path: P, target_names: &[String]) -> Result<Vec<SvCandidate>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())
        .with_context(|| format!("Unable to read SV candidates from {}.", path.as_ref().display()))?;
    let tids: HashMap<&str, usize> = target_names
        .iter()
        .enumerate()
        .map(|(tid, name)| (name.as_str(), tid))
        .collect();

    let mut svs = Vec::new();
    for row in reader.deserialize() {
        let row: CandidateRow = row?;
        let tid = |contig: &str| {
            tids.get(contig).cloned().ok_or_else(|| Error::UnknownContig {
                id: row.id,
                contig: contig.to_owned(),
            })
        };
        let chr1 = tid(&row.chr1)?;
        let chr2 = tid(&row.chr2)?;
        let svtype = SvType::try_from(row.svtype)?;
        if chr1 == chr2 && row.end < row.start {
            return Err(Error::InvalidSvInterval {
                id: row.id,
                start: row.start,
                end: row.end,
            }
            .into());
        }
        svs.push(SvCandidate::new(
            row.id,
            chr1,
            chr2,
            row.start,
            row.end,
            svtype,
            row.precise,
            row.pe_support,
            row.probe_start_ref.into_bytes(),
            row.probe_start_alt.into_bytes(),
            row.probe_end_ref.into_bytes(),
            row.probe_end_alt.into_bytes(),
        ));
    }

    Ok(svs)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const HEADER: &str = "id\tchr1\tchr2\tstart\tend\tsvtype\tprecise\tpe_support\tprobe_start_ref\tprobe_start_alt\tprobe_end_ref\tprobe_end_alt\n";

    fn targets() -> Vec<String> {
        vec!["chr1".to_owned(), "chr2".to_owned()]
    }

    #[test]
    fn test_read_candidates() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            "{}0\tchr1\tchr1\t100\t400\t2\ttrue\t3\tACGT\tACCT\tTTGA\tTTCA\n1\tchr1\tchr2\t500\t900\t7\tfalse\t0\t\t\t\t\n",
            HEADER
        )
        .unwrap();
        let svs = read_candidates(tmp.path(), &targets()).unwrap();
        assert_eq!(svs.len(), 2);
        assert_eq!(svs[0].svtype(), SvType::Deletion);
        assert_eq!(svs[0].probe_start_alt(), b"ACCT");
        assert_eq!(svs[1].chr2(), 1);
        assert!(svs[1].probe_end_ref().is_empty());
    }

    #[test]
    fn test_unknown_contig() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{}0\tchrX\tchr1\t100\t400\t2\ttrue\t3\t\t\t\t\n", HEADER).unwrap();
        let err = read_candidates(tmp.path(), &targets()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::UnknownContig {
                id: 0,
                contig: "chrX".to_owned()
            })
        );
    }
}
