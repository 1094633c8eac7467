use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_htslib::bam;
use rust_htslib::bam::record::{Aux, Cigar, CigarString};

/// Deterministic pseudo random reference sequence.
pub(crate) fn random_seq(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4]
        })
        .collect()
}

/// Write a single line per contig FASTA file together with its faidx index.
pub(crate) fn write_reference(dir: &Path, contigs: &[(&str, &[u8])]) -> Result<PathBuf> {
    let path = dir.join("reference.fa");
    let mut fasta = File::create(&path)?;
    let mut fai = File::create(dir.join("reference.fa.fai"))?;
    let mut offset = 0;
    for (name, seq) in contigs {
        let header = format!(">{}\n", name);
        offset += header.len();
        fasta.write_all(header.as_bytes())?;
        fasta.write_all(seq)?;
        fasta.write_all(b"\n")?;
        writeln!(
            fai,
            "{}\t{}\t{}\t{}\t{}",
            name,
            seq.len(),
            offset,
            seq.len(),
            seq.len() + 1
        )?;
        offset += seq.len() + 1;
    }
    Ok(path)
}

/// Write coordinate sorted records into an indexed BAM file.
pub(crate) fn write_bam(
    dir: &Path,
    contigs: &[(&str, u64)],
    mut records: Vec<bam::Record>,
) -> Result<PathBuf> {
    let path = dir.join("reads.bam");
    let mut text = String::from("@HD\tVN:1.6\tSO:coordinate\n");
    for (name, len) in contigs {
        text.push_str(&format!("@SQ\tSN:{}\tLN:{}\n", name, len));
    }
    let header = bam::Header::from_template(&bam::HeaderView::from_bytes(text.as_bytes()));

    records.sort_by_key(|rec| (rec.tid(), rec.pos()));
    {
        let mut writer = bam::Writer::from_path(&path, &header, bam::Format::Bam)?;
        for rec in &records {
            writer.write(rec)?;
        }
    }
    bam::index::build(&path, None, bam::index::Type::Bai, 1)?;
    Ok(path)
}

#[derive(Debug, Clone)]
pub(crate) struct Mate {
    pub(crate) tid: i32,
    pub(crate) pos: i64,
    pub(crate) reverse: bool,
    /// Whether the mate is the first read of the template.
    pub(crate) first: bool,
    pub(crate) insert_size: i64,
}

/// Build an aligned read with base qualities 30 and mapping quality 60.
pub(crate) fn read(
    qname: &str,
    tid: i32,
    pos: i64,
    reverse: bool,
    seq: &[u8],
    cigar: Vec<Cigar>,
    mate: Option<Mate>,
    haplotype: Option<i32>,
) -> bam::Record {
    let mut rec = bam::Record::new();
    rec.set(
        qname.as_bytes(),
        Some(&CigarString(cigar)),
        seq,
        &vec![30; seq.len()],
    );
    rec.set_tid(tid);
    rec.set_pos(pos);
    rec.set_mapq(60);
    if reverse {
        rec.set_reverse();
    }
    match mate {
        Some(mate) => {
            rec.set_paired();
            rec.set_mtid(mate.tid);
            rec.set_mpos(mate.pos);
            rec.set_insert_size(mate.insert_size);
            if mate.reverse {
                rec.set_mate_reverse();
            }
            if mate.first {
                rec.set_last_in_template();
            } else {
                rec.set_first_in_template();
            }
        }
        None => {
            rec.set_mtid(-1);
            rec.set_mpos(-1);
        }
    }
    if let Some(haplotype) = haplotype {
        rec.push_aux(b"HP", Aux::I32(haplotype))
            .expect("bug: unable to add HP tag");
    }
    rec
}

/// Both reads of a pair, the first one forward and the second one reverse.
pub(crate) fn pair(
    qname: &str,
    tid: i32,
    pos: i64,
    mate_tid: i32,
    mate_pos: i64,
    len: usize,
) -> Vec<bam::Record> {
    let seq = vec![b'A'; len];
    let insert_size = if tid == mate_tid {
        mate_pos + len as i64 - pos
    } else {
        0
    };
    vec![
        read(
            qname,
            tid,
            pos,
            false,
            &seq,
            vec![Cigar::Match(len as u32)],
            Some(Mate {
                tid: mate_tid,
                pos: mate_pos,
                reverse: true,
                first: false,
                insert_size,
            }),
            None,
        ),
        read(
            qname,
            mate_tid,
            mate_pos,
            true,
            &seq,
            vec![Cigar::Match(len as u32)],
            Some(Mate {
                tid,
                pos,
                reverse: false,
                first: true,
                insert_size: -insert_size,
            }),
            None,
        ),
    ]
}
