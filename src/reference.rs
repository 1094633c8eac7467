// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bio::io::fasta;
use lru_time_cache::LruCache;

/// A lazy buffer for contig sequences of an indexed (faidx) reference genome.
pub(crate) struct Buffer {
    reader: fasta::IndexedReader<fs::File>,
    sequences: LruCache<String, Arc<Vec<u8>>>,
}

impl Buffer {
    pub(crate) fn from_path<P: AsRef<Path> + std::fmt::Debug>(path: P, capacity: usize) -> Result<Self> {
        let reader = fasta::IndexedReader::from_file(&path).with_context(|| {
            format!(
                "Unable to read reference genome {} (it has to be indexed with samtools faidx).",
                path.as_ref().display()
            )
        })?;
        Ok(Buffer {
            reader,
            sequences: LruCache::with_capacity(capacity),
        })
    }

    /// Length of the given contig according to the FASTA index.
    pub(crate) fn contig_len(&self, chrom: &str) -> Option<u64> {
        self.reader
            .index
            .sequences()
            .into_iter()
            .find(|seq| seq.name == chrom)
            .map(|seq| seq.len)
    }

    /// Load the given contig. This is O(1) if the contig is still buffered.
    pub(crate) fn seq(&mut self, chrom: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(sequence) = self.sequences.get(chrom) {
            return Ok(Arc::clone(sequence));
        }

        let mut sequence = Vec::new();
        self.reader
            .fetch_all(chrom)
            .with_context(|| format!("Unable to fetch contig {} from reference genome.", chrom))?;
        self.reader
            .read(&mut sequence)
            .with_context(|| format!("Unable to read contig {} from reference genome.", chrom))?;
        let sequence = Arc::new(sequence);
        self.sequences.insert(chrom.to_owned(), Arc::clone(&sequence));
        Ok(sequence)
    }
}
