use crate::types::PeplocusError;
use bio::io::fasta;
use std::fs::File;
use std::path::Path;

/// FASTA record as (id, optional description, sequence bytes)
pub type FastaRecord = (String, Option<String>, Vec<u8>);

/// Read all sequences from a FASTA file using rust-bio
pub fn read_fasta_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, PeplocusError> {
    let file = File::open(path.as_ref())?;
    let reader = fasta::Reader::new(file);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| PeplocusError::ParseError(e.to_string()))?;
        let id = record.id().to_string();
        let description = record.desc().map(String::from);
        let seq = record.seq().to_vec();
        sequences.push((id, description, seq));
    }

    Ok(sequences)
}
