//! Sequence and annotation providers.
//!
//! The engine never owns genome storage: everything it needs is reached
//! through the read-only [`SequenceProvider`] trait (reference sequences,
//! transcripts and genes overlapping a region). [`InMemoryProvider`] is the
//! bundled implementation, built from FASTA plus a normalized annotation
//! table; parsing of upstream annotation formats (GTF/GFF) is external.
//!
//! Variant records arrive as an already-normalized list and are validated
//! against the provider before any search starts; a ref-allele mismatch is
//! fatal.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bio::bio_types::strand::Strand;

use crate::constants::{DECOY_PREFIX, PSEUDO_EXTRA, PSEUDO_READS, PSEUDO_RNASEQ, RESERVED_DELIMITER};
use crate::sequence::io::read_fasta_sequences;
use crate::sequence::reverse_complement;
use crate::types::{PeplocusError, RegionPart};

/// Annotation source/quality tag of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptSource {
    /// Manually curated annotation
    Curated,
    /// Reference annotation build
    Reference,
    /// Assembled from RNA-seq
    RnaSeq,
    /// Extra user-supplied annotation
    Extra,
    /// Derived from raw reads
    Reads,
}

impl TranscriptSource {
    /// Preference rank when several transcripts explain a hit (lower wins)
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Curated => 0,
            Self::Reference => 1,
            Self::RnaSeq => 2,
            Self::Extra => 3,
            Self::Reads => 4,
        }
    }

    /// Lenient parse from the annotation table; unknown tags count as
    /// reference quality.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "curated" => Self::Curated,
            "rnaseq" | "rna-seq" => Self::RnaSeq,
            "extra" => Self::Extra,
            "reads" => Self::Reads,
            _ => Self::Reference,
        }
    }
}

/// One annotated transcript: exon model, optional CDS, source tag.
///
/// Exons are genomic, ascending, non-overlapping, 0-based half-open.
/// Transcript coordinates run 5'→3' along the spliced sequence, so for
/// reverse-strand transcripts transcript position 0 sits at the highest
/// genomic coordinate.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    pub gene_id: String,
    pub reference: String,
    pub strand: Strand,
    pub exons: Vec<RegionPart>,
    /// Genomic CDS span (includes introns), `None` for non-coding
    pub cds: Option<RegionPart>,
    pub source: TranscriptSource,
    /// Whether the CDS is complete (start and stop annotated)
    pub cds_complete: bool,
}

impl Transcript {
    /// Total exonic length
    #[must_use]
    pub fn spliced_len(&self) -> u64 {
        self.exons.iter().map(RegionPart::len).sum()
    }

    #[must_use]
    pub const fn is_coding(&self) -> bool {
        self.cds.is_some()
    }

    /// Genomic span from first exon start to last exon end
    #[must_use]
    pub fn genomic_span(&self) -> RegionPart {
        RegionPart::new(
            self.exons.first().map_or(0, |e| e.start),
            self.exons.last().map_or(0, |e| e.end),
        )
    }

    /// Position along the exon concatenation in genomic order
    fn genomic_to_forward_spliced(&self, pos: u64) -> Option<u64> {
        let mut acc = 0u64;
        for e in &self.exons {
            if pos >= e.start && pos < e.end {
                return Some(acc + pos - e.start);
            }
            acc += e.len();
        }
        None
    }

    /// Transcript (5'→3') coordinate of a genomic position, if exonic
    #[must_use]
    pub fn genomic_to_transcript(&self, pos: u64) -> Option<u64> {
        let fs = self.genomic_to_forward_spliced(pos)?;
        match self.strand {
            Strand::Forward => Some(fs),
            Strand::Reverse => Some(self.spliced_len() - 1 - fs),
            Strand::Unknown => None,
        }
    }

    /// Maps a transcript interval `[t_start, t_end)` through the exon model
    /// into genomic parts in ascending order.
    #[must_use]
    pub fn transcript_to_genomic(&self, t_start: u64, t_end: u64) -> Option<Vec<RegionPart>> {
        let len = self.spliced_len();
        if t_end <= t_start || t_end > len {
            return None;
        }
        let (fs, fe) = match self.strand {
            Strand::Forward => (t_start, t_end),
            Strand::Reverse => (len - t_end, len - t_start),
            Strand::Unknown => return None,
        };
        let mut parts = Vec::new();
        let mut acc = 0u64;
        for e in &self.exons {
            let e_len = e.len();
            let lo = fs.max(acc);
            let hi = fe.min(acc + e_len);
            if lo < hi {
                parts.push(RegionPart::new(e.start + (lo - acc), e.start + (hi - acc)));
            }
            acc += e_len;
        }
        Some(parts)
    }

    /// CDS bounds in transcript coordinates, if coding and exonic
    #[must_use]
    pub fn cds_transcript_range(&self) -> Option<(u64, u64)> {
        let cds = self.cds?;
        let (five_prime, three_prime) = match self.strand {
            Strand::Forward => (cds.start, cds.end - 1),
            Strand::Reverse => (cds.end - 1, cds.start),
            Strand::Unknown => return None,
        };
        let t_start = self.genomic_to_transcript(five_prime)?;
        let t_end = self.genomic_to_transcript(three_prime)? + 1;
        (t_start < t_end).then_some((t_start, t_end))
    }

    /// Spliced sequence 5'→3' (reverse-complemented for reverse strand)
    pub fn spliced_sequence(
        &self,
        provider: &dyn SequenceProvider,
    ) -> Result<Vec<u8>, PeplocusError> {
        let mut seq = Vec::with_capacity(self.spliced_len() as usize);
        for e in &self.exons {
            seq.extend(provider.sequence(&self.reference, e.start, e.end)?);
        }
        if self.strand == Strand::Reverse {
            seq = reverse_complement(&seq);
        }
        Ok(seq)
    }

    /// Whether every part lies fully inside a single exon
    #[must_use]
    pub fn contains_in_exons(&self, parts: &[RegionPart]) -> bool {
        parts.iter().all(|p| {
            self.exons
                .iter()
                .any(|e| p.start >= e.start && p.end <= e.end)
        })
    }

    /// Exonic overlap (in nucleotides) with a set of region parts
    #[must_use]
    pub fn overlap_len(&self, parts: &[RegionPart]) -> u64 {
        parts
            .iter()
            .map(|p| {
                self.exons
                    .iter()
                    .map(|e| e.end.min(p.end).saturating_sub(e.start.max(p.start)))
                    .sum::<u64>()
            })
            .sum()
    }

    /// Maps region parts to one contiguous transcript interval, if the
    /// parts splice together seamlessly in transcript space.
    #[must_use]
    pub fn region_to_transcript_interval(&self, parts: &[RegionPart]) -> Option<(u64, u64)> {
        if parts.is_empty() || !self.contains_in_exons(parts) {
            return None;
        }
        let mut intervals = Vec::with_capacity(parts.len());
        for p in parts {
            let fs = self.genomic_to_forward_spliced(p.start)?;
            intervals.push((fs, fs + p.len()));
        }
        intervals.sort_unstable();
        if intervals.windows(2).any(|w| w[1].0 != w[0].1) {
            return None;
        }
        let (fs, fe) = (intervals[0].0, intervals.last()?.1);
        let len = self.spliced_len();
        match self.strand {
            Strand::Forward => Some((fs, fe)),
            Strand::Reverse => Some((len - fe, len - fs)),
            Strand::Unknown => None,
        }
    }
}

/// One annotated gene (derived from its transcripts)
#[derive(Debug, Clone)]
pub struct Gene {
    pub id: String,
    pub reference: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

/// Read-only access to reference sequences and annotation.
///
/// The core never mutates a provider; during the parallel phase it is
/// shared read-only across workers.
pub trait SequenceProvider: Send + Sync {
    /// Reference names in load order
    fn reference_names(&self) -> Vec<String>;

    /// Length of a reference sequence
    fn reference_length(&self, reference: &str) -> Result<u64, PeplocusError>;

    /// Residues of `[start, end)` on the forward strand
    fn sequence(&self, reference: &str, start: u64, end: u64) -> Result<Vec<u8>, PeplocusError>;

    /// All transcripts
    fn transcripts(&self) -> &[Transcript];

    /// Transcripts whose genomic span overlaps `[start, end)`
    fn transcripts_overlapping(&self, reference: &str, start: u64, end: u64) -> Vec<&Transcript>;

    /// Genes whose span overlaps `[start, end)`
    fn genes_overlapping(&self, reference: &str, start: u64, end: u64) -> Vec<&Gene>;
}

/// Rejects names that would collide with the location-string syntax, the
/// decoy convention, or the reserved pseudo-references.
pub fn check_sequence_name(name: &str) -> Result<(), PeplocusError> {
    if name.contains(RESERVED_DELIMITER) {
        return Err(PeplocusError::ReservedName(format!(
            "{name}: contains reserved delimiter '{RESERVED_DELIMITER}'"
        )));
    }
    if name.starts_with(DECOY_PREFIX) {
        return Err(PeplocusError::ReservedName(format!(
            "{name}: starts with decoy prefix {DECOY_PREFIX}"
        )));
    }
    if matches!(name, PSEUDO_EXTRA | PSEUDO_RNASEQ | PSEUDO_READS) {
        return Err(PeplocusError::ReservedName(format!(
            "{name}: reserved pseudo-reference"
        )));
    }
    Ok(())
}

/// In-memory [`SequenceProvider`] backed by FASTA and an annotation table
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    sequences: HashMap<String, Vec<u8>>,
    order: Vec<String>,
    transcripts: Vec<Transcript>,
    genes: Vec<Gene>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one reference sequence, rejecting reserved names
    pub fn add_sequence(
        &mut self,
        name: impl Into<String>,
        seq: Vec<u8>,
    ) -> Result<(), PeplocusError> {
        let name = name.into();
        check_sequence_name(&name)?;
        if !self.sequences.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sequences.insert(name, seq);
        Ok(())
    }

    /// Loads every sequence of a FASTA file
    pub fn load_genome_fasta<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PeplocusError> {
        for (id, _desc, seq) in read_fasta_sequences(path)? {
            self.add_sequence(id, seq)?;
        }
        Ok(())
    }

    /// Adds one transcript and folds it into its gene's span
    pub fn add_transcript(&mut self, transcript: Transcript) -> Result<(), PeplocusError> {
        check_sequence_name(&transcript.id)?;
        if transcript.exons.is_empty() {
            return Err(PeplocusError::ParseError(format!(
                "transcript {} has no exons",
                transcript.id
            )));
        }
        if transcript
            .exons
            .windows(2)
            .any(|w| w[1].start < w[0].end)
        {
            return Err(PeplocusError::ParseError(format!(
                "transcript {} has unsorted or overlapping exons",
                transcript.id
            )));
        }
        let span = transcript.genomic_span();
        match self.genes.iter_mut().find(|g| g.id == transcript.gene_id) {
            Some(gene) => {
                gene.start = gene.start.min(span.start);
                gene.end = gene.end.max(span.end);
            }
            None => self.genes.push(Gene {
                id: transcript.gene_id.clone(),
                reference: transcript.reference.clone(),
                start: span.start,
                end: span.end,
                strand: transcript.strand,
            }),
        }
        self.transcripts.push(transcript);
        Ok(())
    }

    /// Loads transcripts from the normalized annotation table.
    ///
    /// Tab-separated columns: id, gene, reference, strand (+/-), exons
    /// (`start-end,start-end`), cds (`start-end` or `.`), source, complete
    /// (`1`/`0`). Lines starting with `#` are skipped.
    pub fn load_annotation_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PeplocusError> {
        let file = File::open(path.as_ref())?;
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let transcript = parse_annotation_row(trimmed)
                .map_err(|e| PeplocusError::ParseError(format!("annotation line {}: {e}", number + 1)))?;
            self.add_transcript(transcript)?;
        }
        Ok(())
    }
}

fn parse_span(text: &str) -> Result<RegionPart, String> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| format!("bad span {text}"))?;
    let start: u64 = start.trim().parse().map_err(|_| format!("bad span {text}"))?;
    let end: u64 = end.trim().parse().map_err(|_| format!("bad span {text}"))?;
    if end <= start {
        return Err(format!("empty span {text}"));
    }
    Ok(RegionPart::new(start, end))
}

fn parse_annotation_row(line: &str) -> Result<Transcript, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        return Err(format!("expected 8 columns, found {}", fields.len()));
    }
    let strand = match fields[3].trim() {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        other => return Err(format!("bad strand {other}")),
    };
    let exons = fields[4]
        .split(',')
        .map(parse_span)
        .collect::<Result<Vec<_>, _>>()?;
    let cds = match fields[5].trim() {
        "." | "" => None,
        span => Some(parse_span(span)?),
    };
    let cds_complete = matches!(fields[7].trim(), "1" | "yes" | "true");
    Ok(Transcript {
        id: fields[0].trim().to_string(),
        gene_id: fields[1].trim().to_string(),
        reference: fields[2].trim().to_string(),
        strand,
        exons,
        cds,
        source: TranscriptSource::parse(fields[6]),
        cds_complete,
    })
}

impl SequenceProvider for InMemoryProvider {
    fn reference_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn reference_length(&self, reference: &str) -> Result<u64, PeplocusError> {
        self.sequences
            .get(reference)
            .map(|s| s.len() as u64)
            .ok_or_else(|| PeplocusError::UnknownReference(reference.to_string()))
    }

    fn sequence(&self, reference: &str, start: u64, end: u64) -> Result<Vec<u8>, PeplocusError> {
        let seq = self
            .sequences
            .get(reference)
            .ok_or_else(|| PeplocusError::UnknownReference(reference.to_string()))?;
        if end > seq.len() as u64 || start > end {
            return Err(PeplocusError::RegionOutOfBounds {
                reference: reference.to_string(),
                start,
                end,
                length: seq.len() as u64,
            });
        }
        Ok(seq[start as usize..end as usize].to_vec())
    }

    fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    fn transcripts_overlapping(&self, reference: &str, start: u64, end: u64) -> Vec<&Transcript> {
        self.transcripts
            .iter()
            .filter(|t| t.reference == reference && t.genomic_span().overlaps(start, end))
            .collect()
    }

    fn genes_overlapping(&self, reference: &str, start: u64, end: u64) -> Vec<&Gene> {
        self.genes
            .iter()
            .filter(|g| g.reference == reference && g.start < end && start < g.end)
            .collect()
    }
}

/// One genome (provider plus its genome-of-origin id) in the search universe
pub struct GenomeSource {
    /// Genome-of-origin id carried on every hit and FDR stratum
    pub origin: String,
    pub provider: Box<dyn SequenceProvider>,
}

/// A named auxiliary sequence (extra database entry, RNA-seq contig)
#[derive(Debug, Clone)]
pub struct NamedSequence {
    pub name: String,
    pub seq: Vec<u8>,
}

/// One normalized variant record.
///
/// `position` is 0-based on the forward strand; `ref_allele` must match the
/// provider's sequence exactly. Alleles may differ in length (indels); an
/// empty allele side is allowed for pure insertions/deletions.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub reference: String,
    pub position: u64,
    pub ref_allele: Vec<u8>,
    pub alt_alleles: Vec<Vec<u8>>,
    pub provenance: String,
}

/// Loads the normalized variant table.
///
/// Tab-separated columns: reference, position (0-based), ref allele, alt
/// alleles (comma-separated), optional provenance (synthesized in HGVS-like
/// `g.` notation when absent). Lines starting with `#` are skipped.
pub fn load_variant_file<P: AsRef<Path>>(path: P) -> Result<Vec<VariantRecord>, PeplocusError> {
    let file = File::open(path.as_ref())?;
    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 4 {
            return Err(PeplocusError::ParseError(format!(
                "variant line {}: expected at least 4 columns",
                number + 1
            )));
        }
        let position: u64 = fields[1].trim().parse().map_err(|_| {
            PeplocusError::ParseError(format!("variant line {}: bad position", number + 1))
        })?;
        let ref_allele = fields[2].trim().as_bytes().to_vec();
        let alt_alleles: Vec<Vec<u8>> = fields[3]
            .split(',')
            .map(|a| a.trim().as_bytes().to_vec())
            .collect();
        let provenance = fields
            .get(4)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "g.{}{}>{}",
                    position + 1,
                    String::from_utf8_lossy(&ref_allele),
                    alt_alleles
                        .iter()
                        .map(|a| String::from_utf8_lossy(a).to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            });
        records.push(VariantRecord {
            reference: fields[0].trim().to_string(),
            position,
            ref_allele,
            alt_alleles,
            provenance,
        });
    }
    Ok(records)
}

/// Validates every variant's ref allele against the provider's sequence.
///
/// # Errors
///
/// [`PeplocusError::VariantMismatch`] on the first disagreement. A
/// mismatching variant would corrupt every downstream coordinate, so the
/// run aborts before search.
pub fn validate_variants(
    provider: &dyn SequenceProvider,
    variants: &[VariantRecord],
) -> Result<(), PeplocusError> {
    for v in variants {
        if v.ref_allele.is_empty() {
            continue;
        }
        let end = v.position + v.ref_allele.len() as u64;
        let found = provider.sequence(&v.reference, v.position, end)?;
        if !found.eq_ignore_ascii_case(&v.ref_allele) {
            return Err(PeplocusError::VariantMismatch {
                reference: v.reference.clone(),
                position: v.position,
                expected: String::from_utf8_lossy(&v.ref_allele).to_string(),
                found: String::from_utf8_lossy(&found).to_string(),
            });
        }
    }
    Ok(())
}
