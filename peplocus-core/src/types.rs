use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bio::bio_types::strand::Strand;
use thiserror::Error;

use crate::constants::DECOY_PREFIX;

/// Character used for a strand in location strings
#[must_use]
pub const fn strand_char(strand: Strand) -> char {
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::Unknown => '.',
    }
}

/// A per-residue modification parsed from a peptide string.
///
/// `position` is the 0-based residue index the delta is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    /// 0-based residue index carrying the modification
    pub position: usize,
    /// Mass delta in Daltons (sign preserved from the input)
    pub delta: f64,
}

/// One observed peptide identification read from the input table.
///
/// Calls are read once at startup; everything downstream works on the
/// canonical keywords derived from `residues`.
#[derive(Debug, Clone)]
pub struct PeptideCall {
    /// Plain residue string with modification tags stripped
    pub residues: String,
    /// Modifications that were attached to residues of this call
    pub modifications: Vec<Modification>,
    /// Confidence score, 0-100
    pub score: f64,
    /// Fraction grouping key
    pub fraction: String,
    /// Scan grouping key
    pub scan: String,
    /// Feature grouping key
    pub feature: String,
    /// All columns of the original input row, in input order
    pub columns: Vec<String>,
    /// 0-based input row index
    pub row: usize,
}

impl PeptideCall {
    /// Spectrum/feature block key used for ranking co-identified peptides
    #[must_use]
    pub fn block_key(&self) -> String {
        format!("{}/{}", self.fraction, self.scan)
    }

    /// Re-applies this call's modification tags onto a matched keyword.
    ///
    /// The keyword may differ from the observed residues at ambiguity
    /// positions; the tags stay attached to the same residue indices.
    #[must_use]
    pub fn modified_sequence(&self, keyword: &str) -> String {
        let mut out = String::with_capacity(keyword.len() + self.modifications.len() * 8);
        for (i, c) in keyword.chars().enumerate() {
            out.push(c);
            for m in &self.modifications {
                if m.position == i {
                    out.push_str(&format!("({:+.2})", m.delta));
                }
            }
        }
        out
    }
}

/// One contiguous part of a genomic region, 0-based half-open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPart {
    pub start: u64,
    pub end: u64,
}

impl RegionPart {
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub const fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end
    }
}

/// A strand-correct, possibly multi-part genomic region.
///
/// Parts are kept in ascending genomic order regardless of strand; the
/// strand determines the read direction when the region is re-extracted.
/// Decoy regions carry the [`DECOY_PREFIX`] on the reference name.
#[derive(Debug, Clone)]
pub struct GenomicRegion {
    /// Reference (contig or pseudo-reference) name, decoy-prefixed for decoys
    pub reference: String,
    /// Strand the matched translation ran on
    pub strand: Strand,
    /// Region parts in ascending genomic order
    pub parts: Vec<RegionPart>,
}

impl GenomicRegion {
    /// Single-part region
    #[must_use]
    pub fn contiguous(reference: impl Into<String>, strand: Strand, start: u64, end: u64) -> Self {
        Self {
            reference: reference.into(),
            strand,
            parts: vec![RegionPart::new(start, end)],
        }
    }

    /// Whether the reference name carries the decoy prefix
    #[must_use]
    pub fn is_decoy(&self) -> bool {
        self.reference.starts_with(DECOY_PREFIX)
    }

    /// Reference name with the decoy prefix stripped
    #[must_use]
    pub fn base_reference(&self) -> &str {
        self.reference
            .strip_prefix(DECOY_PREFIX)
            .unwrap_or(&self.reference)
    }

    /// Enclosing (min start, max end) span over all parts
    #[must_use]
    pub fn span(&self) -> (u64, u64) {
        let start = self.parts.iter().map(|p| p.start).min().unwrap_or(0);
        let end = self.parts.iter().map(|p| p.end).max().unwrap_or(0);
        (start, end)
    }

    /// Length of the enclosing span
    #[must_use]
    pub fn span_len(&self) -> u64 {
        let (start, end) = self.span();
        end - start
    }

    /// Sum of part lengths (nucleotides actually consumed)
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.parts.iter().map(RegionPart::len).sum()
    }

    /// Whether the region is a single part, or parts separated by at most
    /// [`crate::constants::COMPACT_GAP_LIMIT`] nucleotides.
    ///
    /// Compactness separates frameshift-sized part gaps from genuinely
    /// spliced regions during classification.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.parts.windows(2).all(|w| {
            w[1].start.saturating_sub(w[0].end) <= crate::constants::COMPACT_GAP_LIMIT
        })
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.reference, strand_char(self.strand))?;
        for (i, p) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}-{}", p.start, p.end)?;
        }
        Ok(())
    }
}

impl PartialEq for GenomicRegion {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
            && strand_char(self.strand) == strand_char(other.strand)
            && self.parts == other.parts
    }
}

impl Eq for GenomicRegion {}

impl Hash for GenomicRegion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
        strand_char(self.strand).hash(state);
        self.parts.hash(state);
    }
}

/// One placed occurrence of a keyword in the sequence universe.
///
/// Hits are immutable once produced; decoy-ness is inferred from the
/// reference-name prefix of the region.
#[derive(Debug, Clone)]
pub struct GenomicHit {
    /// Where the keyword was consumed
    pub region: GenomicRegion,
    /// The canonical keyword that matched
    pub keyword: String,
    /// Free-text provenance (variant notation, splice parts, source name, ...)
    pub provenance: String,
    /// Genome-of-origin id
    pub origin: String,
    /// Frame tag (0..3): absolute genomic frame for window hits, 0 for
    /// transcript-anchored placements
    pub frame: u8,
}

impl GenomicHit {
    #[must_use]
    pub fn is_decoy(&self) -> bool {
        self.region.is_decoy()
    }

    /// Total ordering on full hit identity, used for deterministic
    /// deduplication after the parallel phase.
    #[must_use]
    pub fn cmp_identity(&self, other: &Self) -> Ordering {
        (
            &self.origin,
            &self.region.reference,
            &self.region.parts,
            strand_char(self.region.strand),
            self.frame,
            &self.keyword,
            &self.provenance,
        )
            .cmp(&(
                &other.origin,
                &other.region.reference,
                &other.region.parts,
                strand_char(other.region.strand),
                other.frame,
                &other.keyword,
                &other.provenance,
            ))
    }
}

impl PartialEq for GenomicHit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_identity(other) == Ordering::Equal
    }
}

impl Eq for GenomicHit {}

impl Hash for GenomicHit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.region.hash(state);
        self.keyword.hash(state);
        self.provenance.hash(state);
        self.origin.hash(state);
        self.frame.hash(state);
    }
}

/// Genomic category assigned to a hit.
///
/// Exactly one category is assigned per hit. The declaration order of the
/// scan categories (Cds..=Intergenic) is the classifier's predicate order;
/// the pre-check categories (Frameshift, Substitution, PeptideSpliced) rank
/// after Intergenic when competing for a call's best explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// In-frame inside an annotated coding sequence
    Cds,
    /// Supported by an RNA-seq-derived transcript
    RnaSeq,
    /// Inside the 5' untranslated region of a coding transcript
    Utr5,
    /// Inside a coding sequence but off-frame or antisense
    OffFrameCds,
    /// Extends from a coding sequence into a retained intron
    CdsIntoIntron,
    /// Inside the 3' untranslated region of a coding transcript
    Utr3,
    /// Inside a non-coding RNA
    NonCodingRna,
    /// Extends from a non-CDS exon into a retained intron
    OtherIntoIntron,
    /// Supported by an extra-database annotation
    Extra,
    /// Supported by a reads-derived annotation
    Reads,
    /// Inside a gene but not explained by any transcript feature
    Intronic,
    /// Outside all annotated genes
    Intergenic,
    /// Frameshifted continuation of a coding frame
    Frameshift,
    /// Single-residue substitution
    Substitution,
    /// Cis-spliced peptide joining two non-adjacent parts
    PeptideSpliced,
}

impl Category {
    /// All categories, in classifier scan order followed by pre-check order
    pub const ALL: [Self; 15] = [
        Self::Cds,
        Self::RnaSeq,
        Self::Utr5,
        Self::OffFrameCds,
        Self::CdsIntoIntron,
        Self::Utr3,
        Self::NonCodingRna,
        Self::OtherIntoIntron,
        Self::Extra,
        Self::Reads,
        Self::Intronic,
        Self::Intergenic,
        Self::Frameshift,
        Self::Substitution,
        Self::PeptideSpliced,
    ];

    /// Priority for best-location selection (lower wins)
    #[must_use]
    pub fn priority(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(usize::MAX)
    }

    /// Stable label used in output tables
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cds => "CDS",
            Self::RnaSeq => "RNA-seq",
            Self::Utr5 => "5'-UTR",
            Self::OffFrameCds => "OffFrame",
            Self::CdsIntoIntron => "CDS-intron",
            Self::Utr3 => "3'-UTR",
            Self::NonCodingRna => "ncRNA",
            Self::OtherIntoIntron => "other-intron",
            Self::Extra => "Extra",
            Self::Reads => "Reads",
            Self::Intronic => "Intronic",
            Self::Intergenic => "Intergenic",
            Self::Frameshift => "Frameshift",
            Self::Substitution => "Substitution",
            Self::PeptideSpliced => "Spliced",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category assignment for one hit: the category plus the transcripts that
/// contributed to the decision, preference-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCall {
    pub category: Category,
    pub transcripts: Vec<String>,
}

/// Decoy policy of a search unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoyPolicy {
    /// Target search, no decoy transform
    None,
    /// Sequence reversed (not complemented)
    Reverse,
    /// Sequence shuffled with a deterministic per-unit seed
    Shuffle,
}

impl DecoyPolicy {
    #[must_use]
    pub const fn is_decoy(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Search mode of a unit: selects frame count, decoy policy and the
/// specialized matcher that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Plain six-frame genomic window
    Genomic,
    /// Forward-frame spliced-transcript window
    Transcript,
    /// Frameshift re-splicing over CDS + 3'UTR
    Frameshift,
    /// Cis-spliced left+right part pairs over the CDS
    CisSpliced,
    /// One substitution at every CDS position
    Substitution,
    /// Extra amino-acid database
    Extra,
    /// RNA-seq-derived nucleotide sequences
    RnaSeqDb,
    /// Raw reads, counters only
    Reads,
}

impl SearchMode {
    /// Frames searched per unit (per strand for nucleotide units)
    #[must_use]
    pub const fn frame_count(self) -> usize {
        match self {
            Self::Genomic | Self::RnaSeqDb | Self::Reads => 6,
            Self::Transcript => 3,
            Self::Frameshift | Self::CisSpliced | Self::Substitution | Self::Extra => 1,
        }
    }

    /// Decoy policy used by the mode's decoy units
    #[must_use]
    pub const fn decoy_policy(self) -> DecoyPolicy {
        match self {
            Self::Genomic
            | Self::Transcript
            | Self::Frameshift
            | Self::CisSpliced
            | Self::Substitution => DecoyPolicy::Reverse,
            Self::Extra | Self::RnaSeqDb | Self::Reads => DecoyPolicy::Shuffle,
        }
    }
}

/// Error types that can occur during peptide search and localization
#[derive(Error, Debug)]
pub enum PeplocusError {
    /// Malformed peptide string in the input table
    #[error("Invalid peptide: {0}")]
    InvalidPeptide(String),
    /// Variant record disagrees with the provider's reference sequence
    #[error("Variant at {reference}:{position} does not match the reference (expected {expected}, found {found})")]
    VariantMismatch {
        reference: String,
        position: u64,
        expected: String,
        found: String,
    },
    /// Sequence name uses the reserved delimiter, prefix, or a pseudo-reference
    #[error("Reserved sequence name: {0}")]
    ReservedName(String),
    /// Classifier scan disagreed with the defensive re-check
    #[error("Classifier conflict: {0}")]
    ClassifierConflict(String),
    /// No predicate fired where one was structurally guaranteed
    #[error("No category matched: {0}")]
    NoCategoryMatched(String),
    /// A mapped region failed round-trip validation
    #[error("Coordinate validation failed: {0}")]
    CoordinateValidation(String),
    /// Reference name not known to the provider
    #[error("Unknown reference: {0}")]
    UnknownReference(String),
    /// Requested region exceeds the reference bounds
    #[error("Region out of bounds: {reference}:{start}-{end} (length {length})")]
    RegionOutOfBounds {
        reference: String,
        start: u64,
        end: u64,
        length: u64,
    },
    /// File I/O operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error parsing input data
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Keyword automaton construction failed
    #[error("Automaton build failed: {0}")]
    AutomatonBuild(String),
    /// Worker pool configuration failed
    #[error("Thread pool: {0}")]
    ThreadPool(String),
}
