// =============================================================================
// General
// =============================================================================

/// Version string for peplocus
pub const VERSION: &str = "1.0.0";

/// Length of a codon in nucleotides
pub const CODON_LENGTH: usize = 3;

/// Number of reading frames per strand
pub const READING_FRAMES: usize = 3;

// =============================================================================
// Naming conventions
// =============================================================================

/// Reference-name prefix marking decoy hits.
///
/// Decoy-ness of a hit is inferred solely from this prefix; there is no
/// separate decoy flag on [`crate::types::GenomicHit`]. The classifier and
/// the FDR accumulator rely on the same convention.
pub const DECOY_PREFIX: &str = "REV_";

/// Delimiter reserved for location strings; forbidden inside sequence names
pub const RESERVED_DELIMITER: char = ':';

/// Pseudo-reference anchoring hits found in the extra amino-acid database
pub const PSEUDO_EXTRA: &str = "extra";

/// Pseudo-reference anchoring hits found in RNA-seq-derived sequences
pub const PSEUDO_RNASEQ: &str = "rnaseq";

/// Pseudo-reference anchoring read-support counts
pub const PSEUDO_READS: &str = "reads";

// =============================================================================
// Peptides and keywords
// =============================================================================

/// Minimum accepted peptide length in residues
pub const MIN_PEPTIDE_LENGTH: usize = 5;

/// Maximum accepted peptide length in residues
pub const MAX_PEPTIDE_LENGTH: usize = 60;

/// Cap on ambiguity expansions per peptide call (excess dropped with a warning)
pub const MAX_KEYWORDS_PER_CALL: usize = 512;

/// The twenty standard amino-acid residues
pub const RESIDUE_ALPHABET: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Substitution-search alphabet: the standard residues excluding isoleucine.
///
/// I is omitted because I/L ambiguity expansion already searches the leucine
/// form of every isoleucine-containing keyword.
pub const SUBSTITUTION_ALPHABET: &[u8] = b"ACDEFGHKLMNPQRSTVWY";

/// Monoisotopic mass shift of deamidation (N->D, Q->E)
pub const DEAMIDATION_DELTA: f64 = 0.984_016;

/// Tolerance for recognizing a distinguishing modification delta
pub const MODIFICATION_TOLERANCE: f64 = 0.01;

// =============================================================================
// Search units
// =============================================================================

/// Default genomic window size in nucleotides
pub const DEFAULT_WINDOW_SIZE: usize = 90_000;

/// Maximum variants considered per genomic window
pub const MAX_WINDOW_VARIANTS: usize = 8;

/// Maximum live branches while traversing a variant DAG
pub const MAX_VARIANT_BRANCHES: usize = 64;

/// Frame shifts explored downstream of each codon boundary
pub const FRAMESHIFT_DELTAS: [i64; 4] = [-2, -1, 1, 2];

/// Default maximum intervening distance (in residues) for cis-splicing
pub const DEFAULT_MAX_SPLICE_GAP: usize = 25;

/// Reads processed per counting task
pub const READ_BATCH_SIZE: usize = 512;

/// Maximum gap (nt) between two region parts still considered one compact hit
pub const COMPACT_GAP_LIMIT: u64 = 2;

// =============================================================================
// FDR
// =============================================================================

/// Number of confidence-score bins (scores 0..=100)
pub const SCORE_BINS: usize = 101;
