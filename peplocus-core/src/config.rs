use crate::constants::{DEFAULT_MAX_SPLICE_GAP, DEFAULT_WINDOW_SIZE};
use crate::types::Category;

/// Output table selector.
///
/// A run produces two artifacts: the annotated identification table and the
/// FDR statistics table. Both are tab-separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Row-per-identification table: the input columns plus rank, location
    /// count, decoy flag, origin, location, category and match details.
    Annotated,

    /// One row per (length, category, origin, score) stratum cell with
    /// target/decoy/ambiguous counts and cumulative ratios.
    FdrStats,
}

/// Configuration settings for a peptide search run.
///
/// # Examples
///
/// ```rust
/// use peplocus_core::config::PeplocusConfig;
///
/// let config = PeplocusConfig {
///     window_size: 30_000,
///     spliced_search: false,
///     quiet: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PeplocusConfig {
    /// Genomic window size in nucleotides.
    ///
    /// Windows overlap by three times the longest keyword so no hit is lost
    /// on a boundary.
    ///
    /// **Default**: 90,000
    pub window_size: usize,

    /// Maximum intervening distance (in residues) for cis-splicing.
    ///
    /// **Default**: 25
    pub max_splice_gap: usize,

    /// Search spliced-transcript windows for junction-spanning peptides.
    ///
    /// **Default**: `true`
    pub transcript_search: bool,

    /// Search frameshifted continuations of annotated coding frames.
    ///
    /// **Default**: `true`
    pub frameshift_search: bool,

    /// Search cis-spliced left+right part pairs over coding sequences.
    ///
    /// **Default**: `true`
    pub spliced_search: bool,

    /// Search single-residue substitutions over coding sequences.
    ///
    /// **Default**: `true`
    pub substitution_search: bool,

    /// Restrict the classifier to a subset of scan categories.
    ///
    /// Intergenic is always retained as the terminal predicate so that
    /// classification stays total. `None` enables every category.
    ///
    /// **Default**: `None`
    pub enabled_categories: Option<Vec<Category>>,

    /// Number of worker threads for the parallel search phase.
    ///
    /// When set, a dedicated fixed-size pool is built for the run; `None`
    /// uses the process-wide default pool.
    ///
    /// **Default**: `None`
    pub num_threads: Option<usize>,

    /// Suppress progress messages on stderr.
    ///
    /// **Default**: `false`
    pub quiet: bool,

    /// Output table written by `write_results`.
    ///
    /// **Default**: [`OutputFormat::Annotated`]
    pub output_format: OutputFormat,
}

impl Default for PeplocusConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            max_splice_gap: DEFAULT_MAX_SPLICE_GAP,
            transcript_search: true,
            frameshift_search: true,
            spliced_search: true,
            substitution_search: true,
            enabled_categories: None,
            num_threads: None,
            quiet: false,
            output_format: OutputFormat::Annotated,
        }
    }
}
