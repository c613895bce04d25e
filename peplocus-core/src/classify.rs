//! Genomic-category classification.
//!
//! Each mapped hit receives exactly one category. Pre-checks handle the
//! anchors that bypass annotation reasoning (pseudo-references, frameshift
//! span arithmetic, variant notation, spliced provenance); everything else
//! runs through a fixed ordered predicate list where the first match wins.
//! The list replaces the dynamic dispatch of per-category classes with
//! plain functions evaluated in declaration order, and the once-built
//! [`ClassifyContext`] replaces global indices: it owns the retained-intron
//! index and the enabled-category order, built at startup and shared
//! read-only.

use crate::constants::{PSEUDO_EXTRA, PSEUDO_READS, PSEUDO_RNASEQ};
use crate::provider::{SequenceProvider, Transcript, TranscriptSource};
use crate::types::{strand_char, Category, CategoryCall, GenomicHit, PeplocusError, RegionPart};

/// One intron retained by a sibling transcript's exon
#[derive(Debug, Clone)]
pub struct RetainedIntron {
    pub reference: String,
    pub start: u64,
    pub end: u64,
}

/// Read-only classification context, built once before the final phase
pub struct ClassifyContext<'a> {
    provider: &'a dyn SequenceProvider,
    retained_introns: Vec<RetainedIntron>,
    enabled: Vec<Category>,
}

/// Number of scan categories (the rest of [`Category::ALL`] are pre-checks)
const SCAN_CATEGORIES: usize = 12;

impl<'a> ClassifyContext<'a> {
    /// Builds the context: retained-intron index plus the ordered enabled
    /// list. Intergenic is always retained as the terminal predicate so
    /// classification stays total for any subset.
    pub fn new(provider: &'a dyn SequenceProvider, enabled: Option<&[Category]>) -> Self {
        let scan = &Category::ALL[..SCAN_CATEGORIES];
        let enabled = match enabled {
            None => scan.to_vec(),
            Some(subset) => {
                let mut list: Vec<Category> =
                    scan.iter().copied().filter(|c| subset.contains(c)).collect();
                if !list.contains(&Category::Intergenic) {
                    list.push(Category::Intergenic);
                }
                list
            }
        };
        Self {
            provider,
            retained_introns: build_retained_intron_index(provider.transcripts()),
            enabled,
        }
    }

    fn retained_overlap(&self, reference: &str, start: u64, end: u64) -> bool {
        self.retained_introns
            .iter()
            .any(|ri| ri.reference == reference && ri.start < end && start < ri.end)
    }
}

/// Introns fully covered by an exon of a sibling transcript of the same gene
fn build_retained_intron_index(transcripts: &[Transcript]) -> Vec<RetainedIntron> {
    let mut out: Vec<RetainedIntron> = Vec::new();
    for t in transcripts {
        for pair in t.exons.windows(2) {
            let (intron_start, intron_end) = (pair[0].end, pair[1].start);
            if intron_start >= intron_end {
                continue;
            }
            let retained = transcripts.iter().any(|other| {
                other.id != t.id
                    && other.gene_id == t.gene_id
                    && other.reference == t.reference
                    && other
                        .exons
                        .iter()
                        .any(|e| e.start <= intron_start && intron_end <= e.end)
            });
            if retained
                && !out.iter().any(|ri| {
                    ri.reference == t.reference && ri.start == intron_start && ri.end == intron_end
                })
            {
                out.push(RetainedIntron {
                    reference: t.reference.clone(),
                    start: intron_start,
                    end: intron_end,
                });
            }
        }
    }
    out
}

fn strand_matches(hit: &GenomicHit, t: &Transcript) -> bool {
    strand_char(hit.region.strand) == strand_char(t.strand)
}

/// Clean in-frame sense placement inside the CDS of one coding transcript
fn in_frame_cds(hit: &GenomicHit, t: &Transcript) -> bool {
    if !t.is_coding() || !strand_matches(hit, t) {
        return false;
    }
    let Some((ts, te)) = t.region_to_transcript_interval(&hit.region.parts) else {
        return false;
    };
    let Some((cs, ce)) = t.cds_transcript_range() else {
        return false;
    };
    ts >= cs && te <= ce && (ts - cs) % 3 == 0
}

fn overlaps_parts(parts: &[RegionPart], start: u64, end: u64) -> bool {
    parts.iter().any(|p| p.overlaps(start, end))
}

/// Evaluates one scan predicate; `Some(transcripts)` means it fired.
fn predicate<'t>(
    category: Category,
    hit: &GenomicHit,
    overlapping: &[&'t Transcript],
    ctx: &ClassifyContext<'_>,
) -> Option<Vec<&'t Transcript>> {
    let base = hit.region.base_reference();
    let (span_start, span_end) = hit.region.span();
    let firing: Vec<&Transcript> = match category {
        Category::Cds => overlapping
            .iter()
            .filter(|t| in_frame_cds(hit, t))
            .copied()
            .collect(),
        Category::RnaSeq => overlapping
            .iter()
            .filter(|t| {
                t.source == TranscriptSource::RnaSeq
                    && t.region_to_transcript_interval(&hit.region.parts).is_some()
            })
            .copied()
            .collect(),
        Category::Utr5 => overlapping
            .iter()
            .filter(|t| {
                t.is_coding() && strand_matches(hit, t) && {
                    match (
                        t.region_to_transcript_interval(&hit.region.parts),
                        t.cds_transcript_range(),
                    ) {
                        (Some((_, te)), Some((cs, _))) => te <= cs,
                        _ => false,
                    }
                }
            })
            .copied()
            .collect(),
        Category::OffFrameCds => overlapping
            .iter()
            .filter(|t| {
                t.is_coding()
                    && !in_frame_cds(hit, t)
                    && match (
                        t.region_to_transcript_interval(&hit.region.parts),
                        t.cds_transcript_range(),
                    ) {
                        (Some((ts, te)), Some((cs, ce))) => ts < ce && cs < te,
                        _ => false,
                    }
            })
            .copied()
            .collect(),
        Category::CdsIntoIntron => overlapping
            .iter()
            .filter(|t| {
                t.is_coding()
                    && !t.contains_in_exons(&hit.region.parts)
                    && t.cds
                        .is_some_and(|cds| overlaps_parts(&hit.region.parts, cds.start, cds.end))
                    && ctx.retained_overlap(base, span_start, span_end)
            })
            .copied()
            .collect(),
        Category::Utr3 => overlapping
            .iter()
            .filter(|t| {
                t.is_coding() && strand_matches(hit, t) && {
                    match (
                        t.region_to_transcript_interval(&hit.region.parts),
                        t.cds_transcript_range(),
                    ) {
                        (Some((ts, _)), Some((_, ce))) => ts >= ce,
                        _ => false,
                    }
                }
            })
            .copied()
            .collect(),
        Category::NonCodingRna => overlapping
            .iter()
            .filter(|t| {
                !t.is_coding()
                    && matches!(
                        t.source,
                        TranscriptSource::Curated | TranscriptSource::Reference
                    )
                    && t.region_to_transcript_interval(&hit.region.parts).is_some()
            })
            .copied()
            .collect(),
        Category::OtherIntoIntron => overlapping
            .iter()
            .filter(|t| {
                !t.contains_in_exons(&hit.region.parts)
                    && t.exons
                        .iter()
                        .any(|e| overlaps_parts(&hit.region.parts, e.start, e.end))
                    && ctx.retained_overlap(base, span_start, span_end)
            })
            .copied()
            .collect(),
        Category::Extra => overlapping
            .iter()
            .filter(|t| {
                t.source == TranscriptSource::Extra
                    && t.region_to_transcript_interval(&hit.region.parts).is_some()
            })
            .copied()
            .collect(),
        Category::Reads => overlapping
            .iter()
            .filter(|t| {
                t.source == TranscriptSource::Reads
                    && t.region_to_transcript_interval(&hit.region.parts).is_some()
            })
            .copied()
            .collect(),
        Category::Intronic => {
            if ctx
                .provider
                .genes_overlapping(base, span_start, span_end)
                .is_empty()
            {
                return None;
            }
            overlapping.to_vec()
        }
        Category::Intergenic => return Some(Vec::new()),
        // Pre-check categories never appear in the scan list
        _ => return None,
    };
    // Intronic fires on gene overlap even with no transcript to report
    if firing.is_empty() && category != Category::Intronic {
        None
    } else {
        Some(firing)
    }
}

/// Preference order among qualifying transcripts: longest overlap, then
/// curated/reference source, then longest transcript, then id.
fn prefer_sort<'t>(mut txs: Vec<&'t Transcript>, hit: &GenomicHit) -> Vec<&'t Transcript> {
    txs.sort_by(|a, b| {
        b.overlap_len(&hit.region.parts)
            .cmp(&a.overlap_len(&hit.region.parts))
            .then_with(|| a.source.rank().cmp(&b.source.rank()))
            .then_with(|| b.spliced_len().cmp(&a.spliced_len()))
            .then_with(|| a.id.cmp(&b.id))
    });
    txs
}

fn ids(txs: Vec<&Transcript>) -> Vec<String> {
    txs.into_iter().map(|t| t.id.clone()).collect()
}

/// Narrow unspliced-CDS re-check used to cross-validate the scan
fn unspliced_cds_expected(hit: &GenomicHit, overlapping: &[&Transcript]) -> bool {
    hit.region.parts.len() == 1 && overlapping.iter().any(|t| in_frame_cds(hit, t))
}

/// Assigns exactly one category to a hit.
///
/// Deterministic for a fixed context. A disagreement between the scan
/// and the defensive unspliced-CDS re-check, or no predicate firing where
/// the terminal predicate was enabled, is a fatal inconsistency.
pub fn classify(hit: &GenomicHit, ctx: &ClassifyContext<'_>) -> Result<CategoryCall, PeplocusError> {
    let base = hit.region.base_reference();

    // Pseudo-reference anchors classify directly
    let direct = match base {
        PSEUDO_READS => Some(Category::Reads),
        PSEUDO_EXTRA => Some(Category::Extra),
        PSEUDO_RNASEQ => Some(Category::RnaSeq),
        _ => None,
    };
    if let Some(category) = direct {
        return Ok(CategoryCall {
            category,
            transcripts: Vec::new(),
        });
    }

    let (span_start, span_end) = hit.region.span();
    let overlapping = ctx.provider.transcripts_overlapping(base, span_start, span_end);

    // A compact hit whose span is not a codon multiple inside a complete
    // coding transcript is a frameshift continuation
    if hit.region.span_len() % 3 != 0 && hit.region.is_compact() {
        let txs: Vec<&Transcript> = overlapping
            .iter()
            .filter(|t| {
                t.is_coding()
                    && t.cds_complete
                    && t.genomic_span().start <= span_start
                    && span_end <= t.genomic_span().end
            })
            .copied()
            .collect();
        if !txs.is_empty() {
            return Ok(CategoryCall {
                category: Category::Frameshift,
                transcripts: ids(prefer_sort(txs, hit)),
            });
        }
    }

    // Variant notation marks a substitution
    if hit.provenance.contains('>') || hit.provenance.starts_with("p.") {
        let txs: Vec<&Transcript> = overlapping.iter().filter(|t| t.is_coding()).copied().collect();
        return Ok(CategoryCall {
            category: Category::Substitution,
            transcripts: ids(prefer_sort(txs, hit)),
        });
    }

    // Two or more colon-delimited location tokens mark a cis-spliced hit
    if hit.provenance.split(':').count() >= 2 {
        return Ok(CategoryCall {
            category: Category::PeptideSpliced,
            transcripts: ids(prefer_sort(overlapping.clone(), hit)),
        });
    }

    for &category in &ctx.enabled {
        if let Some(txs) = predicate(category, hit, &overlapping, ctx) {
            if category != Category::Cds
                && ctx.enabled.contains(&Category::Cds)
                && unspliced_cds_expected(hit, &overlapping)
            {
                return Err(PeplocusError::ClassifierConflict(format!(
                    "{}: scan chose {category} but the unspliced CDS re-check fired",
                    hit.region
                )));
            }
            return Ok(CategoryCall {
                category,
                transcripts: ids(prefer_sort(txs, hit)),
            });
        }
    }

    Err(PeplocusError::NoCategoryMatched(hit.region.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use crate::types::GenomicRegion;
    use bio::bio_types::strand::Strand;

    const SAMPLER_NT: &[u8] = b"TCTGCTATGCCTCTTGAACGT";

    /// chr1: 30-nt pad, SAMPLER coding region, pad to 120; chr2 carries a
    /// retained-intron gene pair.
    fn fixture() -> InMemoryProvider {
        let mut chr1 = vec![b'A'; 30];
        chr1.extend_from_slice(SAMPLER_NT);
        chr1.extend(vec![b'A'; 69]);
        let mut provider = InMemoryProvider::new();
        provider.add_sequence("chr1", chr1).unwrap();
        provider.add_sequence("chr2", vec![b'A'; 100]).unwrap();

        provider
            .add_transcript(Transcript {
                id: "T1".to_string(),
                gene_id: "G1".to_string(),
                reference: "chr1".to_string(),
                strand: Strand::Forward,
                exons: vec![RegionPart::new(0, 81)],
                cds: Some(RegionPart::new(30, 51)),
                source: TranscriptSource::Curated,
                cds_complete: true,
            })
            .unwrap();
        // Spliced coding transcript with a retained intron in its sibling
        provider
            .add_transcript(Transcript {
                id: "T3".to_string(),
                gene_id: "G2".to_string(),
                reference: "chr2".to_string(),
                strand: Strand::Forward,
                exons: vec![RegionPart::new(0, 20), RegionPart::new(40, 60)],
                cds: Some(RegionPart::new(0, 60)),
                source: TranscriptSource::Curated,
                cds_complete: true,
            })
            .unwrap();
        provider
            .add_transcript(Transcript {
                id: "T4".to_string(),
                gene_id: "G2".to_string(),
                reference: "chr2".to_string(),
                strand: Strand::Forward,
                exons: vec![RegionPart::new(0, 60)],
                cds: None,
                source: TranscriptSource::Reference,
                cds_complete: false,
            })
            .unwrap();
        // Non-coding two-exon transcript with an unretained intron
        provider
            .add_transcript(Transcript {
                id: "T5".to_string(),
                gene_id: "G3".to_string(),
                reference: "chr2".to_string(),
                strand: Strand::Forward,
                exons: vec![RegionPart::new(70, 75), RegionPart::new(95, 100)],
                cds: None,
                source: TranscriptSource::Curated,
                cds_complete: false,
            })
            .unwrap();
        provider
    }

    fn hit(reference: &str, start: u64, end: u64, strand: Strand) -> GenomicHit {
        GenomicHit {
            region: GenomicRegion::contiguous(reference, strand, start, end),
            keyword: "SAMPLER".to_string(),
            provenance: String::new(),
            origin: "genome".to_string(),
            frame: 0,
        }
    }

    fn classify_with(provider: &InMemoryProvider, h: &GenomicHit) -> CategoryCall {
        let ctx = ClassifyContext::new(provider, None);
        classify(h, &ctx).unwrap()
    }

    #[test]
    fn test_cds_in_frame() {
        let provider = fixture();
        let call = classify_with(&provider, &hit("chr1", 30, 51, Strand::Forward));
        assert_eq!(call.category, Category::Cds);
        assert_eq!(call.transcripts, vec!["T1".to_string()]);
    }

    #[test]
    fn test_off_frame_cds() {
        let provider = fixture();
        // Shifted by one: inside the CDS but out of frame
        let call = classify_with(&provider, &hit("chr1", 31, 52, Strand::Forward));
        assert_eq!(call.category, Category::OffFrameCds);
        // Antisense over the CDS is off-frame too
        let call = classify_with(&provider, &hit("chr1", 30, 51, Strand::Reverse));
        assert_eq!(call.category, Category::OffFrameCds);
    }

    #[test]
    fn test_utr_categories() {
        let provider = fixture();
        let call = classify_with(&provider, &hit("chr1", 6, 27, Strand::Forward));
        assert_eq!(call.category, Category::Utr5);
        let call = classify_with(&provider, &hit("chr1", 54, 75, Strand::Forward));
        assert_eq!(call.category, Category::Utr3);
    }

    #[test]
    fn test_intergenic_and_intronic() {
        let provider = fixture();
        let call = classify_with(&provider, &hit("chr1", 100, 110, Strand::Forward));
        assert_eq!(call.category, Category::Intergenic);
        assert!(call.transcripts.is_empty());

        // Inside the unretained intron of G3, explained by no feature
        let call = classify_with(&provider, &hit("chr2", 80, 92, Strand::Forward));
        assert_eq!(call.category, Category::Intronic);
        assert_eq!(call.transcripts, vec!["T5".to_string()]);
    }

    #[test]
    fn test_cds_into_retained_intron() {
        let provider = fixture();
        // Crosses from a CDS exon of T3 into its retained intron
        let call = classify_with(&provider, &hit("chr2", 15, 36, Strand::Forward));
        assert_eq!(call.category, Category::CdsIntoIntron);
        assert_eq!(call.transcripts, vec!["T3".to_string()]);
    }

    #[test]
    fn test_frameshift_precheck_on_compact_nonmultiple_span() {
        let provider = fixture();
        let mut h = hit("chr1", 30, 52, Strand::Forward);
        h.region.parts = vec![RegionPart::new(30, 42), RegionPart::new(43, 52)];
        let call = classify_with(&provider, &h);
        assert_eq!(call.category, Category::Frameshift);
        assert_eq!(call.transcripts, vec!["T1".to_string()]);
    }

    #[test]
    fn test_substitution_precheck_on_variant_notation() {
        let provider = fixture();
        let mut h = hit("chr1", 30, 51, Strand::Forward);
        h.provenance = "p.W8L".to_string();
        assert_eq!(
            classify_with(&provider, &h).category,
            Category::Substitution
        );
        h.provenance = "g.31A>T".to_string();
        assert_eq!(
            classify_with(&provider, &h).category,
            Category::Substitution
        );
    }

    #[test]
    fn test_spliced_precheck_on_colon_tokens() {
        let provider = fixture();
        let mut h = hit("chr1", 30, 51, Strand::Forward);
        h.region.parts = vec![RegionPart::new(30, 42), RegionPart::new(60, 69)];
        h.provenance = "30-42:60-69".to_string();
        assert_eq!(
            classify_with(&provider, &h).category,
            Category::PeptideSpliced
        );
    }

    #[test]
    fn test_pseudo_reference_prechecks() {
        let provider = fixture();
        assert_eq!(
            classify_with(&provider, &hit("reads", 0, 7, Strand::Forward)).category,
            Category::Reads
        );
        assert_eq!(
            classify_with(&provider, &hit("extra", 0, 7, Strand::Forward)).category,
            Category::Extra
        );
        assert_eq!(
            classify_with(&provider, &hit("REV_rnaseq", 0, 21, Strand::Forward)).category,
            Category::RnaSeq
        );
    }

    #[test]
    fn test_deterministic_and_exactly_one() {
        // Exactly one category, stable across repeated calls
        let provider = fixture();
        let h = hit("chr1", 30, 51, Strand::Forward);
        let ctx = ClassifyContext::new(&provider, None);
        let first = classify(&h, &ctx).unwrap();
        for _ in 0..5 {
            assert_eq!(classify(&h, &ctx).unwrap(), first);
        }
    }

    #[test]
    fn test_enabled_subset_stays_total() {
        // Under a category subset, Intergenic is retained as terminal
        let provider = fixture();
        let h = hit("chr1", 30, 51, Strand::Forward);
        let ctx = ClassifyContext::new(&provider, Some(&[Category::Utr5]));
        let call = classify(&h, &ctx).unwrap();
        assert_eq!(call.category, Category::Intergenic);
    }

    #[test]
    fn test_decoy_hits_classify_on_base_reference() {
        let provider = fixture();
        let call = classify_with(&provider, &hit("REV_chr1", 30, 51, Strand::Forward));
        assert_eq!(call.category, Category::Cds);
    }

    #[test]
    fn test_retained_intron_index() {
        let provider = fixture();
        let index = build_retained_intron_index(provider.transcripts());
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].start, 20);
        assert_eq!(index[0].end, 40);
    }
}
