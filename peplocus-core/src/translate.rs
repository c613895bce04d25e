//! Variant-aware multi-frame translation.
//!
//! One call to [`translate_and_match`] streams one strand of one window
//! through the keyword automaton. Variants branch the traversal into a
//! small DAG: the reference path is the main line, each alt allele opens a
//! branch that reconverges after the allele's reference span. Branches are
//! managed on an explicit worklist (no recursion) and capped.
//!
//! Three lanes translate phases 0/1/2 simultaneously. Each lane keeps a
//! ring buffer of the reference spans of its recent codons, sized to the
//! longest keyword, so a match can be mapped back to the exact consumed
//! reference interval even when indels change the emitted length.
//!
//! Decoy windows (reversed or shuffled) never carry variants; the caller
//! simply passes an empty variant slice.

use std::collections::VecDeque;

use crate::constants::MAX_VARIANT_BRANCHES;
use crate::keyword::{KeywordAutomaton, MatchVisitor, Prepared};
use crate::sequence::{reverse_complement, translate_codon};

/// One alt allele of one variant, window-relative.
///
/// Multi-allelic records are flattened into one `WindowVariant` per allele
/// before translation. Either allele side may be empty (pure indel).
#[derive(Debug, Clone)]
pub struct WindowVariant {
    /// Offset of the reference allele within the window
    pub offset: usize,
    pub ref_allele: Vec<u8>,
    pub alt: Vec<u8>,
    /// Carried verbatim into match provenance
    pub provenance: String,
}

/// One automaton match found during translation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslatedMatch {
    /// Keyword entry index
    pub pattern: usize,
    /// Keyword length in residues
    pub length: usize,
    /// Lane (frame offset 0..3) the match was found in
    pub frame: u8,
    /// Consumed reference interval within the window (half-open)
    pub ref_start: usize,
    pub ref_end: usize,
    /// Provenance of variants traversed inside the consumed interval
    pub variants: Vec<String>,
}

/// Reflects window variants for a reverse-complemented window.
///
/// Used when the reverse strand of a variant-carrying window is searched:
/// the window is reverse-complemented, so each allele moves to the mirrored
/// offset and both allele strings are reverse-complemented.
#[must_use]
pub fn reflect_variants(variants: &[WindowVariant], window_len: usize) -> Vec<WindowVariant> {
    let mut out: Vec<WindowVariant> = variants
        .iter()
        .filter(|v| v.offset + v.ref_allele.len() <= window_len)
        .map(|v| WindowVariant {
            offset: window_len - (v.offset + v.ref_allele.len()),
            ref_allele: reverse_complement(&v.ref_allele),
            alt: reverse_complement(&v.alt),
            provenance: v.provenance.clone(),
        })
        .collect();
    out.sort_by_key(|v| v.offset);
    out
}

#[derive(Clone)]
struct Lane<'a> {
    visitor: MatchVisitor<'a>,
    codon: [u8; 3],
    fill: usize,
    codon_start: usize,
    /// Reference span of each recently emitted residue, newest last
    spans: VecDeque<(usize, usize)>,
}

impl<'a> Lane<'a> {
    fn new(automaton: &'a KeywordAutomaton<Prepared>) -> Self {
        Self {
            visitor: automaton.visitor(),
            codon: [0; 3],
            fill: 0,
            codon_start: 0,
            spans: VecDeque::new(),
        }
    }
}

#[derive(Clone)]
struct Branch<'a> {
    pos: usize,
    next_variant: usize,
    emitted: usize,
    lanes: Vec<Lane<'a>>,
    /// (ref_start, ref_end, variant index) of every applied allele
    taken: Vec<(usize, usize, usize)>,
}

impl<'a> Branch<'a> {
    fn root(automaton: &'a KeywordAutomaton<Prepared>) -> Self {
        Self {
            pos: 0,
            next_variant: 0,
            emitted: 0,
            lanes: (0..3).map(|_| Lane::new(automaton)).collect(),
            taken: Vec::new(),
        }
    }

    fn emit(
        &mut self,
        nt: u8,
        span: (usize, usize),
        max_len: usize,
        variants: &[WindowVariant],
        out: &mut Vec<TranslatedMatch>,
    ) {
        for (frame, lane) in self.lanes.iter_mut().enumerate() {
            // Lane f skips the first f nucleotides of the stream
            if self.emitted < frame {
                continue;
            }
            if lane.fill == 0 {
                lane.codon_start = span.0;
            }
            lane.codon[lane.fill] = nt;
            lane.fill += 1;
            if lane.fill < 3 {
                continue;
            }
            lane.fill = 0;
            let residue = translate_codon(lane.codon);
            let codon_span = (lane.codon_start, span.1);
            lane.spans.push_back(codon_span);
            if lane.spans.len() > max_len {
                lane.spans.pop_front();
            }
            lane.visitor.step(residue);
            for (pattern, length) in lane.visitor.matches() {
                let ref_start = lane.spans[lane.spans.len() - length].0;
                let ref_end = codon_span.1;
                let traversed = self
                    .taken
                    .iter()
                    .filter(|(s, e, _)| *s < ref_end && *e >= ref_start)
                    .map(|(_, _, v)| variants[*v].provenance.clone())
                    .collect();
                out.push(TranslatedMatch {
                    pattern,
                    length,
                    frame: frame as u8,
                    ref_start,
                    ref_end,
                    variants: traversed,
                });
            }
        }
        self.emitted += 1;
    }
}

/// Streams one window through the automaton and collects every match.
///
/// `variants` must be window-relative and sorted by offset; pass an empty
/// slice for decoy windows and variant-free searches. The result is sorted
/// and deduplicated (branches share their reference prefix, so variant-free
/// matches are rediscovered by every branch).
#[must_use]
pub fn translate_and_match(
    seq: &[u8],
    variants: &[WindowVariant],
    automaton: &KeywordAutomaton<Prepared>,
) -> Vec<TranslatedMatch> {
    let max_len = automaton.max_len().max(1);
    let mut out = Vec::new();
    let mut worklist = vec![Branch::root(automaton)];
    let mut spawned = 1usize;

    while let Some(mut branch) = worklist.pop() {
        while branch.pos < seq.len() {
            while branch.next_variant < variants.len()
                && variants[branch.next_variant].offset < branch.pos
            {
                branch.next_variant += 1;
            }
            if branch.next_variant < variants.len()
                && variants[branch.next_variant].offset == branch.pos
            {
                let v_idx = branch.next_variant;
                let v = &variants[v_idx];
                branch.next_variant += 1;
                if spawned < MAX_VARIANT_BRANCHES
                    && branch.pos + v.ref_allele.len() <= seq.len()
                {
                    spawned += 1;
                    let mut alt = branch.clone();
                    let span = (branch.pos, branch.pos + v.ref_allele.len());
                    // Recorded before emission so matches completing inside
                    // the allele still pick up its provenance
                    alt.taken.push((span.0, span.1, v_idx));
                    for &nt in &v.alt {
                        alt.emit(nt, span, max_len, variants, &mut out);
                    }
                    alt.pos = span.1;
                    worklist.push(alt);
                }
                // The reference path continues past the allele
                continue;
            }
            let nt = seq[branch.pos];
            let span = (branch.pos, branch.pos + 1);
            branch.emit(nt, span, max_len, variants, &mut out);
            branch.pos += 1;
        }
    }

    out.sort_unstable();
    out.dedup();
    out
}
