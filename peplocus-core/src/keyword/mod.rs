//! Canonical keyword registry and multi-pattern automaton.
//!
//! Every peptide call is expanded into its canonical keywords (bounded
//! per-position ambiguity resolution), each unique keyword is registered
//! once, and a single Aho–Corasick DFA over all keywords is built before
//! the parallel phase. Matching is streaming: a [`MatchVisitor`] steps one
//! residue at a time and reports every keyword accepted at the current
//! state, including overlapping matches. Visitors are cheap to clone, which
//! is how the variant DAG forks automaton state at branch points.
//!
//! The build/prepare split uses the same type-state pattern as the engine:
//! a [`KeywordAutomaton<Building>`] accepts insertions, [`prepare`]
//! freezes it into a [`KeywordAutomaton<Prepared>`] that is shared
//! read-only across workers (only the per-keyword result containers remain
//! writable, behind their own locks).
//!
//! [`prepare`]: KeywordAutomaton::prepare
//!
//! # Examples
//!
//! ```rust
//! use peplocus_core::keyword::KeywordAutomaton;
//!
//! let mut automaton = KeywordAutomaton::new();
//! automaton.insert_call(0, "SAMPLER").unwrap();
//! let automaton = automaton.prepare().unwrap();
//!
//! let matches = automaton.find_in(b"XXSAMPLERXX");
//! assert_eq!(matches, vec![(0, 9)]); // (pattern index, end offset)
//! ```

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use aho_corasick::automaton::{Automaton, StateID};
use aho_corasick::dfa::DFA;
use aho_corasick::{Anchored, MatchKind};

use crate::constants::{MAX_KEYWORDS_PER_CALL, MAX_PEPTIDE_LENGTH, MIN_PEPTIDE_LENGTH};
use crate::sequence::is_residue;
use crate::types::{GenomicHit, PeplocusError};

/// Marker trait for automaton build states
pub trait BuildState {}

/// Marker type: keywords may still be inserted
#[derive(Debug, Clone)]
pub struct Building;

/// Marker type: failure transitions built, matching available
#[derive(Debug, Clone)]
pub struct Prepared;

impl BuildState for Building {}
impl BuildState for Prepared {}

/// Target/decoy read-support counters used in read-search mode.
///
/// Read search stores no coordinates; two atomic counters per keyword
/// bound memory regardless of read volume.
#[derive(Debug, Default)]
pub struct ReadSupport {
    target: AtomicU64,
    decoy: AtomicU64,
}

impl ReadSupport {
    pub fn add_target(&self) {
        self.target.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_decoy(&self) {
        self.decoy.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn target(&self) -> u64 {
        self.target.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn decoy(&self) -> u64 {
        self.decoy.load(Ordering::Relaxed)
    }
}

/// One canonical keyword with its shared result container
#[derive(Debug)]
pub struct KeywordEntry {
    /// The canonical residue string
    pub keyword: String,
    /// Input rows whose expansion produced this keyword
    pub calls: Vec<usize>,
    /// Hits appended by workers under this fine-grained lock
    pub hits: Mutex<Vec<GenomicHit>>,
    /// Read-mode support counters
    pub read_support: ReadSupport,
}

impl KeywordEntry {
    fn new(keyword: String) -> Self {
        Self {
            keyword,
            calls: Vec::new(),
            hits: Mutex::new(Vec::new()),
            read_support: ReadSupport::default(),
        }
    }
}

/// Bounded per-position ambiguity: at most one alternative residue.
///
/// - I and L are indistinguishable by mass and interchange anywhere.
/// - Q deamidates to E, asserted for position 0 only.
/// - D immediately before G may be a deamidated N.
#[must_use]
pub fn alternative_residue(residues: &[u8], position: usize) -> Option<u8> {
    match residues[position] {
        b'I' => Some(b'L'),
        b'L' => Some(b'I'),
        b'Q' if position == 0 => Some(b'E'),
        b'D' if residues.get(position + 1) == Some(&b'G') => Some(b'N'),
        _ => None,
    }
}

/// Enumerates all ambiguity resolutions of a residue string.
///
/// The result is deduplicated and capped at
/// [`MAX_KEYWORDS_PER_CALL`]; the original string always comes first.
#[must_use]
pub fn expand_ambiguity(residues: &str) -> Vec<String> {
    let bytes = residues.as_bytes();
    let mut expansions: Vec<Vec<u8>> = vec![bytes.to_vec()];
    for position in 0..bytes.len() {
        if let Some(alt) = alternative_residue(bytes, position) {
            let mut alternates = Vec::with_capacity(expansions.len());
            for e in &expansions {
                if expansions.len() + alternates.len() >= MAX_KEYWORDS_PER_CALL {
                    break;
                }
                let mut flipped = e.clone();
                flipped[position] = alt;
                alternates.push(flipped);
            }
            expansions.extend(alternates);
        }
    }
    let mut seen = HashSet::new();
    expansions
        .into_iter()
        .filter_map(|e| String::from_utf8(e).ok())
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

/// Multi-pattern matcher over all canonical keywords.
///
/// Built once from all calls, frozen by [`prepare`](Self::prepare) before
/// the parallel phase, and read-only afterwards except for the per-keyword
/// result containers.
#[derive(Debug)]
pub struct KeywordAutomaton<S: BuildState> {
    entries: Vec<KeywordEntry>,
    index: HashMap<String, usize>,
    dfa: Option<DFA>,
    start: Option<StateID>,
    max_len: usize,
    _state: PhantomData<S>,
}

impl Default for KeywordAutomaton<Building> {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordAutomaton<Building> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            dfa: None,
            start: None,
            max_len: 0,
            _state: PhantomData,
        }
    }

    /// Expands one call and registers its keywords, sharing the result
    /// container of any keyword that already exists.
    ///
    /// Returns the entry indices the call maps to.
    ///
    /// # Errors
    ///
    /// [`PeplocusError::InvalidPeptide`] for residues outside the standard
    /// alphabet or lengths outside the accepted range.
    pub fn insert_call(
        &mut self,
        call_index: usize,
        residues: &str,
    ) -> Result<Vec<usize>, PeplocusError> {
        if residues.len() < MIN_PEPTIDE_LENGTH || residues.len() > MAX_PEPTIDE_LENGTH {
            return Err(PeplocusError::InvalidPeptide(format!(
                "{residues}: length outside {MIN_PEPTIDE_LENGTH}..={MAX_PEPTIDE_LENGTH}"
            )));
        }
        if let Some(bad) = residues.bytes().find(|&b| !is_residue(b)) {
            return Err(PeplocusError::InvalidPeptide(format!(
                "{residues}: unknown residue {}",
                bad as char
            )));
        }

        let mut indices = Vec::new();
        for keyword in expand_ambiguity(residues) {
            let idx = match self.index.get(&keyword) {
                Some(&idx) => idx,
                None => {
                    let idx = self.entries.len();
                    self.index.insert(keyword.clone(), idx);
                    self.entries.push(KeywordEntry::new(keyword.clone()));
                    self.max_len = self.max_len.max(keyword.len());
                    idx
                }
            };
            if !self.entries[idx].calls.contains(&call_index) {
                self.entries[idx].calls.push(call_index);
            }
            indices.push(idx);
        }
        Ok(indices)
    }

    /// Builds the failure transitions, freezing the keyword set.
    ///
    /// Single-threaded; must complete before any concurrent search.
    pub fn prepare(self) -> Result<KeywordAutomaton<Prepared>, PeplocusError> {
        let dfa = DFA::builder()
            .match_kind(MatchKind::Standard)
            .build(self.entries.iter().map(|e| e.keyword.as_bytes()))
            .map_err(|e| PeplocusError::AutomatonBuild(e.to_string()))?;
        let start = dfa
            .start_state(Anchored::No)
            .map_err(|e| PeplocusError::AutomatonBuild(e.to_string()))?;
        Ok(KeywordAutomaton {
            entries: self.entries,
            index: self.index,
            dfa: Some(dfa),
            start: Some(start),
            max_len: self.max_len,
            _state: PhantomData,
        })
    }
}

impl<S: BuildState> KeywordAutomaton<S> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> &KeywordEntry {
        &self.entries[index]
    }

    /// Length of the longest registered keyword
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Entry index of an exact keyword, if registered
    #[must_use]
    pub fn keyword_index(&self, keyword: &str) -> Option<usize> {
        self.index.get(keyword).copied()
    }
}

impl KeywordAutomaton<Prepared> {
    /// Fresh streaming visitor positioned at the start state
    #[must_use]
    pub fn visitor(&self) -> MatchVisitor<'_> {
        MatchVisitor {
            automaton: self,
            state: self.start.expect("prepared automaton has a start state"),
        }
    }

    /// Runs the visitor over a complete residue slice.
    ///
    /// Returns `(pattern index, end offset)` for every (overlapping) match.
    #[must_use]
    pub fn find_in(&self, residues: &[u8]) -> Vec<(usize, usize)> {
        let mut visitor = self.visitor();
        let mut out = Vec::new();
        for (i, &residue) in residues.iter().enumerate() {
            visitor.step(residue);
            for (pattern, _len) in visitor.matches() {
                out.push((pattern, i + 1));
            }
        }
        out
    }
}

/// Streaming matcher state over the prepared automaton.
///
/// Cloning forks the state, which is how translation branches share their
/// common prefix.
#[derive(Debug, Clone)]
pub struct MatchVisitor<'a> {
    automaton: &'a KeywordAutomaton<Prepared>,
    state: StateID,
}

impl MatchVisitor<'_> {
    fn dfa(&self) -> &DFA {
        self.automaton
            .dfa
            .as_ref()
            .expect("prepared automaton has a DFA")
    }

    /// Advances by one residue
    pub fn step(&mut self, residue: u8) {
        self.state = self.dfa().next_state(Anchored::No, self.state, residue);
    }

    /// Every keyword accepted at the current position, as
    /// `(pattern index, keyword length)`.
    #[must_use]
    pub fn matches(&self) -> Vec<(usize, usize)> {
        let dfa = self.dfa();
        if !dfa.is_match(self.state) {
            return Vec::new();
        }
        (0..dfa.match_len(self.state))
            .map(|i| {
                let pattern = dfa.match_pattern(self.state, i).as_usize();
                (pattern, self.automaton.entries[pattern].keyword.len())
            })
            .collect()
    }

    /// Back to the start state
    pub fn reset(&mut self) {
        self.state = self
            .automaton
            .start
            .expect("prepared automaton has a start state");
    }
}
