//! Expansion of query patterns into the index terms they match.

use std::{collections::HashSet, str};

use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, SINK_STATE};
use tantivy::{Searcher, schema::Field, termdict::TermDictionary};
use tantivy_fst::{Automaton, Regex};
use tracing::debug;

use super::compile::TermPattern;

/// Wrapper that implements `tantivy_fst::Automaton` for `levenshtein_automata::DFA`.
pub struct LevenshteinDfa(levenshtein_automata::DFA);

impl LevenshteinDfa {
    /// Builds an automaton accepting keys within `distance` edits of `term`.
    ///
    /// With `prefix` set, keys are accepted when some prefix of them is within
    /// the distance.
    pub fn new(term: &str, distance: u8, prefix: bool) -> Self {
        let builder = LevenshteinAutomatonBuilder::new(distance, true);
        let dfa = if prefix {
            builder.build_prefix_dfa(term)
        } else {
            builder.build_dfa(term)
        };
        Self(dfa)
    }
}

impl Automaton for LevenshteinDfa {
    type State = u32;

    fn start(&self) -> Self::State {
        self.0.initial_state()
    }

    fn is_match(&self, state: &Self::State) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &Self::State) -> bool {
        *state != SINK_STATE
    }

    fn accept(&self, state: &Self::State, byte: u8) -> Self::State {
        self.0.transition(*state, byte)
    }
}

/// Collects the indexed terms of `field` matched by any of `patterns`.
///
/// Exact patterns are kept even when absent from the dictionary; the result
/// drives highlighting, where a missing term simply never matches.
pub fn expand_terms(searcher: &Searcher, field: Field, patterns: &[TermPattern]) -> HashSet<String> {
    let mut terms = HashSet::new();
    for pattern in patterns {
        if let TermPattern::Exact(term) = pattern {
            terms.insert(term.clone());
        }
    }

    for segment_reader in searcher.segment_readers() {
        let Ok(inverted_index) = segment_reader.inverted_index(field) else {
            continue;
        };
        let dict = inverted_index.terms();
        for pattern in patterns {
            match pattern {
                TermPattern::Exact(_) => {}
                TermPattern::Fuzzy { term, distance } => {
                    collect_matches(dict, LevenshteinDfa::new(term, *distance, false), &mut terms);
                }
                TermPattern::Regex(source) => match Regex::new(source) {
                    Ok(regex) => collect_matches(dict, regex, &mut terms),
                    Err(e) => debug!(pattern = %source, error = %e, "skipping highlight pattern"),
                },
            }
        }
    }

    terms
}

/// Adds every dictionary key accepted by `automaton` to `out`.
fn collect_matches<A>(dict: &TermDictionary, automaton: A, out: &mut HashSet<String>)
where
    A: Automaton,
    A::State: Clone,
{
    let mut stream = match dict.search(automaton).into_stream() {
        Ok(stream) => stream,
        Err(e) => {
            debug!(error = %e, "term dictionary stream failed");
            return;
        }
    };
    while stream.advance() {
        if let Ok(term) = str::from_utf8(stream.key()) {
            out.insert(term.to_string());
        }
    }
}
