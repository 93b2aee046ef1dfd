//! Full-text index implementation.
//!
//! Provides token-based search with stop-word filtering, phrase and
//! proximity matching, prefix matching, and TF-IDF ranked search.

use crate::error::CoreResult;
use crate::index::traits::{Index, IndexKey};
use crate::path;
use entidb_codec::Value;
use std::collections::{HashMap, HashSet};

/// Configuration for the full-text tokenizer.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    /// Minimum token length to index; shorter tokens are dropped.
    pub min_token_length: usize,
    /// Whether matching is case-sensitive.
    pub case_sensitive: bool,
    /// Stop words dropped during tokenization.
    pub stop_words: HashSet<String>,
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            min_token_length: 2,
            case_sensitive: false,
            stop_words: default_stop_words(),
        }
    }
}

impl FtsConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum token length.
    #[must_use]
    pub fn min_token_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Makes matching case-sensitive.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Replaces the stop-word set (pass an empty set to disable filtering).
    #[must_use]
    pub fn with_stop_words(mut self, words: HashSet<String>) -> Self {
        self.stop_words = words;
        self
    }
}

fn default_stop_words() -> HashSet<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Splits `text` into lower-cased (unless case-sensitive) tokens on
/// non-alphanumeric boundaries, dropping short tokens and stop words.
fn tokenize(text: &str, config: &FtsConfig) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| {
            if config.case_sensitive {
                token.to_string()
            } else {
                token.to_lowercase()
            }
        })
        .filter(|token| token.len() >= config.min_token_length)
        .filter(|token| !config.stop_words.contains(token))
        .collect()
}

/// A scored search result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    /// The entity id.
    pub id: String,
    /// The TF-IDF score.
    pub score: f64,
}

/// Inverted full-text index over a single field.
///
/// Stores, per term, the ordered list of `(id, positions)` postings in
/// first-seen order, plus a forward index (`id` → terms) so removal does
/// not require scanning every inverted list.
pub struct FtsIndex {
    field: String,
    config: FtsConfig,
    postings: HashMap<String, Vec<(String, Vec<usize>)>>,
    forward: HashMap<String, Vec<String>>,
}

impl FtsIndex {
    /// Creates a new full-text index over `field` with the given configuration.
    #[must_use]
    pub fn new(field: impl Into<String>, config: FtsConfig) -> Self {
        Self {
            field: field.into(),
            config,
            postings: HashMap::new(),
            forward: HashMap::new(),
        }
    }

    /// Returns the field this index covers.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the tokenizer configuration this index was created with.
    #[must_use]
    pub fn config(&self) -> &FtsConfig {
        &self.config
    }

    fn extract_text<'a>(&self, attrs: &'a Value) -> Option<&'a str> {
        match path::resolve(attrs, &self.field) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn postings_for(&self, term: &str) -> Option<&Vec<(String, Vec<usize>)>> {
        self.postings.get(term)
    }

    /// `search(text)`: ids present in every token's postings (AND), in
    /// intersection order determined by the first term's postings.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<String> {
        let terms = tokenize(text, &self.config);
        self.search_all(&terms)
    }

    fn search_all(&self, terms: &[String]) -> Vec<String> {
        if terms.is_empty() {
            return Vec::new();
        }
        let Some(first) = self.postings_for(&terms[0]) else {
            return Vec::new();
        };
        first
            .iter()
            .map(|(id, _)| id.clone())
            .filter(|id| {
                terms[1..].iter().all(|term| {
                    self.postings_for(term)
                        .is_some_and(|postings| postings.iter().any(|(pid, _)| pid == id))
                })
            })
            .collect()
    }

    /// `searchAny(terms)`: union of postings across all given terms.
    #[must_use]
    pub fn search_any(&self, terms: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for term in terms {
            if let Some(postings) = self.postings_for(term) {
                for (id, _) in postings {
                    if seen.insert(id.clone()) {
                        result.push(id.clone());
                    }
                }
            }
        }
        result
    }

    /// `searchPhrase(text)`: ids where the tokenized phrase's terms appear
    /// consecutively (each position exactly one more than the previous).
    #[must_use]
    pub fn search_phrase(&self, text: &str) -> Vec<String> {
        let terms = tokenize(text, &self.config);
        if terms.is_empty() {
            return Vec::new();
        }
        self.search_all(&terms)
            .into_iter()
            .filter(|id| self.has_consecutive_run(id, &terms))
            .collect()
    }

    fn positions_for(&self, id: &str, term: &str) -> Vec<usize> {
        self.postings_for(term)
            .and_then(|postings| postings.iter().find(|(pid, _)| pid == id))
            .map(|(_, positions)| positions.clone())
            .unwrap_or_default()
    }

    fn has_consecutive_run(&self, id: &str, terms: &[String]) -> bool {
        let Some(first_positions) = self.postings_for(&terms[0]).and_then(|p| {
            p.iter()
                .find(|(pid, _)| pid == id)
                .map(|(_, positions)| positions.clone())
        }) else {
            return false;
        };
        first_positions.iter().any(|&start| {
            terms[1..]
                .iter()
                .enumerate()
                .all(|(offset, term)| {
                    self.positions_for(id, term)
                        .contains(&(start + offset + 1))
                })
        })
    }

    /// `searchProximity(terms, maxDistance)`: ids where some choice of one
    /// position per term has every consecutive pair within `maxDistance`.
    #[must_use]
    pub fn search_proximity(&self, terms: &[String], max_distance: usize) -> Vec<String> {
        if terms.is_empty() {
            return Vec::new();
        }
        self.search_all(terms)
            .into_iter()
            .filter(|id| self.has_proximate_choice(id, terms, max_distance))
            .collect()
    }

    fn has_proximate_choice(&self, id: &str, terms: &[String], max_distance: usize) -> bool {
        let position_lists: Vec<Vec<usize>> =
            terms.iter().map(|term| self.positions_for(id, term)).collect();
        fn search(lists: &[Vec<usize>], last: Option<usize>, max_distance: usize) -> bool {
            match lists.split_first() {
                None => true,
                Some((head, tail)) => head.iter().any(|&pos| {
                    let within = last.map_or(true, |l| pos.abs_diff(l) <= max_distance);
                    within && search(tail, Some(pos), max_distance)
                }),
            }
        }
        search(&position_lists, None, max_distance)
    }

    /// `searchPrefix(prefix)`: union of postings for every term starting
    /// with `prefix` (normalized the same way as indexed tokens).
    #[must_use]
    pub fn search_prefix(&self, prefix: &str) -> Vec<String> {
        let normalized = if self.config.case_sensitive {
            prefix.to_string()
        } else {
            prefix.to_lowercase()
        };
        let matching_terms: Vec<String> = self
            .postings
            .keys()
            .filter(|term| term.starts_with(&normalized))
            .cloned()
            .collect();
        self.search_any(&matching_terms)
    }

    /// `searchRanked(text)`: ids sorted by descending TF-IDF score, ties
    /// broken by ascending id. Terms with zero document frequency are
    /// excluded (undefined IDF).
    #[must_use]
    pub fn search_ranked(&self, text: &str) -> Vec<ScoredId> {
        let terms = tokenize(text, &self.config);
        let doc_count = self.forward.len() as f64;
        if doc_count == 0.0 {
            return Vec::new();
        }
        let mut scores: HashMap<String, f64> = HashMap::new();
        for term in &terms {
            let Some(postings) = self.postings_for(term) else {
                continue;
            };
            let df = postings.len();
            if df == 0 {
                continue;
            }
            let idf = (doc_count / df as f64).ln();
            for (id, positions) in postings {
                let tf = positions.len() as f64;
                *scores.entry(id.clone()).or_insert(0.0) += tf * idf;
            }
        }
        let mut result: Vec<ScoredId> = scores
            .into_iter()
            .map(|(id, score)| ScoredId { id, score })
            .collect();
        result.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        result
    }

    /// Exports per-term postings, for persistence.
    #[must_use]
    pub fn to_map(&self) -> Vec<(String, Vec<(String, Vec<usize>)>)> {
        self.postings
            .iter()
            .map(|(term, postings)| (term.clone(), postings.clone()))
            .collect()
    }

    /// Restores postings and rebuilds the forward index from a previously
    /// exported map, replacing any existing contents.
    pub fn restore_from_map(&mut self, entries: Vec<(String, Vec<(String, Vec<usize>)>)>) {
        self.postings.clear();
        self.forward.clear();
        for (term, postings) in entries {
            for (id, _) in &postings {
                self.forward.entry(id.clone()).or_default().push(term.clone());
            }
            self.postings.insert(term, postings);
        }
    }
}

impl Index for FtsIndex {
    fn insert(&mut self, id: &str, attrs: &Value) -> CoreResult<()> {
        let Some(text) = self.extract_text(attrs) else {
            return Ok(());
        };
        let terms = tokenize(text, &self.config);
        let mut by_term: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, term) in terms.into_iter().enumerate() {
            by_term.entry(term).or_default().push(position);
        }
        for (term, positions) in by_term {
            self.postings
                .entry(term.clone())
                .or_default()
                .push((id.to_string(), positions));
            self.forward.entry(id.to_string()).or_default().push(term);
        }
        Ok(())
    }

    fn remove(&mut self, id: &str, _attrs: &Value) -> CoreResult<()> {
        let Some(terms) = self.forward.remove(id) else {
            return Ok(());
        };
        for term in terms {
            if let Some(postings) = self.postings.get_mut(&term) {
                postings.retain(|(pid, _)| pid != id);
                if postings.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        Ok(())
    }

    fn search(&self, key: &IndexKey) -> Vec<String> {
        match key {
            IndexKey::Text(term) => self.postings_for(term).map_or_else(Vec::new, |postings| {
                postings.iter().map(|(id, _)| id.clone()).collect()
            }),
            _ => Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.postings.clear();
        self.forward.clear();
    }

    fn len(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(field: &str, text: &str) -> Value {
        Value::Map(vec![(Value::Text(field.to_string()), Value::Text(text.to_string()))])
    }

    fn index() -> FtsIndex {
        FtsIndex::new("body", FtsConfig::default())
    }

    #[test]
    fn search_all_requires_every_term() {
        let mut idx = index();
        idx.insert("a", &map("body", "the quick brown fox")).unwrap();
        idx.insert("b", &map("body", "the quick cat")).unwrap();
        assert_eq!(idx.search("quick fox"), vec!["a".to_string()]);
    }

    #[test]
    fn stop_words_are_dropped() {
        let mut idx = index();
        idx.insert("a", &map("body", "the fox")).unwrap();
        assert!(idx.search("the").is_empty());
        assert_eq!(idx.search("fox"), vec!["a".to_string()]);
    }

    #[test]
    fn search_any_is_union() {
        let mut idx = index();
        idx.insert("a", &map("body", "fox")).unwrap();
        idx.insert("b", &map("body", "cat")).unwrap();
        let result = idx.search_any(&["fox".to_string(), "cat".to_string()]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn search_phrase_requires_adjacency() {
        let mut idx = index();
        idx.insert("a", &map("body", "quick brown fox")).unwrap();
        idx.insert("b", &map("body", "brown quick fox")).unwrap();
        assert_eq!(idx.search_phrase("quick brown"), vec!["a".to_string()]);
    }

    #[test]
    fn search_prefix_matches_term_start() {
        let mut idx = index();
        idx.insert("a", &map("body", "foxglove")).unwrap();
        idx.insert("b", &map("body", "cat")).unwrap();
        assert_eq!(idx.search_prefix("fox"), vec!["a".to_string()]);
    }

    #[test]
    fn search_proximity_within_distance() {
        let mut idx = index();
        idx.insert("a", &map("body", "fox jumps over lazy dog")).unwrap();
        let result = idx.search_proximity(&["fox".to_string(), "dog".to_string()], 4);
        assert_eq!(result, vec!["a".to_string()]);
        let result = idx.search_proximity(&["fox".to_string(), "dog".to_string()], 1);
        assert!(result.is_empty());
    }

    #[test]
    fn search_ranked_orders_by_score() {
        let mut idx = index();
        idx.insert("a", &map("body", "fox fox fox")).unwrap();
        idx.insert("b", &map("body", "fox")).unwrap();
        let ranked = idx.search_ranked("fox");
        assert_eq!(ranked[0].id, "a");
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn remove_clears_postings_and_forward_entry() {
        let mut idx = index();
        idx.insert("a", &map("body", "fox")).unwrap();
        idx.remove("a", &Value::Null).unwrap();
        assert!(idx.search("fox").is_empty());
        assert!(idx.is_empty());
    }

    #[test]
    fn to_map_and_restore_roundtrip() {
        let mut idx = index();
        idx.insert("a", &map("body", "fox")).unwrap();
        let mut restored = index();
        restored.restore_from_map(idx.to_map());
        assert_eq!(restored.search("fox"), vec!["a".to_string()]);
    }
}
