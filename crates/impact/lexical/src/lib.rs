//! Impact Lexical - term-frequency model over cause descriptions.
//!
//! The index is a plain value: build it from a corpus snapshot, score
//! queries against it, throw it away when the corpus changes. Nothing here
//! blocks or touches shared state.

#![deny(unsafe_code)]

mod tokenize;

pub use tokenize::{stem, tokenize};

use impact_types::Cause;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Term counts for one document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DocumentTerms {
    counts: HashMap<String, u32>,
    total: u32,
}

/// tf-idf index over an ordered corpus.
///
/// Weighting is `tf × idf` with `tf` the raw count of a term in a document and
/// `idf = 1 + ln(N / (1 + df))`. The smoothed idf stays positive for any
/// corpus of one or more documents, so a matching term always contributes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LexicalIndex {
    documents: Vec<DocumentTerms>,
    document_frequency: HashMap<String, u32>,
}

impl LexicalIndex {
    /// Build an index; document `i` is the `i`-th item of `documents`.
    pub fn build<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for document in documents {
            let mut terms = DocumentTerms::default();
            for token in tokenize(document.as_ref()) {
                *terms.counts.entry(token).or_insert(0) += 1;
                terms.total += 1;
            }
            for term in terms.counts.keys() {
                *index.document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            index.documents.push(terms);
        }
        index
    }

    /// Build over cause descriptions, preserving slice order.
    pub fn build_from_causes(causes: &[Cause]) -> Self {
        Self::build(causes.iter().map(|c| c.description.as_str()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Smoothed inverse document frequency of an already-tokenized term.
    pub fn idf(&self, term: &str) -> f64 {
        if self.documents.is_empty() {
            return 0.0;
        }
        let n = self.documents.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        1.0 + (n / (1.0 + df)).ln()
    }

    /// tf-idf weight of an already-tokenized term in one document.
    pub fn weight(&self, term: &str, document_index: usize) -> f64 {
        let Some(document) = self.documents.get(document_index) else {
            return 0.0;
        };
        match document.counts.get(term) {
            Some(&count) => count as f64 * self.idf(term),
            None => 0.0,
        }
    }

    /// Accumulated weight of every query token against one document.
    ///
    /// Repeated query tokens count once per occurrence. An out-of-range
    /// document or an empty corpus scores 0.
    pub fn score(&self, query: &str, document_index: usize) -> f64 {
        if document_index >= self.documents.len() {
            return 0.0;
        }
        tokenize(query)
            .iter()
            .map(|term| self.weight(term, document_index))
            .sum()
    }

    /// Score the query against every document, in corpus order.
    pub fn score_all(&self, query: &str) -> Vec<f64> {
        let terms = tokenize(query);
        (0..self.documents.len())
            .map(|i| terms.iter().map(|t| self.weight(t, i)).sum())
            .collect()
    }

    /// Number of tokens in a document, or 0 if out of range.
    pub fn document_len(&self, document_index: usize) -> u32 {
        self.documents
            .get(document_index)
            .map(|d| d.total)
            .unwrap_or(0)
    }
}
