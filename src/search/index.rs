//! Inverse document frequency over the resource corpus.

use super::tokenize::tokenize;
use crate::types::ResourceRecord;
use ahash::AHashMap;

/// IDF weights for every term that occurs in at least one resource.
#[derive(Debug, Clone, Default)]
pub struct IdfTable {
    idf: AHashMap<String, f64>,
    document_count: usize,
}

impl IdfTable {
    /// Builds the table from the full resource pool.
    ///
    /// Each resource is one document (title, description and tags). A term counts
    /// once per document no matter how often it repeats there. Weights use the
    /// smoothed form `ln(1 + N / (1 + df))`, which stays finite and positive even
    /// for a term present in every document.
    pub fn build(resources: &[ResourceRecord]) -> Self {
        let start = std::time::Instant::now();
        let mut doc_freq: AHashMap<String, usize> = AHashMap::new();

        for resource in resources {
            for term in tokenize(&resource.text()).iter() {
                *doc_freq.entry(term.to_owned()).or_insert(0) += 1;
            }
        }

        let total_docs = resources.len() as f64;
        let idf: AHashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let weight = (1.0 + total_docs / (1.0 + df as f64)).ln();
                (term, weight)
            })
            .collect();

        tracing::info!(
            "Built IDF table: {} unique terms, {} documents in {:?}",
            idf.len(),
            resources.len(),
            start.elapsed()
        );

        Self {
            idf,
            document_count: resources.len(),
        }
    }

    /// IDF weight of `term`; terms outside the corpus weigh nothing.
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// Number of unique terms in the table.
    pub fn term_count(&self) -> usize {
        self.idf.len()
    }

    /// Number of documents the table was built from.
    pub const fn document_count(&self) -> usize {
        self.document_count
    }
}
