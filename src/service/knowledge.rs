//! Knowledge-base retrieval for the chat endpoint
//!
//! Lexical retrieval over a static line-oriented fact document: TF-IDF
//! vectors over corpus entries plus the query, cosine similarity, and a
//! fixed fallback when nothing matches well enough.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Response for a blank query
pub const EMPTY_QUERY_RESPONSE: &str = "Please ask a question.";

/// Response when no corpus entry is similar enough
pub const UNKNOWN_RESPONSE: &str =
    "I am not sure about that. Please refer to the official SIR manual or ask a Manager.";

/// Response when retrieval itself fails
pub const OFFLINE_RESPONSE: &str = "Sorry, my brain is offline right now.";

/// Minimum cosine similarity for an answer to be returned
pub const SIMILARITY_THRESHOLD: f64 = 0.1;

/// Sole corpus entry when the knowledge document could not be read
const LOAD_ERROR_SENTINEL: &str =
    "Error: the knowledge base could not be loaded. Please contact an administrator.";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no usable vocabulary in corpus or query")]
    EmptyVocabulary,
}

/// Static knowledge corpus with per-query TF-IDF retrieval
///
/// Loaded once at startup and shared read-only across requests; a changed
/// backing document requires a process restart.
pub struct KnowledgeRetriever {
    entries: Vec<String>,
    degraded: bool,
}

impl KnowledgeRetriever {
    /// Load the corpus from a line-oriented text document
    ///
    /// Blank lines and `[SECTION]` headers are discarded; remaining lines
    /// become entries in file order. A read failure leaves the retriever
    /// running degraded on a single sentinel entry rather than failing
    /// startup.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => {
                let entries: Vec<String> = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('['))
                    .map(str::to_string)
                    .collect();
                tracing::info!(
                    path = %path.display(),
                    entries = entries.len(),
                    "Knowledge base loaded"
                );
                Self::from_entries(entries)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read knowledge base, running degraded"
                );
                Self {
                    entries: vec![LOAD_ERROR_SENTINEL.to_string()],
                    degraded: true,
                }
            }
        }
    }

    pub fn from_entries(entries: Vec<String>) -> Self {
        Self {
            entries,
            degraded: false,
        }
    }

    /// Whether the backing document failed to load at startup
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Answer a free-text query with the best-matching corpus entry
    ///
    /// The query is fitted into the same vector space as the corpus, so its
    /// terms always participate in the vocabulary. Ties resolve to the
    /// first maximum in corpus order.
    pub fn answer(&self, query: &str) -> Result<String, RetrievalError> {
        if query.trim().is_empty() {
            return Ok(EMPTY_QUERY_RESPONSE.to_string());
        }

        let mut documents: Vec<Vec<String>> =
            self.entries.iter().map(|e| tokenize(e)).collect();
        documents.push(tokenize(query));

        let vectors = tfidf_vectors(&documents)?;
        let (query_vector, entry_vectors) = vectors
            .split_last()
            .ok_or(RetrievalError::EmptyVocabulary)?;

        let mut best_index = 0;
        let mut best_similarity = -1.0;
        for (index, vector) in entry_vectors.iter().enumerate() {
            let similarity = dot(vector, query_vector);
            if similarity > best_similarity {
                best_similarity = similarity;
                best_index = index;
            }
        }

        if best_similarity < SIMILARITY_THRESHOLD {
            return Ok(UNKNOWN_RESPONSE.to_string());
        }

        Ok(self.entries[best_index].clone())
    }
}

/// Lowercase word tokens of at least two alphanumeric characters
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// L2-normalized TF-IDF vectors, one per document, with smoothed IDF
/// `ln((1 + n) / (1 + df)) + 1`.
fn tfidf_vectors(documents: &[Vec<String>]) -> Result<Vec<Vec<f64>>, RetrievalError> {
    let mut vocabulary: HashMap<&str, usize> = HashMap::new();
    for document in documents {
        for token in document {
            let next_id = vocabulary.len();
            vocabulary.entry(token.as_str()).or_insert(next_id);
        }
    }
    if vocabulary.is_empty() {
        return Err(RetrievalError::EmptyVocabulary);
    }

    let num_documents = documents.len() as f64;
    let mut document_frequency = vec![0u32; vocabulary.len()];
    let term_counts: Vec<HashMap<usize, u32>> = documents
        .iter()
        .map(|document| {
            let mut counts: HashMap<usize, u32> = HashMap::new();
            for token in document {
                *counts.entry(vocabulary[token.as_str()]).or_insert(0) += 1;
            }
            for &term in counts.keys() {
                document_frequency[term] += 1;
            }
            counts
        })
        .collect();

    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + num_documents) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    let vectors = term_counts
        .into_iter()
        .map(|counts| {
            let mut vector = vec![0.0; idf.len()];
            for (term, count) in counts {
                vector[term] = count as f64 * idf[term];
            }
            let norm = vector.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for weight in &mut vector {
                    *weight /= norm;
                }
            }
            vector
        })
        .collect();

    Ok(vectors)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever() -> KnowledgeRetriever {
        KnowledgeRetriever::from_entries(vec![
            "Steam traps must be inspected every six months.".to_string(),
            "Boiler pressure valves are tested at 1.5 times working pressure.".to_string(),
            "Corrosion above 20 percent coverage requires immediate replacement.".to_string(),
        ])
    }

    #[test]
    fn test_blank_query_short_circuits() {
        assert_eq!(retriever().answer("").unwrap(), EMPTY_QUERY_RESPONSE);
        assert_eq!(retriever().answer("   ").unwrap(), EMPTY_QUERY_RESPONSE);
    }

    #[test]
    fn test_exact_entry_matches_itself() {
        let r = retriever();
        let answer = r
            .answer("steam traps must be inspected every six months")
            .unwrap();
        assert_eq!(answer, "Steam traps must be inspected every six months.");
    }

    #[test]
    fn test_partial_overlap_finds_best_entry() {
        let r = retriever();
        let answer = r.answer("how often are boiler valves tested?").unwrap();
        assert_eq!(
            answer,
            "Boiler pressure valves are tested at 1.5 times working pressure."
        );
    }

    #[test]
    fn test_query_is_case_folded() {
        let r = retriever();
        let answer = r.answer("CORROSION COVERAGE REPLACEMENT").unwrap();
        assert_eq!(
            answer,
            "Corrosion above 20 percent coverage requires immediate replacement."
        );
    }

    #[test]
    fn test_no_shared_vocabulary_falls_back() {
        let r = retriever();
        assert_eq!(r.answer("zebra giraffe llama").unwrap(), UNKNOWN_RESPONSE);
    }

    #[test]
    fn test_punctuation_only_query_with_empty_corpus_errors() {
        let r = KnowledgeRetriever::from_entries(vec![]);
        assert!(matches!(
            r.answer("?!"),
            Err(RetrievalError::EmptyVocabulary)
        ));
    }

    #[test]
    fn test_tie_resolves_to_first_corpus_entry() {
        let r = KnowledgeRetriever::from_entries(vec![
            "gasket torque spec".to_string(),
            "gasket torque spec".to_string(),
        ]);
        assert_eq!(r.answer("gasket torque spec").unwrap(), "gasket torque spec");
    }

    #[test]
    fn test_load_skips_sections_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.txt");
        std::fs::write(
            &path,
            "[GENERAL]\nFirst fact.\n\n[SAFETY]\nSecond fact.\n",
        )
        .unwrap();
        let r = KnowledgeRetriever::load(&path);
        assert_eq!(r.entry_count(), 2);
        assert!(!r.is_degraded());
        assert_eq!(r.answer("first fact").unwrap(), "First fact.");
    }

    #[test]
    fn test_missing_document_runs_degraded() {
        let r = KnowledgeRetriever::load(Path::new("/nonexistent/kb.txt"));
        assert!(r.is_degraded());
        assert_eq!(r.entry_count(), 1);
    }

    #[test]
    fn test_tokenize_drops_single_characters() {
        assert_eq!(tokenize("a B2 valve, x!"), vec!["b2", "valve"]);
    }
}
