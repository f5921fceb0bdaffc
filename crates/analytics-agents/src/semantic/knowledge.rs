//! In-memory knowledge base with TF-IDF ranking
//!
//! Term weights use raw term frequency and smoothed inverse document
//! frequency, `ln((1 + n) / (1 + df)) + 1`, and every vector is
//! L2-normalized so a dot product is the cosine similarity.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{AgentError, Result};
use crate::state::KnowledgeDocument;

/// A document with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: KnowledgeDocument,
    pub score: f64,
}

type SparseVector = BTreeMap<usize, f64>;

/// Documents plus their fitted TF-IDF vectors
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVector>,
}

impl KnowledgeBase {
    /// Fit the model over a document set
    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Result<Self> {
        if documents.is_empty() {
            return Err(AgentError::EmptyKnowledgeBase(
                "no documents to index".to_string(),
            ));
        }

        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(&d.text)).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen = std::collections::HashSet::new();
            for token in tokens {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id == document_frequency.len() {
                    document_frequency.push(0);
                }
                if seen.insert(id) {
                    document_frequency[id] += 1;
                }
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let mut base = Self {
            documents,
            vocabulary,
            idf,
            vectors: Vec::new(),
        };
        base.vectors = tokenized.iter().map(|t| base.vectorize(t)).collect();

        log::debug!(
            "Indexed {} document(s) over {} term(s)",
            base.documents.len(),
            base.vocabulary.len()
        );
        Ok(base)
    }

    /// Parse JSON Lines, one document per line
    ///
    /// Blank lines are ignored; malformed lines are logged and skipped.
    pub fn parse_jsonl(contents: &str) -> Result<Self> {
        let mut documents = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<KnowledgeDocument>(line) {
                Ok(document) => documents.push(document),
                Err(e) => log::warn!("Skipping knowledge base line {}: {}", number + 1, e),
            }
        }
        Self::from_documents(documents)
    }

    /// Load and index a JSONL file
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let base = Self::parse_jsonl(&contents)?;
        log::info!("Loaded {} knowledge base document(s) from {:?}", base.len(), path);
        Ok(base)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    /// Most similar document
    ///
    /// Ties, including an all-zero query, go to the earliest document.
    pub fn best_match(&self, query: &str) -> Option<ScoredDocument> {
        self.rank(query, 1).into_iter().next()
    }

    /// Up to `limit` documents ordered by descending similarity
    pub fn rank(&self, query: &str, limit: usize) -> Vec<ScoredDocument> {
        let query_vector = self.vectorize(&tokenize(query));

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, dot(&query_vector, vector)))
            .collect();
        // stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(limit)
            .map(|(index, score)| ScoredDocument {
                document: self.documents[index].clone(),
                score,
            })
            .collect()
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut vector = SparseVector::new();
        for token in tokens {
            if let Some(&id) = self.vocabulary.get(token) {
                *vector.entry(id).or_insert(0.0) += 1.0;
            }
        }
        for (id, weight) in vector.iter_mut() {
            *weight *= self.idf[*id];
        }

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Lowercased alphanumeric runs of at least two characters
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(id, w)| large.get(id).map(|v| w * v))
        .sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DOCUMENTS: &str = r#"{"doc_id": "kb-1", "title": "Email cadence", "text": "Email campaigns perform best with a weekly cadence and clear subject lines."}
{"doc_id": "kb-2", "title": "Display benchmarks", "text": "Display banners have low click through rates; judge them on reach and impressions."}

not json at all
{"doc_id": "kb-3", "title": "Oncology guidance", "text": "Oncology messaging must follow medical review guidelines before launch."}
"#;

    fn doc(id: &str, text: &str) -> KnowledgeDocument {
        KnowledgeDocument {
            doc_id: id.to_string(),
            title: String::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_skips_blank_and_malformed_lines() {
        let base = KnowledgeBase::parse_jsonl(DOCUMENTS).unwrap();
        assert_eq!(base.len(), 3);
        assert_eq!(base.documents()[2].doc_id, "kb-3");
    }

    #[test]
    fn test_best_match() {
        let base = KnowledgeBase::parse_jsonl(DOCUMENTS).unwrap();

        let best = base.best_match("what cadence works for email?").unwrap();
        assert_eq!(best.document.doc_id, "kb-1");
        assert!(best.score > 0.0 && best.score <= 1.0);

        let best = base.best_match("oncology review").unwrap();
        assert_eq!(best.document.doc_id, "kb-3");
    }

    #[test]
    fn test_identical_text_scores_one() {
        let base = KnowledgeBase::from_documents(vec![
            doc("a", "alpha beta gamma"),
            doc("b", "delta epsilon"),
        ])
        .unwrap();
        let best = base.best_match("alpha beta gamma").unwrap();
        assert_eq!(best.document.doc_id, "a");
        assert!((best.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_fall_back_to_first_document() {
        let base = KnowledgeBase::parse_jsonl(DOCUMENTS).unwrap();
        let best = base.best_match("zzz qqq").unwrap();
        assert_eq!(best.document.doc_id, "kb-1");
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let base = KnowledgeBase::from_documents(vec![
            doc("common", "campaign campaign report"),
            doc("rare", "campaign oncology"),
            doc("other", "campaign display"),
        ])
        .unwrap();
        let ranked = base.rank("campaign oncology", 3);
        assert_eq!(ranked[0].document.doc_id, "rare");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            KnowledgeBase::parse_jsonl("\n\nbroken\n"),
            Err(AgentError::EmptyKnowledgeBase(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.jsonl");
        std::fs::write(&path, DOCUMENTS).unwrap();

        let base = KnowledgeBase::load(&path).await.unwrap();
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("ROI, CTR & a Q1-2025 plan"),
            vec!["roi", "ctr", "q1", "2025", "plan"]
        );
    }
}
