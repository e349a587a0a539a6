//! Vector Index — in-memory, per-collection store with cosine top-k search.
//!
//! Exact linear scan over a per-user collection; at interview scale (tens of
//! chunks per user) an index structure would be overhead. Collections are
//! rebuilt wholesale when a user supplies new source documents.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// One embedded text chunk stored in a collection.
#[derive(Debug, Clone)]
pub struct VectorDocument {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Flat JSON object, e.g. `{"source": "resume", "section": "Experience"}`.
    pub metadata: Value,
}

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: VectorDocument,
    /// Cosine similarity in [-1, 1]; 0 for zero-norm inputs.
    pub score: f32,
    /// `1 - score`, so smaller is closer.
    pub distance: f32,
}

/// In-memory collection store. One mutex over the whole map — operations are
/// short, CPU-only scans.
pub struct VectorIndex {
    collections: Mutex<HashMap<String, Vec<VectorDocument>>>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Ensures a collection exists. Existing documents are untouched.
    pub fn create_collection(&self, id: &str) {
        self.lock().entry(id.to_string()).or_default();
    }

    /// Drops all documents in a collection (used for wholesale rebuilds).
    pub fn clear_collection(&self, id: &str) {
        if let Some(docs) = self.lock().get_mut(id) {
            docs.clear();
        }
    }

    pub fn add_documents(&self, id: &str, documents: Vec<VectorDocument>) {
        self.lock()
            .entry(id.to_string())
            .or_default()
            .extend(documents);
    }

    pub fn count_documents(&self, id: &str) -> usize {
        self.lock().get(id).map(|docs| docs.len()).unwrap_or(0)
    }

    /// Top-`k` documents by descending cosine similarity to `query`,
    /// optionally restricted by a metadata filter (AND semantics over every
    /// given key; list-valued document metadata matches by membership).
    pub fn search(
        &self,
        id: &str,
        query: &[f32],
        k: usize,
        metadata_filter: Option<&Value>,
    ) -> Vec<SearchHit> {
        let collections = self.lock();
        let Some(documents) = collections.get(id) else {
            return Vec::new();
        };

        let mut hits: Vec<SearchHit> = documents
            .iter()
            .filter(|doc| metadata_matches(&doc.metadata, metadata_filter))
            .map(|doc| {
                let score = cosine_similarity(query, &doc.embedding);
                SearchHit {
                    document: doc.clone(),
                    score,
                    distance: 1.0 - score,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<VectorDocument>>> {
        self.collections
            .lock()
            .expect("vector index mutex poisoned")
    }
}

/// Cosine similarity = dot(a,b) / (‖a‖·‖b‖); zero-norm inputs yield 0 so a
/// degraded (all-zero) embedding never divides by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Every filter key must match. A list-valued document entry matches when it
/// contains the wanted value; scalars must be equal.
fn metadata_matches(metadata: &Value, filter: Option<&Value>) -> bool {
    let Some(filter) = filter.and_then(|f| f.as_object()) else {
        return true;
    };
    filter.iter().all(|(key, want)| match metadata.get(key) {
        Some(Value::Array(values)) => values.contains(want),
        Some(value) => value == want,
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, embedding: Vec<f32>, metadata: Value) -> VectorDocument {
        VectorDocument {
            id: id.to_string(),
            content: format!("content of {id}"),
            embedding,
            metadata,
        }
    }

    #[test]
    fn test_cosine_of_self_is_one() {
        let v = vec![0.3, -1.2, 4.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_of_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_yields_zero_similarity() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_search_ranks_by_descending_similarity() {
        let index = VectorIndex::new();
        index.add_documents(
            "u1",
            vec![
                doc("far", vec![0.0, 1.0], json!({})),
                doc("near", vec![1.0, 0.05], json!({})),
                doc("exact", vec![1.0, 0.0], json!({})),
            ],
        );

        let hits = index.search("u1", &[1.0, 0.0], 3, None);
        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
        assert!(hits[0].score > hits[1].score);
        assert!((hits[0].distance).abs() < 1e-6);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let index = VectorIndex::new();
        index.add_documents(
            "u1",
            (0..10)
                .map(|i| doc(&format!("d{i}"), vec![1.0, i as f32], json!({})))
                .collect(),
        );
        assert_eq!(index.search("u1", &[1.0, 0.0], 3, None).len(), 3);
    }

    #[test]
    fn test_zero_norm_query_never_panics() {
        let index = VectorIndex::new();
        index.add_documents("u1", vec![doc("a", vec![1.0, 2.0], json!({}))]);
        let hits = index.search("u1", &[0.0, 0.0], 5, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn test_metadata_filter_is_conjunctive() {
        let index = VectorIndex::new();
        index.add_documents(
            "u1",
            vec![
                doc(
                    "resume-exp",
                    vec![1.0],
                    json!({"source": "resume", "section": "Experience"}),
                ),
                doc(
                    "jd-exp",
                    vec![1.0],
                    json!({"source": "job_description", "section": "Experience"}),
                ),
            ],
        );

        let filter = json!({"source": "resume", "section": "Experience"});
        let hits = index.search("u1", &[1.0], 10, Some(&filter));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "resume-exp");
    }

    #[test]
    fn test_list_valued_metadata_matches_by_membership() {
        let index = VectorIndex::new();
        index.add_documents(
            "u1",
            vec![doc("a", vec![1.0], json!({"tags": ["rust", "backend"]}))],
        );

        let hit = index.search("u1", &[1.0], 1, Some(&json!({"tags": "rust"})));
        assert_eq!(hit.len(), 1);
        let miss = index.search("u1", &[1.0], 1, Some(&json!({"tags": "frontend"})));
        assert!(miss.is_empty());
    }

    #[test]
    fn test_missing_filter_key_excludes_document() {
        let index = VectorIndex::new();
        index.add_documents("u1", vec![doc("a", vec![1.0], json!({"source": "resume"}))]);
        let hits = index.search("u1", &[1.0], 1, Some(&json!({"section": "Skills"})));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_clear_collection_empties_but_keeps_collection() {
        let index = VectorIndex::new();
        index.add_documents("u1", vec![doc("a", vec![1.0], json!({}))]);
        assert_eq!(index.count_documents("u1"), 1);

        index.clear_collection("u1");
        assert_eq!(index.count_documents("u1"), 0);
        assert!(index.search("u1", &[1.0], 5, None).is_empty());
    }

    #[test]
    fn test_unknown_collection_is_empty() {
        let index = VectorIndex::new();
        assert_eq!(index.count_documents("nobody"), 0);
        assert!(index.search("nobody", &[1.0], 5, None).is_empty());
    }
}
