//! Context Builder — chunks resume/JD text, embeds it, and answers topic
//! queries with relevant excerpts for prompt injection.
//!
//! A user's collection is rebuilt wholesale whenever new source documents
//! arrive; old documents are discarded, never incrementally merged.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embeddings::EmbeddingClient;
use crate::vector::{VectorDocument, VectorIndex};

pub mod chunking;

use chunking::chunk_document;

pub const SOURCE_RESUME: &str = "resume";
pub const SOURCE_JOB_DESCRIPTION: &str = "job_description";

pub struct ContextBuilder {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<VectorIndex>,
}

impl ContextBuilder {
    pub fn new(embeddings: Arc<EmbeddingClient>, index: Arc<VectorIndex>) -> Self {
        Self { embeddings, index }
    }

    fn collection_id(user_id: &str) -> String {
        format!("user-context-{user_id}")
    }

    /// Rebuilds the user's collection from the supplied source documents.
    /// Returns the number of chunks stored.
    pub async fn rebuild_user_context(
        &self,
        user_id: &str,
        resume_text: Option<&str>,
        jd_text: Option<&str>,
    ) -> usize {
        let collection = Self::collection_id(user_id);
        self.index.create_collection(&collection);
        self.index.clear_collection(&collection);

        let sources = [
            (SOURCE_RESUME, resume_text),
            (SOURCE_JOB_DESCRIPTION, jd_text),
        ];

        let mut labeled = Vec::new();
        for (source, text) in sources {
            let Some(text) = text else { continue };
            for chunk in chunk_document(text) {
                labeled.push((source, chunk));
            }
        }
        if labeled.is_empty() {
            return 0;
        }

        let texts: Vec<String> = labeled.iter().map(|(_, c)| c.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await;

        let documents: Vec<VectorDocument> = labeled
            .into_iter()
            .zip(vectors)
            .map(|((source, chunk), embedding)| VectorDocument {
                id: Uuid::new_v4().to_string(),
                content: chunk.content,
                embedding,
                metadata: json!({"source": source, "section": chunk.section}),
            })
            .collect();

        let count = documents.len();
        self.index.add_documents(&collection, documents);
        info!("Rebuilt context for user {user_id}: {count} chunk(s)");
        count
    }

    /// True when the user has any stored context chunks.
    pub fn has_context(&self, user_id: &str) -> bool {
        self.index.count_documents(&Self::collection_id(user_id)) > 0
    }

    /// Embeds `topic` and returns the top-`k` chunks as one labeled context
    /// block, or `None` when the user has no matching context.
    pub async fn query_context(
        &self,
        user_id: &str,
        topic: &str,
        source_filter: Option<&str>,
        k: usize,
    ) -> Option<String> {
        let collection = Self::collection_id(user_id);
        if self.index.count_documents(&collection) == 0 {
            return None;
        }

        let query = self.embeddings.embed(topic).await;
        let filter = source_filter.map(|source| json!({ "source": source }));
        let hits = self.index.search(&collection, &query, k, filter.as_ref());
        if hits.is_empty() {
            return None;
        }

        debug!("Context query '{topic}' matched {} chunk(s)", hits.len());
        let block = hits
            .iter()
            .map(|hit| {
                let source = hit.document.metadata["source"].as_str().unwrap_or("unknown");
                let section = hit.document.metadata["section"].as_str().unwrap_or("General");
                format!("[{source}/{section}] {}", hit.document.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        Some(block)
    }
}
