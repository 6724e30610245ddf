// ABOUTME: The search_notes tool: semantic search over the notes document via embeddings.
// ABOUTME: NotesIndex chunks the markdown by section and paragraph and caches vectors per content.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{Tool, required_str};
use crate::llm::Embedder;

pub const TOP_K: usize = 3;
const MAX_CHUNK_CHARS: usize = 1_500;

/// Split markdown into chunks. Each heading starts a new section; within a
/// section, paragraphs are packed together until `MAX_CHUNK_CHARS` is reached.
/// Every chunk carries its section heading for context.
pub fn chunk_markdown(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut heading = String::new();
    let mut current = String::new();

    let flush = |chunks: &mut Vec<String>, heading: &str, current: &mut String| {
        let body = current.trim();
        if !body.is_empty() {
            if heading.is_empty() || body.starts_with(heading) {
                chunks.push(body.to_string());
            } else {
                chunks.push(format!("{}\n\n{}", heading, body));
            }
        }
        current.clear();
    };

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if paragraph.starts_with('#') {
            flush(&mut chunks, &heading, &mut current);
            let (first, rest) = paragraph.split_once('\n').unwrap_or((paragraph, ""));
            heading = first.trim().to_string();
            current.push_str(&heading);
            if !rest.trim().is_empty() {
                current.push_str("\n\n");
                current.push_str(rest.trim());
            }
            continue;
        }

        if !current.is_empty() && current.len() + paragraph.len() + 2 > MAX_CHUNK_CHARS {
            flush(&mut chunks, &heading, &mut current);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    flush(&mut chunks, &heading, &mut current);

    chunks
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

struct IndexedNotes {
    source: String,
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

/// Lazily built embedding index over the notes file, shared by every agent.
pub struct NotesIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    cache: Mutex<Option<IndexedNotes>>,
}

impl NotesIndex {
    pub fn new(path: PathBuf, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path,
            embedder,
            cache: Mutex::new(None),
        }
    }

    /// Return the `top_k` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<(f32, String)>> {
        let source = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read notes at {}", self.path.display()))?;

        let mut cache = self.cache.lock().await;
        let stale = cache.as_ref().is_none_or(|c| c.source != source);
        if stale {
            let chunks = chunk_markdown(&source);
            tracing::debug!(chunks = chunks.len(), path = %self.path.display(), "indexing notes");
            let vectors = self.embedder.embed(&chunks).await?;
            *cache = Some(IndexedNotes {
                source,
                chunks,
                vectors,
            });
        }
        let Some(index) = cache.as_ref() else {
            return Ok(Vec::new());
        };
        if index.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;

        let mut scored: Vec<(f32, String)> = index
            .vectors
            .iter()
            .zip(&index.chunks)
            .map(|(v, chunk)| (cosine_similarity(&query_vector, v), chunk.clone()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub struct SearchNotesTool {
    index: Arc<NotesIndex>,
}

impl SearchNotesTool {
    pub fn new(index: Arc<NotesIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SearchNotesTool {
    fn name(&self) -> &str {
        "search_notes"
    }

    fn description(&self) -> &str {
        "Semantic search over the notes document. Returns the passages most relevant to the query."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "What to look for in the notes"
                }
            },
            "required": ["search_query"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<String> {
        let query = required_str(&params, "search_query")?;
        let hits = self.index.search(query, TOP_K).await?;
        if hits.is_empty() {
            return Ok("The notes document has no content to search.".to_string());
        }
        Ok(hits
            .into_iter()
            .map(|(_, chunk)| chunk)
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"))
    }
}
