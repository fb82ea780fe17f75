use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use serde::Serialize;
use crate::client::ApiClient;
use crate::content::ContentItem;
use crate::engine::{AnnotateEngine, AnnotateOptions, EnhancementEngine, LanguageEngine};
use crate::graph::{AnnotationGraph, EntityAnnotationView, TopicAnnotationView};
use crate::params::{ComparisonMethod, CompressionMethod};
use crate::response::{CompareResponse, SummaryResponse};
use crate::storage::{ContentSummary, Database, EntityMention, StoredContent};

/// Outcome of enhancing one content item
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementReport {
    pub uri: String,
    pub language: Option<String>,
    pub entities: Vec<EntityAnnotationView>,
    pub topics: Vec<TopicAnnotationView>,
    pub graph: AnnotationGraph,
}

impl EnhancementReport {
    fn from_graph(uri: &str, graph: AnnotationGraph) -> Self {
        Self {
            uri: uri.to_string(),
            language: graph
                .language_annotations()
                .into_iter()
                .find_map(|anno| anno.language),
            entities: graph.entity_annotations(),
            topics: graph.topic_annotations(),
            graph,
        }
    }
}

/// Manager for the enhancement pipeline
/// Provides async API over the annotation service and the SQLite store
pub struct EnhancementManager {
    client: ApiClient,
    annotate: AnnotateEngine,
    language: LanguageEngine,
    db: Arc<Database>,
}

impl EnhancementManager {
    /// Create new manager with database at given path
    pub fn new(client: ApiClient, options: AnnotateOptions, db_path: PathBuf) -> Result<Self> {
        let db = Database::open(&db_path)?;
        Ok(Self {
            annotate: AnnotateEngine::new(client.clone(), options),
            language: LanguageEngine::new(client.clone()),
            client,
            db: Arc::new(db),
        })
    }

    /// Detect the language of a text; nothing is stored
    pub async fn detect_language(&self, uri: &str, text: &str) -> Result<EnhancementReport> {
        let item = ContentItem::new(uri, text);
        run_engine(&self.language, &item).await?;
        Ok(EnhancementReport::from_graph(uri, item.snapshot().await))
    }

    /// Annotate a text and store its enhancements under `uri`
    pub async fn annotate_text(&self, uri: &str, text: &str) -> Result<EnhancementReport> {
        let item = ContentItem::new(uri, text);
        run_engine(&self.annotate, &item).await?;

        let graph = item.snapshot().await;
        self.db
            .save_enhancements(item.uri(), item.mime_type(), text, &graph)
            .with_context(|| format!("Failed to store enhancements of '{}'", uri))?;
        Ok(EnhancementReport::from_graph(uri, graph))
    }

    pub async fn compare_texts(
        &self,
        method: ComparisonMethod,
        text1: &str,
        text2: &str,
    ) -> Result<CompareResponse> {
        Ok(self.client.compare(method, text1, text2).await?)
    }

    pub async fn summarize_text(
        &self,
        method: CompressionMethod,
        compression_ratio: f32,
        text: &str,
    ) -> Result<SummaryResponse> {
        Ok(self.client.summarize(method, compression_ratio, text).await?)
    }

    /// Read back stored enhancements
    pub async fn read_enhancements(&self, uri: &str) -> Result<Option<StoredContent>> {
        self.db.load_content(uri)
    }

    /// Search stored contents using FTS5 full-text search
    pub async fn search_contents(&self, query: Option<String>) -> Result<Vec<ContentSummary>> {
        self.db.search_contents(query.as_deref())
    }

    /// Stored entity annotations linking to `reference`
    pub async fn find_contents_by_entity(&self, reference: &str) -> Result<Vec<EntityMention>> {
        self.db.contents_mentioning(reference)
    }

    /// Delete stored contents (cascade deletes their entity index rows)
    pub async fn delete_contents(&self, uris: Vec<String>) -> Result<usize> {
        self.db.delete_contents(&uris)
    }
}

async fn run_engine(engine: &dyn EnhancementEngine, item: &ContentItem) -> Result<()> {
    engine
        .compute_enhancements(item)
        .await
        .with_context(|| format!("Engine {} failed on '{}'", engine.name(), item.uri()))
}
