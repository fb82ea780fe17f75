use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mlink_enhancer::client::{ApiClient, Transport, TransportResponse};
use mlink_enhancer::content::ContentItem;
use mlink_enhancer::engine::{AnnotateEngine, AnnotateOptions, EnhancementEngine, LanguageEngine};
use mlink_enhancer::error::{MlError, MlResult};
use mlink_enhancer::manager::EnhancementManager;
use mlink_enhancer::params::{ComparisonMethod, CompressionMethod};
use tempfile::TempDir;

/// Transport replaying scripted replies in order and recording requests
struct ScriptedTransport {
    replies: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    fn new(replies: &[(u16, &str)]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|(status, body)| (*status, body.to_string()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, path: &str, body: String) -> MlResult<TransportResponse> {
        self.requests.lock().unwrap().push((path.to_string(), body));
        let (status, body) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");
        Ok(TransportResponse {
            status,
            body: body.into_bytes(),
        })
    }
}

const TEXT: &str = "Barack Obama visited Rome and talked about politics.";

const ANNOTATION_EN: &str = r#"{"annotation": {
    "lang": "en",
    "cost": 2,
    "keyword": [
        {
            "form": "Barack Obama",
            "rel": 0.95,
            "sense": {"page": "Barack_Obama", "prob": 0.91},
            "class": [{"label": "Person", "url": "http://www.airpedia.org/ontology/class/Person", "resource": "airpedia", "prob": 0.9}],
            "ngram": [{"form": "Barack Obama", "span": {"start": 0, "end": 12}}]
        },
        {
            "form": "Rome",
            "rel": 0.7,
            "sense": {"page": "Rome", "prob": 0.88},
            "ngram": [{"form": "Rome", "span": {"start": 21, "end": 25}}]
        }
    ],
    "topic": [{"label": "Politics", "url": "http://www.airpedia.org/topic/class/Politics", "prob": 0.6}]
}}"#;

const ANNOTATION_IT: &str = r#"{"annotation": {
    "lang": "it",
    "cost": 1,
    "keyword": [{
        "form": "Roma",
        "rel": 0.8,
        "sense": {"page": "Roma", "prob": 0.9},
        "ngram": [{"form": "Roma", "span": {"start": 0, "end": 4}}]
    }]
}}"#;

/// Helper to create temp database file with .db extension
fn create_temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    (dir, path)
}

fn manager_with(transport: Arc<ScriptedTransport>, path: std::path::PathBuf) -> EnhancementManager {
    let client = ApiClient::new("app", "secret", transport);
    EnhancementManager::new(client, AnnotateOptions::default(), path).unwrap()
}

#[tokio::test]
async fn test_annotate_store_and_read_back() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[(200, ANNOTATION_EN)]);
    let manager = manager_with(transport.clone(), path);

    let report = manager.annotate_text("urn:doc:1", TEXT).await.unwrap();
    assert_eq!(report.language.as_deref(), Some("en"));
    assert_eq!(report.entities.len(), 2);
    assert_eq!(report.topics.len(), 1);

    // one request, credentials first, text form-encoded
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/annotate/");
    assert!(requests[0]
        .1
        .starts_with("app_id=app&app_key=secret&text=Barack+Obama+visited+Rome"));

    let stored = manager.read_enhancements("urn:doc:1").await.unwrap().unwrap();
    assert_eq!(stored.text, TEXT);
    assert_eq!(stored.language.as_deref(), Some("en"));
    assert_eq!(stored.graph, report.graph);
}

#[tokio::test]
async fn test_search_and_entity_lookup() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[(200, ANNOTATION_EN), (200, ANNOTATION_IT)]);
    let manager = manager_with(transport, path);

    manager.annotate_text("urn:doc:en", TEXT).await.unwrap();
    manager.annotate_text("urn:doc:it", "Roma è bella").await.unwrap();

    let all = manager.search_contents(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let hits = manager.search_contents(Some("politics".to_string())).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].uri, "urn:doc:en");
    assert_eq!(hits[0].entity_count, 2);

    let mentions = manager
        .find_contents_by_entity("http://dbpedia.org/resource/Rome")
        .await
        .unwrap();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].content_uri, "urn:doc:en");

    // the language code is prefixed to the DBpedia host with no separator
    let mentions = manager
        .find_contents_by_entity("http://itdbpedia.org/resource/Roma")
        .await
        .unwrap();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].label.as_deref(), Some("Roma"));
}

#[tokio::test]
async fn test_delete_cascades_entity_index() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[(200, ANNOTATION_EN)]);
    let manager = manager_with(transport, path);

    manager.annotate_text("urn:doc:1", TEXT).await.unwrap();
    let deleted = manager
        .delete_contents(vec!["urn:doc:1".to_string(), "urn:doc:missing".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert!(manager.read_enhancements("urn:doc:1").await.unwrap().is_none());
    let mentions = manager
        .find_contents_by_entity("http://dbpedia.org/resource/Rome")
        .await
        .unwrap();
    assert!(mentions.is_empty());
}

#[tokio::test]
async fn test_service_error_stores_nothing() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[(
        200,
        r#"{"error": {"msg": "Invalid app key", "code": 403}}"#,
    )]);
    let manager = manager_with(transport, path);

    let err = manager.annotate_text("urn:doc:1", TEXT).await.unwrap_err();
    let service = err.downcast_ref::<MlError>().unwrap();
    assert_eq!(
        service.to_string(),
        "An error occurred while invoking API. Message: [Invalid app key], code: [403]"
    );
    assert!(manager.search_contents(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_mapping_leaves_metadata_untouched() {
    let transport = ScriptedTransport::new(&[(
        200,
        r#"{"annotation": {"lang": "en", "cost": 1, "keyword": [],
            "topic": [{"label": "X", "url": "http://example.org/topics/X", "prob": 0.5}]}}"#,
    )]);
    let engine = AnnotateEngine::new(
        ApiClient::new("app", "secret", transport),
        AnnotateOptions::default(),
    );
    let item = ContentItem::new("urn:doc:1", TEXT);

    let err = engine.compute_enhancements(&item).await.unwrap_err();
    assert!(matches!(err, MlError::UnexpectedNamespace { .. }));
    assert!(item.metadata().await.is_empty());
}

#[tokio::test]
async fn test_same_response_gives_equal_graphs() {
    let transport = ScriptedTransport::new(&[(200, ANNOTATION_EN), (200, ANNOTATION_EN)]);
    let engine = AnnotateEngine::new(
        ApiClient::new("app", "secret", transport),
        AnnotateOptions {
            include_entity_data: true,
            ..Default::default()
        },
    );

    let first = ContentItem::new("urn:doc:1", TEXT);
    let second = ContentItem::new("urn:doc:1", TEXT);
    engine.compute_enhancements(&first).await.unwrap();
    engine.compute_enhancements(&second).await.unwrap();

    assert_eq!(first.snapshot().await, second.snapshot().await);
}

#[tokio::test]
async fn test_engines_append_to_one_item() {
    let transport = ScriptedTransport::new(&[
        (200, r#"{"annotation": {"lang": "en", "cost": 1}}"#),
        (200, ANNOTATION_EN),
    ]);
    let client = ApiClient::new("app", "secret", transport);
    let language = LanguageEngine::new(client.clone());
    let annotate = AnnotateEngine::new(client, AnnotateOptions::default());
    let item = ContentItem::new("urn:doc:1", TEXT);

    language.compute_enhancements(&item).await.unwrap();
    annotate.compute_enhancements(&item).await.unwrap();

    let graph = item.metadata().await;
    assert_eq!(graph.language_annotations().len(), 2);
    let entities = graph.entity_annotations();
    assert_eq!(entities.len(), 2);
    // handles of the second fragment were shifted past the first
    for entity in &entities {
        assert_eq!(entity.related_spans.len(), 1);
        assert!(entity.related_spans[0].id > entity.id);
    }
}

#[tokio::test]
async fn test_compare_and_summarize() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[
        (200, r#"{"annotation": {"cost": 1, "value": 0.42}}"#),
        (
            200,
            r#"{"annotation": {"cost": 1, "summary": [
                {"sentence": "Obama visited Rome.", "weight": 0.9, "start": 0, "end": 19}
            ]}}"#,
        ),
    ]);
    let manager = manager_with(transport.clone(), path);

    let compared = manager
        .compare_texts(ComparisonMethod::Combo, "a", "b")
        .await
        .unwrap();
    assert!((compared.similarity - 0.42).abs() < 1e-6);

    let summary = manager
        .summarize_text(CompressionMethod::Average, 0.5, TEXT)
        .await
        .unwrap();
    assert_eq!(summary.summaries.len(), 1);
    assert_eq!(summary.summaries[0].sentence, "Obama visited Rome.");

    let requests = transport.requests();
    assert_eq!(requests[0].0, "/compare/");
    assert_eq!(requests[1].0, "/summary/");
    assert!(requests[1].1.contains("compression_ratio=0.5&func=average&"));
}

#[tokio::test]
async fn test_blank_text_is_rejected_before_any_call() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[]);
    let manager = manager_with(transport.clone(), path);

    assert!(manager.annotate_text("urn:doc:1", "  \n").await.is_err());
    assert!(manager.detect_language("urn:doc:1", "").await.is_err());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_uri_is_rejected_by_store() {
    let (_dir, path) = create_temp_db();
    let transport = ScriptedTransport::new(&[(200, ANNOTATION_EN)]);
    let manager = manager_with(transport, path);

    assert!(manager.annotate_text("urn:has spaces", TEXT).await.is_err());
}
