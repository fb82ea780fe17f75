//! Enhancement engines: each one calls the service for a content item and
//! writes what it learned into the item's metadata graph.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::content::ContentItem;
use crate::error::MlResult;
use crate::graph::AnnotationGraph;
use crate::mapper::{map_annotations, write_language, MappingContext};
use crate::params::{self, Candidates};

pub const ANNOTATE_ENGINE: &str = "mlink-annotate";
pub const LANGUAGE_ENGINE: &str = "mlink-language";

#[async_trait]
pub trait EnhancementEngine: Send + Sync {
    /// Recorded as the creator of every annotation the engine writes.
    fn name(&self) -> &str;

    /// Call the service once and append the result to `item`'s metadata.
    /// On failure the metadata is left as it was.
    async fn compute_enhancements(&self, item: &ContentItem) -> MlResult<()>;
}

/// Options of the annotate request and of the mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotateOptions {
    /// Also describe each linked entity under its own URI.
    pub include_entity_data: bool,
    pub topic: Option<bool>,
    pub category: Option<bool>,
    pub class: Option<bool>,
    pub min_weight: Option<f32>,
}

impl AnnotateOptions {
    /// Request parameters carried by these options.
    pub fn candidates(&self) -> Candidates {
        let mut candidates = Candidates::new();
        let toggles = [
            (params::TOPIC, self.topic),
            (params::CATEGORY, self.category),
            (params::CLASS, self.class),
        ];
        for (name, value) in toggles {
            if let Some(value) = value {
                candidates.insert(name.to_string(), value.into());
            }
        }
        if let Some(min_weight) = self.min_weight {
            candidates.insert(params::MIN_WEIGHT.to_string(), min_weight.into());
        }
        candidates
    }
}

/// Links keywords of the text to DBpedia entities and topics.
pub struct AnnotateEngine {
    client: ApiClient,
    options: AnnotateOptions,
}

impl AnnotateEngine {
    pub fn new(client: ApiClient, options: AnnotateOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl EnhancementEngine for AnnotateEngine {
    fn name(&self) -> &str {
        ANNOTATE_ENGINE
    }

    async fn compute_enhancements(&self, item: &ContentItem) -> MlResult<()> {
        let text = item.text()?;
        let response = self
            .client
            .annotate(text, &self.options.candidates())
            .await?;
        info!(
            uri = item.uri(),
            language = %response.language,
            keywords = response.keywords.len(),
            "annotation received"
        );

        let ctx = MappingContext {
            content_uri: item.uri(),
            creator: self.name(),
            include_entity_data: self.options.include_entity_data,
        };
        let mut metadata = item.metadata_mut().await;
        let fragment = map_annotations(&response, text, &ctx)?;
        debug!(
            annotations = fragment.annotation_count(),
            triples = fragment.triples().len(),
            "appending enhancements"
        );
        metadata.append(fragment);
        Ok(())
    }
}

/// Writes only the document language.
pub struct LanguageEngine {
    client: ApiClient,
}

impl LanguageEngine {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EnhancementEngine for LanguageEngine {
    fn name(&self) -> &str {
        LANGUAGE_ENGINE
    }

    async fn compute_enhancements(&self, item: &ContentItem) -> MlResult<()> {
        let text = item.text()?;
        let response = self.client.guess_language(text).await?;
        info!(uri = item.uri(), language = %response.language, "language detected");

        let ctx = MappingContext {
            content_uri: item.uri(),
            creator: self.name(),
            include_entity_data: false,
        };
        let mut fragment = AnnotationGraph::new();
        write_language(&mut fragment, &response.language, &ctx);
        item.metadata_mut().await.append(fragment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Transport, TransportResponse};
    use crate::error::MlError;
    use std::sync::{Arc, Mutex};

    struct Canned {
        body: &'static str,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn post(&self, _path: &str, body: String) -> MlResult<TransportResponse> {
            self.sent.lock().unwrap().push(body);
            Ok(TransportResponse {
                status: 200,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn client(body: &'static str) -> (ApiClient, Arc<Canned>) {
        let transport = Arc::new(Canned {
            body,
            sent: Mutex::new(Vec::new()),
        });
        (ApiClient::new("id", "key", transport.clone()), transport)
    }

    const ANNOTATION: &str = r#"{"annotation": {
        "lang": "en",
        "cost": 1,
        "keyword": [{
            "form": "Obama",
            "rel": 0.9,
            "sense": {"page": "Barack_Obama", "prob": 0.8},
            "ngram": [{"form": "Obama", "span": {"start": 0, "end": 5}}]
        }]
    }}"#;

    #[test]
    fn options_become_candidates() {
        let options = AnnotateOptions {
            topic: Some(true),
            class: Some(false),
            ..Default::default()
        };
        let candidates = options.candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates.get(params::TOPIC), Some(&true.into()));
        assert_eq!(candidates.get(params::CLASS), Some(&false.into()));
    }

    #[tokio::test]
    async fn annotate_engine_appends_to_metadata() {
        let (client, transport) = client(ANNOTATION);
        let engine = AnnotateEngine::new(
            client,
            AnnotateOptions {
                topic: Some(true),
                ..Default::default()
            },
        );
        let item = ContentItem::new("urn:c1", "Obama spoke.");

        engine.compute_enhancements(&item).await.unwrap();

        let graph = item.metadata().await;
        assert_eq!(graph.language_annotations().len(), 1);
        let entities = graph.entity_annotations();
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].reference.as_deref(),
            Some("http://dbpedia.org/resource/Barack_Obama")
        );
        assert!(transport.sent.lock().unwrap()[0].contains("&topic=1&"));
    }

    #[tokio::test]
    async fn blank_content_makes_no_call() {
        let (client, transport) = client(ANNOTATION);
        let engine = AnnotateEngine::new(client, AnnotateOptions::default());
        let item = ContentItem::new("urn:c1", "   ");

        let err = engine.compute_enhancements(&item).await.unwrap_err();
        assert!(matches!(err, MlError::EmptyContent(_)));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(item.metadata().await.is_empty());
    }

    #[tokio::test]
    async fn language_engine_writes_language_only() {
        let (client, _) = client(r#"{"annotation": {"lang": "it", "cost": 1}}"#);
        let engine = LanguageEngine::new(client);
        let item = ContentItem::new("urn:c2", "Ciao a tutti");

        engine.compute_enhancements(&item).await.unwrap();

        let graph = item.metadata().await;
        let languages = graph.language_annotations();
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].language.as_deref(), Some("it"));
        assert!(graph.entity_annotations().is_empty());
    }
}
