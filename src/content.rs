//! A piece of content being enhanced and the metadata graph it accumulates.

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{MlError, MlResult};
use crate::graph::AnnotationGraph;

pub const TEXT_PLAIN: &str = "text/plain";

/// Text content identified by a URI, plus the enhancements written so far.
///
/// Writers take the metadata lock exclusively for the whole of one mapping,
/// so concurrent engines never interleave their triples.
#[derive(Debug)]
pub struct ContentItem {
    uri: String,
    mime_type: String,
    text: String,
    metadata: RwLock<AnnotationGraph>,
}

impl ContentItem {
    /// Plain-text content item.
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_mime_type(uri, TEXT_PLAIN, text)
    }

    pub fn with_mime_type(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            text: text.into(),
            metadata: RwLock::new(AnnotationGraph::new()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Only plain text can be sent to the service.
    pub fn can_enhance(&self) -> bool {
        self.mime_type
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(TEXT_PLAIN))
    }

    /// The text to enhance. Fails for unsupported or blank content.
    pub fn text(&self) -> MlResult<&str> {
        if !self.can_enhance() {
            return Err(MlError::UnsupportedContent {
                uri: self.uri.clone(),
                mime_type: self.mime_type.clone(),
            });
        }
        if self.text.trim().is_empty() {
            return Err(MlError::EmptyContent(self.uri.clone()));
        }
        Ok(&self.text)
    }

    pub async fn metadata(&self) -> RwLockReadGuard<'_, AnnotationGraph> {
        self.metadata.read().await
    }

    pub async fn metadata_mut(&self) -> RwLockWriteGuard<'_, AnnotationGraph> {
        self.metadata.write().await
    }

    /// Copy of the metadata graph.
    pub async fn snapshot(&self) -> AnnotationGraph {
        self.metadata.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_with_charset_is_enhanceable() {
        let item = ContentItem::with_mime_type("urn:c1", "text/plain; charset=UTF-8", "hello");
        assert!(item.can_enhance());
        assert_eq!(item.text().unwrap(), "hello");
    }

    #[test]
    fn html_is_rejected() {
        let item = ContentItem::with_mime_type("urn:c1", "text/html", "<p>hello</p>");
        assert!(!item.can_enhance());
        assert!(matches!(item.text(), Err(MlError::UnsupportedContent { .. })));
    }

    #[test]
    fn blank_text_is_rejected() {
        let item = ContentItem::new("urn:c1", " \n\t ");
        match item.text() {
            Err(MlError::EmptyContent(uri)) => assert_eq!(uri, "urn:c1"),
            other => panic!("expected empty content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn metadata_starts_empty() {
        let item = ContentItem::new("urn:c1", "text");
        assert!(item.metadata().await.is_empty());
    }
}
