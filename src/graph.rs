use serde::{Deserialize, Serialize};

use crate::vocab::{
    DC_LANGUAGE, DC_RELATION, DC_TYPE, FISE_CONFIDENCE, FISE_END, FISE_ENTITY_LABEL,
    FISE_ENTITY_REFERENCE, FISE_ENTITY_TYPE, FISE_SELECTED_TEXT, FISE_SELECTION_CONTEXT,
    FISE_START,
};

/// Handle of an annotation node (index into the graph's node arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub usize);

/// Kind of an annotation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Text,
    Entity,
    Topic,
}

/// Subject of a triple: an annotation node or an external resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Subject {
    Annotation(AnnotationId),
    Resource(String),
}

/// Object of a triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Object {
    Annotation(AnnotationId),
    Uri(String),
    Literal(Literal),
}

/// Literal value, plain (optionally language tagged) or typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Text { value: String, lang: Option<String> },
    Double(f64),
    Int(i64),
}

impl Object {
    pub fn uri(uri: impl Into<String>) -> Self {
        Object::Uri(uri.into())
    }

    pub fn text(value: impl Into<String>, lang: Option<&str>) -> Self {
        Object::Literal(Literal::Text {
            value: value.into(),
            lang: lang.map(str::to_string),
        })
    }

    pub fn double(value: f64) -> Self {
        Object::Literal(Literal::Double(value))
    }

    pub fn int(value: i64) -> Self {
        Object::Literal(Literal::Int(value))
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Object::Uri(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Object::Literal(Literal::Text { value, .. }) => Some(value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Object::Literal(Literal::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Literal(Literal::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<AnnotationId> {
        match self {
            Object::Annotation(id) => Some(*id),
            _ => None,
        }
    }
}

/// Statement in the enhancement graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Subject,
    pub predicate: String,
    pub object: Object,
}

/// Append-only enhancement graph of one content item
///
/// Annotation nodes live in an arena and are referenced by [`AnnotationId`];
/// everything said about them is a [`Triple`]. Nodes and triples are only
/// ever added, so two graphs built by the same sequence of writes compare
/// equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationGraph {
    annotations: Vec<AnnotationKind>,
    triples: Vec<Triple>,
}

/// Span or document-level text annotation, as read back from a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAnnotationView {
    pub id: AnnotationId,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub selected_text: Option<String>,
    pub selection_context: Option<String>,
    pub dc_type: Option<String>,
    pub language: Option<String>,
    pub confidence: Option<f64>,
}

/// Entity annotation with the spans it relates to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityAnnotationView {
    pub id: AnnotationId,
    pub label: Option<String>,
    pub reference: Option<String>,
    pub entity_type: Option<String>,
    pub confidence: Option<f64>,
    pub related_spans: Vec<TextAnnotationView>,
}

/// Topic classification related to its container text annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAnnotationView {
    pub id: AnnotationId,
    pub label: Option<String>,
    pub reference: Option<String>,
    pub entity_type: Option<String>,
    pub confidence: Option<f64>,
    pub container: Option<AnnotationId>,
}

impl AnnotationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an annotation node and return its handle
    pub fn add_annotation(&mut self, kind: AnnotationKind) -> AnnotationId {
        self.annotations.push(kind);
        AnnotationId(self.annotations.len() - 1)
    }

    pub fn add(&mut self, subject: Subject, predicate: &str, object: Object) {
        self.triples.push(Triple {
            subject,
            predicate: predicate.to_string(),
            object,
        });
    }

    /// Shorthand for a triple about an annotation node
    pub fn annotate(&mut self, id: AnnotationId, predicate: &str, object: Object) {
        self.add(Subject::Annotation(id), predicate, object);
    }

    /// Append every node and triple of `fragment`, shifting its handles
    pub fn append(&mut self, fragment: AnnotationGraph) {
        let offset = self.annotations.len();
        let shift = |id: AnnotationId| AnnotationId(id.0 + offset);
        self.annotations.extend(fragment.annotations);
        self.triples
            .extend(fragment.triples.into_iter().map(|triple| Triple {
                subject: match triple.subject {
                    Subject::Annotation(id) => Subject::Annotation(shift(id)),
                    other => other,
                },
                predicate: triple.predicate,
                object: match triple.object {
                    Object::Annotation(id) => Object::Annotation(shift(id)),
                    other => other,
                },
            }));
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.triples.is_empty()
    }

    pub fn kind(&self, id: AnnotationId) -> Option<AnnotationKind> {
        self.annotations.get(id.0).copied()
    }

    /// Handles of all nodes of `kind`, in creation order
    pub fn annotations_of(&self, kind: AnnotationKind) -> impl Iterator<Item = AnnotationId> + '_ {
        self.annotations
            .iter()
            .enumerate()
            .filter(move |(_, k)| **k == kind)
            .map(|(i, _)| AnnotationId(i))
    }

    /// Objects of all triples matching `subject` and `predicate`
    pub fn objects<'a, 'b>(
        &'a self,
        subject: &'b Subject,
        predicate: &'b str,
    ) -> impl Iterator<Item = &'a Object> + 'b
    where
        'a: 'b,
    {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    pub fn object(&self, subject: &Subject, predicate: &str) -> Option<&Object> {
        self.objects(subject, predicate).next()
    }

    /// Document-level annotations carrying a detected language
    pub fn language_annotations(&self) -> Vec<TextAnnotationView> {
        self.annotations_of(AnnotationKind::Text)
            .filter(|id| self.object(&Subject::Annotation(*id), DC_LANGUAGE).is_some())
            .map(|id| self.text_view(id))
            .collect()
    }

    pub fn entity_annotations(&self) -> Vec<EntityAnnotationView> {
        self.annotations_of(AnnotationKind::Entity)
            .map(|id| {
                let subject = Subject::Annotation(id);
                let related_spans = self
                    .objects(&subject, DC_RELATION)
                    .filter_map(Object::as_annotation)
                    .map(|span| self.text_view(span))
                    .collect();
                EntityAnnotationView {
                    id,
                    label: self.text_of(&subject, FISE_ENTITY_LABEL),
                    reference: self.uri_of(&subject, FISE_ENTITY_REFERENCE),
                    entity_type: self.uri_of(&subject, FISE_ENTITY_TYPE),
                    confidence: self.object(&subject, FISE_CONFIDENCE).and_then(Object::as_double),
                    related_spans,
                }
            })
            .collect()
    }

    pub fn topic_annotations(&self) -> Vec<TopicAnnotationView> {
        self.annotations_of(AnnotationKind::Topic)
            .map(|id| {
                let subject = Subject::Annotation(id);
                TopicAnnotationView {
                    id,
                    label: self.text_of(&subject, FISE_ENTITY_LABEL),
                    reference: self.uri_of(&subject, FISE_ENTITY_REFERENCE),
                    entity_type: self.uri_of(&subject, FISE_ENTITY_TYPE),
                    confidence: self.object(&subject, FISE_CONFIDENCE).and_then(Object::as_double),
                    container: self
                        .object(&subject, DC_RELATION)
                        .and_then(Object::as_annotation),
                }
            })
            .collect()
    }

    fn text_view(&self, id: AnnotationId) -> TextAnnotationView {
        let subject = Subject::Annotation(id);
        TextAnnotationView {
            id,
            start: self.object(&subject, FISE_START).and_then(Object::as_int),
            end: self.object(&subject, FISE_END).and_then(Object::as_int),
            selected_text: self.text_of(&subject, FISE_SELECTED_TEXT),
            selection_context: self.text_of(&subject, FISE_SELECTION_CONTEXT),
            dc_type: self.uri_of(&subject, DC_TYPE),
            language: self.text_of(&subject, DC_LANGUAGE),
            confidence: self.object(&subject, FISE_CONFIDENCE).and_then(Object::as_double),
        }
    }

    fn text_of(&self, subject: &Subject, predicate: &str) -> Option<String> {
        self.object(subject, predicate)
            .and_then(Object::as_text)
            .map(str::to_string)
    }

    fn uri_of(&self, subject: &Subject, predicate: &str) -> Option<String> {
        self.object(subject, predicate)
            .and_then(Object::as_uri)
            .map(str::to_string)
    }
}
