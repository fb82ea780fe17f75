//! Turns a decoded annotation response into enhancement graph statements.
//!
//! For each keyword one entity annotation is written, related to one text
//! annotation per span. Topics become topic annotations related to a shared
//! text annotation typed `skos:Concept`. All statements of one call are built
//! into a fresh fragment first, so a resolution failure leaves the
//! destination graph untouched.

use tracing::debug;

use crate::error::MlResult;
use crate::graph::{AnnotationGraph, AnnotationId, AnnotationKind, Object, Subject};
use crate::resolver::{resource_uri, topic_resource_uri, type_uri};
use crate::response::{AnnotationResponse, Keyword};
use crate::selection::selection_context;
use crate::vocab::{
    DCTERMS_LINGUISTIC_SYSTEM, DC_CREATOR, DC_LANGUAGE, DC_RELATION, DC_TYPE, FISE_CONFIDENCE,
    FISE_END, FISE_ENHANCEMENT, FISE_ENTITY_ANNOTATION, FISE_ENTITY_LABEL, FISE_ENTITY_REFERENCE,
    FISE_ENTITY_TYPE, FISE_EXTRACTED_FROM, FISE_SELECTED_TEXT, FISE_SELECTION_CONTEXT, FISE_START,
    FISE_TEXT_ANNOTATION, FISE_TOPIC_ANNOTATION, FOAF_DEPICTION, FOAF_THUMBNAIL, RDFS_COMMENT,
    RDFS_LABEL, RDF_TYPE, SKOS_CONCEPT,
};

/// Where the enhancements come from and what to write besides annotations.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// URI of the content item the text was extracted from.
    pub content_uri: &'a str,
    /// Name of the engine recorded as `dc:creator`.
    pub creator: &'a str,
    /// Also describe each linked entity under its own URI.
    pub include_entity_data: bool,
}

/// Clamp a probability into `[0, 1]`.
pub fn clamp_confidence(probability: f64) -> f64 {
    if probability < 0.0 {
        0.0
    } else if probability > 1.0 {
        1.0
    } else {
        probability
    }
}

/// Build the enhancement fragment for `response` over `text`.
pub fn map_annotations(
    response: &AnnotationResponse,
    text: &str,
    ctx: &MappingContext<'_>,
) -> MlResult<AnnotationGraph> {
    let mut graph = AnnotationGraph::new();
    let lang = response.language.as_str();

    write_language(&mut graph, lang, ctx);

    for keyword in &response.keywords {
        write_keyword(&mut graph, keyword, lang, text, ctx)?;
    }

    let topics: Vec<_> = response
        .topics
        .iter()
        .flatten()
        .collect();
    debug!("> write {} topics", topics.len());
    if !topics.is_empty() {
        let container = new_enhancement(&mut graph, AnnotationKind::Text, ctx);
        graph.annotate(container, DC_TYPE, Object::uri(SKOS_CONCEPT));
        for topic in topics {
            debug!(" - {} [conf: {}]", topic.url, topic.probability);
            let reference = topic_resource_uri(topic)?;
            let anno = new_enhancement(&mut graph, AnnotationKind::Topic, ctx);
            graph.annotate(anno, FISE_ENTITY_TYPE, Object::uri(SKOS_CONCEPT));
            graph.annotate(anno, FISE_ENTITY_REFERENCE, Object::uri(reference));
            graph.annotate(anno, FISE_ENTITY_LABEL, Object::text(&topic.label, None));
            graph.annotate(
                anno,
                FISE_CONFIDENCE,
                Object::double(clamp_confidence(f64::from(topic.probability))),
            );
            graph.annotate(anno, DC_RELATION, Object::Annotation(container));
        }
    }

    Ok(graph)
}

/// Write the document-level language annotation and return its handle.
pub fn write_language(
    graph: &mut AnnotationGraph,
    lang: &str,
    ctx: &MappingContext<'_>,
) -> AnnotationId {
    let id = new_enhancement(graph, AnnotationKind::Text, ctx);
    graph.annotate(id, DC_LANGUAGE, Object::text(lang, None));
    graph.annotate(id, FISE_CONFIDENCE, Object::double(1.0));
    graph.annotate(id, DC_TYPE, Object::uri(DCTERMS_LINGUISTIC_SYSTEM));
    id
}

fn write_keyword(
    graph: &mut AnnotationGraph,
    keyword: &Keyword,
    lang: &str,
    text: &str,
    ctx: &MappingContext<'_>,
) -> MlResult<()> {
    debug!("> keyword '{}' ({:?})", keyword.form, keyword.sense_page);
    let entity = new_enhancement(graph, AnnotationKind::Entity, ctx);
    graph.annotate(entity, FISE_ENTITY_LABEL, Object::text(&keyword.form, Some(lang)));

    let reference = keyword
        .sense_page
        .as_deref()
        .map(|page| resource_uri(Some(lang), page));
    match &reference {
        Some(uri) => {
            debug!(" - dbpedia resource: {}", uri);
            graph.annotate(entity, FISE_ENTITY_REFERENCE, Object::uri(uri.as_str()));
        }
        None => debug!(" - no sense page, entity reference omitted"),
    }

    let mut dc_type = None;
    if let Some(clazz) = keyword.classes.first() {
        match type_uri(clazz)? {
            Some(dbpedia_type) => {
                debug!(" - dbpedia type: {}", dbpedia_type);
                graph.annotate(entity, FISE_ENTITY_TYPE, Object::uri(dbpedia_type.as_str()));
                dc_type = Some(dbpedia_type);
            }
            None => {
                debug!(" - type: {}", clazz.url);
                graph.annotate(entity, FISE_ENTITY_TYPE, Object::uri(clazz.url.as_str()));
            }
        }
    }
    graph.annotate(
        entity,
        FISE_CONFIDENCE,
        Object::double(clamp_confidence(f64::from(keyword.sense_probability))),
    );

    for ngram in &keyword.spans {
        debug!(" - ngram [start: {}, end: {}]", ngram.start, ngram.end);
        let span = new_enhancement(graph, AnnotationKind::Text, ctx);
        graph.annotate(entity, DC_RELATION, Object::Annotation(span));
        graph.annotate(span, FISE_START, Object::int(ngram.start as i64));
        graph.annotate(span, FISE_END, Object::int(ngram.end as i64));
        // the keyword form, not the literal text at [start, end)
        graph.annotate(span, FISE_SELECTED_TEXT, Object::text(&keyword.form, Some(lang)));
        if let Some(dc_type) = &dc_type {
            graph.annotate(span, DC_TYPE, Object::uri(dc_type.as_str()));
        }
        let context = selection_context(text, &keyword.form, ngram.start);
        graph.annotate(span, FISE_SELECTION_CONTEXT, Object::text(context, Some(lang)));
    }

    if ctx.include_entity_data {
        if let Some(uri) = &reference {
            write_entity_data(graph, keyword, uri, lang)?;
        }
    }
    Ok(())
}

fn write_entity_data(
    graph: &mut AnnotationGraph,
    keyword: &Keyword,
    entity_uri: &str,
    lang: &str,
) -> MlResult<()> {
    let subject = || Subject::Resource(entity_uri.to_string());
    graph.add(subject(), RDFS_LABEL, Object::text(&keyword.form, Some(lang)));
    for clazz in &keyword.classes {
        graph.add(subject(), RDF_TYPE, Object::uri(clazz.url.as_str()));
        if let Some(dbpedia_type) = type_uri(clazz)? {
            graph.add(subject(), RDF_TYPE, Object::uri(dbpedia_type));
        }
    }
    if let Some(summary) = keyword.abstract_text.as_deref().filter(|a| !a.is_empty()) {
        graph.add(subject(), RDFS_COMMENT, Object::text(summary, Some(lang)));
    }
    if let Some(image) = keyword.images.first() {
        graph.add(subject(), FOAF_DEPICTION, Object::uri(image.image.as_str()));
        graph.add(subject(), FOAF_THUMBNAIL, Object::uri(image.thumb.as_str()));
    }
    Ok(())
}

/// Create an enhancement node with its bookkeeping statements.
fn new_enhancement(
    graph: &mut AnnotationGraph,
    kind: AnnotationKind,
    ctx: &MappingContext<'_>,
) -> AnnotationId {
    let id = graph.add_annotation(kind);
    let kind_class = match kind {
        AnnotationKind::Text => FISE_TEXT_ANNOTATION,
        AnnotationKind::Entity => FISE_ENTITY_ANNOTATION,
        AnnotationKind::Topic => FISE_TOPIC_ANNOTATION,
    };
    graph.annotate(id, RDF_TYPE, Object::uri(FISE_ENHANCEMENT));
    graph.annotate(id, RDF_TYPE, Object::uri(kind_class));
    graph.annotate(id, FISE_EXTRACTED_FROM, Object::uri(ctx.content_uri));
    graph.annotate(id, DC_CREATOR, Object::text(ctx.creator, None));
    id
}
