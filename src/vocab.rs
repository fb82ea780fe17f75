//! Namespaces and terms of the enhancement graph.

pub const DBPEDIA_RESOURCE_PREFIX: &str = "http://dbpedia.org/resource/";
pub const DBPEDIA_ONTOLOGY_PREFIX: &str = "http://dbpedia.org/ontology/";
pub const AIRPEDIA_CLASS_PREFIX: &str = "http://www.airpedia.org/ontology/class/";
pub const AIRPEDIA_TOPIC_PREFIX: &str = "http://www.airpedia.org/topic/class/";

pub const FISE_ENHANCEMENT: &str = "http://fise.iks-project.eu/ontology/Enhancement";
pub const FISE_TEXT_ANNOTATION: &str = "http://fise.iks-project.eu/ontology/TextAnnotation";
pub const FISE_ENTITY_ANNOTATION: &str = "http://fise.iks-project.eu/ontology/EntityAnnotation";
pub const FISE_TOPIC_ANNOTATION: &str = "http://fise.iks-project.eu/ontology/TopicAnnotation";
pub const FISE_EXTRACTED_FROM: &str = "http://fise.iks-project.eu/ontology/extracted-from";
pub const FISE_CONFIDENCE: &str = "http://fise.iks-project.eu/ontology/confidence";
pub const FISE_START: &str = "http://fise.iks-project.eu/ontology/start";
pub const FISE_END: &str = "http://fise.iks-project.eu/ontology/end";
pub const FISE_SELECTED_TEXT: &str = "http://fise.iks-project.eu/ontology/selected-text";
pub const FISE_SELECTION_CONTEXT: &str = "http://fise.iks-project.eu/ontology/selection-context";
pub const FISE_ENTITY_LABEL: &str = "http://fise.iks-project.eu/ontology/entity-label";
pub const FISE_ENTITY_REFERENCE: &str = "http://fise.iks-project.eu/ontology/entity-reference";
pub const FISE_ENTITY_TYPE: &str = "http://fise.iks-project.eu/ontology/entity-type";

pub const DC_LANGUAGE: &str = "http://purl.org/dc/terms/language";
pub const DC_TYPE: &str = "http://purl.org/dc/terms/type";
pub const DC_RELATION: &str = "http://purl.org/dc/terms/relation";
pub const DC_CREATOR: &str = "http://purl.org/dc/terms/creator";
pub const DCTERMS_LINGUISTIC_SYSTEM: &str = "http://purl.org/dc/terms/LinguisticSystem";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
pub const SKOS_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";
pub const FOAF_DEPICTION: &str = "http://xmlns.com/foaf/0.1/depiction";
pub const FOAF_THUMBNAIL: &str = "http://xmlns.com/foaf/0.1/thumbnail";
