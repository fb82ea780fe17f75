//! Maps the service's sense pages, Airpedia classes and Airpedia topics
//! onto DBpedia URIs.

use crate::error::{MlError, MlResult};
use crate::response::{Clazz, Topic};
use crate::vocab::{
    AIRPEDIA_CLASS_PREFIX, AIRPEDIA_TOPIC_PREFIX, DBPEDIA_ONTOLOGY_PREFIX, DBPEDIA_RESOURCE_PREFIX,
};

const AIRPEDIA_SOURCE: &str = "airpedia";

/// Airpedia topics whose first segment is not a usable DBpedia resource.
const SPECIAL_TOPICS: &[(&str, &str)] = &[
    ("Philosophy/Psychology", "Philosophy"),
    ("Sex/gossip", "Gossip"),
    ("Science/technology", "Science"),
];

/// DBpedia resource for a sense page.
///
/// English (or unknown) text maps to `http://dbpedia.org/resource/{page}`.
/// Any other language code is lowercased and placed directly in front of the
/// DBpedia host with no separator, so `it` gives
/// `http://itdbpedia.org/resource/{page}`. An empty code collapses to the
/// English form.
pub fn resource_uri(lang: Option<&str>, sense_page: &str) -> String {
    match lang {
        Some(lang) if !lang.eq_ignore_ascii_case("en") => {
            let host_and_path = &DBPEDIA_RESOURCE_PREFIX["http://".len()..];
            format!(
                "http://{}{}{}",
                lang.to_ascii_lowercase(),
                host_and_path,
                sense_page
            )
        }
        _ => format!("{}{}", DBPEDIA_RESOURCE_PREFIX, sense_page),
    }
}

/// DBpedia ontology type for an Airpedia class.
///
/// Returns `Ok(None)` for classes from any other source; callers then use
/// the class URL itself as the entity type.
pub fn type_uri(clazz: &Clazz) -> MlResult<Option<String>> {
    if clazz.source_resource != AIRPEDIA_SOURCE {
        return Ok(None);
    }
    let local_name = strip_namespace(clazz.url.as_str(), AIRPEDIA_CLASS_PREFIX)?;
    Ok(Some(format!("{}{}", DBPEDIA_ONTOLOGY_PREFIX, local_name)))
}

/// DBpedia resource standing for an Airpedia topic.
///
/// Union topics such as `Sports/Football` resolve to their first segment.
pub fn topic_resource_uri(topic: &Topic) -> MlResult<String> {
    let topic_name = strip_namespace(topic.url.as_str(), AIRPEDIA_TOPIC_PREFIX)?;
    if let Some((_, resource)) = SPECIAL_TOPICS.iter().find(|(name, _)| *name == topic_name) {
        return Ok(format!("{}{}", DBPEDIA_RESOURCE_PREFIX, resource));
    }
    let first = match topic_name.find('/') {
        Some(idx) if idx > 0 => &topic_name[..idx],
        _ => topic_name,
    };
    Ok(format!("{}{}", DBPEDIA_RESOURCE_PREFIX, first.replace(' ', "_")))
}

fn strip_namespace<'a>(uri: &'a str, namespace: &'static str) -> MlResult<&'a str> {
    uri.strip_prefix(namespace)
        .ok_or_else(|| MlError::UnexpectedNamespace {
            uri: uri.to_string(),
            namespace,
        })
}
